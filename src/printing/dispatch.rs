use std::path::Path;
use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::models::print_job::{ColorMode, Layout, PageRange, PrintSettings};

/// Translates job settings into CUPS `lp` arguments.
///
/// The returned vector does not include the file path; callers append it
/// last so tests can inspect the option set in isolation.
pub fn lp_args(settings: &PrintSettings, printer: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(printer) = printer {
        args.push("-d".to_string());
        args.push(printer.to_string());
    }

    args.push("-n".to_string());
    args.push(settings.copies.max(1).to_string());

    if settings.layout == Layout::Landscape {
        args.push("-o".to_string());
        args.push("landscape".to_string());
    }

    args.push("-o".to_string());
    if settings.print_both_sides {
        args.push("sides=two-sided-long-edge".to_string());
    } else {
        args.push("sides=one-sided".to_string());
    }

    if settings.page_range == PageRange::Custom && !settings.custom_page_range.trim().is_empty() {
        args.push("-o".to_string());
        args.push(format!("page-ranges={}", settings.custom_page_range.trim()));
    }

    args.push("-o".to_string());
    match settings.color_mode {
        ColorMode::Bw => args.push("print-color-mode=monochrome".to_string()),
        ColorMode::Color => args.push("print-color-mode=color".to_string()),
    }

    args.push("-o".to_string());
    args.push(format!("media={}", settings.paper_size.media_name()));

    args
}

/// The platform viewer used when no print spooler is available; opening
/// the document leaves the actual printing to booth staff.
fn viewer_command(path: &Path) -> Command {
    #[cfg(target_os = "linux")]
    {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(path);
        cmd
    }
    #[cfg(target_os = "macos")]
    {
        let mut cmd = Command::new("open");
        cmd.arg(path);
        cmd
    }
    #[cfg(not(any(target_os = "linux", target_os = "macos")))]
    {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg("start").arg("").arg(path);
        cmd
    }
}

/// Sends a locally-resident PDF to the printer.
///
/// # Arguments
///
/// * `path` - A local path to the PDF (already materialized by the
///   storage backend).
/// * `settings` - The job's print options.
/// * `printer` - Destination printer name, or the system default.
///
/// # Errors
///
/// `FileUnavailable` when the source path does not resolve (terminal —
/// the caller should not retry); `PrintDispatch` when the spooler or its
/// fallback rejects the job (retryable).
pub async fn dispatch(path: &Path, settings: &PrintSettings, printer: Option<&str>) -> Result<()> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        return Err(AppError::FileUnavailable(format!(
            "Spool file missing: {}",
            path.display()
        )));
    }

    let args = lp_args(settings, printer);
    tracing::info!("🖨️ Dispatching {} via lp {:?}", path.display(), args);

    match Command::new("lp").args(&args).arg(path).output().await {
        Ok(output) if output.status.success() => {
            tracing::info!("✅ Print job accepted by spooler");
            Ok(())
        }
        Ok(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AppError::PrintDispatch(format!(
                "lp exited with {}: {}",
                output.status,
                stderr.trim()
            )))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            // No spooler installed; hand the document to the viewer so
            // booth staff can print manually.
            tracing::warn!("⚠️ lp not found, falling back to the platform viewer");
            match viewer_command(path).spawn() {
                Ok(_) => {
                    tracing::info!("✅ Opened {} in the platform viewer", path.display());
                    Ok(())
                }
                Err(e) => Err(AppError::PrintDispatch(format!(
                    "No print spooler and viewer fallback failed: {}",
                    e
                ))),
            }
        }
        Err(e) => Err(AppError::PrintDispatch(format!(
            "Failed to spawn lp: {}",
            e
        ))),
    }
}

/// Removes a temporary spool file a few seconds after dispatch, giving
/// the spooler time to read it.
pub fn schedule_spool_cleanup(path: std::path::PathBuf) {
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("⚠️ Failed to remove spool file {}: {}", path.display(), e);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::print_job::PaperSize;

    #[test]
    fn default_settings_translate_to_safe_options() {
        let args = lp_args(&PrintSettings::default(), None);
        assert!(args.contains(&"-n".to_string()));
        assert!(args.contains(&"1".to_string()));
        assert!(args.contains(&"sides=one-sided".to_string()));
        assert!(args.contains(&"print-color-mode=monochrome".to_string()));
        assert!(args.contains(&"media=A4".to_string()));
        assert!(!args.iter().any(|a| a == "landscape"));
        assert!(!args.iter().any(|a| a.starts_with("page-ranges=")));
    }

    #[test]
    fn full_options_translate() {
        let settings = PrintSettings {
            copies: 3,
            page_range: PageRange::Custom,
            custom_page_range: "1-3,7".to_string(),
            layout: Layout::Landscape,
            print_both_sides: true,
            paper_size: PaperSize::Legal,
            color_mode: ColorMode::Color,
            total_pages: 7,
        };
        let args = lp_args(&settings, Some("booth-hp-01"));

        let joined = args.join(" ");
        assert!(joined.contains("-d booth-hp-01"));
        assert!(joined.contains("-n 3"));
        assert!(joined.contains("-o landscape"));
        assert!(joined.contains("sides=two-sided-long-edge"));
        assert!(joined.contains("page-ranges=1-3,7"));
        assert!(joined.contains("print-color-mode=color"));
        assert!(joined.contains("media=Legal"));
    }

    #[test]
    fn copies_floor_is_one() {
        let settings = PrintSettings {
            copies: 0,
            ..Default::default()
        };
        let args = lp_args(&settings, None);
        let n_index = args.iter().position(|a| a == "-n").unwrap();
        assert_eq!(args[n_index + 1], "1");
    }

    #[tokio::test]
    async fn missing_file_is_file_unavailable() {
        let path = Path::new("/nonexistent/printhub-test.pdf");
        match dispatch(path, &PrintSettings::default(), None).await {
            Err(AppError::FileUnavailable(_)) => {}
            other => panic!("expected FileUnavailable, got {:?}", other.map(|_| ())),
        }
    }
}
