use anyhow::{Context, Result};
use std::env;
use zeroize::Zeroizing;

/// Which concrete storage backend serves uploaded files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Files live on the local disk under `storage_root`.
    Local,
    /// Files live in an S3-compatible bucket.
    S3,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The secret used to sign access and refresh tokens.
    pub jwt_secret: Zeroizing<Vec<u8>>,
    /// Access-token lifetime in minutes.
    pub access_token_minutes: i64,
    /// Refresh-token lifetime in days.
    pub refresh_token_days: i64,
    /// Which storage backend to use.
    pub storage_kind: StorageKind,
    /// Root directory for the local backend.
    pub storage_root: String,
    /// Bucket name for the S3 backend.
    pub s3_bucket: String,
    /// Optional custom S3 endpoint (MinIO et al.).
    pub s3_endpoint: Option<String>,
    /// Base URL clients use to reach this server (proxy URL construction).
    pub public_base_url: String,
    /// Default printer name passed to the spooler (`lp -d`).
    pub printer_name: Option<String>,
    /// SMTP relay host; mail goes to the log when unset.
    pub smtp_host: Option<String>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// The From mailbox for outgoing mail.
    pub mail_from: String,
    /// Port to bind.
    pub port: u16,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (generate with: openssl rand -hex 32)")?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters");
        }

        let storage_kind = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "local" => StorageKind::Local,
            "s3" => StorageKind::S3,
            other => anyhow::bail!("Unknown STORAGE_BACKEND: {} (expected local|s3)", other),
        };

        let s3_bucket = env::var("S3_BUCKET").unwrap_or_default();
        if storage_kind == StorageKind::S3 && s3_bucket.is_empty() {
            anyhow::bail!("S3_BUCKET must be set when STORAGE_BACKEND=s3");
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            jwt_secret: Zeroizing::new(jwt_secret.into_bytes()),
            access_token_minutes: env::var("ACCESS_TOKEN_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .context("Invalid ACCESS_TOKEN_MINUTES")?,
            refresh_token_days: env::var("REFRESH_TOKEN_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid REFRESH_TOKEN_DAYS")?,
            storage_kind,
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "uploads/jobs".to_string()),
            s3_bucket,
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3000".to_string()),
            printer_name: env::var("PRINTER_NAME").ok(),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "PrintHub <no-reply@printhub.local>".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid PORT")?,
        })
    }
}
