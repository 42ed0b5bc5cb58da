use rand::Rng;
use rand::distributions::Alphanumeric;
use subtle::ConstantTimeEq;

/// Length of verification codes.
pub const CODE_LEN: usize = 6;

/// Generates a fixed-width six-digit verification code.
pub fn generate_verification_code() -> String {
    let n: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{:06}", n)
}

/// Generates a temporary password for the account-recovery mail.
pub fn generate_temp_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

/// Compares a submitted code against the stored one in constant time.
///
/// Codes are stored as fixed-width strings; the submitted value is only
/// trimmed. Length mismatch is an immediate reject.
pub fn codes_match(submitted: &str, stored: &str) -> bool {
    let submitted = submitted.trim();
    if submitted.len() != stored.len() {
        return false;
    }
    submitted.as_bytes().ct_eq(stored.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_fixed_width() {
        for _ in 0..64 {
            let code = generate_verification_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn comparison_trims_but_stays_strict() {
        assert!(codes_match(" 004217 ", "004217"));
        assert!(!codes_match("4217", "004217"));
        assert!(!codes_match("004218", "004217"));
    }

    #[test]
    fn temp_password_is_twelve_alnum() {
        let pw = generate_temp_password();
        assert_eq!(pw.len(), 12);
        assert!(pw.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
