use crate::error::{AppError, Result};

/// A kiosk lookup key: either identifier resolves to the same user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KioskIdentifier {
    /// Seven digits, no leading zero.
    StudentId(String),
    /// Ten digits, leading zero.
    Rfid(String),
}

/// Validates a campus student ID: exactly 7 digits, no leading zero.
pub fn validate_student_id(student_id: &str) -> Result<()> {
    if student_id.len() != 7
        || !student_id.chars().all(|c| c.is_ascii_digit())
        || student_id.starts_with('0')
    {
        return Err(AppError::Validation(
            "Student ID must be 7 digits and must not start with 0".to_string(),
        ));
    }
    Ok(())
}

/// Validates an RFID card number: exactly 10 digits with a leading zero.
pub fn validate_rfid(rfid: &str) -> Result<()> {
    if rfid.len() != 10
        || !rfid.chars().all(|c| c.is_ascii_digit())
        || !rfid.starts_with('0')
    {
        return Err(AppError::Validation(
            "RFID card number must be 10 digits starting with 0".to_string(),
        ));
    }
    Ok(())
}

/// Classifies a kiosk identifier as a student ID or an RFID number.
///
/// # Arguments
///
/// * `identifier` - The raw identifier typed or scanned at the booth.
///
/// # Returns
///
/// The classified identifier, or a validation error for anything that is
/// neither shape.
pub fn classify_identifier(identifier: &str) -> Result<KioskIdentifier> {
    let identifier = identifier.trim();

    if validate_student_id(identifier).is_ok() {
        return Ok(KioskIdentifier::StudentId(identifier.to_string()));
    }
    if validate_rfid(identifier).is_ok() {
        return Ok(KioskIdentifier::Rfid(identifier.to_string()));
    }

    Err(AppError::Validation(
        "Identifier must be a 7-digit student ID or a 10-digit RFID number".to_string(),
    ))
}

/// Validates a password.
pub fn validate_password(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    if password.len() > 128 {
        return Err(AppError::Validation(
            "Password must be at most 128 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validates a phone number: digits with an optional leading plus.
pub fn validate_phone(phone: &str) -> Result<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if digits.len() < 7 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "Phone number must be 7-15 digits".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_id_rules() {
        assert!(validate_student_id("1234567").is_ok());
        assert!(validate_student_id("0123456").is_err());
        assert!(validate_student_id("123456").is_err());
        assert!(validate_student_id("12345678").is_err());
        assert!(validate_student_id("12a4567").is_err());
    }

    #[test]
    fn rfid_rules() {
        assert!(validate_rfid("0123456789").is_ok());
        assert!(validate_rfid("1234567890").is_err());
        assert!(validate_rfid("012345678").is_err());
        assert!(validate_rfid("12345678901").is_err());
    }

    #[test]
    fn classifier_accepts_both_shapes() {
        assert_eq!(
            classify_identifier("1234567").unwrap(),
            KioskIdentifier::StudentId("1234567".to_string())
        );
        assert_eq!(
            classify_identifier(" 0123456789 ").unwrap(),
            KioskIdentifier::Rfid("0123456789".to_string())
        );
        assert!(classify_identifier("0123456").is_err());
        assert!(classify_identifier("12345678901").is_err());
    }

    #[test]
    fn phone_rules() {
        assert!(validate_phone("+8801712345678").is_ok());
        assert!(validate_phone("0171234").is_ok());
        assert!(validate_phone("12-34").is_err());
    }
}
