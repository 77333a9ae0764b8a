//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of the round-two secret revealed on the dashboard.
pub const ROUND2_SECRET_LEN: usize = 8;

/// Validates that the round-two secret has exactly eight characters (surrounding blanks ignored).
///
/// ```ignore
/// validate_round2_secret("LUMOS123")  // Ok
/// validate_round2_secret("LUMOS")     // Err - too short
/// ```
pub fn validate_round2_secret(secret: &str) -> Result<(), ValidationError> {
    let len = secret.trim().chars().count();
    if len != ROUND2_SECRET_LEN {
        let mut err = ValidationError::new("round2_secret_length");
        err.message = Some(
            format!("Round 2 secret must be exactly {ROUND2_SECRET_LEN} characters (got {len})")
                .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Rejects values that are empty once trimmed.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_must_be_eight_characters() {
        assert!(validate_round2_secret("LUMOS123").is_ok());
        assert!(validate_round2_secret(" LUMOS123 ").is_ok());
        assert!(validate_round2_secret("ÉCLAIRS!").is_ok());
        assert!(validate_round2_secret("LUMOS").is_err());
        assert!(validate_round2_secret("LUMOS1234").is_err());
        assert!(validate_round2_secret("").is_err());
    }

    #[test]
    fn blank_values_are_rejected() {
        assert!(validate_not_blank("Owls").is_ok());
        assert!(validate_not_blank("   ").is_err());
        assert!(validate_not_blank("").is_err());
    }
}
