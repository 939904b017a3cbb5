//! Validation helpers for DTOs.

use validator::ValidationError;

const MAX_CHAT_ID_LEN: usize = 64;
const MAX_ROLE_LEN: usize = 64;

/// Validates a live-chat identity: 1 to 64 characters, no whitespace.
pub fn validate_chat_id(id: &str) -> Result<(), ValidationError> {
    let len = id.chars().count();
    if len == 0 || len > MAX_CHAT_ID_LEN {
        let mut err = ValidationError::new("chat_id_length");
        err.message = Some(
            format!("Chat identity must be 1 to {MAX_CHAT_ID_LEN} characters (got {len})").into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("chat_id_format");
        err.message = Some("Chat identity must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a messaging contact: a numeric chat id or an `@username`.
///
/// # Examples
///
/// ```ignore
/// validate_contact("123456789")   // Ok
/// validate_contact("@mafia_fan")  // Ok
/// validate_contact("@ab")         // Err - username too short
/// validate_contact("12 34")       // Err - not numeric
/// ```
pub fn validate_contact(contact: &str) -> Result<(), ValidationError> {
    if let Some(username) = contact.strip_prefix('@') {
        let valid = (5..=32).contains(&username.len())
            && username
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            let mut err = ValidationError::new("contact_username");
            err.message = Some(
                "Usernames must be 5 to 32 letters, digits or underscores after `@`".into(),
            );
            return Err(err);
        }
        return Ok(());
    }

    let digits = contact.strip_prefix('-').unwrap_or(contact);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("contact_format");
        err.message = Some("Contact must be a numeric id or an @username".into());
        return Err(err);
    }

    Ok(())
}

/// Validates role labels: each one non-blank and at most 64 characters.
pub fn validate_role_labels(roles: &[String]) -> Result<(), ValidationError> {
    for role in roles {
        let trimmed = role.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_ROLE_LEN {
            let mut err = ValidationError::new("role_label");
            err.message =
                Some(format!("Role labels must be 1 to {MAX_ROLE_LEN} characters").into());
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_chat_id() {
        assert!(validate_chat_id("alice_99").is_ok());
        assert!(validate_chat_id("").is_err());
        assert!(validate_chat_id("two words").is_err());
        assert!(validate_chat_id(&"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_contact() {
        assert!(validate_contact("123456789").is_ok());
        assert!(validate_contact("-100200300").is_ok()); // group chat
        assert!(validate_contact("@mafia_fan").is_ok());
        assert!(validate_contact("@ab").is_err());
        assert!(validate_contact("@bad-name").is_err());
        assert!(validate_contact("12 34").is_err());
        assert!(validate_contact("").is_err());
    }

    #[test]
    fn test_validate_role_labels() {
        assert!(validate_role_labels(&["Mafia".into(), "Doctor".into()]).is_ok());
        assert!(validate_role_labels(&["Mafia".into(), "  ".into()]).is_err());
    }
}
