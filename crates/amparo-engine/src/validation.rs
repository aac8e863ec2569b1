//! Sponsor input validation.
//!
//! Validation errors are returned synchronously as
//! [`EngineError::Validation`] with a field-specific message; they never
//! leave a hold behind (the claiming services acquire holds inside the same
//! transaction and roll back on validation failure).

use serde::{Deserialize, Serialize};

use amparo_db::models::GiftPreference;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};

/// Maximum email length per RFC 5321.
const MAX_EMAIL_LENGTH: usize = 254;

/// Sponsor contact details submitted with a claim or reservation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SponsorInfo {
    /// Sponsor display name (required).
    pub name: String,
    /// Sponsor contact email (required, format-checked).
    pub email: String,
    /// Optional phone number.
    pub phone: Option<String>,
    /// Optional free-text message, bounded length.
    pub message: Option<String>,
    /// Gift preference; the closed enum rejects junk values at the edge.
    pub gift_preference: GiftPreference,
}

/// Validate an email address format.
///
/// Practical checks consistent with RFC 5322 basics: exactly one `@`,
/// non-empty local part and domain, a dotted domain, no whitespace,
/// bounded length.
pub fn validate_email(email: &str) -> std::result::Result<(), String> {
    if email.is_empty() {
        return Err("Email is empty".to_string());
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(format!(
            "Email exceeds maximum length of {MAX_EMAIL_LENGTH} characters"
        ));
    }

    if email.contains(char::is_whitespace) {
        return Err("Email contains whitespace".to_string());
    }

    let parts: Vec<&str> = email.splitn(2, '@').collect();
    if parts.len() != 2 {
        return Err("Email must contain exactly one '@'".to_string());
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() {
        return Err("Email local part is empty".to_string());
    }

    if domain.is_empty() {
        return Err("Email domain is empty".to_string());
    }

    if !domain.contains('.') {
        return Err("Email domain must contain at least one '.'".to_string());
    }

    if domain.starts_with('.') || domain.ends_with('.') {
        return Err("Email domain cannot start or end with '.'".to_string());
    }

    Ok(())
}

/// Validate sponsor fields against the configured bounds.
///
/// # Errors
///
/// Returns [`EngineError::Validation`] naming the offending field.
pub fn validate_sponsor_info(info: &SponsorInfo, config: &EngineConfig) -> Result<()> {
    let name = info.name.trim();
    if name.is_empty() {
        return Err(EngineError::Validation("Sponsor name is required".to_string()));
    }
    if name.len() > config.max_name_length {
        return Err(EngineError::Validation(format!(
            "Sponsor name exceeds maximum length of {} characters",
            config.max_name_length
        )));
    }

    validate_email(info.email.trim()).map_err(EngineError::Validation)?;

    if let Some(message) = &info.message {
        if message.len() > config.max_message_length {
            return Err(EngineError::Validation(format!(
                "Message exceeds maximum length of {} characters",
                config.max_message_length
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sponsor() -> SponsorInfo {
        SponsorInfo {
            name: "Alex Moreau".to_string(),
            email: "alex@example.com".to_string(),
            phone: None,
            message: None,
            gift_preference: GiftPreference::Any,
        }
    }

    #[test]
    fn test_validate_email_valid() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("user.name+tag@example.co.uk").is_ok());
        assert!(validate_email("a@b.c").is_ok());
    }

    #[test]
    fn test_validate_email_invalid() {
        assert!(validate_email("").is_err());
        assert!(validate_email("noatsign").is_err());
        assert!(validate_email("@domain.com").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("user@domain").is_err());
        assert!(validate_email("user @domain.com").is_err());
        assert!(validate_email("user@.domain.com").is_err());
        assert!(validate_email("user@domain.com.").is_err());
    }

    #[test]
    fn test_valid_sponsor_passes() {
        assert!(validate_sponsor_info(&sponsor(), &EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut info = sponsor();
        info.name = "   ".to_string();
        let err = validate_sponsor_info(&info, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_overlong_name_rejected() {
        let mut info = sponsor();
        info.name = "x".repeat(201);
        assert!(validate_sponsor_info(&info, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut info = sponsor();
        info.email = "not-an-email".to_string();
        let err = validate_sponsor_info(&info, &EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn test_overlong_message_rejected() {
        let mut info = sponsor();
        info.message = Some("m".repeat(2001));
        assert!(validate_sponsor_info(&info, &EngineConfig::default()).is_err());
    }

    #[test]
    fn test_message_at_bound_accepted() {
        let mut info = sponsor();
        info.message = Some("m".repeat(2000));
        assert!(validate_sponsor_info(&info, &EngineConfig::default()).is_ok());
    }
}
