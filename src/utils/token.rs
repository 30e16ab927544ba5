//! Normalizes raw credential strings into the `Bearer` header value.

use crate::core::error::{AppError, Result};
use regex::Regex;

/// Turns a token as copied from browser developer tools into the value the
/// `Authorization` header expects.
///
/// Tokens lifted from intercepted requests usually arrive URL-encoded with
/// trailing request parameters attached. Ampersands are percent-encoded
/// first, then the leading `ey…` base64 portion is cut at the first `%`.
/// A bare JWT or an already-prefixed `Bearer ey…` value passes through.
pub fn normalize_bearer_token(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let stripped = trimmed.strip_prefix("Bearer ").unwrap_or(trimmed);
    if stripped.is_empty() {
        return Err(AppError::Token("empty token".to_string()));
    }

    let encoded = stripped.replace('&', "%26");

    let pattern = Regex::new(r"ey.*?%")
        .map_err(|e| AppError::Initialization(format!("Failed to compile token pattern: {}", e)))?;

    let token = match pattern.find(&encoded) {
        Some(found) => found.as_str().trim_end_matches('%').to_string(),
        None if encoded.starts_with("ey") => encoded,
        None => {
            return Err(AppError::Token(
                "expected a JWT starting with 'ey'".to_string(),
            ))
        }
    };

    Ok(format!("Bearer {}", token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_copied_token_is_cut_at_first_escape() {
        let raw = "eyJ0eXAiOiJKV1QifQ.payload.sig%3D&client-request-id=42";
        let bearer = normalize_bearer_token(raw).expect("normalizes");
        assert_eq!(bearer, "Bearer eyJ0eXAiOiJKV1QifQ.payload.sig");
    }

    #[test]
    fn ampersand_is_percent_encoded_before_the_cut() {
        let raw = "eyJhbGciOiJSUzI1NiJ9.body.sig&skypetoken=abc";
        let bearer = normalize_bearer_token(raw).expect("normalizes");
        assert_eq!(bearer, "Bearer eyJhbGciOiJSUzI1NiJ9.body.sig");
    }

    #[test]
    fn bare_jwt_passes_through() {
        let bearer = normalize_bearer_token("eyJhbGciOiJSUzI1NiJ9.body.sig").expect("normalizes");
        assert_eq!(bearer, "Bearer eyJhbGciOiJSUzI1NiJ9.body.sig");
    }

    #[test]
    fn existing_bearer_prefix_is_not_doubled() {
        let bearer =
            normalize_bearer_token("Bearer eyJhbGciOiJSUzI1NiJ9.body.sig").expect("normalizes");
        assert_eq!(bearer, "Bearer eyJhbGciOiJSUzI1NiJ9.body.sig");
    }

    #[test]
    fn non_jwt_input_is_rejected() {
        assert!(matches!(
            normalize_bearer_token("not-a-token"),
            Err(AppError::Token(_))
        ));
        assert!(matches!(
            normalize_bearer_token("   "),
            Err(AppError::Token(_))
        ));
    }
}
