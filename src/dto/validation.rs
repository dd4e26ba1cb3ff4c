//! Validation helpers for DTOs.

use serde::Deserialize;
use validator::{Validate, ValidationError};

const GAME_CODE_MIN: usize = 3;
const GAME_CODE_MAX: usize = 12;

/// Validates that a game code is 3 to 12 ASCII letters or digits.
///
/// # Examples
///
/// ```ignore
/// validate_game_code("QUIZ42") // Ok
/// validate_game_code("AB")     // Err - too short
/// validate_game_code("QUIZ-42") // Err - punctuation
/// ```
pub fn validate_game_code(code: &str) -> Result<(), ValidationError> {
    if !(GAME_CODE_MIN..=GAME_CODE_MAX).contains(&code.len()) {
        let mut err = ValidationError::new("game_code_length");
        err.message = Some(
            format!(
                "Game code must be {GAME_CODE_MIN} to {GAME_CODE_MAX} characters (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("game_code_format");
        err.message = Some("Game code must contain only ASCII letters and digits".into());
        return Err(err);
    }

    Ok(())
}

/// Path parameters of routes scoped to one game.
#[derive(Debug, Deserialize, Validate)]
pub struct GameCodePath {
    #[validate(custom(function = "validate_game_code"))]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_game_code_valid() {
        assert!(validate_game_code("ABC").is_ok());
        assert!(validate_game_code("quiz42").is_ok());
        assert!(validate_game_code("ABCDEF123456").is_ok());
    }

    #[test]
    fn test_validate_game_code_invalid_length() {
        assert!(validate_game_code("AB").is_err()); // too short
        assert!(validate_game_code("ABCDEF1234567").is_err()); // too long
        assert!(validate_game_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_game_code_invalid_format() {
        assert!(validate_game_code("QUIZ-42").is_err()); // dash
        assert!(validate_game_code("QUIZ 42").is_err()); // space
        assert!(validate_game_code("../etc").is_err()); // path
    }

    #[test]
    fn test_path_validation_reports_field() {
        let path = GameCodePath { code: "a/b".into() };
        let errors = path.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("code"));

        let path = GameCodePath {
            code: "QUIZ42".into(),
        };
        assert!(path.validate().is_ok());
    }
}
