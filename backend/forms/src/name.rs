use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

pub const MIN_NAME_LEN: usize = 3;

// ASCII letters, Latin-1 supplement (À..ÿ) and spaces
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\u{C0}-\u{FF} ]+$").expect("name pattern compiles"));

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("O nome deve ter pelo menos 3 caracteres")]
    TooShort,

    #[error("Use apenas letras e espaços")]
    InvalidCharacters,
}

/// Trims the name and checks it, returning the trimmed value.
pub fn validate(nome: &str) -> Result<String, NameError> {
    let nome = nome.trim();

    if nome.chars().count() < MIN_NAME_LEN {
        return Err(NameError::TooShort);
    }

    if !NAME.is_match(nome) {
        return Err(NameError::InvalidCharacters);
    }

    Ok(nome.to_string())
}

#[cfg(test)]
mod tests {
    use super::{NameError, validate};

    #[test]
    fn test_trims() {
        assert_eq!(validate("  Maria Silva  ").unwrap(), "Maria Silva");
    }

    #[test]
    fn test_accents() {
        assert_eq!(validate("João Conceição").unwrap(), "João Conceição");
        assert_eq!(validate("Ângela").unwrap(), "Ângela");
    }

    #[test]
    fn test_too_short() {
        assert_eq!(validate(""), Err(NameError::TooShort));
        assert_eq!(validate("  Jo  "), Err(NameError::TooShort));
        assert_eq!(validate("Zé"), Err(NameError::TooShort));
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(validate("Maria2"), Err(NameError::InvalidCharacters));
        assert_eq!(validate("Ana-Maria"), Err(NameError::InvalidCharacters));
        assert_eq!(validate("Łukasz"), Err(NameError::InvalidCharacters));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            NameError::TooShort.to_string(),
            "O nome deve ter pelo menos 3 caracteres"
        );
        assert_eq!(
            NameError::InvalidCharacters.to_string(),
            "Use apenas letras e espaços"
        );
    }
}
