//! Core data models for the CEP cache
//!
//! This module contains the address record shared by the store, the remote
//! client and the CLI, plus the normalizer that turns raw user input into the
//! canonical 8-digit CEP used as the lookup key.

pub mod viacep;

pub use viacep::{FetchError, Fetcher, ViaCepClient};

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Number of digits in a normalized CEP
pub const CEP_LEN: usize = 8;

/// Error returned when raw input does not reduce to a valid CEP
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid CEP: '{input}' ({digits} digits after removing non-digits, expected 8)")]
pub struct ValidationError {
    /// The raw input as supplied by the user
    pub input: String,
    /// How many digits were left after stripping
    pub digits: usize,
}

/// An address resolved for a single CEP
///
/// `code` is always the normalized 8-digit form and is the sole lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRecord {
    /// Normalized 8-digit CEP
    pub code: String,
    /// Street name (logradouro)
    pub street: String,
    /// Complement, e.g. "lado ímpar"
    pub complement: String,
    /// Neighborhood (bairro)
    pub neighborhood: String,
    /// City (localidade)
    pub city: String,
    /// Two-letter state code (UF)
    pub state: String,
    /// IBGE municipality code
    pub ibge: String,
    /// GIA code (São Paulo only, usually empty elsewhere)
    pub gia: String,
    /// Telephone area code
    pub ddd: String,
    /// SIAFI municipality code
    pub siafi: String,
}

impl fmt::Display for AddressRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.street)?;
        if !self.complement.is_empty() {
            write!(f, ", {}", self.complement)?;
        }
        if !self.neighborhood.is_empty() {
            write!(f, " - {}", self.neighborhood)?;
        }
        write!(f, ", {}/{}", self.city, self.state)?;
        write!(
            f,
            " (ibge {}, gia {}, ddd {}, siafi {})",
            self.ibge, self.gia, self.ddd, self.siafi
        )
    }
}

/// Strips every non-digit character and checks that exactly 8 digits remain.
///
/// Letters and punctuation are removed, not counted, so `"abcd12345678"`
/// normalizes to `"12345678"`.
///
/// # Returns
/// * `Ok(String)` with the 8-digit code
/// * `Err(ValidationError)` if any other number of digits remains
pub fn normalize(raw: &str) -> Result<String, ValidationError> {
    let code: String = raw.chars().filter(char::is_ascii_digit).collect();

    if code.len() != CEP_LEN {
        return Err(ValidationError {
            input: raw.to_string(),
            digits: code.len(),
        });
    }

    Ok(code)
}

/// Returns true if `code` is already in normalized form
pub fn is_normalized(code: &str) -> bool {
    code.len() == CEP_LEN && code.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> AddressRecord {
        AddressRecord {
            code: "01001000".to_string(),
            street: "Praça da Sé".to_string(),
            complement: "lado ímpar".to_string(),
            neighborhood: "Sé".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            ibge: "3550308".to_string(),
            gia: "1004".to_string(),
            ddd: "11".to_string(),
            siafi: "7107".to_string(),
        }
    }

    #[test]
    fn test_normalize_strips_punctuation() {
        assert_eq!(normalize("123.456-78").unwrap(), "12345678");
        assert_eq!(normalize("01001-000").unwrap(), "01001000");
        assert_eq!(normalize(" 01001 000 ").unwrap(), "01001000");
    }

    #[test]
    fn test_normalize_letters_are_stripped_not_counted() {
        assert_eq!(normalize("abcd12345678").unwrap(), "12345678");
    }

    #[test]
    fn test_normalize_too_few_digits() {
        let err = normalize("1234567").unwrap_err();
        assert_eq!(err.digits, 7);
        assert_eq!(err.input, "1234567");
    }

    #[test]
    fn test_normalize_too_many_digits() {
        let err = normalize("123456789").unwrap_err();
        assert_eq!(err.digits, 9);
    }

    #[test]
    fn test_normalize_no_digits() {
        let err = normalize("invalid").unwrap_err();
        assert_eq!(err.digits, 0);
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in ["123.456-78", "01001000", "CEP 70040-010"] {
            let once = normalize(raw).unwrap();
            assert_eq!(normalize(&once).unwrap(), once);
        }
    }

    #[test]
    fn test_normalize_rejects_non_ascii_digits() {
        // Arabic-Indic digits are not decimal ASCII digits
        assert!(normalize("٠١٢٣٤٥٦٧").is_err());
    }

    #[test]
    fn test_is_normalized() {
        assert!(is_normalized("01001000"));
        assert!(!is_normalized("01001-000"));
        assert!(!is_normalized("0100100"));
    }

    #[test]
    fn test_record_display_contains_key_fields() {
        let line = sample_record().to_string();
        assert!(line.starts_with("01001000: Praça da Sé"));
        assert!(line.contains("lado ímpar"));
        assert!(line.contains("São Paulo/SP"));
        assert!(line.contains("ddd 11"));
    }

    #[test]
    fn test_record_display_skips_empty_complement() {
        let mut record = sample_record();
        record.complement.clear();
        assert!(!record.to_string().contains(", ,"));
    }

    #[test]
    fn test_record_json_uses_english_field_names() {
        let json = serde_json::to_string(&sample_record()).unwrap();
        assert!(json.contains("\"neighborhood\":\"Sé\""));
        assert!(json.contains("\"code\":\"01001000\""));
    }
}
