//! License plate normalization and validation.
//!
//! Two layouts are accepted: the old one, `AAA-9999`, and the Mercosul one,
//! `AAA9A99`. The store trusts that any plate it receives went through
//! [`parse_plate`] first.
//!
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

const MAX_PLATE_CHARS: usize = 7;

static OLD_PLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}-[0-9]{4}$").expect("valid old plate regex"));

static MERCOSUL_PLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}[0-9][A-Z][0-9]{2}$").expect("valid mercosul plate regex"));

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlateError {
    #[error("Formato inválido. Use AAA-9999 ou AAA9A99")]
    InvalidFormat,
    #[error("Informe a placa do veículo")]
    Empty,
}

/// Normalizes raw keyboard input into one of the two plate layouts.
///
/// Meant to be applied on every input change, so it copes with partial
/// input: anything that is not a letter or digit is dropped, the result is
/// uppercased and cut to 7 characters, and the layout is guessed from the
/// fifth character (a letter there means Mercosul).
///
pub fn format_plate(raw: &str) -> String {
    let cleaned: Vec<char> = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .take(MAX_PLATE_CHARS)
        .collect();

    if cleaned.len() <= 3 {
        return cleaned.iter().filter(|c| c.is_ascii_uppercase()).collect();
    }

    let (letters, rest) = cleaned.split_at(3);
    let letters: String = letters.iter().collect();

    if rest.len() >= 2 && rest[1].is_ascii_uppercase() {
        let digit: String = rest[..1].iter().filter(|c| c.is_ascii_digit()).collect();
        let letter = rest[1];
        let tail: String = rest[2..]
            .iter()
            .take(2)
            .filter(|c| c.is_ascii_digit())
            .collect();
        return format!("{letters}{digit}{letter}{tail}");
    }

    let numbers: String = rest.iter().filter(|c| c.is_ascii_digit()).collect();
    if numbers.is_empty() {
        letters
    } else {
        format!("{letters}-{numbers}")
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

fn matches_layout(normalized: &str) -> bool {
    OLD_PLATE.is_match(normalized) || MERCOSUL_PLATE.is_match(normalized)
}

/// Accepts either plate layout (after trimming and uppercasing) or an empty
/// string, which stands for "no filter" in search boxes.
pub fn is_valid_plate(value: &str) -> bool {
    let normalized = normalize(value);
    normalized.is_empty() || matches_layout(&normalized)
}

/// Error to show next to a plate field, if any.
pub fn plate_error(value: &str) -> Option<PlateError> {
    if is_valid_plate(value) {
        None
    } else {
        Some(PlateError::InvalidFormat)
    }
}

/// Validates a plate for occupying a spot, returning its normalized form.
pub fn parse_plate(value: &str) -> Result<String, PlateError> {
    let normalized = normalize(value);
    if normalized.is_empty() {
        return Err(PlateError::Empty);
    }
    if !matches_layout(&normalized) {
        return Err(PlateError::InvalidFormat);
    }
    Ok(normalized)
}
