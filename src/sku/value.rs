//! The SKU value object.
//!
//! # Canonical Form
//! ```text
//! LLLL-DDDD
//!  │     └── exactly 4 ASCII digits, leading zeros kept
//!  └──────── exactly 4 ASCII letters, uppercased
//! ```
//!
//! Parsing is the only way to build a [`Sku`], so every value in circulation
//! is canonical.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;

const SEPARATOR: char = '-';
const PART_LEN: usize = 4;

/// Reasons a raw line is not a SKU, in the order they are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkuError {
    #[error("wrong format, expected two parts separated by '-'")]
    Separator,

    #[error("first part must have length 4")]
    FirstPartLength,

    #[error("second part must have length 4")]
    SecondPartLength,

    #[error("first part may only contain letters")]
    FirstPartNotLetters,

    #[error("second part may only contain an unsigned integer")]
    SecondPartNotNumber,
}

impl SkuError {
    /// Short label used in log fields and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkuError::Separator => "separator",
            SkuError::FirstPartLength => "first_part_length",
            SkuError::SecondPartLength => "second_part_length",
            SkuError::FirstPartNotLetters => "first_part_not_letters",
            SkuError::SecondPartNotNumber => "second_part_not_number",
        }
    }
}

/// A validated, normalized stock-keeping unit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sku(String);

impl Sku {
    /// Clean, validate and normalize a raw input line.
    pub fn parse(raw: &str) -> Result<Self, SkuError> {
        let cleaned: String = raw.chars().filter(|c| !matches!(c, '\n' | '\r')).collect();
        let cleaned = cleaned.trim_matches(' ');

        let mut parts = cleaned.split(SEPARATOR);
        let (letters, digits) = match (parts.next(), parts.next(), parts.next()) {
            (Some(letters), Some(digits), None) => (letters, digits),
            _ => return Err(SkuError::Separator),
        };

        if letters.len() != PART_LEN {
            return Err(SkuError::FirstPartLength);
        }
        if digits.len() != PART_LEN {
            return Err(SkuError::SecondPartLength);
        }
        if !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(SkuError::FirstPartNotLetters);
        }
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(SkuError::SecondPartNotNumber);
        }

        Ok(Self(format!(
            "{}{}{}",
            letters.to_ascii_uppercase(),
            SEPARATOR,
            digits
        )))
    }

    /// The canonical string, used as the identity key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical form with the digit part's leading zeros removed.
    ///
    /// An all-zero digit part collapses to a single `0`. Only meant for
    /// human-facing output; equality always uses the canonical form.
    pub fn zero_trimmed(&self) -> String {
        let (letters, digits) = self.split();
        let trimmed = digits.trim_start_matches('0');
        let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
        format!("{}{}{}", letters, SEPARATOR, trimmed)
    }

    fn split(&self) -> (&str, &str) {
        // Canonical values always hold exactly one ASCII separator at PART_LEN.
        (&self.0[..PART_LEN], &self.0[PART_LEN + 1..])
    }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Sku {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
