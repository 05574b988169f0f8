//! Routing identifiers (IBAN)
//!
//! `Iban` is the only way an account is addressed from outside the crate.
//! Parsing normalizes and checks the shape; check digits are computed with
//! ISO 7064 MOD 97-10 when generating, so every IBAN this service issues
//! validates against any standard IBAN checker.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// IBAN shape errors
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum IbanError {
    #[error("Invalid IBAN length: expected 5-34, got {0}")]
    InvalidLength(usize),

    #[error("Invalid IBAN format: '{0}'")]
    InvalidFormat(String),
}

/// Validated, normalized routing identifier.
///
/// Ordering is plain lexicographic order of the normalized string. The
/// transfer engine relies on it as the canonical row-lock order.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema,
)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
#[schema(value_type = String, example = "NL26LEDG0123456789")]
pub struct Iban(String);

impl Iban {
    pub const MIN_LEN: usize = 5;
    pub const MAX_LEN: usize = 34;

    /// Parse and normalize (drop whitespace, upper-case).
    pub fn parse(raw: &str) -> Result<Self, IbanError> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();

        let len = normalized.len();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(IbanError::InvalidLength(len));
        }

        let bytes = normalized.as_bytes();
        let well_formed = bytes[..2].iter().all(u8::is_ascii_uppercase)
            && bytes[2..4].iter().all(u8::is_ascii_digit)
            && bytes[4..].iter().all(u8::is_ascii_alphanumeric);
        if !well_formed {
            return Err(IbanError::InvalidFormat(normalized));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn country_code(&self) -> &str {
        &self.0[..2]
    }

    /// True when the check digits satisfy MOD 97-10.
    pub fn has_valid_checksum(&self) -> bool {
        let rearranged = format!("{}{}", &self.0[4..], &self.0[..4]);
        mod97(&rearranged) == 1
    }
}

impl fmt::Display for Iban {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Iban {
    type Error = IbanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Iban> for String {
    fn from(iban: Iban) -> Self {
        iban.0
    }
}

/// Remainder of the alphanumeric string (letters expanded A=10..Z=35) mod 97.
fn mod97(s: &str) -> u32 {
    s.chars().fold(0u32, |acc, c| match c.to_digit(36) {
        Some(v) if v >= 10 => (acc * 100 + v) % 97,
        Some(v) => (acc * 10 + v) % 97,
        None => acc,
    })
}

/// Compute the two check digits for `country` + `bban`.
pub fn check_digits(country: &str, bban: &str) -> u32 {
    98 - mod97(&format!("{}{}00", bban, country))
}

/// Issues IBANs of the form `<country><check><bank code><10 digits>`.
#[derive(Debug, Clone)]
pub struct IbanGenerator {
    country_code: String,
    bank_code: String,
}

impl IbanGenerator {
    pub const ACCOUNT_NUMBER_DIGITS: usize = 10;

    pub fn new(country_code: &str, bank_code: &str) -> Result<Self, IbanError> {
        let country_code = country_code.trim().to_ascii_uppercase();
        let bank_code = bank_code.trim().to_ascii_uppercase();

        if country_code.len() != 2 || !country_code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(IbanError::InvalidFormat(country_code));
        }
        if bank_code.is_empty() || !bank_code.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(IbanError::InvalidFormat(bank_code));
        }
        let total = 4 + bank_code.len() + Self::ACCOUNT_NUMBER_DIGITS;
        if total > Iban::MAX_LEN {
            return Err(IbanError::InvalidLength(total));
        }

        Ok(Self {
            country_code,
            bank_code,
        })
    }

    /// Build the IBAN for a specific account number.
    pub fn for_account_number(&self, account_number: u64) -> Iban {
        let bban = format!(
            "{}{:0width$}",
            self.bank_code,
            account_number,
            width = Self::ACCOUNT_NUMBER_DIGITS
        );
        let check = check_digits(&self.country_code, &bban);
        Iban(format!("{}{:02}{}", self.country_code, check, bban))
    }

    /// Draw a random account number. Uniqueness is enforced by the store;
    /// callers retry on conflict.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Iban {
        self.for_account_number(rng.gen_range(0..10_000_000_000u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let iban = Iban::parse(" nl91 abna 0417 1643 00 ").unwrap();
        assert_eq!(iban.as_str(), "NL91ABNA0417164300");
        assert_eq!(iban.country_code(), "NL");
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        assert_eq!(Iban::parse("NL9"), Err(IbanError::InvalidLength(3)));
        assert!(matches!(
            Iban::parse("1234ABCD"),
            Err(IbanError::InvalidFormat(_))
        ));
        assert!(matches!(
            Iban::parse("NLXX1234"),
            Err(IbanError::InvalidFormat(_))
        ));
        assert!(matches!(
            Iban::parse("NL91-1234"),
            Err(IbanError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_known_iban_checksum() {
        assert!(Iban::parse("NL91ABNA0417164300").unwrap().has_valid_checksum());
        assert!(Iban::parse("GB82WEST12345698765432").unwrap().has_valid_checksum());
        assert!(!Iban::parse("NL92ABNA0417164300").unwrap().has_valid_checksum());
    }

    #[test]
    fn test_generated_ibans_validate() {
        let generator = IbanGenerator::new("nl", "ledg").unwrap();
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let iban = generator.generate(&mut rng);
            assert_eq!(iban.as_str().len(), 18);
            assert!(iban.as_str().starts_with("NL"));
            assert!(iban.has_valid_checksum(), "bad checksum: {}", iban);
            assert_eq!(Iban::parse(iban.as_str()).unwrap(), iban);
        }
    }

    #[test]
    fn test_account_number_is_zero_padded() {
        let generator = IbanGenerator::new("NL", "LEDG").unwrap();
        let iban = generator.for_account_number(42);
        assert!(iban.as_str().ends_with("LEDG0000000042"));
        assert!(iban.has_valid_checksum());
    }

    #[test]
    fn test_generator_rejects_bad_codes() {
        assert!(IbanGenerator::new("N", "LEDG").is_err());
        assert!(IbanGenerator::new("NL", "").is_err());
        assert!(IbanGenerator::new("NL", "LE-DG").is_err());
        assert!(IbanGenerator::new("NL", "ABCDEFGHIJKLMNOPQRSTUVWXYZ").is_err());
    }

    #[test]
    fn test_serde_round_trip_goes_through_parse() {
        let iban: Iban = serde_json::from_str("\"nl91abna0417164300\"").unwrap();
        assert_eq!(iban.as_str(), "NL91ABNA0417164300");
        assert!(serde_json::from_str::<Iban>("\"??\"").is_err());
    }
}
