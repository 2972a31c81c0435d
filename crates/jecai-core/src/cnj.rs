//! CNJ unified process numbers.
//!
//! Every Brazilian court process carries a 20-digit number formatted as
//! `NNNNNNN-DD.AAAA.J.TR.OOOO` (CNJ Resolution 65/2008):
//!
//! - `NNNNNNN` sequential number within the origin unit and year
//! - `DD` check digits (ISO 7064 MOD 97-10)
//! - `AAAA` filing year
//! - `J` judicial segment (8 = state courts)
//! - `TR` court code within the segment (26 = TJSP, 19 = TJRJ, 13 = TJMG)
//! - `OOOO` origin unit

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Shape of a formatted CNJ number, bounded by word breaks. ASCII digits only.
pub(crate) static PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[0-9]{7}-[0-9]{2}\.[0-9]{4}\.[0-9]\.[0-9]{2}\.[0-9]{4}\b").expect("CNJ regex is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CaseNumber {
    pub sequence: u32,
    pub check_digits: u8,
    pub year: u16,
    pub segment: u8,
    pub court: u8,
    pub origin: u16,
}

impl CaseNumber {
    /// First parsable case number in `text`, if any.
    ///
    /// Check digits are not verified here; use
    /// [`has_valid_check_digits`](Self::has_valid_check_digits).
    pub fn find(text: &str) -> Option<Self> {
        PATTERN
            .find_iter(text)
            .find_map(|m| m.as_str().parse().ok())
    }

    /// Check digits implied by the remaining fields.
    pub fn expected_check_digits(&self) -> u8 {
        // N AAAA J TR OOOO followed by "00", reduced mod 97.
        let body = format!(
            "{:07}{:04}{}{:02}{:04}00",
            self.sequence, self.year, self.segment, self.court, self.origin
        );
        let remainder = mod97(&body);
        (98 - remainder) as u8
    }

    pub fn has_valid_check_digits(&self) -> bool {
        self.check_digits == self.expected_check_digits()
    }
}

/// Remainder of a decimal digit string modulo 97, computed piecewise.
fn mod97(digits: &str) -> u32 {
    digits
        .bytes()
        .fold(0u32, |acc, b| (acc * 10 + u32::from(b - b'0')) % 97)
}

impl FromStr for CaseNumber {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || CoreError::MalformedCaseNumber(s.to_string());

        let whole = PATTERN.find(s).ok_or_else(malformed)?;
        if whole.start() != 0 || whole.end() != s.len() {
            return Err(malformed());
        }

        let (sequence, rest) = s.split_once('-').ok_or_else(malformed)?;
        let mut parts = rest.split('.');
        let mut next = || parts.next().ok_or_else(malformed);
        let check_digits = next()?;
        let year = next()?;
        let segment = next()?;
        let court = next()?;
        let origin = next()?;

        Ok(Self {
            sequence: sequence.parse().map_err(|_| malformed())?,
            check_digits: check_digits.parse().map_err(|_| malformed())?,
            year: year.parse().map_err(|_| malformed())?,
            segment: segment.parse().map_err(|_| malformed())?,
            court: court.parse().map_err(|_| malformed())?,
            origin: origin.parse().map_err(|_| malformed())?,
        })
    }
}

impl fmt::Display for CaseNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:07}-{:02}.{:04}.{}.{:02}.{:04}",
            self.sequence, self.check_digits, self.year, self.segment, self.court, self.origin
        )
    }
}

impl TryFrom<String> for CaseNumber {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<CaseNumber> for String {
    fn from(n: CaseNumber) -> Self {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fields() {
        let n: CaseNumber = "0001234-56.2024.8.26.0100".parse().unwrap();
        assert_eq!(n.sequence, 1234);
        assert_eq!(n.check_digits, 56);
        assert_eq!(n.year, 2024);
        assert_eq!(n.segment, 8);
        assert_eq!(n.court, 26);
        assert_eq!(n.origin, 100);
    }

    #[test]
    fn display_restores_zero_padding() {
        let raw = "0001234-56.2024.8.26.0100";
        let n: CaseNumber = raw.parse().unwrap();
        assert_eq!(n.to_string(), raw);
    }

    #[test]
    fn rejects_wrong_shapes() {
        for bad in [
            "",
            "1234-56.2024.8.26.0100",
            "0001234-56.2024.8.26.010",
            "0001234-56.2024.8.26.0100 extra",
            "0001234/56.2024.8.26.0100",
        ] {
            assert!(
                matches!(bad.parse::<CaseNumber>(), Err(CoreError::MalformedCaseNumber(_))),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn check_digits() {
        let valid: CaseNumber = "0001234-71.2024.8.26.0100".parse().unwrap();
        assert_eq!(valid.expected_check_digits(), 71);
        assert!(valid.has_valid_check_digits());

        let invalid: CaseNumber = "0001234-56.2024.8.26.0100".parse().unwrap();
        assert!(!invalid.has_valid_check_digits());

        let tjrj: CaseNumber = "0000001-79.2020.8.19.0001".parse().unwrap();
        assert!(tjrj.has_valid_check_digits());
    }

    #[test]
    fn find_in_text() {
        let n = CaseNumber::find("Processo nº 5001234-17.2023.8.13.0024, 2ª Vara").unwrap();
        assert_eq!(n.court, 13);
        assert!(n.has_valid_check_digits());
        assert!(CaseNumber::find("sem número").is_none());
    }

    #[test]
    fn non_ascii_digits_are_not_case_numbers() {
        let arabic = "autos ٠٠٠١٢٣٤-٥٦.٢٠٢٤.٨.٢٦.٠١٠٠";
        assert!(CaseNumber::find(arabic).is_none());
        assert!("０００１２３４-７１.２０２４.８.２６.０１００".parse::<CaseNumber>().is_err());
    }

    #[test]
    fn find_skips_to_later_ascii_number() {
        let text = "autos ٠٠٠١٢٣٤-٥٦.٢٠٢٤.٨.٢٦.٠١٠٠ e 0001234-71.2024.8.26.0100";
        let n = CaseNumber::find(text).unwrap();
        assert_eq!(n.to_string(), "0001234-71.2024.8.26.0100");
    }

    #[test]
    fn serde_uses_formatted_string() {
        let n: CaseNumber = "0001234-71.2024.8.26.0100".parse().unwrap();
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, "\"0001234-71.2024.8.26.0100\"");
        let back: CaseNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, n);
        assert!(serde_json::from_str::<CaseNumber>("\"x\"").is_err());
    }
}
