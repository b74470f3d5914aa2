use crate::error::ValidationError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest sequence a period can issue before the `NNNN` field overflows.
pub const MAX_SEQUENCE: u16 = 9999;

/// A numbering period, identified by the two-digit calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey(u8);

impl PeriodKey {
    pub fn new(two_digit_year: u8) -> Option<Self> {
        (two_digit_year < 100).then_some(Self(two_digit_year))
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self(date.year().rem_euclid(100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// A system-issued official receipt number, `YY-NNNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReceiptNumber {
    period: PeriodKey,
    sequence: u16,
}

impl ReceiptNumber {
    pub fn new(period: PeriodKey, sequence: u16) -> Option<Self> {
        (1..=MAX_SEQUENCE)
            .contains(&sequence)
            .then_some(Self { period, sequence })
    }

    pub fn period(&self) -> PeriodKey {
        self.period
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }
}

impl fmt::Display for ReceiptNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:04}", self.period, self.sequence)
    }
}

impl FromStr for ReceiptNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedReceipt(s.to_string());
        let (year, seq) = s.split_once('-').ok_or_else(malformed)?;
        if year.len() != 2
            || seq.len() != 4
            || !year.bytes().all(|b| b.is_ascii_digit())
            || !seq.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(malformed());
        }
        let period = year
            .parse()
            .ok()
            .and_then(PeriodKey::new)
            .ok_or_else(malformed)?;
        let sequence = seq.parse().map_err(|_| malformed())?;
        Self::new(period, sequence).ok_or_else(malformed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_from_date() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 20).unwrap();
        assert_eq!(PeriodKey::from_date(date).value(), 25);

        let date = NaiveDate::from_ymd_opt(2100, 1, 1).unwrap();
        assert_eq!(PeriodKey::from_date(date).to_string(), "00");
    }

    #[test]
    fn test_receipt_formatting_is_zero_padded() {
        let period = PeriodKey::new(5).unwrap();
        assert_eq!(ReceiptNumber::new(period, 1).unwrap().to_string(), "05-0001");
        assert_eq!(
            ReceiptNumber::new(period, MAX_SEQUENCE).unwrap().to_string(),
            "05-9999"
        );
    }

    #[test]
    fn test_receipt_sequence_bounds() {
        let period = PeriodKey::new(25).unwrap();
        assert!(ReceiptNumber::new(period, 0).is_none());
        assert!(ReceiptNumber::new(period, 10_000).is_none());
    }

    #[test]
    fn test_parse_receipt() {
        let receipt: ReceiptNumber = "25-0042".parse().unwrap();
        assert_eq!(receipt.period().value(), 25);
        assert_eq!(receipt.sequence(), 42);
    }

    #[test]
    fn test_parse_rejects_legacy_shapes() {
        for raw in ["2000001", "OR-00123", "25-42", "2025-0001", "25-00a1", "25-0000"] {
            assert!(
                matches!(
                    raw.parse::<ReceiptNumber>(),
                    Err(ValidationError::MalformedReceipt(_))
                ),
                "{raw} should not parse"
            );
        }
    }
}
