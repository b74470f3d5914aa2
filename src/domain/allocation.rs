use super::money::{Amount, Money};
use super::{IndividualId, PaymentId};
use crate::error::ValidationError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// How many rows of an allocation set may be marked as the payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayerPolicy {
    /// No constraint on the number of payer rows.
    #[default]
    Any,
    AtMostOne,
    ExactlyOne,
}

impl PayerPolicy {
    fn admits(self, payers: usize) -> bool {
        match self {
            Self::Any => true,
            Self::AtMostOne => payers <= 1,
            Self::ExactlyOne => payers == 1,
        }
    }
}

impl fmt::Display for PayerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Any => "any",
            Self::AtMostOne => "at-most-one",
            Self::ExactlyOne => "exactly-one",
        })
    }
}

impl FromStr for PayerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "at-most-one" => Ok(Self::AtMostOne),
            "exactly-one" => Ok(Self::ExactlyOne),
            other => Err(format!("unknown payer policy `{other}`")),
        }
    }
}

/// One requested share of a payment, before validation.
///
/// The amount is kept as a raw `Decimal` so that negative input reaches
/// `AllocationSet::build` and is reported as `NegativeAllocation`.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRow {
    pub individual_id: IndividualId,
    pub allocated_amount: Decimal,
    pub is_payer: bool,
}

impl AllocationRow {
    pub fn new(individual_id: IndividualId, allocated_amount: Decimal, is_payer: bool) -> Self {
        Self {
            individual_id,
            allocated_amount,
            is_payer,
        }
    }
}

/// Parses the compact `individual:amount[:payer]` form.
impl FromStr for AllocationRow {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedAllocation(s.to_string());
        let mut parts = s.trim().split(':').map(str::trim);
        let individual_id = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let allocated_amount = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let is_payer = match parts.next() {
            None => false,
            Some(flag) if flag.eq_ignore_ascii_case("payer") => true,
            Some(_) => return Err(malformed()),
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(Self::new(individual_id, allocated_amount, is_payer))
    }
}

/// A persisted allocation row, owned by exactly one payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub payment_id: PaymentId,
    pub individual_id: IndividualId,
    pub allocated_amount: Money,
    pub is_payer: bool,
}

impl fmt::Display for Allocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.individual_id, self.allocated_amount)?;
        if self.is_payer {
            f.write_str(":payer")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Share {
    individual_id: IndividualId,
    amount: Money,
    is_payer: bool,
}

/// The validated decomposition of a payment total across individuals.
///
/// An `AllocationSet` can only be obtained through [`AllocationSet::build`], so
/// holding one proves the sum invariant for its total.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationSet {
    total: Amount,
    shares: Vec<Share>,
}

impl AllocationSet {
    /// Validates `rows` against `total`.
    ///
    /// Checks run in a fixed order: emptiness, per-row sign and precision,
    /// duplicates, payer cardinality, and finally the exact sum.
    pub fn build(
        total: Amount,
        rows: &[AllocationRow],
        policy: PayerPolicy,
    ) -> Result<Self, ValidationError> {
        if rows.is_empty() {
            return Err(ValidationError::EmptyAllocationSet);
        }

        let mut seen = HashSet::with_capacity(rows.len());
        let mut shares = Vec::with_capacity(rows.len());
        for row in rows {
            if row.allocated_amount < Decimal::ZERO {
                return Err(ValidationError::NegativeAllocation {
                    individual: row.individual_id,
                    amount: row.allocated_amount,
                });
            }
            let amount = Money::new(row.allocated_amount)?;
            if !seen.insert(row.individual_id) {
                return Err(ValidationError::DuplicateIndividual(row.individual_id));
            }
            shares.push(Share {
                individual_id: row.individual_id,
                amount,
                is_payer: row.is_payer,
            });
        }

        let payers = shares.iter().filter(|s| s.is_payer).count();
        if !policy.admits(payers) {
            return Err(ValidationError::PayerCount { policy, payers });
        }

        let allocated = Money::checked_sum(shares.iter().map(|s| s.amount))
            .ok_or(ValidationError::AllocationOverflow)?;
        if allocated.value() != total.value() {
            return Err(ValidationError::AmountMismatch {
                expected: total.value(),
                actual: allocated.value(),
            });
        }

        Ok(Self { total, shares })
    }

    pub fn total(&self) -> Amount {
        self.total
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }

    pub fn covers(&self, individual_id: IndividualId) -> bool {
        self.shares.iter().any(|s| s.individual_id == individual_id)
    }

    /// Binds the set to its parent payment, producing the rows to persist.
    pub fn attach(&self, payment_id: PaymentId) -> Vec<Allocation> {
        self.shares
            .iter()
            .map(|s| Allocation {
                payment_id,
                individual_id: s.individual_id,
                allocated_amount: s.amount,
                is_payer: s.is_payer,
            })
            .collect()
    }
}
