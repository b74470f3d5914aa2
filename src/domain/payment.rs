use super::actor::Actor;
use super::allocation::{Allocation, AllocationRow, AllocationSet, PayerPolicy};
use super::lifecycle::{Outcome, PaymentEvent, PaymentStatus};
use super::money::Amount;
use super::{ChurchId, ContributionTypeId, IndividualId, PaymentId, UserId};
use crate::error::{Result, ValidationError};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Gcash,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cash => "CASH",
            Self::Gcash => "GCASH",
        })
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CASH" => Ok(Self::Cash),
            "GCASH" => Ok(Self::Gcash),
            other => Err(format!("unknown payment method `{other}`")),
        }
    }
}

/// Who touched a payment, and when.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub collected_by: UserId,
    pub validated_by: Option<UserId>,
    pub validated_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<UserId>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
}

impl AuditTrail {
    pub fn opened(actor: &Actor, now: DateTime<Utc>) -> Self {
        Self {
            created_by: actor.user_id,
            created_at: now,
            collected_by: actor.user_id,
            validated_by: None,
            validated_at: None,
            cancelled_by: None,
            cancelled_at: None,
            cancellation_reason: None,
        }
    }
}

/// A request to record a payment, as submitted by the collecting user.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentIntent {
    pub contributor_id: IndividualId,
    pub contribution_type_id: ContributionTypeId,
    pub church_id: Option<ChurchId>,
    pub amount: Decimal,
    pub date_paid: NaiveDate,
    pub method: PaymentMethod,
    pub gcash_reference: Option<String>,
    pub is_legacy_record: bool,
    /// Operator-supplied receipt number; only accepted on legacy records.
    pub receipt_number: Option<String>,
    pub remarks: Option<String>,
    pub allocations: Vec<AllocationRow>,
}

impl PaymentIntent {
    pub fn cash(
        contributor_id: IndividualId,
        contribution_type_id: ContributionTypeId,
        amount: Decimal,
        date_paid: NaiveDate,
    ) -> Self {
        Self {
            contributor_id,
            contribution_type_id,
            church_id: None,
            amount,
            date_paid,
            method: PaymentMethod::Cash,
            gcash_reference: None,
            is_legacy_record: false,
            receipt_number: None,
            remarks: None,
            allocations: Vec::new(),
        }
    }

    pub fn gcash(
        contributor_id: IndividualId,
        contribution_type_id: ContributionTypeId,
        amount: Decimal,
        date_paid: NaiveDate,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            method: PaymentMethod::Gcash,
            gcash_reference: Some(reference.into()),
            ..Self::cash(contributor_id, contribution_type_id, amount, date_paid)
        }
    }

    pub fn allocate(mut self, individual_id: IndividualId, amount: Decimal, is_payer: bool) -> Self {
        self.allocations
            .push(AllocationRow::new(individual_id, amount, is_payer));
        self
    }

    /// Marks the intent as a historical back-fill carrying `receipt_number`, if any.
    pub fn legacy(mut self, receipt_number: Option<String>) -> Self {
        self.is_legacy_record = true;
        self.receipt_number = receipt_number;
        self
    }

    pub fn in_church(mut self, church_id: ChurchId) -> Self {
        self.church_id = Some(church_id);
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    /// Checks every rule that can be decided from the intent alone.
    pub fn prepare(self, policy: PayerPolicy) -> std::result::Result<PreparedPayment, ValidationError> {
        let amount = Amount::new(self.amount)?;

        let gcash_reference = non_blank(self.gcash_reference);
        match (self.method, &gcash_reference) {
            (PaymentMethod::Gcash, None) => return Err(ValidationError::MissingGcashReference),
            (PaymentMethod::Cash, Some(_)) => {
                return Err(ValidationError::UnexpectedGcashReference);
            }
            _ => {}
        }

        let receipt_number = non_blank(self.receipt_number);
        if !self.is_legacy_record && receipt_number.is_some() {
            return Err(ValidationError::ReceiptNotAllowed);
        }

        let allocations = AllocationSet::build(amount, &self.allocations, policy)?;

        Ok(PreparedPayment {
            contributor_id: self.contributor_id,
            contribution_type_id: self.contribution_type_id,
            church_id: self.church_id,
            amount,
            date_paid: self.date_paid,
            method: self.method,
            gcash_reference,
            is_legacy_record: self.is_legacy_record,
            receipt_number,
            remarks: non_blank(self.remarks),
            allocations,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// An intent that passed validation and only awaits status, receipt and audit.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedPayment {
    pub contributor_id: IndividualId,
    pub contribution_type_id: ContributionTypeId,
    pub church_id: Option<ChurchId>,
    pub amount: Amount,
    pub date_paid: NaiveDate,
    pub method: PaymentMethod,
    pub gcash_reference: Option<String>,
    pub is_legacy_record: bool,
    pub receipt_number: Option<String>,
    pub remarks: Option<String>,
    pub allocations: AllocationSet,
}

impl PreparedPayment {
    /// Moves the payment out of `Draft`, stamping the collector and, when the
    /// payment lands in `Validated`, the validator.
    pub fn submit(self, collector: &Actor, can_validate: bool, now: DateTime<Utc>) -> Result<NewPayment> {
        let event = if self.is_legacy_record {
            PaymentEvent::Backfill
        } else {
            PaymentEvent::Submit {
                method: self.method,
                collector_can_validate: can_validate,
            }
        };
        let status = match PaymentStatus::Draft.on(event)? {
            Outcome::Moved(status) => status,
            Outcome::Unchanged => PaymentStatus::Draft,
        };

        let mut audit = AuditTrail::opened(collector, now);
        if status == PaymentStatus::Validated {
            audit.validated_by = Some(collector.user_id);
            audit.validated_at = Some(now);
        }

        Ok(NewPayment {
            receipt_number: self.receipt_number,
            amount: self.amount,
            date_paid: self.date_paid,
            method: self.method,
            gcash_reference: self.gcash_reference,
            contributor_id: self.contributor_id,
            contribution_type_id: self.contribution_type_id,
            church_id: self.church_id,
            remarks: self.remarks,
            status,
            is_legacy_record: self.is_legacy_record,
            allocations: self.allocations,
            audit,
        })
    }
}

/// A payment ready to be inserted; the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub receipt_number: Option<String>,
    pub amount: Amount,
    pub date_paid: NaiveDate,
    pub method: PaymentMethod,
    pub gcash_reference: Option<String>,
    pub contributor_id: IndividualId,
    pub contribution_type_id: ContributionTypeId,
    pub church_id: Option<ChurchId>,
    pub remarks: Option<String>,
    pub status: PaymentStatus,
    pub is_legacy_record: bool,
    pub allocations: AllocationSet,
    pub audit: AuditTrail,
}

impl NewPayment {
    /// Whether inserting this payment claims its receipt number in the active index.
    pub fn claims_receipt(&self) -> bool {
        !self.is_legacy_record && self.status.holds_receipt() && self.receipt_number.is_some()
    }

    pub fn into_payment(self, id: PaymentId) -> Payment {
        Payment {
            id,
            receipt_number: self.receipt_number,
            amount: self.amount,
            date_paid: self.date_paid,
            method: self.method,
            gcash_reference: self.gcash_reference,
            contributor_id: self.contributor_id,
            contribution_type_id: self.contribution_type_id,
            church_id: self.church_id,
            remarks: self.remarks,
            status: self.status,
            is_legacy_record: self.is_legacy_record,
            allocations: self.allocations.attach(id),
            audit: self.audit,
        }
    }
}

/// A recorded payment and its allocation rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub receipt_number: Option<String>,
    pub amount: Amount,
    pub date_paid: NaiveDate,
    pub method: PaymentMethod,
    pub gcash_reference: Option<String>,
    pub contributor_id: IndividualId,
    pub contribution_type_id: ContributionTypeId,
    pub church_id: Option<ChurchId>,
    pub remarks: Option<String>,
    pub status: PaymentStatus,
    pub is_legacy_record: bool,
    pub allocations: Vec<Allocation>,
    pub audit: AuditTrail,
}

impl Payment {
    /// Applies validation by `actor`. Returns `false` when the payment was
    /// already validated, in which case nothing is re-stamped.
    pub fn validate(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<bool> {
        match self.status.on(PaymentEvent::Validate)? {
            Outcome::Unchanged => Ok(false),
            Outcome::Moved(status) => {
                self.status = status;
                self.audit.validated_by = Some(actor.user_id);
                self.audit.validated_at = Some(now);
                Ok(true)
            }
        }
    }

    /// Cancels the payment, which releases its receipt number.
    pub fn cancel(&mut self, actor: &Actor, reason: &str, now: DateTime<Utc>) -> Result<()> {
        let outcome = self.status.on(PaymentEvent::Cancel)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingCancellationReason.into());
        }
        if let Outcome::Moved(status) = outcome {
            self.status = status;
            self.audit.cancelled_by = Some(actor.user_id);
            self.audit.cancelled_at = Some(now);
            self.audit.cancellation_reason = Some(reason.to_string());
        }
        Ok(())
    }

    pub fn holds_receipt(&self) -> bool {
        !self.is_legacy_record && self.status.holds_receipt() && self.receipt_number.is_some()
    }

    pub fn covers(&self, individual_id: IndividualId) -> bool {
        self.allocations
            .iter()
            .any(|a| a.individual_id == individual_id)
    }

    pub fn payers(&self) -> impl Iterator<Item = IndividualId> + '_ {
        self.allocations
            .iter()
            .filter(|a| a.is_payer)
            .map(|a| a.individual_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::actor::Role;
    use crate::error::LedgerError;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 9).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 9, 8, 30, 0).unwrap()
    }

    fn collector() -> Actor {
        Actor::new(10, [Role::Collector])
    }

    #[test]
    fn test_prepare_cash_intent() {
        let prepared = PaymentIntent::cash(1, 2, dec!(500.00), day())
            .allocate(1, dec!(500.00), true)
            .with_remarks("  annual dues ")
            .prepare(PayerPolicy::Any)
            .unwrap();
        assert_eq!(prepared.amount.value(), dec!(500));
        assert_eq!(prepared.remarks.as_deref(), Some("annual dues"));
        assert!(prepared.gcash_reference.is_none());
    }

    #[test]
    fn test_gcash_reference_rules() {
        let missing = PaymentIntent::gcash(1, 2, dec!(10), day(), "  ")
            .allocate(1, dec!(10), true)
            .prepare(PayerPolicy::Any);
        assert_eq!(missing, Err(ValidationError::MissingGcashReference));

        let mut cash = PaymentIntent::cash(1, 2, dec!(10), day()).allocate(1, dec!(10), true);
        cash.gcash_reference = Some("GC1".into());
        assert_eq!(
            cash.prepare(PayerPolicy::Any),
            Err(ValidationError::UnexpectedGcashReference)
        );

        let mut blank_cash = PaymentIntent::cash(1, 2, dec!(10), day()).allocate(1, dec!(10), true);
        blank_cash.gcash_reference = Some(String::new());
        assert!(blank_cash.prepare(PayerPolicy::Any).is_ok());
    }

    #[test]
    fn test_receipt_only_accepted_on_legacy() {
        let mut intent = PaymentIntent::cash(1, 2, dec!(10), day()).allocate(1, dec!(10), true);
        intent.receipt_number = Some("2000001".into());
        assert_eq!(
            intent.clone().prepare(PayerPolicy::Any),
            Err(ValidationError::ReceiptNotAllowed)
        );

        let prepared = intent
            .legacy(Some("2000001".into()))
            .prepare(PayerPolicy::Any)
            .unwrap();
        assert_eq!(prepared.receipt_number.as_deref(), Some("2000001"));
    }

    #[test]
    fn test_submit_stamps_validator_for_cash() {
        let new = PaymentIntent::cash(1, 2, dec!(10), day())
            .allocate(1, dec!(10), true)
            .prepare(PayerPolicy::Any)
            .unwrap()
            .submit(&collector(), false, now())
            .unwrap();
        assert_eq!(new.status, PaymentStatus::Validated);
        assert_eq!(new.audit.collected_by, 10);
        assert_eq!(new.audit.validated_by, Some(10));
        assert_eq!(new.audit.validated_at, Some(now()));
    }

    #[test]
    fn test_submit_leaves_gcash_pending() {
        let new = PaymentIntent::gcash(1, 2, dec!(10), day(), "GC9")
            .allocate(1, dec!(10), true)
            .prepare(PayerPolicy::Any)
            .unwrap()
            .submit(&collector(), false, now())
            .unwrap();
        assert_eq!(new.status, PaymentStatus::PendingValidation);
        assert!(new.audit.validated_by.is_none());
        assert!(!new.claims_receipt());
    }

    #[test]
    fn test_legacy_submit() {
        let new = PaymentIntent::cash(1, 2, dec!(10), day())
            .allocate(1, dec!(10), true)
            .legacy(None)
            .prepare(PayerPolicy::Any)
            .unwrap()
            .submit(&collector(), true, now())
            .unwrap();
        assert_eq!(new.status, PaymentStatus::Legacy);
        assert!(new.audit.validated_at.is_none());

        let payment = new.into_payment(3);
        assert!(!payment.holds_receipt());
        assert_eq!(payment.allocations[0].payment_id, 3);
    }

    fn recorded() -> Payment {
        let mut new = PaymentIntent::gcash(1, 2, dec!(300), day(), "GC123")
            .allocate(1, dec!(150), true)
            .allocate(2, dec!(150), false)
            .prepare(PayerPolicy::Any)
            .unwrap()
            .submit(&collector(), false, now())
            .unwrap();
        new.receipt_number = Some("25-0001".into());
        new.into_payment(1)
    }

    #[test]
    fn test_validate_then_revalidate() {
        let mut payment = recorded();
        let validator = Actor::new(20, [Role::Validator]);
        assert!(payment.validate(&validator, now()).unwrap());
        assert_eq!(payment.audit.validated_by, Some(20));

        let later = now() + chrono::Duration::hours(1);
        assert!(!payment.validate(&Actor::new(21, [Role::Validator]), later).unwrap());
        assert_eq!(payment.audit.validated_by, Some(20));
        assert_eq!(payment.audit.validated_at, Some(now()));
    }

    #[test]
    fn test_cancel_requires_reason_and_releases_receipt() {
        let mut payment = recorded();
        assert!(payment.holds_receipt());

        let canceller = Actor::new(30, [Role::Canceller]);
        assert!(matches!(
            payment.cancel(&canceller, "   ", now()),
            Err(LedgerError::ValidationError(
                ValidationError::MissingCancellationReason
            ))
        ));
        assert_eq!(payment.status, PaymentStatus::PendingValidation);

        payment.cancel(&canceller, "duplicate entry", now()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Cancelled);
        assert_eq!(payment.audit.cancelled_by, Some(30));
        assert_eq!(
            payment.audit.cancellation_reason.as_deref(),
            Some("duplicate entry")
        );
        assert!(!payment.holds_receipt());
        assert_eq!(payment.receipt_number.as_deref(), Some("25-0001"));
    }

    #[test]
    fn test_cancelled_payment_rejects_everything() {
        let mut payment = recorded();
        let admin = Actor::new(1, [Role::Admin]);
        payment.cancel(&admin, "wrong amount", now()).unwrap();

        assert!(matches!(
            payment.validate(&admin, now()),
            Err(LedgerError::InvalidTransition { .. })
        ));
        // Terminal state wins over a missing reason.
        assert!(matches!(
            payment.cancel(&admin, "", now()),
            Err(LedgerError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_payers_and_coverage() {
        let payment = recorded();
        assert_eq!(payment.payers().collect::<Vec<_>>(), vec![1]);
        assert!(payment.covers(2));
        assert!(!payment.covers(3));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("gcash".parse::<PaymentMethod>(), Ok(PaymentMethod::Gcash));
        assert_eq!(" Cash ".parse::<PaymentMethod>(), Ok(PaymentMethod::Cash));
        assert!("cheque".parse::<PaymentMethod>().is_err());
    }
}
