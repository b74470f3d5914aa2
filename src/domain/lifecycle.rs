//! Payment lifecycle.
//!
//! `PaymentStatus` is the single source of truth for where a payment stands.
//! Every change goes through [`PaymentStatus::on`], which either names the
//! next state, reports that the event changes nothing, or refuses it.

use super::payment::PaymentMethod;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Being assembled; never persisted.
    Draft,
    PendingValidation,
    Validated,
    Cancelled,
    /// Back-filled historical record. Terminal.
    Legacy,
}

/// Something that happens to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentEvent {
    /// A new payment leaves `Draft`.
    Submit {
        method: PaymentMethod,
        collector_can_validate: bool,
    },
    /// A historical record is entered.
    Backfill,
    Validate,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Moved(PaymentStatus),
    /// The event is accepted but the payment is already where it would land.
    Unchanged,
}

impl PaymentStatus {
    pub fn on(self, event: PaymentEvent) -> Result<Outcome> {
        use PaymentStatus::*;

        let target = match event {
            PaymentEvent::Submit {
                method,
                collector_can_validate,
            } => {
                if method == PaymentMethod::Cash || collector_can_validate {
                    Validated
                } else {
                    PendingValidation
                }
            }
            PaymentEvent::Backfill => Legacy,
            PaymentEvent::Validate => Validated,
            PaymentEvent::Cancel => Cancelled,
        };

        match (self, event) {
            (Draft, PaymentEvent::Submit { .. } | PaymentEvent::Backfill) => {
                Ok(Outcome::Moved(target))
            }
            (PendingValidation, PaymentEvent::Validate) => Ok(Outcome::Moved(Validated)),
            (Validated, PaymentEvent::Validate) => Ok(Outcome::Unchanged),
            (PendingValidation | Validated, PaymentEvent::Cancel) => Ok(Outcome::Moved(Cancelled)),
            _ => Err(LedgerError::InvalidTransition {
                from: self,
                to: target,
            }),
        }
    }

    /// Whether a payment in this state keeps its receipt number reserved
    /// against reuse by other non-legacy payments.
    pub fn holds_receipt(self) -> bool {
        matches!(self, Self::PendingValidation | Self::Validated)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Legacy)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::PendingValidation => "PENDING_VALIDATION",
            Self::Validated => "VALIDATED",
            Self::Cancelled => "CANCELLED",
            Self::Legacy => "LEGACY",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "DRAFT" => Ok(Self::Draft),
            "PENDING_VALIDATION" | "PENDING" => Ok(Self::PendingValidation),
            "VALIDATED" => Ok(Self::Validated),
            "CANCELLED" => Ok(Self::Cancelled),
            "LEGACY" => Ok(Self::Legacy),
            other => Err(format!("unknown payment status `{other}`")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(method: PaymentMethod, collector_can_validate: bool) -> PaymentEvent {
        PaymentEvent::Submit {
            method,
            collector_can_validate,
        }
    }

    #[test]
    fn test_cash_is_validated_on_submit() {
        let outcome = PaymentStatus::Draft.on(submit(PaymentMethod::Cash, false)).unwrap();
        assert_eq!(outcome, Outcome::Moved(PaymentStatus::Validated));
    }

    #[test]
    fn test_gcash_waits_for_validation_unless_collector_may_validate() {
        assert_eq!(
            PaymentStatus::Draft
                .on(submit(PaymentMethod::Gcash, false))
                .unwrap(),
            Outcome::Moved(PaymentStatus::PendingValidation)
        );
        assert_eq!(
            PaymentStatus::Draft
                .on(submit(PaymentMethod::Gcash, true))
                .unwrap(),
            Outcome::Moved(PaymentStatus::Validated)
        );
    }

    #[test]
    fn test_backfill_lands_in_legacy() {
        assert_eq!(
            PaymentStatus::Draft.on(PaymentEvent::Backfill).unwrap(),
            Outcome::Moved(PaymentStatus::Legacy)
        );
    }

    #[test]
    fn test_validation_is_idempotent() {
        assert_eq!(
            PaymentStatus::PendingValidation
                .on(PaymentEvent::Validate)
                .unwrap(),
            Outcome::Moved(PaymentStatus::Validated)
        );
        assert_eq!(
            PaymentStatus::Validated.on(PaymentEvent::Validate).unwrap(),
            Outcome::Unchanged
        );
    }

    #[test]
    fn test_cancellation_is_terminal() {
        for event in [PaymentEvent::Validate, PaymentEvent::Cancel] {
            assert!(matches!(
                PaymentStatus::Cancelled.on(event),
                Err(LedgerError::InvalidTransition {
                    from: PaymentStatus::Cancelled,
                    ..
                })
            ));
        }
    }

    #[test]
    fn test_legacy_never_moves() {
        for event in [
            PaymentEvent::Validate,
            PaymentEvent::Cancel,
            PaymentEvent::Backfill,
            submit(PaymentMethod::Cash, true),
        ] {
            assert!(PaymentStatus::Legacy.on(event).is_err());
        }
    }

    #[test]
    fn test_persisted_payments_cannot_be_resubmitted() {
        assert!(matches!(
            PaymentStatus::Validated.on(submit(PaymentMethod::Cash, false)),
            Err(LedgerError::InvalidTransition {
                from: PaymentStatus::Validated,
                to: PaymentStatus::Validated,
            })
        ));
        assert!(PaymentStatus::Draft.on(PaymentEvent::Validate).is_err());
        assert!(PaymentStatus::Draft.on(PaymentEvent::Cancel).is_err());
    }

    #[test]
    fn test_receipt_hold() {
        assert!(PaymentStatus::PendingValidation.holds_receipt());
        assert!(PaymentStatus::Validated.holds_receipt());
        assert!(!PaymentStatus::Cancelled.holds_receipt());
        assert!(!PaymentStatus::Legacy.holds_receipt());
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(
            "pending-validation".parse::<PaymentStatus>(),
            Ok(PaymentStatus::PendingValidation)
        );
        assert_eq!("VALIDATED".parse::<PaymentStatus>(), Ok(PaymentStatus::Validated));
        assert!("paid".parse::<PaymentStatus>().is_err());
    }
}
