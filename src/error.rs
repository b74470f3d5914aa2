use crate::domain::actor::Capability;
use crate::domain::allocation::PayerPolicy;
use crate::domain::lifecycle::PaymentStatus;
use crate::domain::receipt::PeriodKey;
use crate::domain::{IndividualId, PaymentId, UserId};
use rust_decimal::Decimal;
use thiserror::Error;

/// A payment request that breaks a ledger rule. Always raised before any write.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(Decimal),
    #[error("amount {0} is finer than one centavo")]
    ExcessPrecision(Decimal),
    #[error("a payment needs at least one allocation")]
    EmptyAllocationSet,
    #[error("allocations sum to {actual} but the payment is {expected}")]
    AmountMismatch { expected: Decimal, actual: Decimal },
    #[error("individual {0} is allocated more than once")]
    DuplicateIndividual(IndividualId),
    #[error("allocation for individual {individual} is negative ({amount})")]
    NegativeAllocation {
        individual: IndividualId,
        amount: Decimal,
    },
    #[error("allocations are too large to add up")]
    AllocationOverflow,
    #[error("{payers} payer row(s) violate the `{policy}` payer policy")]
    PayerCount { policy: PayerPolicy, payers: usize },
    #[error("malformed allocation `{0}`, expected individual:amount[:payer]")]
    MalformedAllocation(String),
    #[error("unsupported payment method `{0}`, expected CASH or GCASH")]
    UnsupportedMethod(String),
    #[error("GCash payments need a reference number")]
    MissingGcashReference,
    #[error("a GCash reference is only allowed on GCash payments")]
    UnexpectedGcashReference,
    #[error("receipt numbers are issued by the ledger; only legacy records may supply one")]
    ReceiptNotAllowed,
    #[error("malformed receipt number `{0}`, expected YY-NNNN")]
    MalformedReceipt(String),
    #[error("receipt number {0} belongs to an active payment")]
    ReceiptInUse(String),
    #[error("a cancellation reason is required")]
    MissingCancellationReason,
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),
    #[error("receipt sequence for period {period} is exhausted")]
    SequenceExhausted { period: PeriodKey },
    #[error("could not secure a receipt number after {attempts} attempt(s)")]
    AllocationConflict { attempts: u32 },
    /// Raised by stores when a receipt number is already active.
    #[error("receipt number {0} is already active")]
    DuplicateReceipt(String),
    #[error("cannot move payment from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("payment {0} not found")]
    NotFound(PaymentId),
    #[error("user {user} may not {capability}")]
    Forbidden {
        user: UserId,
        capability: Capability,
    },
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Whether the caller may simply retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::AllocationConflict { .. } | Self::SequenceExhausted { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
