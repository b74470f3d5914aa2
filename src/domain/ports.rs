use super::lifecycle::PaymentStatus;
use super::payment::{NewPayment, Payment};
use super::query::PaymentFilter;
use super::receipt::PeriodKey;
use super::PaymentId;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Writes the payment and its allocations as one unit and returns the
    /// stored record with its assigned id.
    ///
    /// Fails with `LedgerError::DuplicateReceipt` when the receipt number is
    /// already held by an active non-legacy payment; nothing is written then.
    async fn insert(&self, payment: NewPayment) -> Result<Payment>;

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;

    /// Overwrites a payment only if its stored status is still `expected`.
    ///
    /// Returns `false` when another writer got there first. A payment that no
    /// longer holds its receipt has the number removed from the active index.
    async fn replace(&self, payment: Payment, expected: PaymentStatus) -> Result<bool>;

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>>;
}

/// One counter per numbering period.
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    /// Atomically advances the counter and returns the new value, or `None`
    /// (leaving the counter untouched) when the value would pass `ceiling`.
    async fn increment(&self, period: PeriodKey, ceiling: u16) -> Result<Option<u16>>;

    /// The last value issued for `period`; zero for an unused period.
    async fn current(&self, period: PeriodKey) -> Result<u16>;

    /// Moves the counter forward to `floor` if it is behind. Never lowers it.
    async fn raise_to(&self, period: PeriodKey, floor: u16) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type SequenceCounterBox = Box<dyn SequenceCounter>;
pub type ClockBox = Box<dyn Clock>;
