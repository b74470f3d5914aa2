//! Domain model of the payment ledger: money, receipts, allocations, the
//! payment lifecycle and the ports the application layer depends on.

pub mod actor;
pub mod allocation;
pub mod lifecycle;
pub mod money;
pub mod payment;
pub mod ports;
pub mod query;
pub mod receipt;

/// Internal primary key of a payment, assigned by the store.
pub type PaymentId = u64;
/// Reference to an individual in the member directory.
pub type IndividualId = u32;
pub type ChurchId = u32;
pub type ContributionTypeId = u32;
/// Identity of an acting user, as issued by the authentication layer.
pub type UserId = u32;
