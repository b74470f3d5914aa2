//! Application layer containing the ledger orchestration.
//!
//! This module defines the `PaymentLedger`, the entry point the rest of the
//! system calls to record, validate, cancel and query payments, and the
//! `SequenceAllocator` it draws receipt numbers from.

pub mod ledger;
pub mod sequence;
