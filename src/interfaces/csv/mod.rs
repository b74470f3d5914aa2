//! CSV back-fill input and payment export.

pub mod legacy_reader;
pub mod payment_writer;
