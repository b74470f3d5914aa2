use crate::domain::payment::Payment;
use crate::domain::{ContributionTypeId, IndividualId, PaymentId, UserId};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

const HEADER: [&str; 15] = [
    "id",
    "receipt_number",
    "date_paid",
    "amount",
    "method",
    "gcash_reference",
    "contributor",
    "contribution_type",
    "status",
    "legacy",
    "collected_by",
    "validated_by",
    "cancelled_by",
    "cancellation_reason",
    "allocations",
];

#[derive(Serialize)]
struct PaymentRow<'a> {
    id: PaymentId,
    receipt_number: &'a str,
    date_paid: String,
    amount: String,
    method: String,
    gcash_reference: &'a str,
    contributor: IndividualId,
    contribution_type: ContributionTypeId,
    status: &'static str,
    legacy: bool,
    collected_by: UserId,
    validated_by: Option<UserId>,
    cancelled_by: Option<UserId>,
    cancellation_reason: &'a str,
    allocations: String,
}

impl<'a> From<&'a Payment> for PaymentRow<'a> {
    fn from(payment: &'a Payment) -> Self {
        Self {
            id: payment.id,
            receipt_number: payment.receipt_number.as_deref().unwrap_or_default(),
            date_paid: payment.date_paid.to_string(),
            amount: payment.amount.to_string(),
            method: payment.method.to_string(),
            gcash_reference: payment.gcash_reference.as_deref().unwrap_or_default(),
            contributor: payment.contributor_id,
            contribution_type: payment.contribution_type_id,
            status: payment.status.as_str(),
            legacy: payment.is_legacy_record,
            collected_by: payment.audit.collected_by,
            validated_by: payment.audit.validated_by,
            cancelled_by: payment.audit.cancelled_by,
            cancellation_reason: payment
                .audit
                .cancellation_reason
                .as_deref()
                .unwrap_or_default(),
            allocations: payment
                .allocations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

/// Writes payments as CSV, one row per payment with its allocations folded
/// into a single `;`-separated column.
///
/// The header is always written, so an empty result still yields a valid
/// CSV document.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(sink),
        }
    }

    pub fn write_payments<'a, I>(&mut self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Payment>,
    {
        self.writer.write_record(HEADER)?;
        for payment in payments {
            self.writer.serialize(PaymentRow::from(payment))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
