use crate::domain::allocation::AllocationRow;
use crate::domain::payment::{PaymentIntent, PaymentMethod};
use crate::domain::{ChurchId, ContributionTypeId, IndividualId};
use crate::error::{LedgerError, Result, ValidationError};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One historical payment as exported from the old receipt books.
///
/// `allocations` uses the compact `individual:amount[:payer]` form, rows
/// separated by `;`. A blank column means the contributor paid for themself.
#[derive(Debug, Deserialize, PartialEq)]
pub struct LegacyRecord {
    pub receipt_number: Option<String>,
    pub date_paid: NaiveDate,
    pub amount: Decimal,
    pub method: String,
    pub gcash_reference: Option<String>,
    pub contributor: IndividualId,
    pub contribution_type: ContributionTypeId,
    pub church: Option<ChurchId>,
    #[serde(default)]
    pub allocations: Option<String>,
}

impl LegacyRecord {
    pub fn into_intent(self) -> Result<PaymentIntent> {
        let method: PaymentMethod = self
            .method
            .parse()
            .map_err(|_| ValidationError::UnsupportedMethod(self.method.clone()))?;

        let rows = match self.allocations.as_deref().map(str::trim) {
            None | Some("") => vec![AllocationRow::new(self.contributor, self.amount, true)],
            Some(compact) => compact
                .split(';')
                .filter(|part| !part.trim().is_empty())
                .map(str::parse)
                .collect::<std::result::Result<Vec<AllocationRow>, ValidationError>>()?,
        };

        let mut intent = PaymentIntent::cash(
            self.contributor,
            self.contribution_type,
            self.amount,
            self.date_paid,
        );
        intent.method = method;
        intent.gcash_reference = self.gcash_reference;
        intent.church_id = self.church;
        intent.allocations = rows;
        Ok(intent.legacy(self.receipt_number))
    }
}

/// Reads legacy payments from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over
/// `Result<PaymentIntent>`, already marked as legacy back-fills. It handles
/// whitespace trimming and flexible record lengths automatically.
pub struct LegacyPaymentReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> LegacyPaymentReader<R> {
    /// Creates a new `LegacyPaymentReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts records.
    ///
    /// Large back-fill files are processed in a streaming fashion without
    /// loading the entire dataset into memory.
    pub fn intents(self) -> impl Iterator<Item = Result<PaymentIntent>> {
        self.reader
            .into_deserialize::<LegacyRecord>()
            .map(|result| result.map_err(LedgerError::from)?.into_intent())
    }
}
