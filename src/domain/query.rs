use super::lifecycle::PaymentStatus;
use super::payment::Payment;
use super::IndividualId;
use chrono::NaiveDate;
use std::cmp::Reverse;

/// Criteria for listing payments. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    /// Inclusive lower bound on `date_paid`.
    pub paid_from: Option<NaiveDate>,
    /// Inclusive upper bound on `date_paid`.
    pub paid_to: Option<NaiveDate>,
    pub contributor_id: Option<IndividualId>,
    /// Matches payments with an allocation row for this individual.
    pub covered_individual: Option<IndividualId>,
    pub receipt_prefix: Option<String>,
}

impl PaymentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: PaymentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn paid_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.paid_from = from;
        self.paid_to = to;
        self
    }

    pub fn for_contributor(mut self, individual_id: IndividualId) -> Self {
        self.contributor_id = Some(individual_id);
        self
    }

    pub fn covering(mut self, individual_id: IndividualId) -> Self {
        self.covered_individual = Some(individual_id);
        self
    }

    pub fn with_receipt_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.receipt_prefix = Some(prefix.into());
        self
    }

    pub fn matches(&self, payment: &Payment) -> bool {
        if self.status.is_some_and(|s| s != payment.status) {
            return false;
        }
        if self.paid_from.is_some_and(|d| payment.date_paid < d) {
            return false;
        }
        if self.paid_to.is_some_and(|d| payment.date_paid > d) {
            return false;
        }
        if self
            .contributor_id
            .is_some_and(|id| id != payment.contributor_id)
        {
            return false;
        }
        if self
            .covered_individual
            .is_some_and(|id| !payment.covers(id))
        {
            return false;
        }
        match &self.receipt_prefix {
            Some(prefix) => payment
                .receipt_number
                .as_deref()
                .is_some_and(|r| r.starts_with(prefix.as_str())),
            None => true,
        }
    }
}

/// Orders payments newest first: by `date_paid`, then receipt number, then id,
/// all descending.
pub fn sort_newest_first(payments: &mut [Payment]) {
    payments.sort_by_key(|p| {
        (
            Reverse(p.date_paid),
            Reverse(p.receipt_number.clone()),
            Reverse(p.id),
        )
    });
}
