use crate::domain::PaymentId;
use crate::domain::lifecycle::PaymentStatus;
use crate::domain::payment::{NewPayment, Payment};
use crate::domain::ports::{PaymentStore, SequenceCounter};
use crate::domain::query::{PaymentFilter, sort_newest_first};
use crate::domain::receipt::PeriodKey;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct PaymentTable {
    next_id: PaymentId,
    payments: HashMap<PaymentId, Payment>,
    /// Receipt numbers held by active non-legacy payments.
    active_receipts: HashMap<String, PaymentId>,
}

/// A thread-safe in-memory payment store.
///
/// Payments and the active-receipt index live behind one `RwLock`, so an
/// insert checks and claims its receipt number in a single critical section.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    table: Arc<RwLock<PaymentTable>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: NewPayment) -> Result<Payment> {
        let mut table = self.table.write().await;
        if let Some(receipt) = &payment.receipt_number
            && table.active_receipts.contains_key(receipt)
        {
            return Err(LedgerError::DuplicateReceipt(receipt.clone()));
        }

        table.next_id += 1;
        let id = table.next_id;
        let claims = payment.claims_receipt();
        let payment = payment.into_payment(id);
        if claims && let Some(receipt) = &payment.receipt_number {
            table.active_receipts.insert(receipt.clone(), id);
        }
        table.payments.insert(id, payment.clone());
        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let table = self.table.read().await;
        Ok(table.payments.get(&id).cloned())
    }

    async fn replace(&self, payment: Payment, expected: PaymentStatus) -> Result<bool> {
        let mut table = self.table.write().await;
        match table.payments.get(&payment.id) {
            None => return Err(LedgerError::NotFound(payment.id)),
            Some(stored) if stored.status != expected => return Ok(false),
            Some(_) => {}
        }

        if !payment.holds_receipt()
            && let Some(receipt) = &payment.receipt_number
            && table.active_receipts.get(receipt) == Some(&payment.id)
        {
            table.active_receipts.remove(receipt);
        }
        table.payments.insert(payment.id, payment);
        Ok(true)
    }

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let table = self.table.read().await;
        let mut payments: Vec<Payment> = table
            .payments
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        sort_newest_first(&mut payments);
        Ok(payments)
    }
}

/// A thread-safe in-memory receipt counter, one slot per period.
#[derive(Default, Clone)]
pub struct InMemorySequenceCounter {
    counters: Arc<RwLock<HashMap<PeriodKey, u16>>>,
}

impl InMemorySequenceCounter {
    /// Creates a counter with every period at zero.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SequenceCounter for InMemorySequenceCounter {
    async fn increment(&self, period: PeriodKey, ceiling: u16) -> Result<Option<u16>> {
        let mut counters = self.counters.write().await;
        let slot = counters.entry(period).or_default();
        if *slot >= ceiling {
            return Ok(None);
        }
        *slot += 1;
        Ok(Some(*slot))
    }

    async fn current(&self, period: PeriodKey) -> Result<u16> {
        let counters = self.counters.read().await;
        Ok(counters.get(&period).copied().unwrap_or(0))
    }

    async fn raise_to(&self, period: PeriodKey, floor: u16) -> Result<()> {
        let mut counters = self.counters.write().await;
        let slot = counters.entry(period).or_default();
        *slot = (*slot).max(floor);
        Ok(())
    }
}
