use super::sequence::SequenceAllocator;
use crate::config::LedgerConfig;
use crate::domain::PaymentId;
use crate::domain::actor::{Actor, Capability};
use crate::domain::payment::{Payment, PaymentIntent};
use crate::domain::ports::{ClockBox, PaymentStoreBox, SequenceCounterBox};
use crate::domain::query::PaymentFilter;
use crate::domain::receipt::PeriodKey;
use crate::error::{LedgerError, Result, ValidationError};
use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};

/// The entry point for recording and managing payments.
///
/// `PaymentLedger` owns the storage backends and the receipt allocator. Every
/// mutating operation takes the acting user and checks the capability it
/// needs once, here, before touching anything.
pub struct PaymentLedger {
    store: PaymentStoreBox,
    sequences: SequenceAllocator,
    clock: ClockBox,
    config: LedgerConfig,
}

fn authorize(actor: &Actor, capability: Capability) -> Result<()> {
    if actor.can(capability) {
        Ok(())
    } else {
        Err(LedgerError::Forbidden {
            user: actor.user_id,
            capability,
        })
    }
}

impl PaymentLedger {
    /// Creates a new `PaymentLedger` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - Where payments and their allocations are kept.
    /// * `counter` - The per-period receipt counter.
    /// * `clock` - Source of audit timestamps and of the numbering period.
    /// * `config` - Payer policy and retry bound.
    pub fn new(
        store: PaymentStoreBox,
        counter: SequenceCounterBox,
        clock: ClockBox,
        config: LedgerConfig,
    ) -> Self {
        Self {
            store,
            sequences: SequenceAllocator::new(counter),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Records a payment.
    ///
    /// The intent is fully validated before a receipt number is drawn, so a
    /// rejected intent never consumes a number. Non-legacy payments are
    /// numbered from the period of the current date; if the store reports the
    /// number as already active, another one is drawn, up to
    /// `max_issue_attempts` times.
    #[instrument(skip(self, actor, intent), fields(actor = actor.user_id))]
    pub async fn create_payment(&self, actor: &Actor, intent: PaymentIntent) -> Result<Payment> {
        let capability = if intent.is_legacy_record {
            Capability::Backfill
        } else {
            Capability::Collect
        };
        authorize(actor, capability)?;

        let prepared = intent.prepare(self.config.payer_policy)?;
        let now = self.clock.now();
        let new = prepared.submit(actor, actor.can(Capability::Validate), now)?;

        if new.is_legacy_record {
            return match self.store.insert(new).await {
                Ok(payment) => {
                    info!(
                        payment = payment.id,
                        receipt = payment.receipt_number.as_deref().unwrap_or("-"),
                        "Back-filled legacy payment"
                    );
                    Ok(payment)
                }
                Err(LedgerError::DuplicateReceipt(receipt)) => {
                    Err(ValidationError::ReceiptInUse(receipt).into())
                }
                Err(e) => Err(e),
            };
        }

        let local_today = now.with_timezone(&self.config.period_offset).date_naive();
        let period = PeriodKey::from_date(local_today);
        let attempts = self.config.max_issue_attempts;
        for attempt in 1..=attempts {
            let receipt = self.sequences.next(period).await?;
            let mut candidate = new.clone();
            candidate.receipt_number = Some(receipt.to_string());

            match self.store.insert(candidate).await {
                Ok(payment) => {
                    info!(
                        payment = payment.id,
                        %receipt,
                        amount = %payment.amount,
                        status = %payment.status,
                        "Recorded payment"
                    );
                    return Ok(payment);
                }
                Err(LedgerError::DuplicateReceipt(taken)) => {
                    warn!(attempt, receipt = %taken, "Receipt number already active, drawing another");
                }
                Err(e) => return Err(e),
            }
        }
        Err(LedgerError::AllocationConflict { attempts })
    }

    /// Approves a pending payment. Approving an already validated payment
    /// succeeds without touching its audit fields.
    #[instrument(skip(self, actor), fields(actor = actor.user_id))]
    pub async fn validate_payment(&self, id: PaymentId, actor: &Actor) -> Result<Payment> {
        authorize(actor, Capability::Validate)?;
        let payment = self
            .transition(id, |payment, now| payment.validate(actor, now))
            .await?;
        info!(payment = id, "Payment validated");
        Ok(payment)
    }

    #[instrument(skip(self, actor, reason), fields(actor = actor.user_id))]
    pub async fn cancel_payment(&self, id: PaymentId, actor: &Actor, reason: &str) -> Result<Payment> {
        authorize(actor, Capability::Cancel)?;
        let payment = self
            .transition(id, |payment, now| {
                payment.cancel(actor, reason, now).map(|()| true)
            })
            .await?;
        info!(
            payment = id,
            receipt = payment.receipt_number.as_deref().unwrap_or("-"),
            "Payment cancelled"
        );
        Ok(payment)
    }

    pub async fn get_payment(&self, id: PaymentId) -> Result<Payment> {
        self.store.get(id).await?.ok_or(LedgerError::NotFound(id))
    }

    pub async fn list_payments(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        self.store.list(filter).await
    }

    /// Raises the receipt counters to match the receipts already on file.
    pub async fn reconcile_sequences(&self) -> Result<()> {
        let payments = self.store.list(&PaymentFilter::new()).await?;
        self.sequences.reconcile(&payments).await
    }

    /// Loads the payment, applies `apply` and writes it back if the status
    /// has not changed underneath. `apply` returns `false` for a no-op.
    async fn transition<F>(&self, id: PaymentId, apply: F) -> Result<Payment>
    where
        F: Fn(&mut Payment, DateTime<Utc>) -> Result<bool>,
    {
        let attempts = self.config.max_issue_attempts;
        for attempt in 1..=attempts {
            let mut payment = self.get_payment(id).await?;
            let expected = payment.status;
            if !apply(&mut payment, self.clock.now())? {
                return Ok(payment);
            }
            if self.store.replace(payment.clone(), expected).await? {
                return Ok(payment);
            }
            warn!(payment = id, attempt, "Payment changed concurrently, retrying");
        }
        Err(LedgerError::AllocationConflict { attempts })
    }
}
