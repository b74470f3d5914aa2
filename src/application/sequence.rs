use crate::domain::payment::Payment;
use crate::domain::ports::SequenceCounterBox;
use crate::domain::receipt::{MAX_SEQUENCE, PeriodKey, ReceiptNumber};
use crate::error::{LedgerError, Result};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Issues `YY-NNNN` receipt numbers from a per-period counter.
///
/// The counter port performs the read-increment-reserve step atomically, so
/// concurrent callers always see distinct, strictly increasing sequences.
/// Numbers are never handed out twice, even after the payment holding one is
/// cancelled.
pub struct SequenceAllocator {
    counter: SequenceCounterBox,
}

impl SequenceAllocator {
    pub fn new(counter: SequenceCounterBox) -> Self {
        Self { counter }
    }

    pub async fn next(&self, period: PeriodKey) -> Result<ReceiptNumber> {
        let sequence = self
            .counter
            .increment(period, MAX_SEQUENCE)
            .await?
            .ok_or(LedgerError::SequenceExhausted { period })?;
        let receipt = ReceiptNumber::new(period, sequence)
            .ok_or(LedgerError::SequenceExhausted { period })?;
        debug!(%receipt, "Reserved receipt number");
        Ok(receipt)
    }

    /// Last sequence issued in `period`.
    pub async fn current(&self, period: PeriodKey) -> Result<u16> {
        self.counter.current(period).await
    }

    /// Brings every period counter up to the highest system-issued receipt
    /// among `payments`. Legacy records and free-form numbers are ignored.
    pub async fn reconcile<'a, I>(&self, payments: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Payment>,
    {
        let mut highest: BTreeMap<PeriodKey, u16> = BTreeMap::new();
        for payment in payments {
            if payment.is_legacy_record {
                continue;
            }
            let Some(receipt) = payment
                .receipt_number
                .as_deref()
                .and_then(|r| r.parse::<ReceiptNumber>().ok())
            else {
                continue;
            };
            let entry = highest.entry(receipt.period()).or_default();
            *entry = (*entry).max(receipt.sequence());
        }

        for (period, floor) in highest {
            self.counter.raise_to(period, floor).await?;
            info!(%period, floor, "Reconciled receipt sequence");
        }
        Ok(())
    }
}
