use crate::domain::PaymentId;
use crate::domain::lifecycle::PaymentStatus;
use crate::domain::payment::{NewPayment, Payment};
use crate::domain::ports::{PaymentStore, SequenceCounter};
use crate::domain::query::{PaymentFilter, sort_newest_first};
use crate::domain::receipt::PeriodKey;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for payment records, allocations included.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family indexing receipt numbers held by active non-legacy payments.
pub const CF_RECEIPTS: &str = "receipts";
/// Column Family with one receipt counter per numbering period.
pub const CF_SEQUENCES: &str = "sequences";
/// Column Family for store bookkeeping (the id counter).
pub const CF_META: &str = "meta";

const KEY_LAST_ID: &[u8] = b"last_payment_id";

fn internal(message: String) -> LedgerError {
    LedgerError::InternalError(Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message,
    )))
}

fn decode_u64(bytes: &[u8]) -> Result<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| internal(format!("expected 8 bytes, found {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}

fn decode_u16(bytes: &[u8]) -> Result<u16> {
    let raw: [u8; 2] = bytes
        .try_into()
        .map_err(|_| internal(format!("expected 2 bytes, found {}", bytes.len())))?;
    Ok(u16::from_be_bytes(raw))
}

fn encode_payment(payment: &Payment) -> Result<Vec<u8>> {
    serde_json::to_vec(payment).map_err(|e| internal(format!("Serialization error: {}", e)))
}

fn decode_payment(bytes: &[u8]) -> Result<Payment> {
    serde_json::from_slice(bytes).map_err(|e| internal(format!("Deserialization error: {}", e)))
}

/// A persistent store implementation using RocksDB.
///
/// Payments, the active-receipt index, the period counters and the id counter
/// live in separate Column Families. Writes that must stay consistent with
/// each other go through one `WriteBatch` while holding `write_lock`, which
/// serializes read-check-write sequences across tasks.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that all required column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = [CF_PAYMENTS, CF_RECEIPTS, CF_SEQUENCES, CF_META]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));

        let db = DB::open_cf_descriptors(&opts, path, families)?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LedgerError::InternalError(Box::new(std::io::Error::other(format!(
                "{} column family not found",
                name
            ))))
        })
    }

    fn load(&self, id: PaymentId) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_pinned_cf(cf, id.to_be_bytes())? {
            Some(bytes) => Ok(Some(decode_payment(&bytes)?)),
            None => Ok(None),
        }
    }

    fn counter_value(&self, period: PeriodKey) -> Result<u16> {
        let cf = self.cf(CF_SEQUENCES)?;
        match self.db.get_pinned_cf(cf, [period.value()])? {
            Some(bytes) => decode_u16(&bytes),
            None => Ok(0),
        }
    }

    fn set_counter(&self, period: PeriodKey, value: u16) -> Result<()> {
        let cf = self.cf(CF_SEQUENCES)?;
        self.db.put_cf(cf, [period.value()], value.to_be_bytes())?;
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: NewPayment) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let receipts = self.cf(CF_RECEIPTS)?;
        let meta = self.cf(CF_META)?;

        if let Some(receipt) = &payment.receipt_number
            && self.db.get_pinned_cf(receipts, receipt.as_bytes())?.is_some()
        {
            return Err(LedgerError::DuplicateReceipt(receipt.clone()));
        }

        let last_id = match self.db.get_pinned_cf(meta, KEY_LAST_ID)? {
            Some(bytes) => decode_u64(&bytes)?,
            None => 0,
        };
        let id = last_id + 1;
        let claims = payment.claims_receipt();
        let payment = payment.into_payment(id);

        let mut batch = WriteBatch::default();
        batch.put_cf(self.cf(CF_PAYMENTS)?, id.to_be_bytes(), encode_payment(&payment)?);
        if claims && let Some(receipt) = &payment.receipt_number {
            batch.put_cf(receipts, receipt.as_bytes(), id.to_be_bytes());
        }
        batch.put_cf(meta, KEY_LAST_ID, id.to_be_bytes());
        self.db.write(batch)?;

        Ok(payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.load(id)
    }

    async fn replace(&self, payment: Payment, expected: PaymentStatus) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        match self.load(payment.id)? {
            None => return Err(LedgerError::NotFound(payment.id)),
            Some(stored) if stored.status != expected => return Ok(false),
            Some(_) => {}
        }

        let receipts = self.cf(CF_RECEIPTS)?;
        let mut batch = WriteBatch::default();
        if !payment.holds_receipt()
            && let Some(receipt) = &payment.receipt_number
            && let Some(owner) = self.db.get_pinned_cf(receipts, receipt.as_bytes())?
            && decode_u64(&owner)? == payment.id
        {
            batch.delete_cf(receipts, receipt.as_bytes());
        }
        batch.put_cf(
            self.cf(CF_PAYMENTS)?,
            payment.id.to_be_bytes(),
            encode_payment(&payment)?,
        );
        self.db.write(batch)?;
        Ok(true)
    }

    async fn list(&self, filter: &PaymentFilter) -> Result<Vec<Payment>> {
        let handle = self.cf(CF_PAYMENTS)?;

        let mut payments = Vec::new();
        let iter = self.db.iterator_cf(handle, rocksdb::IteratorMode::Start);

        for item in iter {
            let (_key, value) = item?;
            let payment = decode_payment(&value)?;
            if filter.matches(&payment) {
                payments.push(payment);
            }
        }

        sort_newest_first(&mut payments);
        Ok(payments)
    }
}

#[async_trait]
impl SequenceCounter for RocksDBStore {
    async fn increment(&self, period: PeriodKey, ceiling: u16) -> Result<Option<u16>> {
        let _guard = self.write_lock.lock().await;
        let current = self.counter_value(period)?;
        if current >= ceiling {
            return Ok(None);
        }
        self.set_counter(period, current + 1)?;
        Ok(Some(current + 1))
    }

    async fn current(&self, period: PeriodKey) -> Result<u16> {
        self.counter_value(period)
    }

    async fn raise_to(&self, period: PeriodKey, floor: u16) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        if self.counter_value(period)? < floor {
            self.set_counter(period, floor)?;
        }
        Ok(())
    }
}
