#![allow(dead_code)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use kadamay_ledger::application::ledger::PaymentLedger;
use kadamay_ledger::config::LedgerConfig;
use kadamay_ledger::domain::ports::Clock;
use kadamay_ledger::infrastructure::clock::FixedClock;
use kadamay_ledger::infrastructure::in_memory::{InMemoryPaymentStore, InMemorySequenceCounter};
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

/// A clock that moves one minute forward every time it is read.
pub struct SteppingClock {
    start: DateTime<Utc>,
    ticks: AtomicI64,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            ticks: AtomicI64::new(0),
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(self.ticks.fetch_add(1, Ordering::SeqCst))
    }
}

pub const LEGACY_HEADER: [&str; 9] = [
    "receipt_number",
    "date_paid",
    "amount",
    "method",
    "gcash_reference",
    "contributor",
    "contribution_type",
    "church",
    "allocations",
];

/// A ledger over fresh in-memory stores whose clock is frozen on 2025-03-15.
pub fn ledger_2025(config: LedgerConfig) -> PaymentLedger {
    PaymentLedger::new(
        Box::new(InMemoryPaymentStore::new()),
        Box::new(InMemorySequenceCounter::new()),
        Box::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap())),
        config,
    )
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// Like [`ledger_2025`], but time advances between operations.
pub fn stepping_ledger_2025(config: LedgerConfig) -> PaymentLedger {
    PaymentLedger::new(
        Box::new(InMemoryPaymentStore::new()),
        Box::new(InMemorySequenceCounter::new()),
        Box::new(SteppingClock::new(Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap())),
        config,
    )
}

/// Writes `rows` single-member cash back-fills, receipts `2000001` upwards.
pub fn generate_legacy_csv(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(LEGACY_HEADER)?;

    for i in 1..=rows {
        let receipt = (2_000_000 + i).to_string();
        let contributor = i.to_string();
        wtr.write_record([
            receipt.as_str(),
            "2019-01-06",
            "100.00",
            "CASH",
            "",
            contributor.as_str(),
            "1",
            "",
            "",
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
