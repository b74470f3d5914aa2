use chrono::{TimeZone, Utc};
use kadamay_ledger::domain::actor::{Actor, Role};
use kadamay_ledger::domain::allocation::PayerPolicy;
use kadamay_ledger::domain::lifecycle::PaymentStatus;
use kadamay_ledger::domain::payment::PaymentIntent;
use kadamay_ledger::domain::ports::{PaymentStoreBox, SequenceCounterBox};
use kadamay_ledger::domain::receipt::PeriodKey;
use kadamay_ledger::infrastructure::in_memory::{InMemoryPaymentStore, InMemorySequenceCounter};
use rust_decimal_macros::dec;

mod common;

#[tokio::test]
async fn test_stores_as_trait_objects() {
    let payment_store: PaymentStoreBox = Box::new(InMemoryPaymentStore::new());
    let counter: SequenceCounterBox = Box::new(InMemorySequenceCounter::new());

    let new = PaymentIntent::cash(1, 1, dec!(100.0), common::date(2025, 1, 5))
        .allocate(1, dec!(100.0), true)
        .prepare(PayerPolicy::Any)
        .unwrap()
        .submit(
            &Actor::new(1, [Role::Collector]),
            false,
            Utc.with_ymd_and_hms(2025, 1, 5, 0, 0, 0).unwrap(),
        )
        .unwrap();

    // Verify Send + Sync by spawning tasks
    let ps_handle = tokio::spawn(async move {
        let stored = payment_store.insert(new).await.unwrap();
        payment_store.get(stored.id).await.unwrap().unwrap()
    });

    let sc_handle = tokio::spawn(async move {
        let period = PeriodKey::new(25).unwrap();
        counter.increment(period, 9999).await.unwrap();
        counter.current(period).await.unwrap()
    });

    let retrieved = ps_handle.await.unwrap();
    assert_eq!(retrieved.id, 1);
    assert_eq!(retrieved.status, PaymentStatus::Validated);

    assert_eq!(sc_handle.await.unwrap(), 1);
}
