use chrono::{FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use kadamay_ledger::application::ledger::PaymentLedger;
use kadamay_ledger::config::{DEFAULT_MAX_ISSUE_ATTEMPTS, LedgerConfig};
use kadamay_ledger::domain::actor::{Actor, Role};
use kadamay_ledger::domain::allocation::{AllocationRow, PayerPolicy};
use kadamay_ledger::domain::lifecycle::PaymentStatus;
use kadamay_ledger::domain::payment::{PaymentIntent, PaymentMethod};
use kadamay_ledger::domain::ports::{PaymentStoreBox, SequenceCounterBox};
use kadamay_ledger::domain::query::PaymentFilter;
use kadamay_ledger::domain::{ChurchId, ContributionTypeId, IndividualId, PaymentId, UserId};
use kadamay_ledger::infrastructure::clock::SystemClock;
use kadamay_ledger::infrastructure::in_memory::{InMemoryPaymentStore, InMemorySequenceCounter};
use kadamay_ledger::interfaces::csv::legacy_reader::LegacyPaymentReader;
use kadamay_ledger::interfaces::csv::payment_writer::PaymentWriter;
use miette::{IntoDiagnostic, Result};
use rust_decimal::Decimal;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long, env = "KADAMAY_DB_PATH", global = true)]
    db_path: Option<PathBuf>,

    /// User id recorded in the audit trail.
    #[arg(long, default_value_t = 1, global = true)]
    actor: UserId,

    /// Role held by the acting user. Repeat for several; defaults to collector.
    #[arg(long = "role", global = true)]
    roles: Vec<Role>,

    #[arg(
        long,
        env = "KADAMAY_MAX_ISSUE_ATTEMPTS",
        default_value_t = DEFAULT_MAX_ISSUE_ATTEMPTS,
        global = true
    )]
    max_issue_attempts: u32,

    /// One of `any`, `at-most-one`, `exactly-one`.
    #[arg(long, env = "KADAMAY_PAYER_POLICY", default_value = "any", global = true)]
    payer_policy: PayerPolicy,

    /// UTC offset whose calendar year numbers receipts.
    #[arg(
        long,
        env = "KADAMAY_PERIOD_OFFSET",
        default_value = "+08:00",
        allow_hyphen_values = true,
        global = true
    )]
    period_offset: FixedOffset,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Record a new payment and issue its receipt number.
    Record {
        #[arg(long)]
        contributor: IndividualId,
        #[arg(long)]
        contribution_type: ContributionTypeId,
        #[arg(long)]
        church: Option<ChurchId>,
        #[arg(long)]
        amount: Decimal,
        /// Date the money was received; defaults to today.
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "cash")]
        method: PaymentMethod,
        #[arg(long)]
        gcash_ref: Option<String>,
        /// `individual:amount[:payer]`. Without any, the contributor pays for themself.
        #[arg(long = "alloc")]
        allocations: Vec<AllocationRow>,
        #[arg(long)]
        remarks: Option<String>,
    },
    /// Confirm a pending payment.
    Validate { id: PaymentId },
    /// Void a payment and release its receipt number.
    Cancel {
        id: PaymentId,
        #[arg(long)]
        reason: String,
    },
    Show { id: PaymentId },
    /// List payments, newest first.
    List {
        #[arg(long)]
        status: Option<PaymentStatus>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Only payments with an allocation to this individual.
        #[arg(long)]
        individual: Option<IndividualId>,
        #[arg(long)]
        contributor: Option<IndividualId>,
        #[arg(long)]
        receipt_prefix: Option<String>,
    },
    /// Back-fill historical payments from a CSV file.
    ImportLegacy { input: PathBuf },
}

fn open_stores(db_path: Option<PathBuf>) -> Result<(PaymentStoreBox, SequenceCounterBox)> {
    #[cfg(feature = "storage-rocksdb")]
    if let Some(db_path) = db_path {
        use kadamay_ledger::infrastructure::rocksdb::RocksDBStore;

        let store = RocksDBStore::open(db_path).into_diagnostic()?;
        return Ok((Box::new(store.clone()), Box::new(store)));
    }

    #[cfg(not(feature = "storage-rocksdb"))]
    if db_path.is_some() {
        tracing::warn!(
            "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to in-memory storage."
        );
    }

    Ok((
        Box::new(InMemoryPaymentStore::new()),
        Box::new(InMemorySequenceCounter::new()),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let roles = if cli.roles.is_empty() {
        vec![Role::Collector]
    } else {
        cli.roles
    };
    let actor = Actor::new(cli.actor, roles);
    let config = LedgerConfig::default()
        .with_max_issue_attempts(cli.max_issue_attempts)
        .with_payer_policy(cli.payer_policy)
        .with_period_offset(cli.period_offset);

    let (store, counter) = open_stores(cli.db_path)?;
    let ledger = PaymentLedger::new(store, counter, Box::new(SystemClock), config);

    let payments = match cli.command {
        Command::Record {
            contributor,
            contribution_type,
            church,
            amount,
            date,
            method,
            gcash_ref,
            allocations,
            remarks,
        } => {
            let date_paid = date
                .unwrap_or_else(|| Utc::now().with_timezone(&config.period_offset).date_naive());
            let mut intent = PaymentIntent::cash(contributor, contribution_type, amount, date_paid);
            intent.method = method;
            intent.gcash_reference = gcash_ref;
            intent.church_id = church;
            intent.remarks = remarks;
            intent.allocations = if allocations.is_empty() {
                vec![AllocationRow::new(contributor, amount, true)]
            } else {
                allocations
            };
            vec![ledger.create_payment(&actor, intent).await.into_diagnostic()?]
        }
        Command::Validate { id } => {
            vec![ledger.validate_payment(id, &actor).await.into_diagnostic()?]
        }
        Command::Cancel { id, reason } => {
            vec![
                ledger
                    .cancel_payment(id, &actor, &reason)
                    .await
                    .into_diagnostic()?,
            ]
        }
        Command::Show { id } => vec![ledger.get_payment(id).await.into_diagnostic()?],
        Command::List {
            status,
            from,
            to,
            individual,
            contributor,
            receipt_prefix,
        } => {
            let mut filter = PaymentFilter::new().paid_between(from, to);
            if let Some(status) = status {
                filter = filter.with_status(status);
            }
            if let Some(individual) = individual {
                filter = filter.covering(individual);
            }
            if let Some(contributor) = contributor {
                filter = filter.for_contributor(contributor);
            }
            if let Some(prefix) = receipt_prefix {
                filter = filter.with_receipt_prefix(prefix);
            }
            ledger.list_payments(&filter).await.into_diagnostic()?
        }
        Command::ImportLegacy { input } => {
            let file = File::open(input).into_diagnostic()?;
            let reader = LegacyPaymentReader::new(file);
            let mut imported = Vec::new();
            for intent_result in reader.intents() {
                match intent_result {
                    Ok(intent) => match ledger.create_payment(&actor, intent).await {
                        Ok(payment) => imported.push(payment),
                        Err(e) => eprintln!("Error recording legacy payment: {}", e),
                    },
                    Err(e) => {
                        eprintln!("Error reading legacy record: {}", e);
                    }
                }
            }
            ledger.reconcile_sequences().await.into_diagnostic()?;
            imported
        }
    };

    let stdout = io::stdout();
    let mut writer = PaymentWriter::new(stdout.lock());
    writer.write_payments(&payments).into_diagnostic()?;

    Ok(())
}
