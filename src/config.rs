use crate::domain::allocation::PayerPolicy;
use chrono::{FixedOffset, Offset, Utc};

pub const DEFAULT_MAX_ISSUE_ATTEMPTS: u32 = 5;
/// Philippine Standard Time, UTC+08:00.
pub const DEFAULT_PERIOD_OFFSET_SECS: i32 = 8 * 3600;

/// Tunables of the payment ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound on attempts for one receipt issuance or status update
    /// before the ledger gives up with `AllocationConflict`.
    pub max_issue_attempts: u32,
    pub payer_policy: PayerPolicy,
    /// Local offset whose calendar year decides the receipt numbering period.
    pub period_offset: FixedOffset,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_issue_attempts: DEFAULT_MAX_ISSUE_ATTEMPTS,
            payer_policy: PayerPolicy::default(),
            period_offset: FixedOffset::east_opt(DEFAULT_PERIOD_OFFSET_SECS)
                .unwrap_or_else(|| Utc.fix()),
        }
    }
}

impl LedgerConfig {
    pub fn with_payer_policy(mut self, policy: PayerPolicy) -> Self {
        self.payer_policy = policy;
        self
    }

    pub fn with_period_offset(mut self, offset: FixedOffset) -> Self {
        self.period_offset = offset;
        self
    }

    /// Sets the attempt bound; zero is treated as one.
    pub fn with_max_issue_attempts(mut self, attempts: u32) -> Self {
        self.max_issue_attempts = attempts.max(1);
        self
    }
}
