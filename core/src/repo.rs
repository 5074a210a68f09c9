//! Persistence contract. The engine behind it (relational store, embedded
//! sqlite, …) is an implementation detail; every other crate only ever
//! depends on this trait.

use crate::domain::{Ban, LedgerEntry, User};
use crate::error::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::Value;

/// Outcome of appending a ledger entry. Distinguishing `AlreadyApplied`
/// from `Applied` lets the wallet crate implement idempotent retries
/// without re-deriving it from error variants.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    Applied { balance: Decimal },
    AlreadyApplied { entry: LedgerEntry },
}

/// Everything the process needs persisted across restarts: users,
/// wallet balances, the append-only ledger, settings, and bans.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>>;

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>>;

    async fn upsert_user(&self, user: &User) -> Result<()>;

    async fn get_wallet_balance(&self, user_id: &str) -> Result<Decimal>;

    async fn get_ledger_entry(&self, id: &str) -> Result<Option<LedgerEntry>>;

    /// Append `entry` and update the wallet balance as a single
    /// transaction; a duplicate `id` belonging to the same user is a
    /// no-op returning `AlreadyApplied`. A duplicate `id` belonging to a
    /// different user fails with `Error::KeyConflict`.
    async fn apply_ledger_entry(&self, entry: LedgerEntry) -> Result<ApplyOutcome>;

    async fn list_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<LedgerEntry>>;

    async fn get_setting(&self, key: &str) -> Result<Option<Value>>;

    async fn set_setting(&self, key: &str, value: Value) -> Result<()>;

    async fn ban_user(&self, user_id: &str, ban: Ban) -> Result<()>;

    async fn get_ban(&self, user_id: &str) -> Result<Option<Ban>>;
}
