use driftrace_core::domain::{LedgerEntry, LedgerKind, UserId};
use driftrace_core::error::{Error, Result};
use driftrace_core::money::round2;
use driftrace_core::repo::{ApplyOutcome, Repository};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Affiliate commission rates for the three referral levels, configured
/// at the process composition root rather than hardcoded.
#[derive(Debug, Clone, Copy)]
pub struct CommissionRates {
    pub l1: Decimal,
    pub l2: Decimal,
    pub l3: Decimal,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self { l1: dec!(0.05), l2: dec!(0.03), l3: dec!(0.01) }
    }
}

/// Outcome of a single affiliate level payout attempt.
#[derive(Debug, Clone)]
pub struct AffiliatePayout {
    pub level: u8,
    pub user_id: UserId,
    pub amount: Decimal,
}

/// Process-wide mediator for every wallet balance change. No other
/// component writes a balance directly.
pub struct WalletLedger {
    repo: Arc<dyn Repository>,
    commission_rates: CommissionRates,
}

impl WalletLedger {
    pub fn new(repo: Arc<dyn Repository>, commission_rates: CommissionRates) -> Self {
        Self { repo, commission_rates }
    }

    async fn guard_not_banned(&self, user_id: &str, kind: LedgerKind) -> Result<()> {
        if kind == LedgerKind::AdminAdjust {
            return Ok(());
        }
        if let Some(user) = self.repo.get_user(user_id).await? {
            if user.is_banned() {
                return Err(Error::UserBanned);
            }
        }
        Ok(())
    }

    /// Credit `amount` to `user_id`'s balance. Idempotent on
    /// `idempotency_key`: a repeat call with the same key and user is a
    /// no-op returning the existing balance.
    pub async fn credit(
        &self,
        user_id: &str,
        amount: Decimal,
        kind: LedgerKind,
        description: &str,
        idempotency_key: &str,
        reference_id: Option<&str>,
    ) -> Result<Decimal> {
        self.guard_not_banned(user_id, kind).await?;
        let amount = round2(amount);
        let entry = LedgerEntry {
            id: idempotency_key.to_string(),
            user_id: user_id.to_string(),
            amount,
            kind,
            description: description.to_string(),
            reference_id: reference_id.map(str::to_string),
            created_at: chrono::Utc::now(),
        };
        match self.repo.apply_ledger_entry(entry).await? {
            ApplyOutcome::Applied { balance } => Ok(balance),
            ApplyOutcome::AlreadyApplied { .. } => self.repo.get_wallet_balance(user_id).await,
        }
    }

    /// Debit `amount` from `user_id`'s balance. Fails with
    /// `InsufficientFunds` if the balance would go negative.
    pub async fn debit(
        &self,
        user_id: &str,
        amount: Decimal,
        kind: LedgerKind,
        description: &str,
        idempotency_key: &str,
        reference_id: Option<&str>,
    ) -> Result<Decimal> {
        self.guard_not_banned(user_id, kind).await?;
        let amount = round2(amount);
        let balance = self.repo.get_wallet_balance(user_id).await?;
        if balance < amount {
            return Err(Error::InsufficientFunds);
        }
        let entry = LedgerEntry {
            id: idempotency_key.to_string(),
            user_id: user_id.to_string(),
            amount: -amount,
            kind,
            description: description.to_string(),
            reference_id: reference_id.map(str::to_string),
            created_at: chrono::Utc::now(),
        };
        match self.repo.apply_ledger_entry(entry).await? {
            ApplyOutcome::Applied { balance } => Ok(balance),
            ApplyOutcome::AlreadyApplied { .. } => self.repo.get_wallet_balance(user_id).await,
        }
    }

    pub async fn balance(&self, user_id: &str) -> Result<Decimal> {
        self.repo.get_wallet_balance(user_id).await
    }

    pub async fn transactions(&self, user_id: &str, limit: usize) -> Result<Vec<LedgerEntry>> {
        self.repo.list_transactions(user_id, limit).await
    }

    /// Pay up to three ancestor levels of `referred_user_id`'s referral
    /// chain a share of `eligible_base`, each as an independently
    /// idempotent credit keyed by `(room_id, referred_user_id, level)`.
    /// Each level is its own transaction; one level's failure does not
    /// roll back another.
    pub async fn process_affiliate_chain(
        &self,
        referred_user_id: &str,
        eligible_base: Decimal,
        room_id: &str,
    ) -> Vec<AffiliatePayout> {
        let mut payouts = Vec::new();
        let mut current = referred_user_id.to_string();

        let rates = self.commission_rates;
        for (level, rate) in [(1u8, rates.l1), (2, rates.l2), (3, rates.l3)] {
            let upline = match self.repo.get_user(&current).await {
                Ok(Some(user)) => user.referred_by,
                Ok(None) => None,
                Err(e) => {
                    warn!(room_id, level, error = %e, "affiliate chain lookup failed");
                    break;
                }
            };
            let Some(upline_id) = upline else { break };

            let amount = round2(eligible_base * rate);
            let key = format!("{room_id}:{referred_user_id}:affiliate-l{level}");
            let kind = match level {
                1 => LedgerKind::AffiliateL1,
                2 => LedgerKind::AffiliateL2,
                _ => LedgerKind::AffiliateL3,
            };
            let description = format!("Affiliate L{level} commission");
            let reference = json!({ "room_id": room_id, "referred_user_id": referred_user_id }).to_string();

            match self
                .credit(&upline_id, amount, kind, &description, &key, Some(&reference))
                .await
            {
                Ok(_) => {
                    info!(room_id, level, upline_id, %amount, "affiliate commission paid");
                    payouts.push(AffiliatePayout { level, user_id: upline_id.clone(), amount });
                }
                Err(e) => {
                    warn!(room_id, level, upline_id, error = %e, "affiliate commission failed");
                }
            }
            current = upline_id;
        }

        payouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftrace_core::domain::{Ban, Role, User};
    use driftrace_core::repo_sqlite::SqliteRepository;

    fn user(id: &str, referred_by: Option<&str>) -> User {
        User {
            id: id.to_string(),
            display_name: id.to_string(),
            role: Role::Player,
            referral_code: format!("ref-{id}"),
            referred_by: referred_by.map(str::to_string),
            withdraw_key: None,
            car_color: "red".to_string(),
            ban: None,
        }
    }

    async fn wallet_with_user(user_id: &str, referred_by: Option<&str>) -> (WalletLedger, Arc<SqliteRepository>) {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        repo.upsert_user(&user(user_id, referred_by)).await.unwrap();
        (WalletLedger::new(repo.clone(), CommissionRates::default()), repo)
    }

    #[tokio::test]
    async fn credit_then_debit_settles_balance() {
        let (wallet, _repo) = wallet_with_user("u1", None).await;
        wallet
            .credit("u1", dec!(10.00), LedgerKind::Deposit, "top up", "k1", None)
            .await
            .unwrap();
        let balance = wallet
            .debit("u1", dec!(4.00), LedgerKind::GameTicket, "ticket", "k2", None)
            .await
            .unwrap();
        assert_eq!(balance, dec!(6.00));
    }

    #[tokio::test]
    async fn debit_past_balance_fails_with_insufficient_funds() {
        let (wallet, _repo) = wallet_with_user("u1", None).await;
        let err = wallet
            .debit("u1", dec!(1.00), LedgerKind::GameTicket, "ticket", "k1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds));
    }

    #[tokio::test]
    async fn repeat_credit_with_same_key_is_a_no_op() {
        let (wallet, _repo) = wallet_with_user("u1", None).await;
        let b1 = wallet
            .credit("u1", dec!(5.00), LedgerKind::Deposit, "top up", "k1", None)
            .await
            .unwrap();
        let b2 = wallet
            .credit("u1", dec!(5.00), LedgerKind::Deposit, "top up", "k1", None)
            .await
            .unwrap();
        assert_eq!(b1, b2);
        let txs = wallet.transactions("u1", 10).await.unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    async fn affiliate_chain_pays_up_to_three_levels() {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        for (id, referred_by) in [("u1", Some("u2")), ("u2", Some("u3")), ("u3", Some("u4")), ("u4", None)] {
            repo.upsert_user(&user(id, referred_by)).await.unwrap();
        }
        let wallet = WalletLedger::new(repo.clone(), CommissionRates::default());
        let payouts = wallet.process_affiliate_chain("u1", dec!(100.00), "room1").await;
        assert_eq!(payouts.len(), 3);
        assert_eq!(payouts[0].user_id, "u2");
        assert_eq!(payouts[0].amount, dec!(5.00));
        assert_eq!(payouts[1].user_id, "u3");
        assert_eq!(payouts[1].amount, dec!(3.00));
        assert_eq!(payouts[2].user_id, "u4");
        assert_eq!(payouts[2].amount, dec!(1.00));
    }

    #[tokio::test]
    async fn banned_user_refuses_mutations() {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        repo.upsert_user(&user("u1", None)).await.unwrap();
        repo.ban_user(
            "u1",
            Ban { banned_by: "admin".to_string(), reason: "cheating".to_string(), expires_at: None },
        )
        .await
        .unwrap();
        let wallet = WalletLedger::new(repo, CommissionRates::default());
        let err = wallet
            .credit("u1", dec!(1.00), LedgerKind::Deposit, "top up", "k1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UserBanned));
    }

    #[tokio::test]
    async fn admin_adjust_is_exempt_from_the_ban_guard() {
        let repo = Arc::new(SqliteRepository::try_new_mem().unwrap());
        repo.upsert_user(&user("u1", None)).await.unwrap();
        repo.ban_user(
            "u1",
            Ban { banned_by: "admin".to_string(), reason: "cheating".to_string(), expires_at: None },
        )
        .await
        .unwrap();
        let wallet = WalletLedger::new(repo, CommissionRates::default());
        let balance = wallet
            .credit("u1", dec!(1.00), LedgerKind::AdminAdjust, "manual correction", "k1", None)
            .await
            .unwrap();
        assert_eq!(balance, dec!(1.00));
    }
}
