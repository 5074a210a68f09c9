//! `rusqlite`-backed `Repository`: a single connection guarded by a
//! `tokio::sync::Mutex`, schema created eagerly on open.

use crate::domain::{Ban, LedgerEntry, LedgerKind, Role, User};
use crate::error::{Error, Result};
use crate::repo::{ApplyOutcome, Repository};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SqliteRepository {
    conn: Arc<Mutex<Connection>>,
}

fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL,
            referral_code TEXT NOT NULL UNIQUE,
            referred_by TEXT,
            withdraw_key TEXT,
            car_color TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS wallets (
            user_id TEXT PRIMARY KEY,
            balance TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS ledger (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            amount TEXT NOT NULL,
            kind TEXT NOT NULL,
            description TEXT NOT NULL,
            ref_room_id TEXT,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS bans (
            user_id TEXT PRIMARY KEY,
            banned_by TEXT NOT NULL,
            reason TEXT NOT NULL,
            expires_at TEXT
        );",
    )
}

impl SqliteRepository {
    pub fn try_new_mem() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn try_new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        init_schema(&conn)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }
}

fn kind_to_str(kind: LedgerKind) -> &'static str {
    match kind {
        LedgerKind::Deposit => "deposit",
        LedgerKind::Withdrawal => "withdrawal",
        LedgerKind::GameTicket => "game-ticket",
        LedgerKind::GameReward => "game-reward",
        LedgerKind::AffiliateL1 => "affiliate-l1",
        LedgerKind::AffiliateL2 => "affiliate-l2",
        LedgerKind::AffiliateL3 => "affiliate-l3",
        LedgerKind::AdminAdjust => "admin-adjust",
    }
}

fn str_to_kind(s: &str) -> Result<LedgerKind> {
    Ok(match s {
        "deposit" => LedgerKind::Deposit,
        "withdrawal" => LedgerKind::Withdrawal,
        "game-ticket" => LedgerKind::GameTicket,
        "game-reward" => LedgerKind::GameReward,
        "affiliate-l1" => LedgerKind::AffiliateL1,
        "affiliate-l2" => LedgerKind::AffiliateL2,
        "affiliate-l3" => LedgerKind::AffiliateL3,
        "admin-adjust" => LedgerKind::AdminAdjust,
        other => return Err(Error::RepositoryError(format!("unknown ledger kind: {other}"))),
    })
}

fn row_to_entry(row: &rusqlite::Row) -> rusqlite::Result<LedgerEntry> {
    let kind_str: String = row.get(3)?;
    let created_at_str: String = row.get(6)?;
    let amount_str: String = row.get(2)?;
    Ok(LedgerEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        amount: Decimal::from_str(&amount_str).unwrap_or(Decimal::ZERO),
        kind: str_to_kind(&kind_str).unwrap_or(LedgerKind::AdminAdjust),
        description: row.get(4)?,
        reference_id: row.get(5)?,
        created_at: DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc.timestamp_opt(0, 0).unwrap()),
    })
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let user = conn
            .query_row(
                "SELECT id, display_name, role, referral_code, referred_by, withdraw_key, car_color FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    let role_str: String = row.get(2)?;
                    Ok(User {
                        id: row.get(0)?,
                        display_name: row.get(1)?,
                        role: if role_str == "admin" { Role::Admin } else { Role::Player },
                        referral_code: row.get(3)?,
                        referred_by: row.get(4)?,
                        withdraw_key: row.get(5)?,
                        car_color: row.get(6)?,
                        ban: None,
                    })
                },
            )
            .optional()?;
        let Some(mut user) = user else { return Ok(None) };
        user.ban = self.get_ban(user_id).await?;
        Ok(Some(user))
    }

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let id: Option<String> = conn
            .query_row("SELECT id FROM users WHERE referral_code = ?1", params![code], |row| row.get(0))
            .optional()?;
        drop(conn);
        match id {
            Some(id) => self.get_user(&id).await,
            None => Ok(None),
        }
    }

    async fn upsert_user(&self, user: &User) -> Result<()> {
        let conn = self.conn.lock().await;
        let role_str = match user.role {
            Role::Admin => "admin",
            Role::Player => "player",
        };
        conn.execute(
            "INSERT INTO users (id, display_name, role, referral_code, referred_by, withdraw_key, car_color)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                display_name = excluded.display_name,
                withdraw_key = excluded.withdraw_key,
                car_color = excluded.car_color",
            params![
                user.id,
                user.display_name,
                role_str,
                user.referral_code,
                user.referred_by,
                user.withdraw_key,
                user.car_color,
            ],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO wallets (user_id, balance) VALUES (?1, '0')",
            params![user.id],
        )?;
        Ok(())
    }

    async fn get_wallet_balance(&self, user_id: &str) -> Result<Decimal> {
        let conn = self.conn.lock().await;
        let balance_str: Option<String> = conn
            .query_row("SELECT balance FROM wallets WHERE user_id = ?1", params![user_id], |row| row.get(0))
            .optional()?;
        Ok(balance_str.and_then(|s| Decimal::from_str(&s).ok()).unwrap_or(Decimal::ZERO))
    }

    async fn get_ledger_entry(&self, id: &str) -> Result<Option<LedgerEntry>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT id, user_id, amount, kind, description, ref_room_id, created_at FROM ledger WHERE id = ?1",
            params![id],
            row_to_entry,
        )
        .optional()
        .map_err(Error::from)
    }

    async fn apply_ledger_entry(&self, entry: LedgerEntry) -> Result<ApplyOutcome> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let existing: Option<(String, String)> = tx
            .query_row("SELECT user_id, amount FROM ledger WHERE id = ?1", params![entry.id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .optional()?;

        if let Some((existing_user_id, _)) = existing {
            let existing_entry = tx
                .query_row(
                    "SELECT id, user_id, amount, kind, description, ref_room_id, created_at FROM ledger WHERE id = ?1",
                    params![entry.id],
                    row_to_entry,
                )
                .map_err(Error::from)?;
            if existing_user_id != entry.user_id {
                return Err(Error::KeyConflict);
            }
            return Ok(ApplyOutcome::AlreadyApplied { entry: existing_entry });
        }

        let current_balance_str: Option<String> = tx
            .query_row("SELECT balance FROM wallets WHERE user_id = ?1", params![entry.user_id], |row| row.get(0))
            .optional()?;
        let current_balance = current_balance_str.and_then(|s| Decimal::from_str(&s).ok()).unwrap_or(Decimal::ZERO);
        let new_balance = current_balance + entry.amount;

        tx.execute(
            "INSERT INTO ledger (id, user_id, amount, kind, description, ref_room_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id,
                entry.user_id,
                entry.amount.to_string(),
                kind_to_str(entry.kind),
                entry.description,
                entry.reference_id,
                entry.created_at.to_rfc3339(),
            ],
        )?;

        tx.execute(
            "INSERT INTO wallets (user_id, balance) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET balance = excluded.balance",
            params![entry.user_id, new_balance.to_string()],
        )?;

        tx.commit()?;
        Ok(ApplyOutcome::Applied { balance: new_balance })
    }

    async fn list_transactions(&self, user_id: &str, limit: usize) -> Result<Vec<LedgerEntry>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, amount, kind, description, ref_room_id, created_at
             FROM ledger WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], row_to_entry)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    async fn get_setting(&self, key: &str) -> Result<Option<Value>> {
        let conn = self.conn.lock().await;
        let value_str: Option<String> = conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?;
        Ok(value_str.and_then(|s| serde_json::from_str(&s).ok()))
    }

    async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value.to_string()],
        )?;
        Ok(())
    }

    async fn ban_user(&self, user_id: &str, ban: Ban) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO bans (user_id, banned_by, reason, expires_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET banned_by = excluded.banned_by, reason = excluded.reason, expires_at = excluded.expires_at",
            params![user_id, ban.banned_by, ban.reason, ban.expires_at.map(|d| d.to_rfc3339())],
        )?;
        Ok(())
    }

    async fn get_ban(&self, user_id: &str) -> Result<Option<Ban>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT banned_by, reason, expires_at FROM bans WHERE user_id = ?1",
            params![user_id],
            |row| {
                let expires_at: Option<String> = row.get(2)?;
                Ok(Ban {
                    banned_by: row.get(0)?,
                    reason: row.get(1)?,
                    expires_at: expires_at.and_then(|s| DateTime::parse_from_rfc3339(&s).ok()).map(|d| d.with_timezone(&Utc)),
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }
}
