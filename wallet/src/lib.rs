//! Idempotent balance mutations for bet debits, prize credits, and
//! multi-level affiliate commissions.

mod ledger;

pub use ledger::{CommissionRates, WalletLedger};
