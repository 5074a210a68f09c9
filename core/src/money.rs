//! Fixed-point money helpers. `rust_decimal::Decimal` is used end-to-end for
//! ledger amounts; a binary float never appears on this path.

use rust_decimal::Decimal;

/// Round to 2 fractional digits, banker's rounding (the `rust_decimal`
/// default), matching the ledger's fixed-point contract.
pub fn round2(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

/// Split a pool into `(retained_by_house, distributable)` given a fee
/// fraction in `[0, 1]`.
pub fn apply_house_fee(pool: Decimal, house_fee: Decimal) -> (Decimal, Decimal) {
    let fee = round2(pool * house_fee);
    let distributable = pool - fee;
    (fee, distributable)
}
