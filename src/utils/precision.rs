// src/utils/precision.rs
use rust_decimal::{Decimal, RoundingStrategy};

/// Округляет количество ВНИЗ до ближайшего кратного step_size.
/// Пример: amount=10.999, step=1.0 -> 10
pub fn normalize_quantity(amount: Decimal, step_size: Decimal) -> Decimal {
    if step_size <= Decimal::ZERO {
        return amount;
    }
    ((amount / step_size).floor() * step_size).normalize()
}

/// Rounds a price to `dp` decimal places, half to even.
pub fn round_price(price: Decimal, dp: u32) -> Decimal {
    price
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Truncates a quote-currency amount to the precision the exchange accepts.
pub fn truncate_quote(amount: Decimal, precision: u32) -> Decimal {
    amount
        .round_dp_with_strategy(precision, RoundingStrategy::ToZero)
        .normalize()
}
