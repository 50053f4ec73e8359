//! Tick-size price normalization.

use rust_decimal::Decimal;

/// Decimal places kept after snapping to the tick grid.
const PRICE_SCALE: u32 = 8;

/// Snap `price` to the nearest multiple of `tick_size`.
///
/// A non-positive tick size, or one too fine to divide into the price
/// without overflow, leaves the price untouched apart from the final
/// rounding.
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    let snapped = if tick_size > Decimal::ZERO {
        price
            .checked_div(tick_size)
            .and_then(|ticks| ticks.round().checked_mul(tick_size))
    } else {
        None
    };

    match snapped {
        Some(snapped) => snapped.round_dp(PRICE_SCALE).normalize(),
        None => price.round_dp(PRICE_SCALE),
    }
}
