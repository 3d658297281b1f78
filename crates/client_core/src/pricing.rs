use chrono::{NaiveDate, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Decimal places kept on a total price.
pub const CURRENCY_SCALE: u32 = 2;

const MINUTES_PER_HOUR: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PriceQuote {
    pub duration_hours: Decimal,
    pub total_price: Decimal,
}

impl PriceQuote {
    pub const ZERO: PriceQuote = PriceQuote {
        duration_hours: Decimal::ZERO,
        total_price: Decimal::ZERO,
    };

    pub fn is_bookable(&self) -> bool {
        self.duration_hours > Decimal::ZERO
    }
}

/// Whole minutes from `start` to `end`, or `None` unless `end` is strictly later.
pub fn minutes_between(start: NaiveTime, end: NaiveTime) -> Option<i64> {
    let minutes = (end - start).num_minutes();
    (minutes > 0).then_some(minutes)
}

/// Prices `start..end` at `price_per_hour`. An empty window or an unrepresentable total
/// quotes zero.
pub fn quote(start: NaiveTime, end: NaiveTime, price_per_hour: Decimal) -> PriceQuote {
    let Some(minutes) = minutes_between(start, end) else {
        return PriceQuote::ZERO;
    };
    let minutes = Decimal::from(minutes);
    let per_hour = Decimal::from(MINUTES_PER_HOUR);

    // Multiply before dividing so whole-hour prices stay exact for any span.
    let Some(total_price) = price_per_hour
        .checked_mul(minutes)
        .and_then(|scaled| scaled.checked_div(per_hour))
    else {
        return PriceQuote::ZERO;
    };
    let total_price = total_price
        .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
        .normalize();

    PriceQuote {
        duration_hours: (minutes / per_hour).normalize(),
        total_price,
    }
}

pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

pub fn parse_booking_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}
