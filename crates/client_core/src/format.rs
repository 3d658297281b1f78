use rust_decimal::{Decimal, RoundingStrategy};

use crate::validation::normalize_phone;

/// Vietnamese dong, e.g. `400.000 ₫`.
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped} ₫")
    } else {
        format!("{grouped} ₫")
    }
}

/// `0901234567` becomes `0901 234 567`; anything else is returned as given.
pub fn format_phone(phone: &str) -> String {
    let digits = normalize_phone(phone);
    if digits.len() != 10 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return phone.to_string();
    }
    format!("{} {} {}", &digits[..4], &digits[4..7], &digits[7..])
}
