use chrono::NaiveDate;

use crate::error::ValidationError;

const PHONE_DIGITS: usize = 10;

pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Accepts `0` followed by exactly nine digits once whitespace is removed.
pub fn validate_phone(raw: &str) -> Result<String, ValidationError> {
    let phone = normalize_phone(raw);
    let well_formed = phone.len() == PHONE_DIGITS
        && phone.starts_with('0')
        && phone.bytes().all(|b| b.is_ascii_digit());
    if well_formed {
        Ok(phone)
    } else {
        Err(ValidationError::InvalidPhone)
    }
}

/// Returns the normalized phone and trimmed name.
pub fn validate_customer(phone: &str, name: &str) -> Result<(String, String), ValidationError> {
    let name = name.trim();
    if phone.trim().is_empty() || name.is_empty() {
        return Err(ValidationError::MissingCustomerFields);
    }
    let phone = validate_phone(phone)?;
    Ok((phone, name.to_string()))
}

pub fn validate_booking_date(date: NaiveDate, today: NaiveDate) -> Result<(), ValidationError> {
    if date < today {
        return Err(ValidationError::DateInPast(date));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_shapes() {
        assert_eq!(validate_phone("0901234567"), Ok("0901234567".to_string()));
        assert_eq!(validate_phone("0901 234 567"), Ok("0901234567".to_string()));
        assert_eq!(validate_phone(" 0901\t234567 "), Ok("0901234567".to_string()));
        assert_eq!(validate_phone("123456789"), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_phone("1234567890"), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_phone("09012345678"), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_phone("09012-4567"), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_phone("090123456٧"), Err(ValidationError::InvalidPhone));
    }

    #[test]
    fn missing_fields_reported_before_phone_shape() {
        assert_eq!(
            validate_customer("", "Lan"),
            Err(ValidationError::MissingCustomerFields)
        );
        assert_eq!(
            validate_customer("12", "   "),
            Err(ValidationError::MissingCustomerFields)
        );
        assert_eq!(
            validate_customer("12", "Lan"),
            Err(ValidationError::InvalidPhone)
        );
        assert_eq!(
            validate_customer("0901 234 567", "  Nguyễn Lan "),
            Ok(("0901234567".to_string(), "Nguyễn Lan".to_string()))
        );
    }

    #[test]
    fn past_dates_rejected() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        assert!(validate_booking_date(today, today).is_ok());
        assert_eq!(
            validate_booking_date(today.pred_opt().expect("date"), today),
            Err(ValidationError::DateInPast(NaiveDate::from_ymd_opt(2025, 5, 31).expect("date")))
        );
    }
}
