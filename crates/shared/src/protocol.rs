use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    domain::{BookingId, CustomerId, EntityId, FieldId},
    error::ServiceRejection,
};

/// `HH:MM` wall-clock times, as produced by a time picker.
pub mod hour_minute {
    use chrono::NaiveTime;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
            .map_err(|e| D::Error::custom(format!("invalid time of day '{raw}': {e}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindOrCreateCustomerRequest {
    pub phone: String,
    pub full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: CustomerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerResolution {
    pub customer: CustomerSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: CustomerId,
    pub field_id: FieldId,
    pub booking_date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub start_time: NaiveTime,
    #[serde(with = "hour_minute")]
    pub end_time: NaiveTime,
    #[serde(with = "rust_decimal::serde::float")]
    pub duration: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_price: Decimal,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchAvailableQuery {
    pub date: NaiveDate,
    #[serde(with = "hour_minute")]
    pub start_time: NaiveTime,
    #[serde(with = "hour_minute")]
    pub end_time: NaiveTime,
}

/// The booking record echoed back by `POST /bookings`. Only the id is interpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatedBooking {
    #[serde(flatten)]
    pub record: Map<String, Value>,
}

impl CreatedBooking {
    pub fn id(&self) -> Option<BookingId> {
        let record = match self.record.get("booking") {
            Some(Value::Object(inner)) => inner,
            _ => &self.record,
        };
        let id = record.get("id")?;
        EntityId::deserialize(id).ok().map(BookingId)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub conflict: bool,
}

/// The service answers with either a bare payload or a `{ success, data }` envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse<T> {
    Envelope(Envelope<T>),
    Bare(T),
}

impl<T> ApiResponse<T> {
    pub fn into_result(self) -> Result<T, ServiceRejection> {
        match self {
            ApiResponse::Bare(data) => Ok(data),
            ApiResponse::Envelope(Envelope {
                success: true,
                data: Some(data),
                ..
            }) => Ok(data),
            ApiResponse::Envelope(Envelope {
                success: true,
                data: None,
                message,
                conflict,
            }) => Err(ServiceRejection {
                message: message.or_else(|| Some("response carried no data".to_string())),
                conflict,
            }),
            ApiResponse::Envelope(Envelope {
                success: false,
                message,
                conflict,
                ..
            }) => Err(ServiceRejection { message, conflict }),
        }
    }
}

impl<T: Default> ApiResponse<T> {
    /// Like [`ApiResponse::into_result`], but a successful envelope without data is accepted.
    pub fn into_result_or_default(self) -> Result<T, ServiceRejection> {
        match self {
            ApiResponse::Envelope(Envelope {
                success: true,
                data: None,
                ..
            }) => Ok(T::default()),
            other => other.into_result(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Field;

    fn nine_to_eleven() -> (NaiveTime, NaiveTime) {
        (
            NaiveTime::from_hms_opt(9, 0, 0).expect("time"),
            NaiveTime::from_hms_opt(11, 0, 0).expect("time"),
        )
    }

    #[test]
    fn booking_request_uses_wire_names_and_formats() {
        let (start_time, end_time) = nine_to_eleven();
        let request = CreateBookingRequest {
            user_id: CustomerId::from(5),
            field_id: FieldId::from(2),
            booking_date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"),
            start_time,
            end_time,
            duration: Decimal::from(2),
            total_price: Decimal::from(400_000),
            notes: String::new(),
        };

        let value = serde_json::to_value(&request).expect("encode");
        assert_eq!(
            value,
            serde_json::json!({
                "userId": 5,
                "fieldId": 2,
                "bookingDate": "2025-06-01",
                "startTime": "09:00",
                "endTime": "11:00",
                "duration": 2.0,
                "totalPrice": 400000.0,
                "notes": ""
            })
        );
    }

    #[test]
    fn decodes_enveloped_and_bare_field_lists() {
        let enveloped: ApiResponse<Vec<Field>> = serde_json::from_str(
            r#"{"success":true,"data":[{"id":1,"name":"A","pricePerHour":100000}]}"#,
        )
        .expect("enveloped");
        assert_eq!(enveloped.into_result().expect("ok").len(), 1);

        let bare: ApiResponse<Vec<Field>> =
            serde_json::from_str(r#"[{"id":1,"name":"A","pricePerHour":100000}]"#).expect("bare");
        assert_eq!(bare.into_result().expect("ok").len(), 1);
    }

    #[test]
    fn unsuccessful_envelope_becomes_rejection() {
        let response: ApiResponse<CustomerResolution> =
            serde_json::from_str(r#"{"success":false,"message":"phone blocked"}"#)
                .expect("decode");
        let err = response.into_result().expect_err("rejected");
        assert_eq!(err.to_string(), "phone blocked");
        assert!(!err.conflict);
    }

    #[test]
    fn customer_resolution_accepts_both_shapes() {
        let bare: ApiResponse<CustomerResolution> =
            serde_json::from_str(r#"{"customer":{"id":9}}"#).expect("bare");
        assert_eq!(bare.into_result().expect("ok").customer.id, CustomerId::from(9));

        let enveloped: ApiResponse<CustomerResolution> =
            serde_json::from_str(r#"{"success":true,"data":{"customer":{"id":9,"phone":"0901234567"}}}"#)
                .expect("enveloped");
        assert_eq!(enveloped.into_result().expect("ok").customer.id, CustomerId::from(9));
    }

    #[test]
    fn string_customer_ids_round_trip_into_booking_requests() {
        let resolution: ApiResponse<CustomerResolution> = serde_json::from_str(
            r#"{"success":true,"data":{"customer":{"id":"65f0c0ffee"}}}"#,
        )
        .expect("decode");
        let customer = resolution.into_result().expect("ok").customer;
        assert_eq!(customer.id, CustomerId::from("65f0c0ffee"));

        let (start_time, end_time) = nine_to_eleven();
        let request = CreateBookingRequest {
            user_id: customer.id,
            field_id: FieldId::from("field-a"),
            booking_date: NaiveDate::from_ymd_opt(2025, 6, 1).expect("date"),
            start_time,
            end_time,
            duration: Decimal::from(2),
            total_price: Decimal::from(400_000),
            notes: String::new(),
        };
        let value = serde_json::to_value(&request).expect("encode");
        assert_eq!(value["userId"], serde_json::json!("65f0c0ffee"));
        assert_eq!(value["fieldId"], serde_json::json!("field-a"));
    }

    #[test]
    fn created_booking_id_is_optional() {
        let with_id: CreatedBooking =
            serde_json::from_str(r#"{"id":77,"status":"pending"}"#).expect("decode");
        assert_eq!(with_id.id(), Some(BookingId::from(77)));

        let nested: CreatedBooking =
            serde_json::from_str(r#"{"booking":{"id":78}}"#).expect("decode");
        assert_eq!(nested.id(), Some(BookingId::from(78)));

        let text: CreatedBooking =
            serde_json::from_str(r#"{"id":"65f0c0ffee"}"#).expect("decode");
        assert_eq!(text.id(), Some(BookingId::from("65f0c0ffee")));

        let missing: CreatedBooking =
            serde_json::from_str(r#"{"status":"pending"}"#).expect("decode");
        assert_eq!(missing.id(), None);

        let odd: CreatedBooking = serde_json::from_str(r#"{"id":[1]}"#).expect("decode");
        assert_eq!(odd.id(), None);
    }

    #[test]
    fn time_of_day_accepts_seconds() {
        let query: SearchAvailableQuery = serde_json::from_str(
            r#"{"date":"2025-06-01","startTime":"09:00:00","endTime":"11:00"}"#,
        )
        .expect("decode");
        assert_eq!(query.start_time, nine_to_eleven().0);
    }
}
