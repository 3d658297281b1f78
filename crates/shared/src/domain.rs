use std::{convert::Infallible, fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An identifier assigned by the booking service. Integer and string ids are both
/// accepted and written back in the shape they arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(id) => write!(f, "{id}"),
            EntityId::Text(id) => f.write_str(id),
        }
    }
}

/// Digits become an integer id, anything else is kept as text.
impl FromStr for EntityId {
    type Err = Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        Ok(raw
            .parse::<i64>()
            .map(EntityId::Int)
            .unwrap_or_else(|_| EntityId::Text(raw.to_string())))
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub EntityId);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(EntityId::Int(id))
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(EntityId::Text(id.to_string()))
            }
        }

        impl FromStr for $name {
            type Err = Infallible;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.parse().map(Self)
            }
        }
    };
}

id_newtype!(FieldId);
id_newtype!(CustomerId);
id_newtype!(BookingId);

fn default_active() -> bool {
    true
}

/// A bookable sports field as published by the booking service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub field_type: String,
    pub price_per_hour: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Only present on availability-filtered search results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_price: Option<Decimal>,
}

impl Field {
    /// Case-insensitive match on name or location. A blank term matches everything.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&term) || self.location.to_lowercase().contains(&term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, location: &str) -> Field {
        Field {
            id: FieldId::from(1),
            name: name.to_string(),
            location: location.to_string(),
            field_type: "5v5".to_string(),
            price_per_hour: Decimal::from(200_000),
            description: None,
            is_active: true,
            estimated_price: None,
        }
    }

    #[test]
    fn search_matches_name_or_location_ignoring_case() {
        let f = field("Sân Mini A", "Quận 7");
        assert!(f.matches_search("mini"));
        assert!(f.matches_search("QUẬN"));
        assert!(f.matches_search("   "));
        assert!(!f.matches_search("thủ đức"));
    }

    #[test]
    fn decodes_camel_case_field_with_defaults() {
        let raw = r#"{"id":3,"name":"A","pricePerHour":150000.5}"#;
        let f: Field = serde_json::from_str(raw).expect("decode field");
        assert_eq!(f.id, FieldId::from(3));
        assert!(f.is_active);
        assert_eq!(f.location, "");
        assert_eq!(f.price_per_hour, Decimal::new(1_500_005, 1));
        assert_eq!(f.estimated_price, None);
    }

    #[test]
    fn decodes_price_given_as_string() {
        let raw = r#"{"id":3,"name":"A","pricePerHour":"200000","isActive":false,"estimatedPrice":"400000"}"#;
        let f: Field = serde_json::from_str(raw).expect("decode field");
        assert!(!f.is_active);
        assert_eq!(f.price_per_hour, Decimal::from(200_000));
        assert_eq!(f.estimated_price, Some(Decimal::from(400_000)));
    }

    #[test]
    fn ids_keep_the_shape_they_arrived_in() {
        let raw = r#"[{"id":"abc","name":"A","pricePerHour":1},{"id":7,"name":"B","pricePerHour":1}]"#;
        let fields: Vec<Field> = serde_json::from_str(raw).expect("decode fields");
        assert_eq!(fields[0].id, FieldId::from("abc"));
        assert_eq!(fields[1].id, FieldId::from(7));
        assert_eq!(fields[0].id.to_string(), "abc");

        let value = serde_json::to_value(&fields[0].id).expect("encode");
        assert_eq!(value, serde_json::json!("abc"));
        let value = serde_json::to_value(&fields[1].id).expect("encode");
        assert_eq!(value, serde_json::json!(7));
    }

    #[test]
    fn parsed_ids_prefer_integers() {
        assert_eq!("12".parse::<FieldId>(), Ok(FieldId::from(12)));
        assert_eq!(" 65f0c0ffee ".parse::<FieldId>(), Ok(FieldId::from("65f0c0ffee")));
    }
}
