use thiserror::Error;

use crate::flow::StepKind;

/// Local input problems. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing date/time: choose a date, start time and end time")]
    MissingSearchWindow,
    #[error("incomplete time selection: choose a date, start time and end time")]
    IncompleteTimeSelection,
    #[error("end before start: the end time must be after the start time")]
    EndBeforeStart,
    #[error("booking date {0} is in the past")]
    DateInPast(chrono::NaiveDate),
    #[error("field inactive: {0} is not accepting bookings")]
    FieldInactive(String),
    #[error("missing fields: phone number and name are required")]
    MissingCustomerFields,
    #[error("invalid phone: expected 10 digits starting with 0")]
    InvalidPhone,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingFlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Remote { message: String },
    #[error("{message}")]
    Conflict { message: String },
    #[error("a request is already in flight")]
    Busy,
    #[error("cannot {action} while in step {step:?}")]
    InvalidStep { action: &'static str, step: StepKind },
}

impl BookingFlowError {
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
