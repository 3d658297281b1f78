pub mod api;
pub mod config;
pub mod error;
pub mod flow;
pub mod format;
pub mod pricing;
pub mod validation;

pub use api::{ApiCallError, BookingApi, HttpBookingApi};
pub use config::{load_settings, ClientSettings};
pub use error::{BookingFlowError, ValidationError};
pub use flow::{
    BookingConfirmation, BookingFlow, DraftBooking, FlowSnapshot, StepKind, WizardStep,
};
pub use pricing::PriceQuote;
