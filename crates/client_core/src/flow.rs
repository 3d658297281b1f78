use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::{Local, NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    domain::{BookingId, CustomerId, Field, FieldId},
    protocol::{CreateBookingRequest, FindOrCreateCustomerRequest, SearchAvailableQuery},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    api::BookingApi,
    error::{BookingFlowError, ValidationError},
    pricing::{self, PriceQuote},
    validation::{validate_booking_date, validate_customer},
};

pub const LOAD_FIELDS_FAILED: &str = "cannot load fields";
pub const NO_FIELDS_AVAILABLE: &str = "no fields available for the selected date and time";
const SEARCH_FAILED: &str = "could not search available fields";
const CUSTOMER_FAILED: &str = "could not process customer information";
const BOOKING_FAILED: &str = "could not create booking";
const SLOT_TAKEN: &str = "this time slot is already booked, choose a different time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    SelectField,
    SelectTime,
    CustomerInfo,
    Confirmed,
}

/// Wizard position. Every step past `SelectField` owns the field it was entered with.
#[derive(Debug, Clone, PartialEq)]
pub enum WizardStep {
    SelectField,
    SelectTime { field: Field },
    CustomerInfo { field: Field },
    Confirmed { confirmation: BookingConfirmation },
}

impl WizardStep {
    pub fn kind(&self) -> StepKind {
        match self {
            WizardStep::SelectField => StepKind::SelectField,
            WizardStep::SelectTime { .. } => StepKind::SelectTime,
            WizardStep::CustomerInfo { .. } => StepKind::CustomerInfo,
            WizardStep::Confirmed { .. } => StepKind::Confirmed,
        }
    }

    pub fn selected_field(&self) -> Option<&Field> {
        match self {
            WizardStep::SelectField => None,
            WizardStep::SelectTime { field } | WizardStep::CustomerInfo { field } => Some(field),
            WizardStep::Confirmed { confirmation } => Some(&confirmation.field),
        }
    }
}

/// The reservation being assembled. Duration and price are derived, never set directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DraftBooking {
    pub booking_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration_hours: Decimal,
    pub total_price: Decimal,
    pub customer_phone: String,
    pub customer_name: String,
    pub notes: Option<String>,
}

impl DraftBooking {
    fn reprice(&mut self, field: Option<&Field>) -> PriceQuote {
        let quote = match (self.start_time, self.end_time, field) {
            (Some(start), Some(end), Some(field)) => {
                pricing::quote(start, end, field.price_per_hour)
            }
            _ => PriceQuote::ZERO,
        };
        self.duration_hours = quote.duration_hours;
        self.total_price = quote.total_price;
        quote
    }

    fn clear_window(&mut self) {
        self.booking_date = None;
        self.start_time = None;
        self.end_time = None;
        self.duration_hours = Decimal::ZERO;
        self.total_price = Decimal::ZERO;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingConfirmation {
    pub booking_id: Option<BookingId>,
    pub customer_id: CustomerId,
    pub field: Field,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration_hours: Decimal,
    pub total_price: Decimal,
    pub customer_name: String,
    pub customer_phone: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowSnapshot {
    pub step: WizardStep,
    pub fields: Vec<Field>,
    pub draft: DraftBooking,
    pub filter_applied: bool,
    pub search_term: String,
    pub last_error: Option<String>,
    pub busy: bool,
}

impl FlowSnapshot {
    pub fn step_kind(&self) -> StepKind {
        self.step.kind()
    }

    pub fn selected_field(&self) -> Option<&Field> {
        self.step.selected_field()
    }
}

struct FlowState {
    step: WizardStep,
    fields: Vec<Field>,
    draft: DraftBooking,
    filter_applied: bool,
    search_term: String,
    last_error: Option<String>,
}

impl FlowState {
    fn fail(&mut self, err: BookingFlowError) -> BookingFlowError {
        warn!(step = ?self.step.kind(), error = %err, "booking flow: operation failed");
        self.last_error = Some(err.to_string());
        err
    }

    fn invalid_step(&self, action: &'static str) -> BookingFlowError {
        BookingFlowError::InvalidStep {
            action,
            step: self.step.kind(),
        }
    }
}

struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

/// One user's pass through the booking wizard.
pub struct BookingFlow {
    api: Arc<dyn BookingApi>,
    inner: Mutex<FlowState>,
    busy: AtomicBool,
    today: fn() -> NaiveDate,
}

impl BookingFlow {
    pub fn new(api: Arc<dyn BookingApi>) -> Self {
        Self {
            api,
            inner: Mutex::new(FlowState {
                step: WizardStep::SelectField,
                fields: Vec::new(),
                draft: DraftBooking::default(),
                filter_applied: false,
                search_term: String::new(),
                last_error: None,
            }),
            busy: AtomicBool::new(false),
            today: local_today,
        }
    }

    /// Replaces the calendar used to reject past booking dates.
    pub fn with_today(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin_request(&self) -> Result<BusyGuard<'_>, BookingFlowError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BookingFlowError::Busy)?;
        Ok(BusyGuard { flag: &self.busy })
    }

    fn ensure_idle(&self) -> Result<(), BookingFlowError> {
        if self.is_busy() {
            return Err(BookingFlowError::Busy);
        }
        Ok(())
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        let state = self.inner.lock().await;
        FlowSnapshot {
            step: state.step.clone(),
            fields: state.fields.clone(),
            draft: state.draft.clone(),
            filter_applied: state.filter_applied,
            search_term: state.search_term.clone(),
            last_error: state.last_error.clone(),
            busy: self.is_busy(),
        }
    }

    pub async fn step(&self) -> StepKind {
        self.inner.lock().await.step.kind()
    }

    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    pub async fn find_field(&self, field_id: FieldId) -> Option<Field> {
        self.inner
            .lock()
            .await
            .fields
            .iter()
            .find(|field| field.id == field_id)
            .cloned()
    }

    pub async fn set_search_term(&self, term: impl Into<String>) {
        self.inner.lock().await.search_term = term.into();
    }

    /// The loaded catalog narrowed by the current search term.
    pub async fn visible_fields(&self) -> Vec<Field> {
        let state = self.inner.lock().await;
        state
            .fields
            .iter()
            .filter(|field| field.matches_search(&state.search_term))
            .cloned()
            .collect()
    }

    /// Fetches the full catalog. Failures leave an empty catalog and a visible error.
    pub async fn load_fields(&self) -> Vec<Field> {
        let Ok(_busy) = self.begin_request() else {
            return self.inner.lock().await.fields.clone();
        };
        self.fetch_catalog().await
    }

    /// Caller must hold the busy guard.
    async fn fetch_catalog(&self) -> Vec<Field> {
        self.inner.lock().await.last_error = None;

        let result = self.api.list_fields().await;
        let mut state = self.inner.lock().await;
        state.filter_applied = false;
        match result {
            Ok(fields) => {
                info!(count = fields.len(), "booking flow: fields loaded");
                state.fields = fields.clone();
                fields
            }
            Err(err) => {
                warn!(error = %err, "booking flow: failed to load fields");
                state.fields.clear();
                state.last_error = Some(LOAD_FIELDS_FAILED.to_string());
                Vec::new()
            }
        }
    }

    pub async fn search_available(
        &self,
        date: Option<NaiveDate>,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<Vec<Field>, BookingFlowError> {
        let _busy = self.begin_request()?;
        let query = {
            let mut state = self.inner.lock().await;
            if !matches!(state.step, WizardStep::SelectField) {
                return Err(state.invalid_step("search available fields"));
            }
            state.last_error = None;
            let (Some(date), Some(start_time), Some(end_time)) = (date, start_time, end_time)
            else {
                return Err(state.fail(ValidationError::MissingSearchWindow.into()));
            };
            SearchAvailableQuery {
                date,
                start_time,
                end_time,
            }
        };

        let result = self.api.search_available(&query).await;
        let mut state = self.inner.lock().await;
        match result {
            Ok(fields) => {
                info!(
                    count = fields.len(),
                    date = %query.date,
                    "booking flow: availability filter applied"
                );
                state.fields = fields.clone();
                state.filter_applied = true;
                state.draft.booking_date = Some(query.date);
                state.draft.start_time = Some(query.start_time);
                state.draft.end_time = Some(query.end_time);
                state.draft.reprice(None);
                if fields.is_empty() {
                    state.last_error = Some(NO_FIELDS_AVAILABLE.to_string());
                }
                Ok(fields)
            }
            Err(err) => {
                warn!(error = %err, "booking flow: availability search failed");
                let message = err.server_message().unwrap_or(SEARCH_FAILED).to_string();
                Err(state.fail(BookingFlowError::remote(message)))
            }
        }
    }

    /// Drops the availability filter and the searched window, then reloads the full catalog.
    pub async fn clear_filter(&self) -> Result<Vec<Field>, BookingFlowError> {
        let _busy = self.begin_request()?;
        {
            let mut state = self.inner.lock().await;
            if !matches!(state.step, WizardStep::SelectField) {
                return Err(state.invalid_step("clear the availability filter"));
            }
            state.draft.clear_window();
            state.filter_applied = false;
        }
        Ok(self.fetch_catalog().await)
    }

    pub async fn select_field(&self, field: Field) -> Result<(), BookingFlowError> {
        self.ensure_idle()?;
        let mut state = self.inner.lock().await;
        if !matches!(state.step, WizardStep::SelectField) {
            return Err(state.invalid_step("select a field"));
        }
        state.last_error = None;
        if !field.is_active {
            return Err(state.fail(ValidationError::FieldInactive(field.name.clone()).into()));
        }

        info!(field_id = %field.id, "booking flow: field selected");
        state.draft.reprice(Some(&field));
        state.step = WizardStep::SelectTime { field };
        Ok(())
    }

    /// Updates the requested window and returns the resulting price quote.
    pub async fn set_time_window(
        &self,
        date: Option<NaiveDate>,
        start_time: Option<NaiveTime>,
        end_time: Option<NaiveTime>,
    ) -> Result<PriceQuote, BookingFlowError> {
        self.ensure_idle()?;
        let mut state = self.inner.lock().await;
        if !matches!(
            state.step,
            WizardStep::SelectField | WizardStep::SelectTime { .. }
        ) {
            return Err(state.invalid_step("change the time window"));
        }
        state.last_error = None;

        let FlowState { step, draft, .. } = &mut *state;
        draft.booking_date = date;
        draft.start_time = start_time;
        draft.end_time = end_time;
        Ok(draft.reprice(step.selected_field()))
    }

    pub async fn confirm_time_window(&self) -> Result<(), BookingFlowError> {
        self.ensure_idle()?;
        let mut state = self.inner.lock().await;
        let field = match &state.step {
            WizardStep::SelectTime { field } => field.clone(),
            _ => return Err(state.invalid_step("confirm the time window")),
        };
        state.last_error = None;

        let (Some(date), Some(_), Some(_)) = (
            state.draft.booking_date,
            state.draft.start_time,
            state.draft.end_time,
        ) else {
            return Err(state.fail(ValidationError::IncompleteTimeSelection.into()));
        };
        if !state.draft.reprice(Some(&field)).is_bookable() {
            return Err(state.fail(ValidationError::EndBeforeStart.into()));
        }
        if let Err(err) = validate_booking_date(date, (self.today)()) {
            return Err(state.fail(err.into()));
        }

        info!(
            field_id = %field.id,
            booking_date = %date,
            duration_hours = %state.draft.duration_hours,
            "booking flow: time window confirmed"
        );
        state.step = WizardStep::CustomerInfo { field };
        Ok(())
    }

    /// Steps back one screen. The draft window is kept.
    pub async fn back(&self) -> Result<StepKind, BookingFlowError> {
        self.ensure_idle()?;
        let mut state = self.inner.lock().await;
        let previous = match std::mem::replace(&mut state.step, WizardStep::SelectField) {
            WizardStep::SelectTime { .. } => WizardStep::SelectField,
            WizardStep::CustomerInfo { field } => WizardStep::SelectTime { field },
            other => {
                state.step = other;
                return Err(state.invalid_step("go back"));
            }
        };
        state.last_error = None;
        state.step = previous;
        let FlowState { step, draft, .. } = &mut *state;
        draft.reprice(step.selected_field());
        Ok(step.kind())
    }

    /// Resolves the customer, then creates the booking. Only a created booking confirms the flow.
    pub async fn submit_customer_info(
        &self,
        phone: &str,
        name: &str,
        notes: Option<&str>,
    ) -> Result<BookingConfirmation, BookingFlowError> {
        let _busy = self.begin_request()?;
        let (field, draft, booking_date, start_time, end_time) = {
            let mut state = self.inner.lock().await;
            let field = match &state.step {
                WizardStep::CustomerInfo { field } => field.clone(),
                _ => return Err(state.invalid_step("submit customer information")),
            };
            state.last_error = None;

            let (phone, name) = match validate_customer(phone, name) {
                Ok(valid) => valid,
                Err(err) => return Err(state.fail(err.into())),
            };
            state.draft.customer_phone = phone;
            state.draft.customer_name = name;
            state.draft.notes = notes
                .map(str::trim)
                .filter(|notes| !notes.is_empty())
                .map(str::to_string);

            let (Some(booking_date), Some(start_time), Some(end_time)) = (
                state.draft.booking_date,
                state.draft.start_time,
                state.draft.end_time,
            ) else {
                return Err(state.fail(ValidationError::IncompleteTimeSelection.into()));
            };
            if !state.draft.reprice(Some(&field)).is_bookable() {
                return Err(state.fail(ValidationError::EndBeforeStart.into()));
            }
            (field, state.draft.clone(), booking_date, start_time, end_time)
        };

        let customer_id = match self
            .api
            .find_or_create_customer(&FindOrCreateCustomerRequest {
                phone: draft.customer_phone.clone(),
                full_name: draft.customer_name.clone(),
            })
            .await
        {
            Ok(resolution) => resolution.customer.id,
            Err(err) => {
                warn!(error = %err, "booking flow: customer resolution failed");
                let message = err.server_message().unwrap_or(CUSTOMER_FAILED).to_string();
                let mut state = self.inner.lock().await;
                return Err(state.fail(BookingFlowError::remote(message)));
            }
        };

        let request = CreateBookingRequest {
            user_id: customer_id.clone(),
            field_id: field.id.clone(),
            booking_date,
            start_time,
            end_time,
            duration: draft.duration_hours,
            total_price: draft.total_price,
            notes: draft.notes.clone().unwrap_or_default(),
        };
        let created = match self.api.create_booking(&request).await {
            Ok(created) => created,
            Err(err) => {
                warn!(
                    error = %err,
                    field_id = %field.id,
                    customer_id = %customer_id,
                    "booking flow: booking creation failed"
                );
                let failure = if err.is_conflict() {
                    BookingFlowError::Conflict {
                        message: SLOT_TAKEN.to_string(),
                    }
                } else {
                    BookingFlowError::remote(err.server_message().unwrap_or(BOOKING_FAILED))
                };
                let mut state = self.inner.lock().await;
                return Err(state.fail(failure));
            }
        };

        let confirmation = BookingConfirmation {
            booking_id: created.id(),
            customer_id,
            field,
            booking_date,
            start_time,
            end_time,
            duration_hours: draft.duration_hours,
            total_price: draft.total_price,
            customer_name: draft.customer_name,
            customer_phone: draft.customer_phone,
            notes: draft.notes,
        };
        info!(
            booking_id = ?confirmation.booking_id,
            customer_id = %confirmation.customer_id,
            field_id = %confirmation.field.id,
            "booking flow: booking confirmed"
        );

        let mut state = self.inner.lock().await;
        state.draft = DraftBooking::default();
        state.step = WizardStep::Confirmed {
            confirmation: confirmation.clone(),
        };
        Ok(confirmation)
    }

    /// Starts over. The loaded catalog is kept.
    pub async fn reset(&self) -> Result<(), BookingFlowError> {
        self.ensure_idle()?;
        let mut state = self.inner.lock().await;
        state.step = WizardStep::SelectField;
        state.draft = DraftBooking::default();
        state.last_error = None;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
