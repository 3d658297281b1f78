use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::Field,
    error::{ApiErrorBody, ServiceRejection},
    protocol::{
        ApiResponse, CreateBookingRequest, CreatedBooking, CustomerResolution,
        FindOrCreateCustomerRequest, SearchAvailableQuery,
    },
};
use thiserror::Error;
use tracing::debug;

use crate::config::{normalize_base_url, ClientSettings};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiCallError {
    #[error("booking service unreachable: {0}")]
    Transport(String),
    #[error(
        "booking service rejected the request ({status}): {}",
        .message.as_deref().unwrap_or("no message")
    )]
    Rejected {
        status: u16,
        message: Option<String>,
        conflict: bool,
    },
}

impl ApiCallError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiCallError::Rejected { conflict: true, .. })
    }

    /// The message the service put in its response body, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiCallError::Rejected { message, .. } => message.as_deref(),
            ApiCallError::Transport(_) => None,
        }
    }

    fn rejected(status: StatusCode, rejection: ServiceRejection) -> Self {
        ApiCallError::Rejected {
            status: status.as_u16(),
            message: rejection.message,
            conflict: rejection.conflict || status == StatusCode::CONFLICT,
        }
    }
}

impl From<reqwest::Error> for ApiCallError {
    fn from(value: reqwest::Error) -> Self {
        ApiCallError::Transport(value.to_string())
    }
}

/// The remote booking service, as consumed by the booking flow.
#[async_trait]
pub trait BookingApi: Send + Sync {
    async fn list_fields(&self) -> Result<Vec<Field>, ApiCallError>;
    async fn search_available(
        &self,
        query: &SearchAvailableQuery,
    ) -> Result<Vec<Field>, ApiCallError>;
    async fn find_or_create_customer(
        &self,
        request: &FindOrCreateCustomerRequest,
    ) -> Result<CustomerResolution, ApiCallError>;
    async fn create_booking(
        &self,
        request: &CreateBookingRequest,
    ) -> Result<CreatedBooking, ApiCallError>;
}

pub struct HttpBookingApi {
    http: Client,
    base_url: String,
}

impl HttpBookingApi {
    pub fn new(settings: &ClientSettings) -> anyhow::Result<Self> {
        let base_url = normalize_base_url(&settings.api_base_url)?;
        if settings.request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .context("failed to build http client")?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn read_success_body(response: Response) -> Result<(StatusCode, Vec<u8>), ApiCallError> {
        let status = response.status();
        let body = response.bytes().await?;
        if status.is_success() {
            return Ok((status, body.to_vec()));
        }

        let error_body: ApiErrorBody = serde_json::from_slice(&body).unwrap_or_default();
        Err(ApiCallError::rejected(status, error_body.into()))
    }

    fn parse<T: DeserializeOwned>(
        status: StatusCode,
        body: &[u8],
    ) -> Result<ApiResponse<T>, ApiCallError> {
        serde_json::from_slice(body).map_err(|e| {
            ApiCallError::Transport(format!("malformed response from booking service ({status}): {e}"))
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiCallError> {
        let (status, body) = Self::read_success_body(response).await?;
        Self::parse::<T>(status, &body)?
            .into_result()
            .map_err(|rejection| ApiCallError::rejected(status, rejection))
    }
}

#[async_trait]
impl BookingApi for HttpBookingApi {
    async fn list_fields(&self) -> Result<Vec<Field>, ApiCallError> {
        debug!(base_url = %self.base_url, "booking api: GET /fields");
        let response = self
            .http
            .get(format!("{}/fields", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn search_available(
        &self,
        query: &SearchAvailableQuery,
    ) -> Result<Vec<Field>, ApiCallError> {
        debug!(
            date = %query.date,
            start_time = %query.start_time,
            end_time = %query.end_time,
            "booking api: GET /fields/search-available"
        );
        let response = self
            .http
            .get(format!("{}/fields/search-available", self.base_url))
            .query(query)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn find_or_create_customer(
        &self,
        request: &FindOrCreateCustomerRequest,
    ) -> Result<CustomerResolution, ApiCallError> {
        debug!("booking api: POST /customers/find-or-create");
        let response = self
            .http
            .post(format!("{}/customers/find-or-create", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn create_booking(
        &self,
        request: &CreateBookingRequest,
    ) -> Result<CreatedBooking, ApiCallError> {
        debug!(
            field_id = %request.field_id,
            customer_id = %request.user_id,
            booking_date = %request.booking_date,
            "booking api: POST /bookings"
        );
        let response = self
            .http
            .post(format!("{}/bookings", self.base_url))
            .json(request)
            .send()
            .await?;
        let (status, body) = Self::read_success_body(response).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(CreatedBooking::default());
        }
        Self::parse::<CreatedBooking>(status, &body)?
            .into_result_or_default()
            .map_err(|rejection| ApiCallError::rejected(status, rejection))
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
