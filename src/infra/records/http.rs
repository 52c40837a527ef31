//! HTTP record source.
//!
//! Fetches the ownership list with a single GET. The endpoint URL may carry
//! credentials in its query string, so it is held as a secret and only the
//! host is ever logged.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, error, instrument};

use crate::domain::{
    AppError, ExternalServiceError, FetchedRecord, OwnershipRecord, RecordSource, url_host,
};

/// Record source reading a JSON array from an HTTP endpoint
pub struct HttpRecordSource {
    http_client: Client,
    url: SecretString,
}

impl HttpRecordSource {
    pub fn new(url: SecretString, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ExternalService(ExternalServiceError::Network(e.to_string())))?;
        Ok(Self { http_client, url })
    }

    /// Host part of the source URL, safe to log
    #[must_use]
    pub fn display_host(&self) -> String {
        url_host(self.url.expose_secret())
    }
}

/// Split a response body into per-entry decode results.
///
/// A body that is not a JSON array fails as a whole.
pub fn parse_record_list(body: &[u8]) -> Result<Vec<FetchedRecord>, AppError> {
    let entries: Vec<serde_json::Value> = serde_json::from_slice(body)
        .map_err(|e| AppError::ExternalService(ExternalServiceError::ParseError(e.to_string())))?;
    Ok(entries.into_iter().map(OwnershipRecord::from_value).collect())
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    #[instrument(skip(self), fields(host = %self.display_host()))]
    async fn fetch_records(&self) -> Result<Vec<FetchedRecord>, AppError> {
        let response = self
            .http_client
            .get(self.url.expose_secret())
            .send()
            .await
            .map_err(|e| {
                let err = ExternalServiceError::from_reqwest(e);
                error!(error = %err, "Record source request failed");
                AppError::ExternalService(err)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Record source returned error");
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AppError::ExternalService(ExternalServiceError::from_reqwest(e)))?;
        let records = parse_record_list(&body)?;

        debug!(count = records.len(), "Record list fetched");
        Ok(records)
    }
}
