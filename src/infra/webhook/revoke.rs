//! Role-removal webhook client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info, instrument};

use crate::domain::{AppError, ExternalServiceError, RoleRevoker};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RevokeRequest<'a> {
    user_id: &'a str,
}

/// Posts `{"userId": ...}` to the bot's role-removal endpoint
pub struct WebhookRoleRevoker {
    http_client: Client,
    url: String,
}

impl WebhookRoleRevoker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::ExternalService(ExternalServiceError::Network(e.to_string())))?;
        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RoleRevoker for WebhookRoleRevoker {
    #[instrument(skip(self))]
    async fn revoke_role(&self, user_id: &str) -> Result<(), AppError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&RevokeRequest { user_id })
            .send()
            .await
            .map_err(|e| {
                let err = ExternalServiceError::from_reqwest(e);
                error!(error = %err, "Revoke webhook request failed");
                AppError::ExternalService(err)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Revoke webhook returned error");
            return Err(AppError::ExternalService(ExternalServiceError::ApiError {
                status_code: status.as_u16(),
                message: body,
            }));
        }

        info!("removeRole request sent");
        Ok(())
    }
}
