//! HTTP identity service client.
//!
//! POSTs JSON to the Faith Connect REST API. Service-level refusals come
//! back as 4xx responses with a JSON body (`{"success": false,
//! "message": "Invalid OTP"}`); those are decoded like any other response so
//! the flow can show the message. Everything else is a transport error.

use crate::config::IdentityServiceConfig;
use crate::error::{OtpError, Result};
use crate::providers::identity::{
    IdentityService, ResendCodeRequest, ResendCodeResponse, SendCodeRequest, SendCodeResponse,
    VerifyCodeRequest, VerifyCodeResponse,
};
use crate::utils::mask_contact;
use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

/// Identity service reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpIdentityService {
    client: Client,
    send_url: Url,
    verify_url: Url,
    resend_url: Url,
}

impl HttpIdentityService {
    /// Build a client for the configured API.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Transport`] if an endpoint URL is malformed or the
    /// HTTP client cannot be created.
    pub fn new(config: &IdentityServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            send_url: endpoint(&config.base_url, &config.send_path)?,
            verify_url: endpoint(&config.base_url, &config.verify_path)?,
            resend_url: endpoint(&config.base_url, &config.resend_path)?,
        })
    }

    async fn post<Req, Resp>(&self, url: &Url, body: &Req) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| transport(format!("Request to {} failed: {e}", url.path())))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport(format!("Failed to read response body: {e}")))?;

        // Only a 4xx with a JSON verdict counts as an answer.
        if !status.is_success() {
            let answered = status.is_client_error()
                && serde_json::from_slice::<serde_json::Value>(&bytes).is_ok_and(|value| {
                    value.get("success").is_some() || value.get("message").is_some()
                });
            if !answered {
                return Err(transport(format!("{} returned HTTP {status}", url.path())));
            }
            tracing::debug!(status = status.as_u16(), path = url.path(), "Service refused request");
        }

        serde_json::from_slice(&bytes)
            .map_err(|e| transport(format!("Malformed response from {}: {e}", url.path())))
    }
}

impl IdentityService for HttpIdentityService {
    async fn send_code(&self, request: SendCodeRequest) -> Result<SendCodeResponse> {
        tracing::debug!(
            contact = %mask_contact(&request.contact, request.method),
            method = %request.method,
            "Requesting OTP"
        );
        self.post(&self.send_url, &request).await
    }

    async fn verify_code(&self, request: VerifyCodeRequest) -> Result<VerifyCodeResponse> {
        tracing::debug!(
            contact = %mask_contact(&request.contact, request.method),
            has_user_id = request.user_id.is_some(),
            "Verifying OTP"
        );
        self.post(&self.verify_url, &request).await
    }

    async fn resend_code(&self, request: ResendCodeRequest) -> Result<ResendCodeResponse> {
        tracing::debug!(
            contact = %mask_contact(&request.identifier, request.auth_method),
            "Re-requesting OTP"
        );
        self.post(&self.resend_url, &request).await
    }
}

fn endpoint(base_url: &str, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|e| transport(format!("Invalid endpoint URL {joined}: {e}")))
}

fn transport(message: String) -> OtpError {
    OtpError::Transport { message }
}
