//! Mock identity service for testing.

use crate::error::Result;
use crate::providers::{
    IdentityService, ResendCodeRequest, ResendCodeResponse, SendCodeRequest, SendCodeResponse,
    VerifyCodeRequest, VerifyCodeResponse,
};
use crate::state::{SessionTokens, UserId, UserRecord};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Default)]
struct Script {
    send: VecDeque<Result<SendCodeResponse>>,
    verify: VecDeque<Result<VerifyCodeResponse>>,
    resend: VecDeque<Result<ResendCodeResponse>>,
    send_requests: Vec<SendCodeRequest>,
    verify_requests: Vec<VerifyCodeRequest>,
    resend_requests: Vec<ResendCodeRequest>,
    verify_gate: Option<Arc<Semaphore>>,
}

/// Mock identity service.
///
/// Answers from per-endpoint queues of scripted responses and records every
/// request. With an empty queue, send and resend succeed and verify rejects.
///
/// Verification can be held open with [`MockIdentityService::hold_verifications`]
/// to exercise the in-flight window.
///
/// **WARNING**: Do NOT use in production. This is for testing only!
#[derive(Debug, Clone, Default)]
pub struct MockIdentityService {
    script: Arc<Mutex<Script>>,
}

impl MockIdentityService {
    /// Create a new mock identity service.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a send answer.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn with_send(self, response: Result<SendCodeResponse>) -> Self {
        self.script.lock().unwrap().send.push_back(response);
        self
    }

    /// Queue a verify answer.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn with_verify(self, response: Result<VerifyCodeResponse>) -> Self {
        self.script.lock().unwrap().verify.push_back(response);
        self
    }

    /// Queue a resend answer.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn with_resend(self, response: Result<ResendCodeResponse>) -> Self {
        self.script.lock().unwrap().resend.push_back(response);
        self
    }

    /// Block verify calls until [`MockIdentityService::release_verifications`].
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn hold_verifications(&self) {
        self.script.lock().unwrap().verify_gate = Some(Arc::new(Semaphore::new(0)));
    }

    /// Let `count` held verify calls complete.
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn release_verifications(&self, count: usize) {
        if let Some(gate) = self.script.lock().unwrap().verify_gate.as_ref() {
            gate.add_permits(count);
        }
    }

    /// Recorded send requests.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn send_requests(&self) -> Vec<SendCodeRequest> {
        self.script.lock().unwrap().send_requests.clone()
    }

    /// Recorded verify requests.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn verify_requests(&self) -> Vec<VerifyCodeRequest> {
        self.script.lock().unwrap().verify_requests.clone()
    }

    /// Recorded resend requests.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn resend_requests(&self) -> Vec<ResendCodeRequest> {
        self.script.lock().unwrap().resend_requests.clone()
    }

    /// Wait until at least `count` verify requests have arrived.
    pub async fn wait_for_verify_requests(&self, count: usize) {
        while self.verify_requests().len() < count {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// Successful send answer.
    #[must_use]
    pub fn sent(user_id: Option<&str>, requires_profile_completion: bool) -> SendCodeResponse {
        SendCodeResponse {
            success: true,
            user_id: user_id.map(UserId::new),
            requires_profile_completion: Some(requires_profile_completion),
            message: Some("OTP sent".to_string()),
            otp: None,
        }
    }

    /// Existing-user login answer.
    #[must_use]
    pub fn logged_in(user: UserRecord) -> VerifyCodeResponse {
        VerifyCodeResponse {
            success: true,
            requires_profile_completion: Some(false),
            is_new_user: Some(false),
            user_id: Some(user.id.clone()),
            user: Some(user),
            tokens: Some(SessionTokens {
                access: "access-token".to_string(),
                refresh: Some("refresh-token".to_string()),
            }),
            message: None,
        }
    }

    /// New-account answer.
    #[must_use]
    pub fn new_account(user_id: Option<&str>) -> VerifyCodeResponse {
        VerifyCodeResponse {
            success: true,
            requires_profile_completion: Some(true),
            is_new_user: Some(true),
            user_id: user_id.map(UserId::new),
            ..VerifyCodeResponse::default()
        }
    }

    /// Rejection answer.
    #[must_use]
    pub fn rejected(message: Option<&str>) -> VerifyCodeResponse {
        VerifyCodeResponse {
            success: false,
            message: message.map(str::to_string),
            ..VerifyCodeResponse::default()
        }
    }
}

impl IdentityService for MockIdentityService {
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn send_code(&self, request: SendCodeRequest) -> Result<SendCodeResponse> {
        let mut script = self.script.lock().unwrap();
        script.send_requests.push(request);
        script
            .send
            .pop_front()
            .unwrap_or_else(|| Ok(Self::sent(None, false)))
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn verify_code(&self, request: VerifyCodeRequest) -> Result<VerifyCodeResponse> {
        let gate = {
            let mut script = self.script.lock().unwrap();
            script.verify_requests.push(request);
            script.verify_gate.clone()
        };

        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        self.script
            .lock()
            .unwrap()
            .verify
            .pop_front()
            .unwrap_or_else(|| Ok(Self::rejected(None)))
    }

    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    async fn resend_code(&self, request: ResendCodeRequest) -> Result<ResendCodeResponse> {
        let mut script = self.script.lock().unwrap();
        script.resend_requests.push(request);
        script.resend.pop_front().unwrap_or_else(|| {
            Ok(ResendCodeResponse {
                success: true,
                user_id: None,
                message: None,
            })
        })
    }
}
