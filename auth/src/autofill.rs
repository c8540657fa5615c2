//! Out-of-band code sources.
//!
//! A platform may be able to read the code without the user typing it: an
//! SMS-retriever API, a one-time-code credential prompt, or an `otp`
//! parameter on the link the user followed. Each of those is an
//! [`AutofillSource`]. Sources that are not available on the current
//! platform are skipped without error.

use std::future::Future;
use tokio::sync::mpsc;
use url::Url;

/// Query parameter carrying a code on a sign-in link.
pub const OTP_QUERY_PARAM: &str = "otp";

/// Something that can deliver codes without user input.
pub trait AutofillSource: Send + 'static {
    /// Whether the source works on this platform.
    fn is_available(&self) -> bool;

    /// Wait for the next code. `None` means the source is exhausted.
    fn next_code(&mut self) -> impl Future<Output = Option<String>> + Send;
}

/// Code carried in the `otp` query parameter of a sign-in link.
///
/// Yields the code once.
#[derive(Debug, Clone, Default)]
pub struct QueryStringAutofill {
    code: Option<String>,
}

impl QueryStringAutofill {
    /// Extract the code from a link.
    ///
    /// A malformed URL or a missing/empty parameter yields an unavailable
    /// source.
    #[must_use]
    pub fn from_url(link: &str) -> Self {
        let code = Url::parse(link).ok().and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key == OTP_QUERY_PARAM)
                .map(|(_, value)| value.trim().to_string())
                .filter(|value| !value.is_empty())
        });
        Self { code }
    }
}

impl AutofillSource for QueryStringAutofill {
    fn is_available(&self) -> bool {
        self.code.is_some()
    }

    async fn next_code(&mut self) -> Option<String> {
        self.code.take()
    }
}

/// Codes pushed by platform glue through a channel.
#[derive(Debug)]
pub struct ChannelAutofill {
    receiver: mpsc::Receiver<String>,
}

impl ChannelAutofill {
    /// Create a source and the sender that feeds it.
    #[must_use]
    pub fn new() -> (mpsc::Sender<String>, Self) {
        let (sender, receiver) = mpsc::channel(4);
        (sender, Self { receiver })
    }
}

impl AutofillSource for ChannelAutofill {
    fn is_available(&self) -> bool {
        true
    }

    async fn next_code(&mut self) -> Option<String> {
        self.receiver.recv().await
    }
}
