//! OTP console binary
//!
//! Walks through the sign-in flow against a running identity service.
//!
//! ```text
//! FAITH_CONNECT_API_URL=http://localhost:8000/api cargo run -p otp-console
//! cargo run -p otp-console -- "https://faithconnect.app/verify?otp=482913"
//! ```
//!
//! At the code prompt, type the code, `resend`, or `cancel`.

use anyhow::Context;
use faith_connect_auth::{
    ContactMethod, HttpIdentityService, IdentityServiceConfig, InMemoryChallengeStore,
    InMemorySessionStore, OtpAction, OtpConfig, OtpEnvironment, OtpError, OtpFlowController,
    QueryStringAutofill, Settlement, VerifyOutcome,
};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type Controller = OtpFlowController<HttpIdentityService, InMemoryChallengeStore, InMemorySessionStore>;

async fn prompt(lines: &mut Lines<BufReader<Stdin>>, label: &str) -> anyhow::Result<String> {
    println!("{label}");
    let line = lines
        .next_line()
        .await
        .context("Failed to read stdin")?
        .context("stdin closed")?;
    Ok(line.trim().to_string())
}

async fn choose_method(lines: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<ContactMethod> {
    loop {
        match prompt(lines, "Sign in with [email] or [phone]?").await?.as_str() {
            "email" | "e" => return Ok(ContactMethod::Email),
            "phone" | "p" => return Ok(ContactMethod::Phone),
            other => println!("Unknown method: {other}"),
        }
    }
}

/// Prompt until a code is sent.
async fn send_code(
    controller: &Controller,
    lines: &mut Lines<BufReader<Stdin>>,
    method: ContactMethod,
) -> anyhow::Result<()> {
    loop {
        let contact = prompt(lines, &format!("Enter your {method}:")).await?;
        match controller.start_challenge(&contact, method).await {
            Ok(challenge) => {
                println!("Code sent to {}", challenge.masked_contact());
                return Ok(());
            },
            Err(error) => println!("{}", error.user_message()),
        }
    }
}

async fn enter_code(
    controller: &Controller,
    lines: &mut Lines<BufReader<Stdin>>,
) -> anyhow::Result<Option<VerifyOutcome>> {
    loop {
        let input = prompt(lines, "Enter code (or `resend` / `cancel`):").await?;
        match input.as_str() {
            "cancel" => {
                controller.cancel().await?;
                return Ok(None);
            },
            "resend" => match controller.resend().await {
                Ok(_) => println!("Code re-sent"),
                Err(OtpError::ResendCooldown { remaining_seconds }) => {
                    println!("Resend available in {remaining_seconds}s");
                },
                Err(error) => println!("{}", error.user_message()),
            },
            code => match controller.submit_code(code).await {
                Ok(VerifyOutcome::Rejected { message }) => println!("{message}"),
                Ok(outcome) => return Ok(Some(outcome)),
                Err(error) => println!("{}", error.user_message()),
            },
        }
    }
}

/// Submit the code carried by a sign-in link, if any.
///
/// Returns `None` when the link has no code or the code was rejected.
async fn autofill_from_link(
    controller: &Controller,
    link: &str,
) -> anyhow::Result<Option<VerifyOutcome>> {
    let mut actions = controller.subscribe();
    let Some(task) = controller.attach_autofill(QueryStringAutofill::from_url(link)) else {
        return Ok(None);
    };
    println!("Submitting code from link...");
    task.await?;

    let settled = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match actions.recv().await {
                Ok(OtpAction::Settled { result, .. }) => return result,
                Ok(_) => {},
                Err(error) => return Err(OtpError::Runtime(error.to_string())),
            }
        }
    })
    .await;
    let Ok(settled) = settled else {
        println!("The link did not carry a usable code");
        return Ok(None);
    };

    match settled {
        Ok(Settlement::Verified(VerifyOutcome::Rejected { message })) => {
            println!("{message}");
            Ok(None)
        },
        Ok(Settlement::Verified(outcome)) => Ok(Some(outcome)),
        Ok(Settlement::Challenge(_)) => Ok(None),
        Err(error) => {
            println!("{}", error.user_message());
            Ok(None)
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "otp_console=info,faith_connect_auth=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let identity_config = IdentityServiceConfig::from_env();
    tracing::info!(base_url = %identity_config.base_url, "Using identity service");

    let identity = HttpIdentityService::new(&identity_config)?;
    let env = OtpEnvironment::new(
        identity,
        InMemoryChallengeStore::new(),
        InMemorySessionStore::new(),
    );
    let controller = OtpFlowController::new(OtpConfig::default(), env);

    println!("=== Faith Connect Sign-in ===\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let method = choose_method(&mut lines).await?;
    send_code(&controller, &mut lines, method).await?;

    let mut outcome = None;
    if let Some(link) = std::env::args().nth(1) {
        outcome = autofill_from_link(&controller, &link).await?;
    }
    if outcome.is_none() {
        outcome = enter_code(&controller, &mut lines).await?;
    }

    match outcome {
        Some(VerifyOutcome::ExistingUserLogin { user }) => {
            println!("Welcome back! Continue at {}", user.landing_route());
        },
        Some(VerifyOutcome::NewAccount { handoff }) => {
            println!(
                "Verified {}. Create your account at {}",
                handoff.contact,
                handoff.landing_route()
            );
        },
        Some(VerifyOutcome::Rejected { .. }) | None => println!("Sign-in cancelled"),
    }

    controller.shutdown(Duration::from_secs(5)).await?;
    Ok(())
}
