//! # captcha-tasks
//!
//! An async client for "solve-by-polling" captcha services that speak the
//! `createTask` / `getTaskResult` protocol.
//!
//! A provider turns a typed captcha payload into a task descriptor, and a
//! shared orchestrator submits it, waits, and polls for the answer under a
//! caller-supplied [`Settings`] policy while honoring a
//! [`CancellationToken`](tokio_util::sync::CancellationToken).
//!
//! ## Features
//!
//! - Image, reCAPTCHA v2/v3, hCaptcha, Turnstile, and FunCaptcha payloads
//! - One [`CaptchaProvider`] interface for every vendor
//! - Cancellation observed during waits and in-flight requests
//! - Typed failures: remote rejection, exhaustion, cancellation, transport
//! - Pluggable HTTP transport (reqwest by default)
//!
//! ## Example
//!
//! ```no_run
//! use captcha_tasks::{CaptchaProvider, EzCaptcha, FunCaptchaPayload, Settings};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = EzCaptcha::new("your-client-key")?;
//!     let settings = Settings::reqwest()?;
//!     let payload = FunCaptchaPayload::new(
//!         "476068BF-9607-4799-B53D-966BE98E2B81",
//!         Url::parse("https://example.com/login")?,
//!     );
//!
//!     let solution = provider
//!         .solve_funcaptcha(&CancellationToken::new(), &settings, payload)
//!         .await?;
//!     println!("task {} -> {}", solution.task_id(), solution.raw());
//!     Ok(())
//! }
//! ```

pub mod modules;
pub mod providers;
pub mod tasks;

pub use crate::providers::{AntiCaptcha, CaptchaProvider, EzCaptcha, ProviderConfig};

pub use crate::tasks::core::{
    CaptchaError,
    CaptchaResult,
    CaptchaSolution,
    ReqwestTaskHttpClient,
    Settings,
    TaskApi,
    TaskDescriptor,
    TaskHandle,
    TaskHttpClient,
    TaskHttpClientError,
    TaskOrchestrator,
    TaskStatus,
};

pub use crate::tasks::payloads::{
    CaptchaKind,
    CaptchaTask,
    FunCaptchaPayload,
    HCaptchaPayload,
    ImageCaptchaPayload,
    ProxyInfo,
    ProxyKind,
    RecaptchaV2Payload,
    RecaptchaV3Payload,
    TurnstilePayload,
};

pub use crate::modules::{
    EventDispatcher,
    EventHandler,
    FailedEvent,
    LoggingHandler,
    PolledEvent,
    SolveEvent,
    SolvedEvent,
    SubmittedEvent,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
