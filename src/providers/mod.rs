//! Captcha provider integrations.
//!
//! Every provider exposes the same per-variant operations through
//! [`CaptchaProvider`]. Providers only decide how a [`CaptchaTask`] is
//! flattened into a [`TaskDescriptor`]; submission, polling, and cancellation
//! are handled by the shared [`TaskOrchestrator`].

mod anticaptcha;
mod ezcaptcha;

pub use anticaptcha::AntiCaptcha;
pub use ezcaptcha::EzCaptcha;

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::modules::events::{EventDispatcher, EventHandler};
use crate::tasks::core::{
    CaptchaError, CaptchaResult, Settings, TaskApi, TaskDescriptor, TaskHandle, TaskOrchestrator,
};
use crate::tasks::payloads::{
    CaptchaTask, FunCaptchaPayload, HCaptchaPayload, ImageCaptchaPayload, ProxyInfo,
    RecaptchaV2Payload, RecaptchaV3Payload, TurnstilePayload,
};

/// Provider-level configuration applied when the client is constructed.
///
/// The default registers [`LoggingHandler`](crate::modules::LoggingHandler), which
/// logs failures at trace level only. Use [`ProviderConfig::without_events`] to
/// silence it completely.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: Option<String>,
    pub events: EventDispatcher,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            events: EventDispatcher::with_logging(),
        }
    }
}

impl ProviderConfig {
    /// Point the provider at a different deployment, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.events.register_handler(handler);
        self
    }

    /// Drop every handler, including the default logging one.
    pub fn without_events(mut self) -> Self {
        self.events = EventDispatcher::new();
        self
    }

    pub(crate) fn into_orchestrator(
        self,
        provider: &'static str,
        default_base_url: &str,
        api_key: String,
    ) -> Result<TaskOrchestrator, CaptchaError> {
        let base_url = self.base_url.as_deref().unwrap_or(default_base_url);
        let api = TaskApi::new(base_url, api_key)?;
        Ok(TaskOrchestrator::new(provider, api).with_events(self.events))
    }
}

/// Shared interface implemented by captcha vendors.
///
/// Only [`name`](Self::name), [`orchestrator`](Self::orchestrator), and
/// [`describe`](Self::describe) are required; the per-variant operations all
/// funnel into [`solve`](Self::solve).
#[async_trait]
pub trait CaptchaProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn orchestrator(&self) -> &TaskOrchestrator;

    /// Flattens `task` into the wire descriptor this vendor expects.
    ///
    /// Variants the vendor does not support return
    /// [`CaptchaError::NotImplemented`].
    fn describe(&self, task: &CaptchaTask) -> Result<TaskDescriptor, CaptchaError>;

    async fn solve(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        task: CaptchaTask,
    ) -> CaptchaResult {
        let descriptor = self.describe(&task)?;
        task.validate()?;
        self.orchestrator()
            .solve(cancel, settings, &descriptor)
            .await
    }

    async fn solve_image_captcha(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        payload: ImageCaptchaPayload,
    ) -> CaptchaResult {
        self.solve(cancel, settings, payload.into()).await
    }

    async fn solve_recaptcha_v2(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        payload: RecaptchaV2Payload,
    ) -> CaptchaResult {
        self.solve(cancel, settings, payload.into()).await
    }

    async fn solve_recaptcha_v3(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        payload: RecaptchaV3Payload,
    ) -> CaptchaResult {
        self.solve(cancel, settings, payload.into()).await
    }

    async fn solve_hcaptcha(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        payload: HCaptchaPayload,
    ) -> CaptchaResult {
        self.solve(cancel, settings, payload.into()).await
    }

    async fn solve_turnstile(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        payload: TurnstilePayload,
    ) -> CaptchaResult {
        self.solve(cancel, settings, payload.into()).await
    }

    async fn solve_funcaptcha(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        payload: FunCaptchaPayload,
    ) -> CaptchaResult {
        self.solve(cancel, settings, payload.into()).await
    }

    /// Tell the service a solution was accepted by the target site.
    async fn report_correct(
        &self,
        _cancel: &CancellationToken,
        _settings: &Settings,
        _task_id: &TaskHandle,
    ) -> Result<(), CaptchaError> {
        Err(CaptchaError::not_implemented(self.name(), "report_correct"))
    }

    /// Tell the service a solution was rejected by the target site.
    async fn report_incorrect(
        &self,
        _cancel: &CancellationToken,
        _settings: &Settings,
        _task_id: &TaskHandle,
    ) -> Result<(), CaptchaError> {
        Err(CaptchaError::not_implemented(self.name(), "report_incorrect"))
    }
}

/// Appends the proxy fields used by createTask-style services.
pub(crate) fn with_proxy_fields(descriptor: TaskDescriptor, proxy: &ProxyInfo) -> TaskDescriptor {
    descriptor
        .with("proxyType", proxy.kind.as_str())
        .with("proxyAddress", proxy.address.as_str())
        .with("proxyPort", proxy.port)
        .with_opt("proxyLogin", proxy.login.as_deref())
        .with_opt("proxyPassword", proxy.password.as_deref())
}
