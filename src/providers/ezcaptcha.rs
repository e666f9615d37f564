use async_trait::async_trait;

use super::{CaptchaProvider, ProviderConfig};
use crate::tasks::core::{CaptchaError, TaskDescriptor, TaskOrchestrator};
use crate::tasks::payloads::CaptchaTask;

const EZCAPTCHA_BASE_URL: &str = "https://api.ez-captcha.com";

/// Adapter for the EzCaptcha service.
///
/// Only proxyless FunCaptcha is wired up. Every other variant, and FunCaptcha
/// payloads carrying a proxy, API subdomain, or data blob, report
/// [`CaptchaError::NotImplemented`] without touching the network.
#[derive(Debug, Clone)]
pub struct EzCaptcha {
    orchestrator: TaskOrchestrator,
}

impl EzCaptcha {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CaptchaError> {
        Self::with_config(api_key, ProviderConfig::default())
    }

    pub fn with_config(
        api_key: impl Into<String>,
        config: ProviderConfig,
    ) -> Result<Self, CaptchaError> {
        let orchestrator =
            config.into_orchestrator("ezcaptcha", EZCAPTCHA_BASE_URL, api_key.into())?;
        Ok(Self { orchestrator })
    }
}

#[async_trait]
impl CaptchaProvider for EzCaptcha {
    fn name(&self) -> &'static str {
        "ezcaptcha"
    }

    fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    fn describe(&self, task: &CaptchaTask) -> Result<TaskDescriptor, CaptchaError> {
        match task {
            CaptchaTask::FunCaptcha(payload) => {
                // only the proxyless task with key and page is accepted upstream
                let unsupported = if payload.proxy.is_some() {
                    Some("solve_funcaptcha (proxy)")
                } else if payload.subdomain.is_some() {
                    Some("solve_funcaptcha (api subdomain)")
                } else if payload.data.is_some() {
                    Some("solve_funcaptcha (data blob)")
                } else {
                    None
                };
                if let Some(operation) = unsupported {
                    return Err(CaptchaError::not_implemented(self.name(), operation));
                }

                Ok(TaskDescriptor::new("FuncaptchaTaskProxyless")
                    .with("websiteKey", payload.public_key.as_str())
                    .with("websiteURL", payload.page_url.as_str()))
            }
            other => Err(CaptchaError::not_implemented(
                self.name(),
                other.kind().operation(),
            )),
        }
    }
}
