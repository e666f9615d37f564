use async_trait::async_trait;

use super::{CaptchaProvider, ProviderConfig, with_proxy_fields};
use crate::tasks::core::{CaptchaError, TaskDescriptor, TaskOrchestrator};
use crate::tasks::payloads::{CaptchaTask, ProxyInfo};

const ANTICAPTCHA_BASE_URL: &str = "https://api.anti-captcha.com";

/// Adapter for the AntiCaptcha service.
///
/// Supports every captcha variant. Token variants switch to their proxied
/// task type when the payload carries a proxy.
#[derive(Debug, Clone)]
pub struct AntiCaptcha {
    orchestrator: TaskOrchestrator,
}

impl AntiCaptcha {
    pub fn new(api_key: impl Into<String>) -> Result<Self, CaptchaError> {
        Self::with_config(api_key, ProviderConfig::default())
    }

    pub fn with_config(
        api_key: impl Into<String>,
        config: ProviderConfig,
    ) -> Result<Self, CaptchaError> {
        let orchestrator =
            config.into_orchestrator("anticaptcha", ANTICAPTCHA_BASE_URL, api_key.into())?;
        Ok(Self { orchestrator })
    }
}

/// Picks `<base>Task` with proxy fields or `<base>TaskProxyless`.
fn token_task(base: &str, proxy: Option<&ProxyInfo>) -> TaskDescriptor {
    match proxy {
        Some(proxy) => with_proxy_fields(TaskDescriptor::new(format!("{base}Task")), proxy),
        None => TaskDescriptor::new(format!("{base}TaskProxyless")),
    }
}

#[async_trait]
impl CaptchaProvider for AntiCaptcha {
    fn name(&self) -> &'static str {
        "anticaptcha"
    }

    fn orchestrator(&self) -> &TaskOrchestrator {
        &self.orchestrator
    }

    fn describe(&self, task: &CaptchaTask) -> Result<TaskDescriptor, CaptchaError> {
        let descriptor = match task {
            CaptchaTask::Image(payload) => TaskDescriptor::new("ImageToTextTask")
                .with("body", payload.encoded_image())
                .with("case", payload.case_sensitive)
                .with("numeric", u8::from(payload.numeric))
                .with_opt("minLength", payload.min_length)
                .with_opt("maxLength", payload.max_length)
                .with_opt("comment", payload.comment.as_deref()),
            CaptchaTask::RecaptchaV2(payload) => token_task("RecaptchaV2", payload.proxy.as_ref())
                .with("websiteURL", payload.page_url.as_str())
                .with("websiteKey", payload.site_key.as_str())
                .with("isInvisible", payload.invisible)
                .with_opt("recaptchaDataSValue", payload.data_s.as_deref())
                .with_opt("userAgent", payload.user_agent.as_deref()),
            // v3 is always solved on the service's own workers
            CaptchaTask::RecaptchaV3(payload) => TaskDescriptor::new("RecaptchaV3TaskProxyless")
                .with("websiteURL", payload.page_url.as_str())
                .with("websiteKey", payload.site_key.as_str())
                .with("minScore", round_score(payload.min_score))
                .with_opt("pageAction", payload.page_action.as_deref()),
            CaptchaTask::HCaptcha(payload) => token_task("HCaptcha", payload.proxy.as_ref())
                .with("websiteURL", payload.page_url.as_str())
                .with("websiteKey", payload.site_key.as_str())
                .with("isInvisible", payload.invisible)
                .with_opt("userAgent", payload.user_agent.as_deref()),
            CaptchaTask::Turnstile(payload) => token_task("Turnstile", payload.proxy.as_ref())
                .with("websiteURL", payload.page_url.as_str())
                .with("websiteKey", payload.site_key.as_str())
                .with_opt("action", payload.action.as_deref())
                .with_opt("turnstileCData", payload.cdata.as_deref()),
            CaptchaTask::FunCaptcha(payload) => token_task("FunCaptcha", payload.proxy.as_ref())
                .with("websiteURL", payload.page_url.as_str())
                .with("websitePublicKey", payload.public_key.as_str())
                .with_opt("funcaptchaApiJSSubdomain", payload.subdomain.as_deref())
                .with_opt("data", payload.data.as_deref()),
        };
        Ok(descriptor)
    }
}

fn round_score(score: f32) -> f64 {
    (f64::from(score) * 100.0).round() / 100.0
}
