//! Typed, per-variant captcha payloads.
//!
//! Callers build one of these and hand it to a provider. Providers flatten
//! the payload into a [`TaskDescriptor`](super::core::TaskDescriptor) only
//! when talking to the wire.
//!
//! Page URLs are held as parsed [`Url`]s and sent in their normalised form,
//! so `https://example.com` goes out as `https://example.com/`.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use percent_encoding::percent_decode_str;
use url::Url;

use super::core::CaptchaError;

/// Proxy protocol understood by solver services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyKind {
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Http => "http",
            ProxyKind::Https => "https",
            ProxyKind::Socks4 => "socks4",
            ProxyKind::Socks5 => "socks5",
        }
    }
}

/// Proxy the remote worker should use while solving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInfo {
    pub kind: ProxyKind,
    pub address: String,
    pub port: u16,
    pub login: Option<String>,
    pub password: Option<String>,
}

impl ProxyInfo {
    pub fn new(kind: ProxyKind, address: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            address: address.into(),
            port,
            login: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self.password = Some(password.into());
        self
    }

    /// Parses `scheme://[user:pass@]host:port`.
    pub fn parse(proxy: &str) -> Result<Self, CaptchaError> {
        let url = Url::parse(proxy)
            .map_err(|err| CaptchaError::InvalidPayload(format!("invalid proxy url: {err}")))?;

        let kind = match url.scheme() {
            "http" => ProxyKind::Http,
            "https" => ProxyKind::Https,
            "socks4" => ProxyKind::Socks4,
            "socks5" | "socks5h" => ProxyKind::Socks5,
            other => {
                return Err(CaptchaError::InvalidPayload(format!(
                    "unsupported proxy scheme '{other}'"
                )));
            }
        };

        let address = url
            .host_str()
            .ok_or_else(|| CaptchaError::InvalidPayload("proxy url has no host".into()))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| CaptchaError::InvalidPayload("proxy url has no port".into()))?;

        let mut info = Self::new(kind, address, port);
        if !url.username().is_empty() {
            info.login = Some(decode_credential(url.username())?);
            info.password = url.password().map(decode_credential).transpose()?;
        }
        Ok(info)
    }
}

/// `Url` keeps userinfo percent-encoded; solvers expect the literal value.
fn decode_credential(raw: &str) -> Result<String, CaptchaError> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|err| {
            CaptchaError::InvalidPayload(format!("proxy credential is not utf-8: {err}"))
        })
}

impl FromStr for ProxyInfo {
    type Err = CaptchaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Plain image-to-text captcha.
#[derive(Debug, Clone, Default)]
pub struct ImageCaptchaPayload {
    pub image: Vec<u8>,
    pub case_sensitive: bool,
    pub numeric: bool,
    pub min_length: Option<u32>,
    pub max_length: Option<u32>,
    pub comment: Option<String>,
}

impl ImageCaptchaPayload {
    pub fn new(image: impl Into<Vec<u8>>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }

    pub fn case_sensitive(mut self, enabled: bool) -> Self {
        self.case_sensitive = enabled;
        self
    }

    pub fn numeric(mut self, enabled: bool) -> Self {
        self.numeric = enabled;
        self
    }

    pub fn with_length(mut self, min: u32, max: u32) -> Self {
        self.min_length = Some(min);
        self.max_length = Some(max.max(min));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Image bytes as standard base64, the encoding solver services expect.
    pub fn encoded_image(&self) -> String {
        STANDARD.encode(&self.image)
    }
}

#[derive(Debug, Clone)]
pub struct RecaptchaV2Payload {
    pub site_key: String,
    pub page_url: Url,
    pub invisible: bool,
    pub data_s: Option<String>,
    pub user_agent: Option<String>,
    pub proxy: Option<ProxyInfo>,
}

impl RecaptchaV2Payload {
    pub fn new(site_key: impl Into<String>, page_url: Url) -> Self {
        Self {
            site_key: site_key.into(),
            page_url,
            invisible: false,
            data_s: None,
            user_agent: None,
            proxy: None,
        }
    }

    pub fn invisible(mut self, invisible: bool) -> Self {
        self.invisible = invisible;
        self
    }

    pub fn with_data_s(mut self, value: impl Into<String>) -> Self {
        self.data_s = Some(value.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyInfo) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecaptchaV3Payload {
    pub site_key: String,
    pub page_url: Url,
    pub page_action: Option<String>,
    pub min_score: f32,
}

impl RecaptchaV3Payload {
    pub fn new(site_key: impl Into<String>, page_url: Url) -> Self {
        Self {
            site_key: site_key.into(),
            page_url,
            page_action: None,
            min_score: 0.3,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.page_action = Some(action.into());
        self
    }

    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = score;
        self
    }
}

#[derive(Debug, Clone)]
pub struct HCaptchaPayload {
    pub site_key: String,
    pub page_url: Url,
    pub invisible: bool,
    pub user_agent: Option<String>,
    pub proxy: Option<ProxyInfo>,
}

impl HCaptchaPayload {
    pub fn new(site_key: impl Into<String>, page_url: Url) -> Self {
        Self {
            site_key: site_key.into(),
            page_url,
            invisible: false,
            user_agent: None,
            proxy: None,
        }
    }

    pub fn invisible(mut self, invisible: bool) -> Self {
        self.invisible = invisible;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyInfo) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

/// Cloudflare Turnstile widget.
#[derive(Debug, Clone)]
pub struct TurnstilePayload {
    pub site_key: String,
    pub page_url: Url,
    pub action: Option<String>,
    pub cdata: Option<String>,
    pub proxy: Option<ProxyInfo>,
}

impl TurnstilePayload {
    pub fn new(site_key: impl Into<String>, page_url: Url) -> Self {
        Self {
            site_key: site_key.into(),
            page_url,
            action: None,
            cdata: None,
            proxy: None,
        }
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn with_cdata(mut self, cdata: impl Into<String>) -> Self {
        self.cdata = Some(cdata.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyInfo) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

/// Arkose Labs FunCaptcha.
#[derive(Debug, Clone)]
pub struct FunCaptchaPayload {
    pub public_key: String,
    pub page_url: Url,
    pub subdomain: Option<String>,
    pub data: Option<String>,
    pub proxy: Option<ProxyInfo>,
}

impl FunCaptchaPayload {
    pub fn new(public_key: impl Into<String>, page_url: Url) -> Self {
        Self {
            public_key: public_key.into(),
            page_url,
            subdomain: None,
            data: None,
            proxy: None,
        }
    }

    /// Custom API subdomain the widget is served from.
    pub fn with_subdomain(mut self, subdomain: impl Into<String>) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    /// Extra `data[blob]` JSON some sites require.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyInfo) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

/// Discriminator for the supported captcha variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptchaKind {
    Image,
    RecaptchaV2,
    RecaptchaV3,
    HCaptcha,
    Turnstile,
    FunCaptcha,
}

impl CaptchaKind {
    /// Name of the provider operation that solves this kind.
    pub fn operation(&self) -> &'static str {
        match self {
            CaptchaKind::Image => "solve_image_captcha",
            CaptchaKind::RecaptchaV2 => "solve_recaptcha_v2",
            CaptchaKind::RecaptchaV3 => "solve_recaptcha_v3",
            CaptchaKind::HCaptcha => "solve_hcaptcha",
            CaptchaKind::Turnstile => "solve_turnstile",
            CaptchaKind::FunCaptcha => "solve_funcaptcha",
        }
    }
}

impl fmt::Display for CaptchaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CaptchaKind::Image => "image",
            CaptchaKind::RecaptchaV2 => "recaptcha-v2",
            CaptchaKind::RecaptchaV3 => "recaptcha-v3",
            CaptchaKind::HCaptcha => "hcaptcha",
            CaptchaKind::Turnstile => "turnstile",
            CaptchaKind::FunCaptcha => "funcaptcha",
        };
        f.write_str(name)
    }
}

/// One captcha challenge, tagged by variant.
#[derive(Debug, Clone)]
pub enum CaptchaTask {
    Image(ImageCaptchaPayload),
    RecaptchaV2(RecaptchaV2Payload),
    RecaptchaV3(RecaptchaV3Payload),
    HCaptcha(HCaptchaPayload),
    Turnstile(TurnstilePayload),
    FunCaptcha(FunCaptchaPayload),
}

impl CaptchaTask {
    pub fn kind(&self) -> CaptchaKind {
        match self {
            CaptchaTask::Image(_) => CaptchaKind::Image,
            CaptchaTask::RecaptchaV2(_) => CaptchaKind::RecaptchaV2,
            CaptchaTask::RecaptchaV3(_) => CaptchaKind::RecaptchaV3,
            CaptchaTask::HCaptcha(_) => CaptchaKind::HCaptcha,
            CaptchaTask::Turnstile(_) => CaptchaKind::Turnstile,
            CaptchaTask::FunCaptcha(_) => CaptchaKind::FunCaptcha,
        }
    }

    /// Checks the fields every provider relies on.
    pub fn validate(&self) -> Result<(), CaptchaError> {
        let key = match self {
            CaptchaTask::Image(payload) => {
                if payload.image.is_empty() {
                    return Err(CaptchaError::InvalidPayload("image is empty".into()));
                }
                return Ok(());
            }
            CaptchaTask::RecaptchaV2(payload) => &payload.site_key,
            CaptchaTask::RecaptchaV3(payload) => {
                if !(0.0..=1.0).contains(&payload.min_score) {
                    return Err(CaptchaError::InvalidPayload(format!(
                        "min score {} outside 0.0..=1.0",
                        payload.min_score
                    )));
                }
                &payload.site_key
            }
            CaptchaTask::HCaptcha(payload) => &payload.site_key,
            CaptchaTask::Turnstile(payload) => &payload.site_key,
            CaptchaTask::FunCaptcha(payload) => &payload.public_key,
        };

        if key.trim().is_empty() {
            return Err(CaptchaError::InvalidPayload(format!(
                "{} site key is empty",
                self.kind()
            )));
        }
        Ok(())
    }
}

impl From<ImageCaptchaPayload> for CaptchaTask {
    fn from(payload: ImageCaptchaPayload) -> Self {
        CaptchaTask::Image(payload)
    }
}

impl From<RecaptchaV2Payload> for CaptchaTask {
    fn from(payload: RecaptchaV2Payload) -> Self {
        CaptchaTask::RecaptchaV2(payload)
    }
}

impl From<RecaptchaV3Payload> for CaptchaTask {
    fn from(payload: RecaptchaV3Payload) -> Self {
        CaptchaTask::RecaptchaV3(payload)
    }
}

impl From<HCaptchaPayload> for CaptchaTask {
    fn from(payload: HCaptchaPayload) -> Self {
        CaptchaTask::HCaptcha(payload)
    }
}

impl From<TurnstilePayload> for CaptchaTask {
    fn from(payload: TurnstilePayload) -> Self {
        CaptchaTask::Turnstile(payload)
    }
}

impl From<FunCaptchaPayload> for CaptchaTask {
    fn from(payload: FunCaptchaPayload) -> Self {
        CaptchaTask::FunCaptcha(payload)
    }
}
