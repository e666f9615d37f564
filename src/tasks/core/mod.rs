//! Core utilities shared by the transport, the orchestrator, and providers.

pub mod error;
pub mod orchestrator;
pub mod reqwest_client;
pub mod timing;
pub mod transport;
pub mod types;

pub use error::{CaptchaError, CaptchaResult, TaskHttpClientError};
pub use orchestrator::TaskOrchestrator;
pub use reqwest_client::ReqwestTaskHttpClient;
pub use timing::{Settings, sleep_with_cancel};
pub use transport::{TaskApi, TaskHttpClient};
pub use types::{CaptchaSolution, TaskDescriptor, TaskHandle, TaskStatus};
