//! Wire-level access to createTask / getTaskResult style services.
//!
//! [`TaskHttpClient`] abstracts the single JSON POST exchange so the HTTP stack
//! can be swapped out; [`TaskApi`] layers the request/response encoding and
//! the remote error classification on top of it. Neither layer retries.

use async_trait::async_trait;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::error::{CaptchaError, TaskHttpClientError};
use super::types::{TaskDescriptor, TaskHandle, TaskStatus};

/// Contract that abstracts the HTTP transport used to talk to the solver.
///
/// Implementations must be safe to share between concurrent solve calls.
#[async_trait]
pub trait TaskHttpClient: Send + Sync {
    /// POSTs `body` as `application/json` and returns the raw response body.
    async fn post_json(&self, url: &Url, body: Vec<u8>) -> Result<Bytes, TaskHttpClientError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskRequest<'a> {
    client_key: &'a str,
    task: &'a TaskDescriptor,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateTaskResponse {
    #[serde(default)]
    error_id: i64,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    task_id: Option<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TaskResultRequest<'a> {
    client_key: &'a str,
    task_id: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResultResponse {
    #[serde(default)]
    error_id: i64,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    solution: Option<Value>,
}

/// Endpoint and credential pair for one solver account.
#[derive(Debug, Clone)]
pub struct TaskApi {
    base_url: Url,
    client_key: String,
}

impl TaskApi {
    pub fn new(base_url: &str, client_key: impl Into<String>) -> Result<Self, CaptchaError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|err| CaptchaError::Configuration(format!("invalid base url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(CaptchaError::Configuration(format!(
                "base url {base_url} cannot carry endpoint paths"
            )));
        }
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client_key = client_key.into();
        if client_key.trim().is_empty() {
            return Err(CaptchaError::Configuration("client key is empty".into()));
        }

        Ok(Self {
            base_url,
            client_key,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Submits `descriptor` and returns the handle the service assigned.
    pub async fn submit(
        &self,
        cancel: &CancellationToken,
        http: &dyn TaskHttpClient,
        descriptor: &TaskDescriptor,
    ) -> Result<TaskHandle, CaptchaError> {
        let request = CreateTaskRequest {
            client_key: &self.client_key,
            task: descriptor,
        };
        let response: CreateTaskResponse = self
            .exchange(cancel, http, "createTask", &request)
            .await?;

        check_remote(
            response.error_id,
            response.error_code,
            response.error_description,
        )?;

        match response.task_id {
            Some(Value::String(id)) if !id.is_empty() => Ok(TaskHandle::new(id)),
            Some(Value::Number(id)) => Ok(TaskHandle::new(id.to_string())),
            other => Err(CaptchaError::Decode(format!(
                "createTask response carried no usable taskId: {other:?}"
            ))),
        }
    }

    /// Fetches the current status of `handle`.
    pub async fn fetch(
        &self,
        cancel: &CancellationToken,
        http: &dyn TaskHttpClient,
        handle: &TaskHandle,
    ) -> Result<TaskStatus, CaptchaError> {
        let request = TaskResultRequest {
            client_key: &self.client_key,
            task_id: handle.as_str(),
        };
        let response: TaskResultResponse = self
            .exchange(cancel, http, "getTaskResult", &request)
            .await?;

        check_remote(
            response.error_id,
            response.error_code,
            response.error_description,
        )?;

        if response.status.as_deref() != Some("ready") {
            return Ok(TaskStatus::Pending);
        }

        match response.solution {
            Some(Value::Null) | None => Err(CaptchaError::Decode(format!(
                "task {handle} is ready but carries no solution"
            ))),
            Some(solution) => Ok(TaskStatus::Ready(solution)),
        }
    }

    async fn exchange<T, B>(
        &self,
        cancel: &CancellationToken,
        http: &dyn TaskHttpClient,
        endpoint: &str,
        body: &B,
    ) -> Result<T, CaptchaError>
    where
        T: DeserializeOwned,
        B: Serialize,
    {
        if cancel.is_cancelled() {
            return Err(CaptchaError::Cancelled);
        }

        let url = self
            .base_url
            .join(endpoint)
            .map_err(|err| CaptchaError::Configuration(err.to_string()))?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| CaptchaError::InvalidPayload(err.to_string()))?;

        let bytes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(CaptchaError::Cancelled),
            response = http.post_json(&url, payload) => response?,
        };

        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn check_remote(
    error_id: i64,
    code: Option<String>,
    description: Option<String>,
) -> Result<(), CaptchaError> {
    if error_id == 0 {
        return Ok(());
    }
    Err(CaptchaError::Remote {
        code: code.unwrap_or_default(),
        description: description.unwrap_or_default(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays queued JSON bodies and records every request it receives.
    pub(crate) struct StubHttpClient {
        responses: Mutex<VecDeque<Value>>,
        requests: Mutex<Vec<(Url, Value)>>,
        cancel_on: Option<(usize, CancellationToken)>,
        delay: Duration,
    }

    impl StubHttpClient {
        pub(crate) fn new(responses: Vec<Value>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
                cancel_on: None,
                delay: Duration::ZERO,
            }
        }

        /// Cancels `token` while answering the `call`-th request (1-based).
        pub(crate) fn cancel_on(mut self, call: usize, token: CancellationToken) -> Self {
            self.cancel_on = Some((call, token));
            self
        }

        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub(crate) fn requests(&self) -> Vec<(Url, Value)> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn calls_to(&self, endpoint: &str) -> usize {
            self.requests()
                .iter()
                .filter(|(url, _)| url.path().ends_with(endpoint))
                .count()
        }
    }

    #[async_trait]
    impl TaskHttpClient for StubHttpClient {
        async fn post_json(
            &self,
            url: &Url,
            body: Vec<u8>,
        ) -> Result<Bytes, TaskHttpClientError> {
            let call = {
                let mut requests = self.requests.lock().unwrap();
                requests.push((url.clone(), serde_json::from_slice(&body).unwrap()));
                requests.len()
            };

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            if let Some((at, token)) = &self.cancel_on
                && *at == call
            {
                token.cancel();
            }

            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(value) => Ok(Bytes::from(value.to_string())),
                None => Err(TaskHttpClientError::Transport(
                    "no more stub responses".into(),
                )),
            }
        }
    }

    fn api() -> TaskApi {
        TaskApi::new("https://api.example.com", "secret").unwrap()
    }

    #[tokio::test]
    async fn submit_sends_client_key_and_task() {
        let stub = StubHttpClient::new(vec![json!({"errorId": 0, "taskId": "abc"})]);
        let descriptor = TaskDescriptor::new("FuncaptchaTaskProxyless").with("websiteKey", "k");

        let handle = api()
            .submit(&CancellationToken::new(), &stub, &descriptor)
            .await
            .unwrap();

        assert_eq!(handle.as_str(), "abc");
        let requests = stub.requests();
        assert_eq!(requests[0].0.as_str(), "https://api.example.com/createTask");
        assert_eq!(
            requests[0].1,
            json!({
                "clientKey": "secret",
                "task": {"type": "FuncaptchaTaskProxyless", "websiteKey": "k"}
            })
        );
    }

    #[tokio::test]
    async fn numeric_task_ids_are_normalised() {
        let stub = StubHttpClient::new(vec![json!({"errorId": 0, "taskId": 7654321})]);
        let handle = api()
            .submit(&CancellationToken::new(), &stub, &TaskDescriptor::new("T"))
            .await
            .unwrap();
        assert_eq!(handle.as_str(), "7654321");
    }

    #[tokio::test]
    async fn submit_rejection_carries_code_and_description() {
        let stub = StubHttpClient::new(vec![json!({
            "errorId": 1,
            "errorCode": "ERROR_ZERO_BALANCE",
            "errorDescription": "Account has zero balance"
        })]);

        let err = api()
            .submit(&CancellationToken::new(), &stub, &TaskDescriptor::new("T"))
            .await
            .unwrap_err();

        match err {
            CaptchaError::Remote { code, description } => {
                assert_eq!(code, "ERROR_ZERO_BALANCE");
                assert_eq!(description, "Account has zero balance");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_treats_non_ready_as_pending_even_with_solution() {
        let stub = StubHttpClient::new(vec![json!({
            "errorId": 0,
            "status": "processing",
            "solution": {"token": "early"}
        })]);

        let status = api()
            .fetch(&CancellationToken::new(), &stub, &"abc".into())
            .await
            .unwrap();

        assert_eq!(status, TaskStatus::Pending);
        assert_eq!(stub.requests()[0].1, json!({"clientKey": "secret", "taskId": "abc"}));
    }

    #[tokio::test]
    async fn fetch_keeps_empty_string_solutions() {
        let stub = StubHttpClient::new(vec![json!({
            "errorId": 0,
            "status": "ready",
            "solution": ""
        })]);

        let status = api()
            .fetch(&CancellationToken::new(), &stub, &"abc".into())
            .await
            .unwrap();

        assert_eq!(status, TaskStatus::Ready(json!("")));
    }

    #[tokio::test]
    async fn ready_without_solution_is_a_decode_failure() {
        let stub = StubHttpClient::new(vec![json!({"errorId": 0, "status": "ready"})]);
        let err = api()
            .fetch(&CancellationToken::new(), &stub, &"abc".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptchaError::Decode(_)));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_failure() {
        let stub = StubHttpClient::new(vec![json!(["not", "an", "object"])]);
        let err = api()
            .fetch(&CancellationToken::new(), &stub, &"abc".into())
            .await
            .unwrap_err();
        assert!(matches!(err, CaptchaError::Decode(_)));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_request() {
        let stub = StubHttpClient::new(vec![json!({"errorId": 0, "taskId": "abc"})]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = api()
            .submit(&cancel, &stub, &TaskDescriptor::new("T"))
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(stub.requests().is_empty());
    }

    #[tokio::test]
    async fn in_flight_request_observes_cancellation() {
        let stub = StubHttpClient::new(vec![json!({"errorId": 0, "status": "processing"})])
            .with_delay(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = api()
            .fetch(&cancel, &stub, &"abc".into())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
    }

    #[test]
    fn base_url_keeps_its_path_prefix() {
        let api = TaskApi::new("https://solver.example.com/v2", "key").unwrap();
        assert_eq!(
            api.base_url().join("createTask").unwrap().as_str(),
            "https://solver.example.com/v2/createTask"
        );
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            TaskApi::new("not a url", "key"),
            Err(CaptchaError::Configuration(_))
        ));
        assert!(matches!(
            TaskApi::new("https://api.example.com", "  "),
            Err(CaptchaError::Configuration(_))
        ));
    }
}
