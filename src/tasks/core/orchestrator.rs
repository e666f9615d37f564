//! Task lifecycle orchestration.
//!
//! Drives one descriptor through submission, the initial wait, and the
//! bounded poll loop, translating every outcome into either a
//! [`CaptchaSolution`] or exactly one [`CaptchaError`].

use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::modules::events::{
    EventDispatcher, FailedEvent, PolledEvent, SolveEvent, SolvedEvent, SubmittedEvent,
};

use super::error::{CaptchaError, CaptchaResult};
use super::timing::{Settings, sleep_with_cancel};
use super::transport::TaskApi;
use super::types::{CaptchaSolution, TaskDescriptor, TaskHandle, TaskStatus};

/// Shared submit/poll engine owned by a provider.
///
/// Holds no per-call state, so a single instance serves concurrent solves.
#[derive(Debug, Clone)]
pub struct TaskOrchestrator {
    provider: &'static str,
    api: TaskApi,
    events: EventDispatcher,
}

impl TaskOrchestrator {
    pub fn new(provider: &'static str, api: TaskApi) -> Self {
        Self {
            provider,
            api,
            events: EventDispatcher::with_logging(),
        }
    }

    pub fn with_events(mut self, events: EventDispatcher) -> Self {
        self.events = events;
        self
    }

    pub fn api(&self) -> &TaskApi {
        &self.api
    }

    /// Runs the full lifecycle for `descriptor`.
    ///
    /// Steps:
    /// 1. Submit the descriptor (never retried).
    /// 2. Wait the initial delay.
    /// 3. Poll up to `max_retries` times, sleeping the poll interval between
    ///    pending answers.
    /// 4. Give up with [`CaptchaError::MaxRetriesExceeded`].
    ///
    /// Remote rejections end the call on the spot, and `cancel` is observed
    /// by every wait and every request.
    pub async fn solve(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        descriptor: &TaskDescriptor,
    ) -> CaptchaResult {
        let started = Instant::now();
        let mut handle = None;

        let result = self
            .run(cancel, settings, descriptor, &mut handle)
            .await;

        match &result {
            Ok(solution) => self.events.dispatch(SolveEvent::Solved(SolvedEvent {
                provider: self.provider,
                task_id: solution.task_id().to_string(),
                polls: solution.polls(),
                elapsed: started.elapsed(),
                timestamp: Utc::now(),
            })),
            Err(err) => self.events.dispatch(SolveEvent::Failed(FailedEvent {
                provider: self.provider,
                task_id: handle.as_ref().map(TaskHandle::to_string),
                error: err.to_string(),
                elapsed: started.elapsed(),
                timestamp: Utc::now(),
            })),
        }

        result
    }

    async fn run(
        &self,
        cancel: &CancellationToken,
        settings: &Settings,
        descriptor: &TaskDescriptor,
        handle_slot: &mut Option<TaskHandle>,
    ) -> CaptchaResult {
        let http = settings.http().as_ref();

        let handle = self.api.submit(cancel, http, descriptor).await?;
        *handle_slot = Some(handle.clone());
        self.events.dispatch(SolveEvent::Submitted(SubmittedEvent {
            provider: self.provider,
            task_type: descriptor.task_type().to_string(),
            task_id: handle.to_string(),
            timestamp: Utc::now(),
        }));

        sleep_with_cancel(cancel, settings.initial_wait()).await?;

        for attempt in 1..=settings.max_retries() {
            let status = self.api.fetch(cancel, http, &handle).await?;

            self.events.dispatch(SolveEvent::Polled(PolledEvent {
                provider: self.provider,
                task_id: handle.to_string(),
                attempt,
                ready: matches!(status, TaskStatus::Ready(_)),
                timestamp: Utc::now(),
            }));

            if let TaskStatus::Ready(solution) = status {
                return Ok(CaptchaSolution::new(handle, solution, attempt));
            }

            sleep_with_cancel(cancel, settings.next_poll_delay()).await?;
        }

        Err(CaptchaError::MaxRetriesExceeded {
            attempts: settings.max_retries(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tasks::core::transport::tests::StubHttpClient;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::modules::events::EventHandler;

    fn orchestrator() -> TaskOrchestrator {
        TaskOrchestrator::new(
            "test",
            TaskApi::new("https://api.example.com", "secret").unwrap(),
        )
    }

    fn settings(stub: &Arc<StubHttpClient>, max_retries: usize) -> Settings {
        Settings::new(stub.clone())
            .with_initial_wait(Duration::ZERO)
            .with_poll_interval(Duration::ZERO)
            .with_max_retries(max_retries)
    }

    fn created(id: &str) -> Value {
        json!({"errorId": 0, "taskId": id})
    }

    fn pending() -> Value {
        json!({"errorId": 0, "status": "processing"})
    }

    fn descriptor() -> TaskDescriptor {
        TaskDescriptor::new("FuncaptchaTaskProxyless")
    }

    #[tokio::test]
    async fn returns_solution_after_pending_polls() {
        let stub = Arc::new(StubHttpClient::new(vec![
            created("abc"),
            pending(),
            pending(),
            json!({"errorId": 0, "status": "ready", "solution": "4x9q"}),
        ]));

        let solution = orchestrator()
            .solve(&CancellationToken::new(), &settings(&stub, 3), &descriptor())
            .await
            .unwrap();

        assert_eq!(solution.task_id().as_str(), "abc");
        assert_eq!(solution.solution(), &json!("4x9q"));
        assert_eq!(solution.polls(), 3);
        assert_eq!(stub.calls_to("getTaskResult"), 3);
    }

    #[tokio::test]
    async fn exhausts_exactly_max_retries_polls() {
        for max_retries in [0usize, 1, 4] {
            let mut responses = vec![created("abc")];
            responses.extend((0..max_retries).map(|_| pending()));
            let stub = Arc::new(StubHttpClient::new(responses));

            let err = orchestrator()
                .solve(
                    &CancellationToken::new(),
                    &settings(&stub, max_retries),
                    &descriptor(),
                )
                .await
                .unwrap_err();

            assert!(err.is_exhausted(), "unexpected error: {err:?}");
            assert_eq!(stub.calls_to("getTaskResult"), max_retries);
        }
    }

    #[tokio::test]
    async fn submission_rejection_skips_polling() {
        let stub = Arc::new(StubHttpClient::new(vec![json!({
            "errorId": 1,
            "errorCode": "ERROR_KEY_DOES_NOT_EXIST",
            "errorDescription": "bad key"
        })]));

        let err = orchestrator()
            .solve(&CancellationToken::new(), &settings(&stub, 3), &descriptor())
            .await
            .unwrap_err();

        match err {
            CaptchaError::Remote { code, description } => {
                assert_eq!(code, "ERROR_KEY_DOES_NOT_EXIST");
                assert_eq!(description, "bad key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(stub.calls_to("getTaskResult"), 0);
    }

    #[tokio::test]
    async fn poll_rejection_stops_the_loop_early() {
        let stub = Arc::new(StubHttpClient::new(vec![
            created("abc"),
            pending(),
            json!({
                "errorId": 1,
                "errorCode": "ERROR_CAPTCHA_UNSOLVABLE",
                "errorDescription": "Captcha could not be solved"
            }),
            pending(),
        ]));

        let err = orchestrator()
            .solve(&CancellationToken::new(), &settings(&stub, 10), &descriptor())
            .await
            .unwrap_err();

        assert!(err.is_remote());
        assert_eq!(stub.calls_to("getTaskResult"), 2);
    }

    #[tokio::test]
    async fn submission_transport_failure_is_not_retried() {
        let stub = Arc::new(StubHttpClient::new(vec![]));

        let err = orchestrator()
            .solve(&CancellationToken::new(), &settings(&stub, 3), &descriptor())
            .await
            .unwrap_err();

        assert!(matches!(err, CaptchaError::Transport(_)));
        assert_eq!(stub.requests().len(), 1);
    }

    #[tokio::test]
    async fn poll_transport_failure_ends_the_solve() {
        // the second poll finds the stub exhausted
        let stub = Arc::new(StubHttpClient::new(vec![created("abc"), pending()]));

        let err = orchestrator()
            .solve(&CancellationToken::new(), &settings(&stub, 5), &descriptor())
            .await
            .unwrap_err();

        assert!(matches!(err, CaptchaError::Transport(_)));
        assert!(!err.is_exhausted());
        assert_eq!(stub.calls_to("getTaskResult"), 2);
    }

    #[tokio::test]
    async fn undecodable_poll_reply_ends_the_solve() {
        for reply in [
            json!({"errorId": 0, "status": "ready"}),
            json!("<html>bad gateway</html>"),
        ] {
            let stub = Arc::new(StubHttpClient::new(vec![
                created("abc"),
                reply,
                pending(),
                json!({"errorId": 0, "status": "ready", "solution": "late"}),
            ]));

            let err = orchestrator()
                .solve(&CancellationToken::new(), &settings(&stub, 5), &descriptor())
                .await
                .unwrap_err();

            assert!(matches!(err, CaptchaError::Decode(_)), "got {err:?}");
            assert_eq!(stub.calls_to("getTaskResult"), 1);
        }
    }

    #[tokio::test]
    async fn cancellation_during_initial_wait_prevents_polling() {
        let cancel = CancellationToken::new();
        let stub = Arc::new(
            StubHttpClient::new(vec![created("abc"), pending()]).cancel_on(1, cancel.clone()),
        );
        let settings = settings(&stub, 3).with_initial_wait(Duration::from_secs(60));

        let err = orchestrator()
            .solve(&cancel, &settings, &descriptor())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(stub.calls_to("getTaskResult"), 0);
    }

    #[tokio::test]
    async fn cancellation_during_poll_iteration_stops_next_iteration() {
        let cancel = CancellationToken::new();
        // request #3 is the second poll
        let stub = Arc::new(
            StubHttpClient::new(vec![created("abc"), pending(), pending(), pending()])
                .cancel_on(3, cancel.clone()),
        );

        let err = orchestrator()
            .solve(&cancel, &settings(&stub, 5), &descriptor())
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(stub.calls_to("getTaskResult"), 2);
    }

    struct Recorder(Mutex<Vec<String>>);

    impl EventHandler for Recorder {
        fn handle(&self, event: &SolveEvent) {
            let label = match event {
                SolveEvent::Submitted(_) => "submitted",
                SolveEvent::Polled(_) => "polled",
                SolveEvent::Solved(_) => "solved",
                SolveEvent::Failed(_) => "failed",
            };
            self.0.lock().unwrap().push(label.to_string());
        }
    }

    #[tokio::test]
    async fn emits_lifecycle_events() {
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        let mut events = EventDispatcher::new();
        events.register_handler(recorder.clone());

        let stub = Arc::new(StubHttpClient::new(vec![
            created("abc"),
            pending(),
            json!({"errorId": 0, "status": "ready", "solution": {"token": "t"}}),
        ]));

        orchestrator()
            .with_events(events)
            .solve(&CancellationToken::new(), &settings(&stub, 3), &descriptor())
            .await
            .unwrap();

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["submitted", "polled", "polled", "solved"]
        );
    }
}
