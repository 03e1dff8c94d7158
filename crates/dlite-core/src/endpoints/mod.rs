//! Manager protocol endpoints.
//!
//! Register and send-status go through the retry loop with their own
//! elapsed-time ceilings. Heartbeat, poll and acquire are single attempts:
//! the caller's polling loop runs them on a fixed cadence, so the next cycle
//! is the retry.

mod paths;
pub mod types;

use crate::clock::{Clock, ScopeSleeper, Sleeper, SystemClock};
use crate::control::CancelScope;
use crate::credentials::TokenSource;
use crate::error::ClientError;
use crate::executor::{Executor, Request};
use crate::retry::{run_with_retry, BackoffSettings, ExponentialBackoff};
use crate::transport::{CurlTransport, Transport, TransportOptions};
use http::Method;
use std::sync::Arc;
use std::time::Duration;

pub use types::{
    RegisterRequest, RegisterResponse, Task, TaskCode, TaskEvent, TaskEventsResponse, TaskResponse,
};

/// Retry tuning for the resilient endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClientOptions {
    pub backoff: BackoffSettings,
    /// Ceiling for register. Short: a delegate that cannot register can be
    /// restarted.
    pub register_max_elapsed: Duration,
    /// Ceiling for send status. Longer: a lost status leaves the task in
    /// limbo on the manager.
    pub status_max_elapsed: Duration,
    pub strict_encode: bool,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            backoff: BackoffSettings::default(),
            register_max_elapsed: Duration::from_secs(30),
            status_max_elapsed: Duration::from_secs(60),
            strict_encode: false,
        }
    }
}

/// Client for one account on one manager. `Send + Sync`; share it behind an
/// `Arc` between the heartbeat and poll threads.
#[derive(Clone)]
pub struct ManagerClient {
    executor: Executor,
    account_id: String,
    options: ClientOptions,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
}

impl ManagerClient {
    /// Client with its own curl transport and default retry tuning.
    pub fn new(
        endpoint: impl Into<String>,
        account_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        skip_verify: bool,
    ) -> Self {
        let transport = CurlTransport::new(TransportOptions {
            skip_verify,
            ..TransportOptions::default()
        });
        Self::with_transport(
            endpoint,
            account_id,
            tokens,
            Arc::new(transport),
            ClientOptions::default(),
        )
    }

    pub fn with_transport(
        endpoint: impl Into<String>,
        account_id: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        transport: Arc<dyn Transport>,
        options: ClientOptions,
    ) -> Self {
        let executor =
            Executor::new(endpoint, tokens, transport).strict_encode(options.strict_encode);
        Self {
            executor,
            account_id: account_id.into(),
            options,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(ScopeSleeper),
        }
    }

    /// Replace the time sources driving backoff.
    pub fn with_time(mut self, clock: Arc<dyn Clock>, sleeper: Arc<dyn Sleeper>) -> Self {
        self.clock = clock;
        self.sleeper = sleeper;
        self
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// The underlying single-attempt executor.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Announce this delegate and receive its assigned id. Retried on
    /// transport errors and statuses above 501 until the register ceiling.
    pub fn register(
        &self,
        req: &RegisterRequest,
        scope: &CancelScope,
    ) -> Result<RegisterResponse, ClientError> {
        let request = Request::new(Method::POST, paths::register(&self.account_id)).json(req);
        let resp = self
            .retry(self.options.register_max_elapsed, scope, || {
                self.executor
                    .execute_json::<_, RegisterResponse>(&request, scope)
            })?
            .unwrap_or_default();
        tracing::info!(
            endpoint = %self.executor.endpoint(),
            account_id = %self.account_id,
            delegate_id = %resp.id,
            "registered delegate"
        );
        Ok(resp)
    }

    /// Liveness signal. Single attempt.
    pub fn heartbeat(&self, req: &RegisterRequest, scope: &CancelScope) -> Result<(), ClientError> {
        let request = Request::new(Method::POST, paths::heartbeat(&self.account_id)).json(req);
        self.executor.execute(&request, scope)
    }

    /// Pending task events for `delegate_id`. Single attempt; empty on 204.
    pub fn get_task_events(
        &self,
        delegate_id: &str,
        scope: &CancelScope,
    ) -> Result<TaskEventsResponse, ClientError> {
        let request = Request::new(
            Method::GET,
            paths::task_events(&self.account_id, delegate_id),
        );
        Ok(self
            .executor
            .execute_json(&request, scope)?
            .unwrap_or_default())
    }

    /// Claim `task_id` for `delegate_id`. Single attempt; default task on 204.
    pub fn acquire(
        &self,
        delegate_id: &str,
        task_id: &str,
        scope: &CancelScope,
    ) -> Result<Task, ClientError> {
        let request = Request::new(
            Method::PUT,
            paths::acquire(&self.account_id, delegate_id, task_id),
        );
        Ok(self
            .executor
            .execute_json(&request, scope)?
            .unwrap_or_default())
    }

    /// Report the terminal outcome of a task. Retried until the status
    /// ceiling.
    pub fn send_status(
        &self,
        delegate_id: &str,
        task_id: &str,
        resp: &TaskResponse,
        scope: &CancelScope,
    ) -> Result<(), ClientError> {
        let request = Request::new(
            Method::POST,
            paths::task_status(&self.account_id, delegate_id, task_id),
        )
        .json(resp);
        tracing::debug!(task_id, code = ?resp.code, "sending task status");
        self.retry(self.options.status_max_elapsed, scope, || {
            self.executor.execute(&request, scope)
        })?;
        tracing::debug!(task_id, "task status delivered");
        Ok(())
    }

    /// Resilient call with no elapsed-time ceiling. Ends on success, a
    /// terminal error, or when `scope` is cancelled or expires.
    pub fn retry_unbounded<T, F>(&self, scope: &CancelScope, mut attempt: F) -> Result<T, ClientError>
    where
        F: FnMut(&Executor) -> Result<T, ClientError>,
    {
        self.retry(Duration::ZERO, scope, || attempt(&self.executor))
    }

    fn retry<T, F>(&self, max_elapsed: Duration, scope: &CancelScope, attempt: F) -> Result<T, ClientError>
    where
        F: FnMut() -> Result<T, ClientError>,
    {
        let backoff = ExponentialBackoff::new(self.options.backoff, max_elapsed, Arc::clone(&self.clock));
        run_with_retry(backoff, self.sleeper.as_ref(), scope, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::manual::{ManualClock, ManualSleeper};
    use crate::credentials::StaticToken;
    use crate::transport::{WireRequest, WireResponse};
    use std::sync::Mutex;

    /// Replays a fixed list of statuses/bodies; repeats the last one.
    struct Script {
        replies: Mutex<Vec<(u16, &'static str)>>,
        seen: Mutex<Vec<WireRequest>>,
    }

    impl Script {
        fn new(replies: &[(u16, &'static str)]) -> Arc<Self> {
            let mut replies = replies.to_vec();
            replies.reverse();
            Arc::new(Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<WireRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Transport for Script {
        fn send(&self, request: &WireRequest, _scope: &CancelScope) -> Result<WireResponse, ClientError> {
            self.seen.lock().unwrap().push(request.clone());
            let mut replies = self.replies.lock().unwrap();
            let (status, body) = if replies.len() > 1 {
                replies.pop().unwrap()
            } else {
                replies[0]
            };
            Ok(WireResponse {
                status,
                body: body.as_bytes().to_vec(),
            })
        }
    }

    fn client(script: Arc<Script>) -> (ManagerClient, Arc<ManualSleeper>) {
        let clock = Arc::new(ManualClock::new());
        let sleeper = Arc::new(ManualSleeper::new(Arc::clone(&clock)));
        let options = ClientOptions {
            backoff: BackoffSettings {
                randomization_factor: 0.0,
                ..BackoffSettings::default()
            },
            ..ClientOptions::default()
        };
        let c = ManagerClient::with_transport(
            "http://manager",
            "acct",
            Arc::new(StaticToken::new("tok")),
            script,
            options,
        )
        .with_time(clock, sleeper.clone());
        (c, sleeper)
    }

    #[test]
    fn new_uses_default_options_and_curl_transport() {
        let c = ManagerClient::new(
            "https://manager.example.com/",
            "acct",
            Arc::new(StaticToken::new("tok")),
            true,
        );
        assert_eq!(c.account_id(), "acct");
        assert_eq!(*c.options(), ClientOptions::default());
        assert_eq!(c.executor().endpoint(), "https://manager.example.com");

        // Ended scope: the curl transport refuses before touching the network.
        let scope = CancelScope::new();
        scope.cancel();
        let err = c.get_task_events("d", &scope).unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn register_retries_503_and_returns_id() {
        let script = Script::new(&[(503, ""), (503, ""), (200, r#"{"id":"42"}"#)]);
        let (c, sleeper) = client(script.clone());
        let resp = c
            .register(&RegisterRequest::default(), &CancelScope::new())
            .unwrap();
        assert_eq!(resp.id, "42");
        assert_eq!(script.seen().len(), 3);
        assert_eq!(sleeper.waits().len(), 2);
    }

    #[test]
    fn register_gives_up_at_30s_ceiling() {
        let script = Script::new(&[(502, "bad gateway")]);
        let (c, sleeper) = client(script.clone());
        let err = c
            .register(&RegisterRequest::default(), &CancelScope::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "bad gateway");
        assert!(script.seen().len() >= 2);
        let slept: Duration = sleeper.waits().iter().sum();
        assert!(slept <= Duration::from_secs(30));
    }

    #[test]
    fn send_status_uses_longer_ceiling() {
        let register = Script::new(&[(504, "")]);
        let (c, reg_sleeper) = client(register.clone());
        let _ = c.register(&RegisterRequest::default(), &CancelScope::new());

        let status = Script::new(&[(504, "")]);
        let (c, status_sleeper) = client(status.clone());
        let _ = c.send_status("d1", "t1", &TaskResponse::default(), &CancelScope::new());

        assert!(status.seen().len() > register.seen().len());
        let reg_total: Duration = reg_sleeper.waits().iter().sum();
        let status_total: Duration = status_sleeper.waits().iter().sum();
        assert!(reg_total <= Duration::from_secs(30));
        assert!(status_total > Duration::from_secs(30));
        assert!(status_total <= Duration::from_secs(60));
    }

    #[test]
    fn send_status_500_fails_once_with_body() {
        let script = Script::new(&[(500, "status store down")]);
        let (c, sleeper) = client(script.clone());
        let err = c
            .send_status("d1", "t1", &TaskResponse::default(), &CancelScope::new())
            .unwrap_err();
        assert_eq!(err.to_string(), "status store down");
        assert_eq!(script.seen().len(), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn heartbeat_poll_and_acquire_never_retry() {
        let script = Script::new(&[(503, "")]);
        let (c, sleeper) = client(script.clone());
        let scope = CancelScope::new();
        assert!(c.heartbeat(&RegisterRequest::default(), &scope).is_err());
        assert!(c.get_task_events("d1", &scope).is_err());
        assert!(c.acquire("d1", "t1", &scope).is_err());
        assert_eq!(script.seen().len(), 3);
        assert!(sleeper.waits().is_empty());
    }

    #[test]
    fn endpoints_use_expected_methods_and_paths() {
        let script = Script::new(&[(204, "")]);
        let (c, _) = client(script.clone());
        let scope = CancelScope::new();
        c.register(&RegisterRequest::default(), &scope).unwrap();
        c.heartbeat(&RegisterRequest::default(), &scope).unwrap();
        c.get_task_events("d1", &scope).unwrap();
        c.acquire("d1", "t1", &scope).unwrap();
        c.send_status("d1", "t1", &TaskResponse::default(), &scope)
            .unwrap();

        let seen: Vec<(String, String)> = script
            .seen()
            .into_iter()
            .map(|r| (r.method.to_string(), r.url))
            .collect();
        assert_eq!(
            seen,
            vec![
                ("POST".into(), "http://manager/api/agent/delegates/register?accountId=acct".into()),
                ("POST".into(), "http://manager/api/agent/delegates/heartbeat-with-polling?accountId=acct".into()),
                ("GET".into(), "http://manager/api/agent/delegates/d1/task-events?accountId=acct".into()),
                ("PUT".into(), "http://manager/api/agent/v2/delegates/d1/tasks/t1/acquire?accountId=acct&delegateInstanceId=d1".into()),
                ("POST".into(), "http://manager/api/agent/v2/tasks/t1/delegates/d1?accountId=acct".into()),
            ]
        );
    }

    #[test]
    fn no_content_yields_defaults() {
        let script = Script::new(&[(204, "")]);
        let (c, _) = client(script);
        let scope = CancelScope::new();
        assert_eq!(c.get_task_events("d1", &scope).unwrap(), TaskEventsResponse::default());
        assert_eq!(c.acquire("d1", "t1", &scope).unwrap(), Task::default());
    }

    #[test]
    fn retry_unbounded_runs_until_success() {
        let mut replies = vec![(503, ""); 200];
        replies.push((200, "{}"));
        let script = Script::new(&replies);
        let (c, _) = client(script.clone());
        let scope = CancelScope::new();
        c.retry_unbounded(&scope, |ex| {
            ex.execute(&Request::new(Method::GET, "/ping"), &scope)
        })
        .unwrap();
        assert_eq!(script.seen().len(), 201);
    }
}
