use std::{sync::Arc, time::Duration};

use serde_json::Value;

use crate::{
    errors::Error,
    events::flags::LongPollMode,
    ports::{ApiCaller, LongPollTransport, Params},
    retry::RetryPolicy,
    utils::{array_or_empty, lenient_i64, lenient_string, truncate_text},
    Result,
};

/// Which long-poll flavour a session subscribes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LongPollKind {
    /// `messages.getLongPollServer`; the server is returned without a scheme.
    User { use_https: bool },
    /// `groups.getLongPollServer`; the server is already a full URL.
    Group { group_id: i64 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollParams {
    /// Seconds the server may hold the request.
    pub wait: u32,
    pub mode: Option<u32>,
    pub version: u32,
}

impl PollParams {
    pub fn user_default() -> Self {
        Self {
            wait: 25,
            mode: Some(LongPollMode::DEFAULT),
            version: 2,
        }
    }

    pub fn group_default() -> Self {
        Self {
            wait: 25,
            mode: None,
            version: 1,
        }
    }

    /// Request timeout: twice the server-side wait.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.wait) * 2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ServerCoords {
    endpoint: String,
    key: String,
}

/// A successful poll.
#[derive(Clone, Debug, PartialEq)]
pub struct PollOutcome {
    pub ts: i64,
    pub pts: Option<i64>,
    pub updates: Vec<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChangePointer {
    pub pts: i64,
    pub ts: i64,
}

/// Long-poll server coordinates plus the failure-recovery state machine.
///
/// Not `Clone` and all mutating methods take `&mut self`: one session has one
/// poller. State only changes after a response has been fully received, so a
/// poll future dropped mid-request (timeout, cancellation) leaves the cursor
/// and endpoint as they were.
pub struct LongPollSession {
    api: Arc<dyn ApiCaller>,
    transport: Arc<dyn LongPollTransport>,
    kind: LongPollKind,
    params: PollParams,
    retry: RetryPolicy,

    server: Option<ServerCoords>,
    cursor: Option<i64>,
    pts: Option<i64>,

    handoffs: u64,
    soft_resyncs: u64,
}

impl LongPollSession {
    pub fn new(
        api: Arc<dyn ApiCaller>,
        transport: Arc<dyn LongPollTransport>,
        kind: LongPollKind,
        params: PollParams,
    ) -> Self {
        Self {
            api,
            transport,
            kind,
            params,
            retry: RetryPolicy::default(),
            server: None,
            cursor: None,
            pts: None,
            handoffs: 0,
            soft_resyncs: 0,
        }
    }

    pub fn user(api: Arc<dyn ApiCaller>, transport: Arc<dyn LongPollTransport>) -> Self {
        Self::new(
            api,
            transport,
            LongPollKind::User { use_https: true },
            PollParams::user_default(),
        )
    }

    pub fn group(
        api: Arc<dyn ApiCaller>,
        transport: Arc<dyn LongPollTransport>,
        group_id: i64,
    ) -> Self {
        Self::new(
            api,
            transport,
            LongPollKind::Group { group_id },
            PollParams::group_default(),
        )
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn kind(&self) -> LongPollKind {
        self.kind
    }

    pub fn params(&self) -> PollParams {
        self.params
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    pub fn is_established(&self) -> bool {
        self.server.is_some()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.server.as_ref().map(|s| s.endpoint.as_str())
    }

    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    pub fn pts(&self) -> Option<i64> {
        self.pts
    }

    /// Successful handoffs so far.
    pub fn handoffs(&self) -> u64 {
        self.handoffs
    }

    /// `failed == 1` responses handled so far.
    pub fn soft_resyncs(&self) -> u64 {
        self.soft_resyncs
    }

    /// Acquire a long-poll server, key and initial cursor.
    pub async fn establish(&mut self, need_pts: bool) -> Result<()> {
        let (method, params): (&str, Params) = match self.kind {
            LongPollKind::User { .. } => (
                "messages.getLongPollServer",
                vec![("need_pts", u8::from(need_pts).to_string())],
            ),
            LongPollKind::Group { group_id } => (
                "groups.getLongPollServer",
                vec![("group_id", group_id.to_string())],
            ),
        };

        let resp = self
            .api
            .call(method, params)
            .await
            .map_err(|e| Error::Handoff(format!("{method}: {e}")))?;

        let missing = |field: &str| Error::Handoff(format!("{method} response missing `{field}`"));
        let server = resp
            .get("server")
            .and_then(lenient_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("server"))?;
        let key = resp
            .get("key")
            .and_then(lenient_string)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("key"))?;
        let ts = resp
            .get("ts")
            .and_then(lenient_i64)
            .ok_or_else(|| missing("ts"))?;

        let endpoint = match self.kind {
            LongPollKind::User { use_https } => {
                let scheme = if use_https { "https" } else { "http" };
                format!("{scheme}://{server}")
            }
            LongPollKind::Group { .. } => server,
        };

        tracing::debug!(%endpoint, ts, "long-poll server acquired");

        self.pts = resp.get("pts").and_then(lenient_i64);
        self.cursor = Some(ts);
        self.server = Some(ServerCoords { endpoint, key });
        self.handoffs += 1;
        Ok(())
    }

    /// Wait for the next batch of updates.
    ///
    /// `failed == 1` (history gap) moves the cursor and polls again; `failed`
    /// 2, 3 or anything unrecognised drops the server and re-handoffs. Neither
    /// is surfaced. HTTP 403, `failed == 4` and an exhausted retry budget are.
    pub async fn poll(&mut self) -> Result<PollOutcome> {
        let mut soft_failures: u32 = 0;

        loop {
            if self.server.is_none() {
                self.establish(false).await?;
            }
            let Some(ServerCoords { endpoint, key }) = self.server.clone() else {
                return Err(Error::Handoff("no long-poll server after handoff".to_string()));
            };

            let query = self.query(&key);
            let resp = self
                .transport
                .get_text(&endpoint, query, self.params.timeout())
                .await?;

            if resp.status == 403 {
                return Err(Error::Transport {
                    status: resp.status,
                    endpoint,
                });
            }
            if !(200..300).contains(&resp.status) {
                return Err(Error::External(format!(
                    "long-poll HTTP {}: {}",
                    resp.status,
                    truncate_text(&resp.body, 200)
                )));
            }

            let body: Value = serde_json::from_str(&resp.body)?;
            let ts = body.get("ts").and_then(lenient_i64);

            // Only an absent, null or zero `failed` is success; anything else
            // that is not 1 or 4 invalidates the session.
            let failed = match body.get("failed") {
                None | Some(Value::Null) => None,
                Some(v) => Some(lenient_i64(v)),
            };

            match failed {
                None | Some(Some(0)) => {
                    if let Some(ts) = ts {
                        self.advance_cursor(ts);
                    }
                    if let Some(pts) = body.get("pts").and_then(lenient_i64) {
                        self.pts = Some(pts);
                    }
                    return Ok(PollOutcome {
                        ts: self.cursor.unwrap_or_default(),
                        pts: self.pts,
                        updates: array_or_empty(body.get("updates")),
                    });
                }
                Some(Some(1)) => {
                    tracing::debug!(?ts, "long-poll history gap; continuing from new cursor");
                    if let Some(ts) = ts {
                        self.advance_cursor(ts);
                    }
                    self.soft_resyncs += 1;
                }
                Some(Some(4)) => {
                    self.server = None;
                    return Err(Error::Version { endpoint });
                }
                Some(code) => {
                    tracing::debug!(?code, "long-poll key expired or state lost; re-handoff");
                    self.server = None;
                }
            }

            soft_failures += 1;
            if self.retry.exhausted(soft_failures) {
                return Err(Error::ResyncExhausted {
                    attempts: soft_failures,
                });
            }
            let delay = self.retry.delay_for_attempt(soft_failures);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Current change-pointer (`pts`) and cursor, re-handoffing with
    /// `need_pts` when no pts is known yet.
    pub async fn change_pointer(&mut self) -> Result<ChangePointer> {
        if self.server.is_none() || self.pts.is_none() {
            self.establish(true).await?;
        }
        let pts = self
            .pts
            .ok_or_else(|| Error::Handoff("long-poll server did not return `pts`".to_string()))?;
        let ts = self
            .cursor
            .ok_or_else(|| Error::Handoff("long-poll server did not return `ts`".to_string()))?;
        Ok(ChangePointer { pts, ts })
    }

    fn query(&self, key: &str) -> Params {
        let mut q: Params = vec![
            ("act", "a_check".to_string()),
            ("key", key.to_string()),
            ("ts", self.cursor.unwrap_or_default().to_string()),
            ("wait", self.params.wait.to_string()),
            ("version", self.params.version.to_string()),
        ];
        if let Some(mode) = self.params.mode {
            q.push(("mode", mode.to_string()));
        }
        q
    }

    fn advance_cursor(&mut self, ts: i64) {
        if let Some(prev) = self.cursor {
            if ts < prev {
                tracing::warn!(prev, ts, "long-poll cursor moved backwards");
            }
        }
        self.cursor = Some(ts);
    }
}
