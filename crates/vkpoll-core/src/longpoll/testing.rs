//! Scripted fakes for the long-poll ports.

use std::{collections::VecDeque, sync::Mutex, time::Duration};

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    errors::Error,
    ports::{ApiCaller, HttpText, LongPollTransport, Params},
    Result,
};

pub(crate) fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v.as_str())
}

pub(crate) fn status(status: u16, body: &str) -> HttpText {
    HttpText {
        status,
        body: body.to_string(),
    }
}

/// Answers handoff calls from a queue of server payloads; an empty queue
/// answers with an API error.
#[derive(Default)]
pub(crate) struct FakeApi {
    servers: Mutex<VecDeque<Value>>,
    calls: Mutex<Vec<(String, Params)>>,
}

impl FakeApi {
    pub(crate) fn with_servers(servers: Vec<Value>) -> Self {
        Self {
            servers: Mutex::new(servers.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> Vec<(String, Params)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiCaller for FakeApi {
    async fn call(&self, method: &str, params: Params) -> Result<Value> {
        self.calls.lock().unwrap().push((method.to_string(), params));
        let next = self.servers.lock().unwrap().pop_front();
        next.ok_or(Error::Api {
            code: 5,
            message: "User authorization failed".to_string(),
        })
    }
}

/// Replays scripted responses in order. Once the script runs dry the GET
/// hangs forever, like a long-poll with nothing to report.
#[derive(Default)]
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<Result<HttpText>>>,
    requests: Mutex<Vec<(String, Params, Duration)>>,
}

impl FakeTransport {
    pub(crate) fn with_responses(responses: Vec<Result<HttpText>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_bodies(bodies: Vec<Value>) -> Self {
        Self::with_responses(
            bodies
                .into_iter()
                .map(|b| Ok(status(200, &b.to_string())))
                .collect(),
        )
    }

    pub(crate) fn push_body(&self, body: Value) {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(status(200, &body.to_string())));
    }

    pub(crate) fn requests(&self) -> Vec<(String, Params, Duration)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LongPollTransport for FakeTransport {
    async fn get_text(&self, url: &str, query: Params, timeout: Duration) -> Result<HttpText> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), query, timeout));
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(resp) => resp,
            None => std::future::pending().await,
        }
    }
}
