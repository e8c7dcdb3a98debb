//! In-memory API client for handler tests

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use iplb_common::{ApiClient, Result};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub endpoint: String,
    pub body: Option<Value>,
}

/// Records every call and answers from a queue; an empty queue answers null
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<RecordedCall>>,
    responses: Mutex<VecDeque<Result<Value>>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: Result<Value>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, endpoint: &str, body: Option<&Value>) -> Result<Value> {
        self.calls.lock().unwrap().push(RecordedCall {
            method,
            endpoint: endpoint.to_string(),
            body: body.cloned(),
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Value::Null))
    }
}

#[async_trait]
impl ApiClient for RecordingClient {
    async fn get(&self, endpoint: &str) -> Result<Value> {
        self.record("GET", endpoint, None)
    }

    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.record("POST", endpoint, Some(body))
    }

    async fn put(&self, endpoint: &str, body: &Value) -> Result<Value> {
        self.record("PUT", endpoint, Some(body))
    }

    async fn delete(&self, endpoint: &str) -> Result<Value> {
        self.record("DELETE", endpoint, None)
    }
}
