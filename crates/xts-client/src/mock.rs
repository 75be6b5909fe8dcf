//! Scripted transport for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{ClientError, ClientResult};
use crate::transport::{BoxFuture, LoginRequest, MarketDataTransport, OhlcQuery, RawResponse};

/// Canned outcome of one mock call.
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Any status and body.
    Response(RawResponse),
    /// Fail before a response exists (refused connection, timeout).
    NetworkError(String),
}

impl MockReply {
    /// 200 with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Response(RawResponse::new(200, body))
    }

    /// Arbitrary status with the given body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Response(RawResponse::new(status, body))
    }

    /// Successful OHLC envelope wrapping `payload` as `result.dataReponse`.
    pub fn ohlc(payload: serde_json::Value) -> Self {
        let body = serde_json::json!({
            "type": "success",
            "code": "s-instrument-0002",
            "description": "Data found",
            "result": { "dataReponse": payload },
        });
        Self::ok(body.to_string())
    }

    /// Successful login envelope.
    pub fn login(token: &str, user_id: &str) -> Self {
        let body = serde_json::json!({
            "type": "success",
            "code": "s-user-0001",
            "description": "Continue session",
            "result": {
                "token": token,
                "userID": user_id,
                "isInvestorClient": true,
            },
        });
        Self::ok(body.to_string())
    }

    fn into_result(self) -> ClientResult<RawResponse> {
        match self {
            MockReply::Response(response) => Ok(response),
            MockReply::NetworkError(message) => Err(ClientError::Transport {
                status: None,
                message,
            }),
        }
    }
}

/// Mock transport with per-instrument scripted replies.
///
/// Instruments without a scripted reply get an empty OHLC payload.
#[derive(Debug)]
pub struct MockTransport {
    /// Reply to `login`.
    login_reply: parking_lot::Mutex<MockReply>,
    /// Replies to `fetch_ohlc` keyed by instrument id.
    ohlc_replies: parking_lot::Mutex<HashMap<u64, MockReply>>,
    /// Recorded OHLC queries.
    queries: parking_lot::Mutex<Vec<OhlcQuery>>,
    /// Tokens presented with OHLC queries.
    tokens: parking_lot::Mutex<Vec<String>>,
    login_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// Create a mock whose login succeeds with token `mock-token`.
    pub fn new() -> Self {
        Self {
            login_reply: parking_lot::Mutex::new(MockReply::login("mock-token", "MOCK01")),
            ohlc_replies: parking_lot::Mutex::new(HashMap::new()),
            queries: parking_lot::Mutex::new(Vec::new()),
            tokens: parking_lot::Mutex::new(Vec::new()),
            login_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_login_reply(&self, reply: MockReply) {
        *self.login_reply.lock() = reply;
    }

    pub fn set_ohlc_reply(&self, instrument_id: u64, reply: MockReply) {
        self.ohlc_replies.lock().insert(instrument_id, reply);
    }

    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Recorded OHLC queries in call order.
    pub fn get_queries(&self) -> Vec<OhlcQuery> {
        self.queries.lock().clone()
    }

    /// Tokens sent with OHLC queries in call order.
    pub fn get_tokens(&self) -> Vec<String> {
        self.tokens.lock().clone()
    }
}

impl MarketDataTransport for MockTransport {
    fn login<'a>(&'a self, _request: &'a LoginRequest<'a>) -> BoxFuture<'a, ClientResult<RawResponse>> {
        Box::pin(async move {
            self.login_calls.fetch_add(1, Ordering::SeqCst);
            self.login_reply.lock().clone().into_result()
        })
    }

    fn fetch_ohlc<'a>(
        &'a self,
        query: &'a OhlcQuery,
        token: &'a str,
    ) -> BoxFuture<'a, ClientResult<RawResponse>> {
        Box::pin(async move {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.queries.lock().push(query.clone());
            self.tokens.lock().push(token.to_string());

            let reply = self
                .ohlc_replies
                .lock()
                .get(&query.exchange_instrument_id)
                .cloned()
                .unwrap_or_else(|| MockReply::ohlc(serde_json::Value::String(String::new())));
            reply.into_result()
        })
    }
}
