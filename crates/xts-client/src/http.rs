//! reqwest-backed transport for the XTS market-data REST API.

use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::transport::{BoxFuture, LoginRequest, MarketDataTransport, OhlcQuery, RawResponse};

/// Market-data login endpoint.
pub const LOGIN_PATH: &str = "/apimarketdata/auth/login";

/// Historical OHLC endpoint.
pub const OHLC_PATH: &str = "/apimarketdata/instruments/ohlc";

/// HTTP transport.
pub struct HttpTransport {
    client: Client,
    /// Server root, e.g. `https://developers.symphonyfintech.in`.
    base_url: String,
}

impl HttpTransport {
    /// Create a transport with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl MarketDataTransport for HttpTransport {
    fn login<'a>(&'a self, request: &'a LoginRequest<'a>) -> BoxFuture<'a, ClientResult<RawResponse>> {
        Box::pin(async move {
            let url = self.url(LOGIN_PATH);
            debug!(url = %url, source = %request.source(), "POST login");

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(request_error)?;
            read_response(response).await
        })
    }

    fn fetch_ohlc<'a>(
        &'a self,
        query: &'a OhlcQuery,
        token: &'a str,
    ) -> BoxFuture<'a, ClientResult<RawResponse>> {
        Box::pin(async move {
            let url = self.url(OHLC_PATH);
            debug!(
                url = %url,
                segment = query.exchange_segment,
                instrument_id = query.exchange_instrument_id,
                start = %query.start_time,
                end = %query.end_time,
                "GET ohlc"
            );

            let response = self
                .client
                .get(&url)
                .header(AUTHORIZATION, token)
                .query(query)
                .send()
                .await
                .map_err(request_error)?;
            read_response(response).await
        })
    }
}

async fn read_response(response: Response) -> ClientResult<RawResponse> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(|e| ClientError::Transport {
        status: Some(status),
        message: format!("Failed to read response body: {e}"),
    })?;
    Ok(RawResponse { status, body })
}

fn request_error(e: reqwest::Error) -> ClientError {
    let message = if e.is_timeout() {
        format!("Request timed out: {e}")
    } else {
        format!("HTTP request failed: {e}")
    };
    ClientError::Transport {
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}
