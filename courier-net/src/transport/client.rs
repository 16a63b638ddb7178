//! Blocking HTTP transport with recoverable-error classification.

use std::io::BufReader;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use courier_core::errors::{CourierResult, NetworkError};

use crate::protocol::response::generic_error_body;
use crate::transport::stream::StreamFraming;
use crate::transport::{EdgeRequest, IEdgeTransport, ResponseListener, SendOutcome};

/// Statuses worth retrying: the server is overloaded or a gateway timed
/// out, not a fault in the request itself.
const RECOVERABLE_STATUSES: [u16; 5] = [408, 429, 502, 503, 504];

/// Configuration for the HTTP transport layer.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Whole-request timeout.
    pub timeout: Duration,
    /// Retry delay when the server does not send one.
    pub default_retry_interval: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            default_retry_interval: Duration::from_secs(5),
        }
    }
}

/// HTTP transport. Wraps a blocking reqwest client; one `send` performs a
/// single attempt and classifies the result, retry scheduling stays with
/// the queue.
pub struct EdgeHttpClient {
    client: reqwest::blocking::Client,
    config: HttpClientConfig,
}

impl EdgeHttpClient {
    pub fn new(config: HttpClientConfig) -> CourierResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .gzip(true)
            .build()
            .map_err(|e| NetworkError::ClientBuild(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn consume_stream(
        &self,
        response: reqwest::blocking::Response,
        framing: &StreamFraming,
        listener: &dyn ResponseListener,
    ) -> SendOutcome {
        let reader = BufReader::new(response);
        if let Err(e) = framing.read_records(reader, |record| listener.on_fragment(&record)) {
            // The server already accepted the batch; a dropped connection
            // here only costs the remaining fragments.
            warn!("edge: response stream ended early: {e}");
        }
        listener.on_complete();
        SendOutcome::Delivered
    }

    fn consume_body(
        &self,
        response: reqwest::blocking::Response,
        listener: &dyn ResponseListener,
    ) -> SendOutcome {
        match response.text() {
            Ok(raw) if raw.trim().is_empty() => {}
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(body) => listener.on_fragment(&body),
                Err(e) => warn!("edge: unparseable response body dropped: {e}"),
            },
            Err(e) => warn!("edge: failed to read response body: {e}"),
        }
        listener.on_complete();
        SendOutcome::Delivered
    }

    fn fail(
        &self,
        status: u16,
        response: reqwest::blocking::Response,
        listener: &dyn ResponseListener,
    ) -> SendOutcome {
        let raw = response.text().unwrap_or_default();
        let body = serde_json::from_str::<Value>(&raw)
            .unwrap_or_else(|_| generic_error_body(status, &raw));
        listener.on_error_fragment(&body);
        listener.on_complete();
        SendOutcome::Failed
    }
}

impl IEdgeTransport for EdgeHttpClient {
    fn send(&self, request: &EdgeRequest, listener: &dyn ResponseListener) -> SendOutcome {
        debug!(url = %request.url, "edge: sending request");

        let mut builder = self.client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match builder.send() {
            Ok(response) => response,
            Err(e) if e.is_builder() => {
                // A request that cannot be built will never recover.
                let body = serde_json::json!({
                    "title": "Request could not be built",
                    "detail": e.to_string(),
                });
                listener.on_error_fragment(&body);
                listener.on_complete();
                return SendOutcome::Failed;
            }
            Err(e) => {
                debug!("edge: request did not reach {}: {e}", request.url);
                return SendOutcome::Retry {
                    after: self.config.default_retry_interval,
                };
            }
        };

        let status = response.status().as_u16();
        match status {
            204 => {
                listener.on_complete();
                SendOutcome::Delivered
            }
            200 => match &request.streaming {
                Some(framing) => self.consume_stream(response, framing, listener),
                None => self.consume_body(response, listener),
            },
            // 207 reports per-event warnings; it always arrives unframed.
            207 => self.consume_body(response, listener),
            _ if is_recoverable(status) => {
                let after = retry_delay(response.headers(), self.config.default_retry_interval);
                debug!("edge: recoverable HTTP {status}, retry in {after:?}");
                SendOutcome::Retry { after }
            }
            _ => {
                debug!("edge: unrecoverable HTTP {status}");
                self.fail(status, response, listener)
            }
        }
    }
}

fn is_recoverable(status: u16) -> bool {
    RECOVERABLE_STATUSES.contains(&status)
}

fn retry_delay(headers: &reqwest::header::HeaderMap, default: Duration) -> Duration {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after_secs)
        .unwrap_or(default)
}

/// Numeric `Retry-After` only; HTTP-date values fall back to the default.
fn parse_retry_after_secs(value: &str) -> Option<Duration> {
    value
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_statuses() {
        for status in [408, 429, 502, 503, 504] {
            assert!(is_recoverable(status), "{status} should be recoverable");
        }
        for status in [200, 204, 207, 400, 401, 404, 422, 500] {
            assert!(!is_recoverable(status), "{status} should not be recoverable");
        }
    }

    #[test]
    fn retry_delay_prefers_numeric_retry_after_header() {
        use reqwest::header::{HeaderMap, RETRY_AFTER};

        let default = Duration::from_secs(5);

        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "30".parse().unwrap());
        assert_eq!(retry_delay(&headers, default), Duration::from_secs(30));

        // HTTP-date values are not parsed; they fall back to the default.
        let mut dated = HeaderMap::new();
        dated.insert(RETRY_AFTER, "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_delay(&dated, default), default);

        assert_eq!(retry_delay(&HeaderMap::new(), default), default);
    }

    #[test]
    fn retry_after_parses_positive_seconds_only() {
        assert_eq!(
            parse_retry_after_secs("30"),
            Some(Duration::from_secs(30))
        );
        assert_eq!(parse_retry_after_secs(" 5 "), Some(Duration::from_secs(5)));
        assert_eq!(parse_retry_after_secs("0"), None);
        assert_eq!(parse_retry_after_secs("-3"), None);
        assert_eq!(parse_retry_after_secs("Wed, 21 Oct 2026 07:28:00 GMT"), None);
    }
}
