//! HTTP feed client.
//!
//! Implements [`FeedPort`] with a plain GET.  The response is read in 1 KiB
//! chunks into a buffer that is kept between requests and capped at
//! [`MAX_BODY_BYTES`]; [`FeedPort::release_buffers`] hands that memory back
//! when the heap runs tight.
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` wrapped in the
//!   `embedded_svc` client, one connection per request.
//! - **other targets**: returns a canned two-prediction feed body.

use core::time::Duration;

use log::{debug, warn};

use crate::app::ports::FeedPort;
use crate::error::TransportError;

/// Largest body accepted; the arrivals feed for one station is a few KiB.
pub const MAX_BODY_BYTES: usize = 32 * 1024;

#[cfg(target_os = "espidf")]
const READ_CHUNK: usize = 1024;

pub struct HttpFeedClient {
    body: Vec<u8>,
    requests: u32,
}

impl Default for HttpFeedClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFeedClient {
    pub fn new() -> Self {
        Self {
            body: Vec::new(),
            requests: 0,
        }
    }

    /// Requests issued since construction.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Bytes currently held by the receive buffer.
    pub fn buffer_capacity(&self) -> usize {
        self.body.capacity()
    }

    fn take_body(&mut self) -> Result<String, TransportError> {
        let text = core::str::from_utf8(&self.body).map_err(|_| TransportError::Body)?;
        Ok(text.to_owned())
    }

    #[cfg(target_os = "espidf")]
    fn fetch(&mut self, url: &str, timeout: Duration) -> Result<(), TransportError> {
        use embedded_svc::http::Method;
        use embedded_svc::http::client::Client;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let config = Configuration {
            timeout: Some(timeout),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&config).map_err(|e| {
            warn!("HTTP: connection setup failed: {}", e);
            TransportError::Connect
        })?;
        let mut client = Client::wrap(connection);

        let request = client
            .request(Method::Get, url, &[("accept", "application/json")])
            .map_err(|_| TransportError::Connect)?;
        let mut response = request.submit().map_err(|e| classify(e.0.code()))?;

        let status = response.status();
        debug!("HTTP: GET -> {}", status);
        if status != 200 {
            return Err(TransportError::Status(status));
        }

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = response.read(&mut chunk).map_err(|e| classify(e.0.code()))?;
            if n == 0 {
                break;
            }
            if self.body.len() + n > MAX_BODY_BYTES {
                return Err(TransportError::TooLarge);
            }
            self.body.extend_from_slice(&chunk[..n]);
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn fetch(&mut self, url: &str, timeout: Duration) -> Result<(), TransportError> {
        debug!("HTTP(sim): GET {} (timeout {:?})", url, timeout);
        let body = sim_body();
        if body.len() > MAX_BODY_BYTES {
            return Err(TransportError::TooLarge);
        }
        self.body.extend_from_slice(body.as_bytes());
        Ok(())
    }
}

/// Map an ESP-IDF error code from the HTTP client to a transport error.
#[cfg(target_os = "espidf")]
fn classify(code: i32) -> TransportError {
    if code == esp_idf_svc::sys::ESP_ERR_TIMEOUT as i32 {
        TransportError::Timeout
    } else {
        TransportError::Connect
    }
}

/// A realistic feed body: two predictions, two minutes and nine minutes
/// out relative to the prediction time.
#[cfg(not(target_os = "espidf"))]
fn sim_body() -> String {
    let now = crate::adapters::time::local_now().unwrap_or_default();
    let stamp = |offset_secs: i64| {
        (now + chrono::Duration::seconds(offset_secs))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string()
    };
    format!(
        r#"{{"ctatt":{{"tmst":"{p}","errCd":"0","errNm":null,"eta":[
{{"staNm":"Sim","destNm":"Loop","prdt":"{p}","arrT":"{a}","isApp":"0","isSch":"0"}},
{{"staNm":"Sim","destNm":"Loop","prdt":"{p}","arrT":"{b}","isApp":"0","isSch":"1"}}]}}}}"#,
        p = stamp(0),
        a = stamp(150),
        b = stamp(560),
    )
}

impl FeedPort for HttpFeedClient {
    fn get(&mut self, url: &str, timeout: Duration) -> Result<String, TransportError> {
        self.requests = self.requests.wrapping_add(1);
        self.body.clear();
        let result = self.fetch(url, timeout).and_then(|()| self.take_body());
        if let Err(e) = &result {
            warn!("HTTP: request {} failed: {}", self.requests, e);
        }
        result
    }

    fn release_buffers(&mut self) -> usize {
        let released = self.body.capacity();
        self.body = Vec::new();
        released
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::feed::parse_feed_body;

    #[test]
    fn sim_body_is_a_valid_feed() {
        let mut client = HttpFeedClient::new();
        let body = client.get("http://example.invalid", Duration::from_secs(1)).unwrap();
        let predictions = parse_feed_body(&body).unwrap();
        assert_eq!(predictions.len(), 2);
        assert_eq!(client.requests(), 1);
    }

    #[test]
    fn release_returns_buffer_capacity() {
        let mut client = HttpFeedClient::new();
        client.get("http://example.invalid", Duration::from_secs(1)).unwrap();
        assert!(client.buffer_capacity() > 0);
        let released = client.release_buffers();
        assert!(released > 0);
        assert_eq!(client.buffer_capacity(), 0);
        assert_eq!(client.release_buffers(), 0);
    }
}
