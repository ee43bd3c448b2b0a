use std::thread;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{COOKIE, USER_AGENT};

use crate::error::ScanError;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const FETCH_ATTEMPTS: usize = 3;
const RETRY_STEP_MS: u64 = 1000;

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client, ScanError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ScanError::TransientNetwork(format!("failed to build http client: {err}")))
    })
}

// Fixed pause after every real network fetch; cache hits skip it.
pub fn call_delay_from_env() -> Duration {
    let ms = std::env::var("SCAN_CALL_DELAY_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(1000)
        .min(10_000);
    Duration::from_millis(ms)
}

#[derive(Debug, Clone)]
pub enum Auth {
    None,
    // legacy endpoints take an id_token cookie, modern ones X-Riot-Token
    Cookie(String),
    ApiKey(String),
}

/// Single GET helper shared by every upstream call. `Ok(None)` means HTTP
/// 404 so callers decide what absence means. Retries are linear; 429 and
/// the legacy empty-body throttle surface as `RateLimited` immediately so
/// the traversal loop can run its own longer pause instead.
pub fn get_json(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    auth: &Auth,
) -> Result<Option<String>, ScanError> {
    let mut last_err: Option<ScanError> = None;
    for attempt in 0..FETCH_ATTEMPTS {
        match try_get(client, url, query, auth) {
            Ok(outcome) => return Ok(outcome),
            Err(err @ ScanError::RateLimited) => return Err(err),
            Err(err) => {
                last_err = Some(err);
                if attempt + 1 < FETCH_ATTEMPTS {
                    thread::sleep(Duration::from_millis((attempt as u64 + 1) * RETRY_STEP_MS));
                }
            }
        }
    }
    Err(last_err.unwrap_or_else(|| ScanError::TransientNetwork(format!("request failed: {url}"))))
}

fn try_get(
    client: &Client,
    url: &str,
    query: &[(&str, String)],
    auth: &Auth,
) -> Result<Option<String>, ScanError> {
    let mut req = client.get(url).header(USER_AGENT, "Mozilla/5.0");
    for (name, value) in query {
        req = req.query(&[(*name, value.as_str())]);
    }
    req = match auth {
        Auth::None => req,
        Auth::Cookie(token) => req.header(COOKIE, format!("id_token={token}")),
        Auth::ApiKey(key) => req.header("X-Riot-Token", key.as_str()),
    };

    let resp = req
        .send()
        .map_err(|err| ScanError::TransientNetwork(format!("request failed: {err}")))?;
    let status = resp.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ScanError::RateLimited);
    }
    let body = resp
        .text()
        .map_err(|err| ScanError::TransientNetwork(format!("failed reading body: {err}")))?;
    if !status.is_success() {
        return Err(ScanError::TransientNetwork(format!("http {status}: {body}")));
    }
    classify_body(body)
}

// A 200 with an empty or {} body is how the legacy API signals throttling;
// a 200 wrapping a status envelope is an error in disguise.
fn classify_body(body: String) -> Result<Option<String>, ScanError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "{}" || trimmed == "null" {
        return Err(ScanError::RateLimited);
    }
    if let Some(code) = error_marker(trimmed) {
        if code == 429 {
            return Err(ScanError::RateLimited);
        }
        return Err(ScanError::TransientNetwork(format!("upstream status {code}")));
    }
    Ok(Some(body))
}

fn error_marker(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let status = value.as_object()?.get("status")?;
    status.get("status_code")?.as_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bodies_read_as_rate_limit() {
        assert!(matches!(classify_body(String::new()), Err(ScanError::RateLimited)));
        assert!(matches!(classify_body("{}".to_string()), Err(ScanError::RateLimited)));
        assert!(matches!(classify_body(" null ".to_string()), Err(ScanError::RateLimited)));
    }

    #[test]
    fn status_envelope_is_an_error() {
        let forbidden = r#"{"status":{"message":"Forbidden","status_code":403}}"#.to_string();
        assert!(matches!(classify_body(forbidden), Err(ScanError::TransientNetwork(_))));
        let throttled = r#"{"status":{"message":"Rate limit exceeded","status_code":429}}"#.to_string();
        assert!(matches!(classify_body(throttled), Err(ScanError::RateLimited)));
    }

    #[test]
    fn real_payloads_pass_through() {
        let body = r#"{"accountId":"abc"}"#.to_string();
        assert_eq!(classify_body(body).unwrap().as_deref(), Some(r#"{"accountId":"abc"}"#));
    }
}
