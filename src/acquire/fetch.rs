use crate::error::AcquireError;
use crate::shared::types::MetricsSnapshot;

#[cfg(not(feature = "web"))]
use once_cell::sync::Lazy;
#[cfg(not(feature = "web"))]
use reqwest::Client;

#[cfg(not(feature = "web"))]
static CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap_or_default()
});

/// GETs one snapshot. Every failure, including an undecodable body, is a
/// `Fetch` error.
#[cfg(not(feature = "web"))]
pub async fn fetch_current_metrics(url: &str) -> Result<MetricsSnapshot, AcquireError> {
    let res = CLIENT
        .get(url)
        .header("Cache-Control", "no-store")
        .send()
        .await
        .map_err(|e| AcquireError::Fetch(format!("GET {url}: {e}")))?;
    if !res.status().is_success() {
        return Err(AcquireError::Fetch(format!("GET {url} returned {}", res.status())));
    }
    let bytes = res
        .bytes()
        .await
        .map_err(|e| AcquireError::Fetch(format!("reading body from {url}: {e}")))?;
    decode_snapshot(url, &bytes)
}

#[cfg(feature = "web")]
pub async fn fetch_current_metrics(url: &str) -> Result<MetricsSnapshot, AcquireError> {
    use gloo_net::http::Request;

    let res = Request::get(url)
        .header("Cache-Control", "no-store")
        .send()
        .await
        .map_err(|e| AcquireError::Fetch(format!("GET {url}: {e}")))?;
    if !res.ok() {
        return Err(AcquireError::Fetch(format!("GET {url} returned {}", res.status())));
    }
    let bytes = res
        .binary()
        .await
        .map_err(|e| AcquireError::Fetch(format!("reading body from {url}: {e}")))?;
    decode_snapshot(url, &bytes)
}

pub fn decode_snapshot(url: &str, bytes: &[u8]) -> Result<MetricsSnapshot, AcquireError> {
    serde_json::from_slice(bytes).map_err(|e| {
        let snip = String::from_utf8_lossy(bytes);
        let snip = snip.chars().take(300).collect::<String>();
        AcquireError::Fetch(format!(
            "decoding JSON from {url} failed: {e}\nBody snippet: {snip}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_snapshot_body() {
        let body = br#"{"activeRides": 5, "averageDuration": 3.0, "topCities": [], "timestamp": "2024-01-01T00:00:00"}"#;
        let s = decode_snapshot("/metrics/current", body).unwrap();
        assert_eq!(s.active_rides, 5);
    }

    #[test]
    fn bad_body_is_a_fetch_error_with_snippet() {
        let err = decode_snapshot("/metrics/current", b"<html>502 Bad Gateway</html>").unwrap_err();
        match err {
            AcquireError::Fetch(msg) => {
                assert!(msg.contains("/metrics/current"));
                assert!(msg.contains("502 Bad Gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
