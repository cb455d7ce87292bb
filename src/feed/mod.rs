use reqwest::Client;
use std::time::Duration;

use crate::models::BarSnapshot;

/// Pull-based client for the external indicator bridge.
///
/// The bridge computes RSI/ADX on the primary and secondary timeframes
/// and serves the latest closed bar as JSON. Anything short of a fully
/// formed bar — not-ready responses, transport errors, malformed bodies —
/// yields `None` and the engine skips that tick.
#[derive(Clone)]
pub struct BridgeFeedClient {
    client: Client,
    url: String,
    timeout_ms: u64,
}

impl BridgeFeedClient {
    pub fn new(url: String, timeout_ms: u64) -> Self {
        Self {
            client: Client::new(),
            url,
            timeout_ms,
        }
    }

    /// Latest closed bar, or None when the feed is not ready.
    pub async fn latest_bar(&self) -> Option<BarSnapshot> {
        match self.fetch().await {
            Ok(bar) => bar,
            Err(e) => {
                tracing::debug!("indicator bridge unavailable: {}", e);
                None
            }
        }
    }

    async fn fetch(&self) -> crate::Result<Option<BarSnapshot>> {
        let response = self
            .client
            .get(&self.url)
            .timeout(Duration::from_millis(self.timeout_ms))
            .send()
            .await?;

        // 204 is the bridge's "no closed bar yet" sentinel
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !response.status().is_success() {
            tracing::debug!("indicator bridge returned {}", response.status());
            return Ok(None);
        }

        match response.json::<BarSnapshot>().await {
            Ok(bar) => Ok(Some(bar)),
            Err(e) => {
                tracing::warn!("indicator bridge sent malformed bar: {}", e);
                Ok(None)
            }
        }
    }
}
