use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::TradeReport;

/// Webhook endpoint and retry policy.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub bearer_token: Option<String>,
    pub http_timeout_ms: u64,
    pub max_retries: u32,
    pub retry_seconds: i64,
}

/// One report awaiting delivery.
#[derive(Debug, Clone)]
pub struct PendingReport {
    pub id: Uuid,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub next_attempt: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("webhook returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// At-least-once outbound delivery queue.
///
/// Reports are retried on a fixed cadence until a 2xx response or until
/// the retry budget is exhausted, then dropped with a warning. The
/// receiving system must tolerate duplicate and out-of-order delivery.
/// Pending order is irrelevant — eligibility is governed by
/// `next_attempt` — so removal uses swap_remove.
pub struct TelemetryDeliveryQueue {
    config: TelemetryConfig,
    client: reqwest::Client,
    pending: Vec<PendingReport>,
    delivered_total: u64,
    dropped_total: u64,
}

impl TelemetryDeliveryQueue {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            pending: Vec::new(),
            delivered_total: 0,
            dropped_total: 0,
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn delivered_total(&self) -> u64 {
        self.delivered_total
    }

    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }

    #[cfg(test)]
    pub fn pending(&self) -> &[PendingReport] {
        &self.pending
    }

    /// Queue a trade report for delivery, eligible immediately.
    pub fn enqueue(&mut self, report: &TradeReport, now: DateTime<Utc>) {
        let payload = match serde_json::to_value(report) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("failed to serialize trade report: {}", e);
                return;
            }
        };

        let pending = PendingReport {
            id: Uuid::new_v4(),
            payload,
            attempts: 0,
            next_attempt: now,
        };
        tracing::debug!("queued report {} ({} pending)", pending.id, self.pending.len() + 1);
        self.pending.push(pending);
    }

    /// Attempt delivery of every due report.
    ///
    /// Iterates in reverse index order so removal cannot shift an index
    /// that is still to be visited. Each attempt is bounded by the
    /// configured HTTP timeout; failures never propagate to the caller.
    pub async fn drain(&mut self, now: DateTime<Utc>) {
        let mut idx = self.pending.len();
        while idx > 0 {
            idx -= 1;
            if self.pending[idx].next_attempt > now {
                continue;
            }

            let outcome = self.post(&self.pending[idx].payload).await;
            match outcome {
                Ok(()) => {
                    let report = self.pending.swap_remove(idx);
                    self.delivered_total += 1;
                    tracing::info!(
                        "report {} delivered after {} retries",
                        report.id,
                        report.attempts
                    );
                }
                Err(e) => {
                    let report = &mut self.pending[idx];
                    report.attempts += 1;
                    if report.attempts >= self.config.max_retries {
                        tracing::warn!(
                            "report {} dropped after {} attempts: {}",
                            report.id,
                            report.attempts,
                            e
                        );
                        self.pending.swap_remove(idx);
                        self.dropped_total += 1;
                    } else {
                        report.next_attempt = now + Duration::seconds(self.config.retry_seconds);
                        tracing::debug!(
                            "report {} attempt {} failed ({}), retrying in {}s",
                            report.id,
                            report.attempts,
                            e,
                            self.config.retry_seconds
                        );
                    }
                }
            }
        }
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<(), DeliveryError> {
        let mut request = self
            .client
            .post(&self.config.url)
            .timeout(std::time::Duration::from_millis(self.config.http_timeout_ms))
            .json(payload);

        if let Some(ref key) = self.config.api_key {
            request = request.header("apikey", key);
        }
        if let Some(ref token) = self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(response.status().as_u16()))
        }
    }
}
