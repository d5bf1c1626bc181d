//! Batched approval-detail fetching.
//!
//! Two modes with different tolerance for pressure on the upstream:
//! bulk (poller) runs narrow windows with an adaptive inter-batch delay
//! and per-item rate-limit retries; status-check (checker) runs wider
//! windows with a fixed short delay and no retries, because the checker
//! revisits every entry on its next tick anyway.

use futures::future::join_all;
use std::time::Duration;

use crate::error::SyncError;
use crate::wecom::types::ApprovalDetail;
use crate::wecom::ApprovalPlatform;

const BULK_CONCURRENCY: usize = 3;
const BULK_BASE_DELAY_MS: u64 = 100;
const BULK_MAX_DELAY_MS: u64 = 500;
const BULK_MIN_DELAY_MS: u64 = 50;
/// Exponential back-off applied per item on upstream code 45009.
const RATE_LIMIT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(2),
    Duration::from_secs(4),
    Duration::from_secs(8),
];

const STATUS_CONCURRENCY: usize = 5;
const STATUS_DELAY_MS: u64 = 50;

/// Details that survived the batch, in input order. Items that failed
/// (after retries, where applicable) are dropped and counted.
pub struct BatchOutcome {
    pub details: Vec<ApprovalDetail>,
    pub failed: usize,
}

struct ItemFetch {
    detail: Option<ApprovalDetail>,
    rate_limited: bool,
}

/// Bulk mode: concurrency window of 3 with adaptive pacing. A batch that
/// saw any rate limit doubles the delay (capped); a clean batch decays it
/// back toward the floor.
pub async fn fetch_details_bulk(
    platform: &dyn ApprovalPlatform,
    sp_nos: &[String],
) -> BatchOutcome {
    let mut details = Vec::with_capacity(sp_nos.len());
    let mut failed = 0;
    let mut delay_ms = BULK_BASE_DELAY_MS;

    let mut batches = sp_nos.chunks(BULK_CONCURRENCY).peekable();
    while let Some(batch) = batches.next() {
        let fetches = join_all(batch.iter().map(|sp_no| fetch_with_retry(platform, sp_no))).await;

        let mut batch_rate_limited = false;
        for fetch in fetches {
            batch_rate_limited |= fetch.rate_limited;
            match fetch.detail {
                Some(detail) => details.push(detail),
                None => failed += 1,
            }
        }

        if batch_rate_limited {
            delay_ms = (delay_ms * 2).min(BULK_MAX_DELAY_MS);
        } else {
            delay_ms = (delay_ms * 9 / 10).max(BULK_MIN_DELAY_MS);
        }

        if batches.peek().is_some() {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    BatchOutcome { details, failed }
}

/// Status-check mode: concurrency window of 5, fixed pacing, no retries.
pub async fn fetch_details_status(
    platform: &dyn ApprovalPlatform,
    sp_nos: &[String],
) -> BatchOutcome {
    let mut details = Vec::with_capacity(sp_nos.len());
    let mut failed = 0;

    let mut batches = sp_nos.chunks(STATUS_CONCURRENCY).peekable();
    while let Some(batch) = batches.next() {
        let fetches = join_all(batch.iter().map(|sp_no| async move {
            match platform.approval_detail(sp_no).await {
                Ok(detail) => Some(detail),
                Err(err) => {
                    tracing::warn!(sp_no = %sp_no, %err, "Status-check detail fetch failed");
                    None
                }
            }
        }))
        .await;

        for fetch in fetches {
            match fetch {
                Some(detail) => details.push(detail),
                None => failed += 1,
            }
        }

        if batches.peek().is_some() {
            tokio::time::sleep(Duration::from_millis(STATUS_DELAY_MS)).await;
        }
    }

    BatchOutcome { details, failed }
}

async fn fetch_with_retry(platform: &dyn ApprovalPlatform, sp_no: &str) -> ItemFetch {
    let mut rate_limited = false;

    for (attempt, backoff) in RATE_LIMIT_BACKOFF.iter().enumerate() {
        match platform.approval_detail(sp_no).await {
            Ok(detail) => {
                return ItemFetch {
                    detail: Some(detail),
                    rate_limited,
                }
            }
            Err(SyncError::RateLimited { .. }) => {
                rate_limited = true;
                tracing::warn!(
                    sp_no = %sp_no,
                    attempt = attempt + 1,
                    backoff_secs = backoff.as_secs(),
                    "Rate limited fetching approval detail, backing off"
                );
                tokio::time::sleep(*backoff).await;
            }
            Err(err) => {
                tracing::warn!(sp_no = %sp_no, %err, "Approval detail fetch failed");
                return ItemFetch {
                    detail: None,
                    rate_limited,
                };
            }
        }
    }

    // One last try after the final back-off window.
    match platform.approval_detail(sp_no).await {
        Ok(detail) => ItemFetch {
            detail: Some(detail),
            rate_limited,
        },
        Err(err) => {
            tracing::warn!(sp_no = %sp_no, %err, "Approval detail fetch exhausted retries");
            ItemFetch {
                detail: None,
                rate_limited,
            }
        }
    }
}
