//! Push-notification processing: verify + decrypt, filter, classify, and
//! either dispatch under the sync lock or park the event for the drain
//! task.

pub mod queue;
pub mod xml;

pub use queue::{CallbackQueue, QueuedEvent};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::crypto::CallbackCodec;
use crate::error::CryptoError;
use crate::sync::SyncService;

/// Upstream event code for approval comments; nothing to sync.
const COMMENT_EVENT: i64 = 10;
const DRAIN_INTERVAL: Duration = Duration::from_secs(2);
const LEAVE_RECORD: &str = "leave";

pub struct CallbackProcessor {
    codec: CallbackCodec,
    service: Arc<SyncService>,
    queue: Arc<CallbackQueue>,
}

impl CallbackProcessor {
    pub fn new(codec: CallbackCodec, service: Arc<SyncService>, queue: Arc<CallbackQueue>) -> Self {
        Self {
            codec,
            service,
            queue,
        }
    }

    pub fn queue(&self) -> &CallbackQueue {
        &self.queue
    }

    /// URL verification handshake: check the signature over `echostr`,
    /// then return its decrypted plaintext as the response body.
    pub fn verify_url(
        &self,
        msg_signature: &str,
        timestamp: &str,
        nonce: &str,
        echostr: &str,
    ) -> Result<String, CryptoError> {
        if !self.codec.verify(msg_signature, timestamp, nonce, echostr) {
            return Err(CryptoError::SignatureMismatch);
        }
        self.codec.decrypt(echostr)
    }

    /// Processes one pushed event. Never fails: the HTTP layer must
    /// answer `success` regardless, so every failure is logged and
    /// swallowed here.
    pub async fn handle_event(&self, msg_signature: &str, timestamp: &str, nonce: &str, body: &str) {
        let Some(ciphertext) = xml::extract_encrypt(body) else {
            tracing::warn!("Callback body without Encrypt element, dropping");
            return;
        };
        if !self.codec.verify(msg_signature, timestamp, nonce, &ciphertext) {
            tracing::warn!("Callback signature mismatch, dropping event");
            return;
        }
        let plaintext = match self.codec.decrypt(&ciphertext) {
            Ok(plaintext) => plaintext,
            Err(err) => {
                tracing::warn!(%err, "Callback decrypt failed, dropping event");
                return;
            }
        };
        let Some(event) = xml::parse_approval_event(&plaintext) else {
            tracing::debug!("Callback without ApprovalInfo SpNo, ignoring");
            return;
        };

        self.accept_event(event).await;
    }

    async fn accept_event(&self, event: xml::ApprovalEvent) {
        if let Some(name) = event.sp_name.as_deref() {
            if name != LEAVE_RECORD {
                tracing::debug!(sp_no = %event.sp_no, sp_name = name, "Ignoring non-leave event");
                return;
            }
        }
        if event.status_change_event == Some(COMMENT_EVENT) {
            tracing::debug!(sp_no = %event.sp_no, "Ignoring comment event");
            return;
        }
        if event.sp_status == Some(1) {
            // An intermediate step inside a flow we already track.
            match self.service.active_index().await {
                Ok(index) if index.contains(&event.sp_no) => {
                    tracing::debug!(sp_no = %event.sp_no, "Pending event for tracked approval, ignoring");
                    return;
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(%err, "Active index read failed during event filter");
                }
            }
        }

        match self.service.lock().try_acquire() {
            Some(_guard) => {
                if let Err(err) = self.service.dispatch_event_locked(&event.sp_no).await {
                    tracing::warn!(sp_no = %event.sp_no, %err, "Callback dispatch failed");
                }
            }
            None => {
                let status = event.sp_status.unwrap_or_default();
                tracing::info!(sp_no = %event.sp_no, status, "Sync in progress, queueing event");
                self.queue.push(event.sp_no, status).await;
            }
        }
    }

    /// One drain pass: when the queue has items and the lock is free,
    /// dispatch each deduplicated entry once.
    pub async fn drain_once(&self) {
        if self.queue.is_empty().await {
            return;
        }
        let Some(_guard) = self.service.lock().try_acquire() else {
            return;
        };

        let events = self.queue.drain_deduped().await;
        tracing::debug!(count = events.len(), "Draining queued callback events");
        for event in events {
            if let Err(err) = self.service.dispatch_event_locked(&event.sp_no).await {
                tracing::warn!(sp_no = %event.sp_no, %err, "Queued dispatch failed");
            }
        }
    }
}

/// Starts the 2-second drain loop. Only called when callback credentials
/// are configured.
pub fn spawn_drain(processor: Arc<CallbackProcessor>, mut shutdown: watch::Receiver<bool>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(DRAIN_INTERVAL);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => processor.drain_once().await,
                _ = shutdown.changed() => return,
            }
        }
    });
}
