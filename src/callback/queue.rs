use tokio::sync::Mutex;

/// A callback event parked while another writer held the sync lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub sp_no: String,
    /// The pushed status hint; dispatch refetches the authoritative one.
    pub status: i64,
}

/// In-memory queue drained on a short interval once the lock frees up.
#[derive(Debug, Default)]
pub struct CallbackQueue {
    items: Mutex<Vec<QueuedEvent>>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, sp_no: String, status: i64) {
        self.items.lock().await.push(QueuedEvent { sp_no, status });
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    /// Takes everything, deduplicated by approval number with the latest
    /// status winning; arrival order of first appearance is kept.
    pub async fn drain_deduped(&self) -> Vec<QueuedEvent> {
        let drained = std::mem::take(&mut *self.items.lock().await);

        let mut order: Vec<String> = Vec::new();
        let mut latest: std::collections::HashMap<String, i64> = std::collections::HashMap::new();
        for event in drained {
            if !latest.contains_key(&event.sp_no) {
                order.push(event.sp_no.clone());
            }
            latest.insert(event.sp_no, event.status);
        }

        order
            .into_iter()
            .map(|sp_no| {
                let status = latest[&sp_no];
                QueuedEvent { sp_no, status }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drain_dedupes_keeping_latest_status() {
        let queue = CallbackQueue::new();
        queue.push("A1".into(), 1).await;
        queue.push("A2".into(), 1).await;
        queue.push("A1".into(), 2).await;

        let drained = queue.drain_deduped().await;
        assert_eq!(
            drained,
            vec![
                QueuedEvent {
                    sp_no: "A1".into(),
                    status: 2
                },
                QueuedEvent {
                    sp_no: "A2".into(),
                    status: 1
                },
            ]
        );
        assert!(queue.is_empty().await);
    }

    #[tokio::test]
    async fn drain_on_empty_queue_is_empty() {
        let queue = CallbackQueue::new();
        assert!(queue.drain_deduped().await.is_empty());
    }
}
