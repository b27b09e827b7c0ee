//! Bounded push dispatch queue.
//!
//! Send jobs are enqueued without blocking the webhook response and drained
//! by a background worker with a concurrency cap. A timeout or failure
//! affects only its own send; permanent rejections are logged but never
//! remove the subscription.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use super::{PushSendError, PushSender, PushSubscription};

/// One queued send.
#[derive(Clone, Debug)]
pub struct PushJob {
    pub subscription: PushSubscription,
    pub payload: String,
}

/// Handle to the dispatch queue.
#[derive(Clone)]
pub struct PushDispatcher {
    tx: mpsc::Sender<PushJob>,
}

impl PushDispatcher {
    /// Spawn the worker and return the enqueue handle.
    pub fn spawn(
        sender: Arc<dyn PushSender>,
        concurrency: usize,
        queue_depth: usize,
        send_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        tokio::spawn(run_worker(rx, sender, concurrency.max(1), send_timeout));
        Self { tx }
    }

    /// Enqueue a send without waiting. A full queue drops the job with a
    /// warning rather than stalling webhook ingestion.
    pub fn enqueue(&self, job: PushJob) {
        if let Err(err) = self.tx.try_send(job) {
            warn!(error = %err, "push queue full, dropping notification");
        }
    }
}

async fn run_worker(
    rx: mpsc::Receiver<PushJob>,
    sender: Arc<dyn PushSender>,
    concurrency: usize,
    send_timeout: Duration,
) {
    ReceiverStream::new(rx)
        .for_each_concurrent(concurrency, |job| {
            let sender = sender.clone();
            async move {
                let endpoint = job.subscription.endpoint.clone();
                match tokio::time::timeout(
                    send_timeout,
                    sender.send(&job.subscription, &job.payload),
                )
                .await
                {
                    Ok(Ok(())) => {
                        debug!(endpoint = %endpoint, "push notification delivered");
                    }
                    Ok(Err(PushSendError::Rejected(detail))) => {
                        // Pruning is advisory only; the subscription stays registered
                        warn!(
                            endpoint = %endpoint,
                            detail = %detail,
                            "push endpoint rejected permanently, subscription left in place"
                        );
                    }
                    Ok(Err(PushSendError::Failed(detail))) => {
                        warn!(endpoint = %endpoint, detail = %detail, "push send failed");
                    }
                    Err(_) => {
                        warn!(endpoint = %endpoint, "push send timed out");
                    }
                }
            }
        })
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::push::SubscriptionKeys;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<String>>,
        reject: bool,
    }

    #[async_trait]
    impl PushSender for RecordingSender {
        async fn send(
            &self,
            subscription: &PushSubscription,
            _payload: &str,
        ) -> Result<(), PushSendError> {
            self.sent
                .lock()
                .unwrap()
                .push(subscription.endpoint.clone());
            if self.reject {
                return Err(PushSendError::Rejected("410 Gone".to_string()));
            }
            Ok(())
        }
    }

    fn job(endpoint: &str) -> PushJob {
        PushJob {
            subscription: PushSubscription {
                endpoint: endpoint.to_string(),
                keys: SubscriptionKeys {
                    p256dh: "BPubKey".to_string(),
                    auth: "authsecret".to_string(),
                },
            },
            payload: "{}".to_string(),
        }
    }

    async fn wait_for_sends(sender: &RecordingSender, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if sender.sent.lock().unwrap().len() >= count {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("sends not attempted in time");
    }

    #[tokio::test]
    async fn test_all_jobs_attempted() {
        let sender = Arc::new(RecordingSender::default());
        let dispatcher = PushDispatcher::spawn(
            sender.clone(),
            4,
            32,
            Duration::from_secs(1),
        );

        dispatcher.enqueue(job("https://push.example/a"));
        dispatcher.enqueue(job("https://push.example/b"));
        dispatcher.enqueue(job("https://push.example/c"));

        wait_for_sends(&sender, 3).await;
        let mut sent = sender.sent.lock().unwrap().clone();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                "https://push.example/a",
                "https://push.example/b",
                "https://push.example/c"
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_does_not_stop_later_jobs() {
        let sender = Arc::new(RecordingSender {
            sent: Mutex::new(Vec::new()),
            reject: true,
        });
        let dispatcher = PushDispatcher::spawn(
            sender.clone(),
            1,
            32,
            Duration::from_secs(1),
        );

        dispatcher.enqueue(job("https://push.example/a"));
        dispatcher.enqueue(job("https://push.example/b"));

        // Both sends run even though every one is rejected
        wait_for_sends(&sender, 2).await;
    }
}
