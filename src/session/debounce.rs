use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Destination of a debounced value, e.g. a progress endpoint or a settings file.
#[async_trait]
pub trait DebouncedSink<T>: Send + Sync {
    async fn deliver(&self, value: T) -> anyhow::Result<()>;
}

#[derive(Debug)]
struct Slots<T> {
    pending: Option<T>,
    delivered: Option<T>,
}

/// Coalesces rapid updates into one delivery after a quiet period.
///
/// Only the most recently scheduled value is ever delivered. Rescheduling cancels the
/// quiet period, never a delivery already under way; deliveries run one at a time in
/// the order they were started. A failed delivery is logged and left for the next
/// `schedule` or `flush` to retry with the latest value.
pub struct Debouncer<T> {
    label: &'static str,
    delay: Duration,
    sink: Arc<dyn DebouncedSink<T>>,
    slots: Arc<Mutex<Slots<T>>>,
    delivering: Arc<Mutex<()>>,
    latest: Option<T>,
    timer: Option<JoinHandle<()>>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + std::fmt::Debug + 'static,
{
    pub fn new(label: &'static str, delay: Duration, sink: Arc<dyn DebouncedSink<T>>) -> Self {
        Self {
            label,
            delay,
            sink,
            slots: Arc::new(Mutex::new(Slots {
                pending: None,
                delivered: None,
            })),
            delivering: Arc::new(Mutex::new(())),
            latest: None,
            timer: None,
        }
    }

    pub fn latest(&self) -> Option<&T> {
        self.latest.as_ref()
    }

    /// Replaces whatever is waiting and restarts the quiet period.
    pub async fn schedule(&mut self, value: T) {
        self.cancel_timer();
        self.latest = Some(value.clone());
        self.slots.lock().await.pending = Some(value);

        let label = self.label;
        let delay = self.delay;
        let sink = Arc::clone(&self.sink);
        let slots = Arc::clone(&self.slots);
        let delivering = Arc::clone(&self.delivering);
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached from the timer so that cancelling the timer cannot cut it short.
            tokio::spawn(async move {
                let _turn = delivering.lock().await;
                let Some(value) = slots.lock().await.pending.take() else {
                    return;
                };
                deliver(label, sink.as_ref(), &slots, value).await;
            });
        }));
    }

    /// Cancels the timer and delivers the latest value now unless it already went out.
    /// Waits for a delivery that is already running to finish first.
    pub async fn flush(&mut self) {
        self.cancel_timer();
        let _turn = self.delivering.lock().await;
        let value = {
            let mut slots = self.slots.lock().await;
            match slots.pending.take() {
                Some(value) => Some(value),
                None if slots.delivered != self.latest => self.latest.clone(),
                None => None,
            }
        };
        if let Some(value) = value {
            deliver(self.label, self.sink.as_ref(), &self.slots, value).await;
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

async fn deliver<T>(label: &str, sink: &dyn DebouncedSink<T>, slots: &Mutex<Slots<T>>, value: T)
where
    T: Clone + std::fmt::Debug,
{
    match sink.deliver(value.clone()).await {
        Ok(()) => {
            tracing::debug!(debouncer = label, ?value, "delivered");
            slots.lock().await.delivered = Some(value);
        }
        Err(err) => {
            tracing::warn!(debouncer = label, ?value, ?err, "delivery failed; will retry on next change");
        }
    }
}
