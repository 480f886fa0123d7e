use tokio::{
    sync::Mutex,
    time::{self, Duration, Instant},
};

/// Keeps a minimum interval between external requests.
///
/// One pacer is shared by every sync pass of a process, so interactive calls and the batch
/// draw from the same budget.
pub struct Pacer {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Waits until a request may be issued and records it as issued now.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(at) = *last {
            time::sleep_until(at + self.interval).await;
        }
        *last = Some(Instant::now());
    }

    /// Waits `extra` beyond the interval since the last request, without taking a slot.
    ///
    /// The next [`Pacer::wait`] then returns immediately unless another request got in between.
    pub async fn wait_extra(&self, extra: Duration) {
        let last = self.last.lock().await;
        match *last {
            Some(at) => time::sleep_until(at + self.interval + extra).await,
            None => time::sleep(extra).await,
        }
    }
}
