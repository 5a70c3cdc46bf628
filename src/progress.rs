//! Timer-driven progress signal for in-flight remote calls.
//!
//! The values are cosmetic: they advance on a fixed cadence and say nothing
//! about how far the remote call actually got. The only guarantees are that
//! they never pass the cap before [`ProgressEmitter::complete`] and that
//! nothing is emitted after `complete` or `cancel`.

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::task::JoinHandle;

/// Receives each emitted progress value (0..=100).
pub type ProgressSink = Arc<dyn Fn(u8) + Send + Sync>;

/// Run bookkeeping shared with the ticking task.
#[derive(Default)]
struct Ticker {
    /// Bumped on every start so an older task can tell it was replaced.
    run: u64,
    /// Armed between start and complete/cancel.
    active: bool,
}

/// Emits a bounded, monotonically increasing progress value on a timer.
pub struct ProgressEmitter {
    period: Duration,
    sink: ProgressSink,
    ticker: Arc<Mutex<Ticker>>,
    task: Option<JoinHandle<()>>,
}

impl ProgressEmitter {
    /// Emitter ticking every `period`, reporting into `sink`.
    pub fn new(period: Duration, sink: ProgressSink) -> Self {
        Self {
            period,
            sink,
            ticker: Arc::new(Mutex::new(Ticker::default())),
            task: None,
        }
    }

    /// Start a new run at 0, cancelling any active one.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, step: u8, cap: u8) {
        self.cancel();
        let step = step.max(1);
        let cap = cap.min(100);

        let run = {
            let mut t = lock(&self.ticker);
            t.run += 1;
            t.active = true;
            (self.sink)(0);
            t.run
        };
        tracing::debug!(run, step, cap, "progress started");

        let period = self.period;
        let sink = Arc::clone(&self.sink);
        let ticker = Arc::clone(&self.ticker);
        self.task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately; 0 was already emitted.
            interval.tick().await;
            let mut value = 0u8;
            while value < cap {
                interval.tick().await;
                value = value.saturating_add(step).min(cap);
                let t = lock(&ticker);
                if !t.active || t.run != run {
                    break;
                }
                sink(value);
            }
        }));
    }

    /// Emit 100 once and stop ticking. No-op unless a run is active.
    pub fn complete(&mut self) {
        {
            let mut t = lock(&self.ticker);
            if !t.active {
                return;
            }
            t.active = false;
            (self.sink)(100);
        }
        self.stop_task();
        tracing::debug!("progress completed");
    }

    /// Stop ticking without a final value.
    pub fn cancel(&mut self) {
        let was_active = {
            let mut t = lock(&self.ticker);
            std::mem::replace(&mut t.active, false)
        };
        self.stop_task();
        if was_active {
            tracing::debug!("progress cancelled");
        }
    }

    /// True between `start` and `complete`/`cancel`.
    pub fn is_active(&self) -> bool {
        lock(&self.ticker).active
    }

    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ProgressEmitter {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Lock ignoring poisoning; the ticker holds no invariants a panic could break.
fn lock(ticker: &Mutex<Ticker>) -> MutexGuard<'_, Ticker> {
    ticker.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (ProgressSink, Arc<Mutex<Vec<u8>>>) {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink_values = Arc::clone(&values);
        let sink: ProgressSink = Arc::new(move |v| sink_values.lock().unwrap().push(v));
        (sink, values)
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_cap_before_complete() {
        let (sink, values) = recorder();
        let mut emitter = ProgressEmitter::new(Duration::from_millis(100), sink);
        emitter.start(5, 90);

        tokio::time::sleep(Duration::from_secs(5)).await;
        {
            let v = values.lock().unwrap();
            assert_eq!(v.first(), Some(&0));
            assert_eq!(v.last(), Some(&90));
            assert!(v.iter().all(|x| *x <= 90));
            assert!(v.windows(2).all(|w| w[0] < w[1]));
        }

        emitter.complete();
        tokio::time::sleep(Duration::from_secs(1)).await;
        let v = values.lock().unwrap();
        assert_eq!(v.iter().filter(|x| **x == 100).count(), 1);
        assert_eq!(v.last(), Some(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_stops_ticks_mid_run() {
        let (sink, values) = recorder();
        let mut emitter = ProgressEmitter::new(Duration::from_millis(100), sink);
        emitter.start(3, 90);

        tokio::time::sleep(Duration::from_millis(350)).await;
        emitter.complete();
        let len = values.lock().unwrap().len();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let v = values.lock().unwrap();
        assert_eq!(v.len(), len);
        assert_eq!(v.last(), Some(&100));
        assert!(!emitter.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_emits_nothing_further() {
        let (sink, values) = recorder();
        let mut emitter = ProgressEmitter::new(Duration::from_millis(100), sink);
        emitter.start(5, 90);
        tokio::time::sleep(Duration::from_millis(250)).await;

        emitter.cancel();
        let snapshot = values.lock().unwrap().clone();
        tokio::time::sleep(Duration::from_secs(2)).await;
        emitter.complete();

        assert_eq!(*values.lock().unwrap(), snapshot);
        assert!(!snapshot.contains(&100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_run() {
        let (sink, values) = recorder();
        let mut emitter = ProgressEmitter::new(Duration::from_millis(100), sink);
        emitter.start(10, 90);
        tokio::time::sleep(Duration::from_millis(450)).await;

        values.lock().unwrap().clear();
        emitter.start(5, 20);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(*values.lock().unwrap(), vec![0, 5, 10, 15, 20]);
    }

    #[test]
    fn test_complete_without_start_is_silent() {
        let (sink, values) = recorder();
        let mut emitter = ProgressEmitter::new(Duration::from_millis(100), sink);
        emitter.complete();
        assert!(values.lock().unwrap().is_empty());
    }
}
