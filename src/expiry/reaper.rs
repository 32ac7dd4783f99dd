//! Reaper implementation
//!
//! The reaper runs in its own thread with a dedicated single-threaded tokio
//! runtime, so stores can be used from synchronous code as well as from
//! inside another runtime. Pending tasks sit in a `DelayQueue`; sleeping
//! never holds the store lock.

use super::{ExpiryTarget, ExpiryTask};
use std::future::poll_fn;
use std::io;
use std::sync::Weak;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::time::DelayQueue;
use tracing::{debug, error, trace};

/// Longest delay handed to the timer wheel at once; longer tasks are re-armed
const MAX_DELAY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// A task waiting in the queue
struct Pending<K> {
    key: K,
    stamp: u64,
    deadline: Instant,
}

/// Handle to a running reaper thread
///
/// Dropping the handle closes the task channel; the thread then exits and
/// every pending task is discarded.
pub(crate) struct Reaper<K> {
    /// Channel to send tasks to the reaper thread
    task_tx: mpsc::UnboundedSender<ExpiryTask<K>>,
}

impl<K> Reaper<K>
where
    K: Send + 'static,
{
    /// Start a reaper thread applying tasks to `target`
    ///
    /// The reaper holds only a weak reference, so it never keeps the
    /// target alive.
    pub fn spawn(target: Weak<dyn ExpiryTarget<K>>) -> io::Result<Self> {
        let (task_tx, task_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name("keystore-reaper".to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create reaper runtime: {}", e);
                        return;
                    }
                };

                runtime.block_on(Self::run_reaper_loop(target, task_rx));
            })?;

        debug!("Expiry reaper started");

        Ok(Reaper { task_tx })
    }

    /// Hand a task to the reaper
    ///
    /// Returns false if the reaper thread is no longer running.
    pub fn schedule(&self, task: ExpiryTask<K>) -> bool {
        self.task_tx.send(task).is_ok()
    }

    /// The main loop that runs in the reaper's thread
    async fn run_reaper_loop(
        target: Weak<dyn ExpiryTarget<K>>,
        mut task_rx: mpsc::UnboundedReceiver<ExpiryTask<K>>,
    ) {
        let mut queue: DelayQueue<Pending<K>> = DelayQueue::new();

        loop {
            tokio::select! {
                // Register new tasks
                task = task_rx.recv() => match task {
                    Some(task) => {
                        // A deadline past the clock's range never arrives
                        let Some(deadline) = Instant::now().checked_add(task.ttl) else {
                            trace!(stamp = task.stamp, "Expiry task dropped, ttl out of range");
                            continue;
                        };
                        queue.insert(
                            Pending { key: task.key, stamp: task.stamp, deadline },
                            task.ttl.min(MAX_DELAY),
                        );
                    }
                    None => {
                        debug!("Store dropped, reaper exiting ({} pending tasks discarded)", queue.len());
                        break;
                    }
                },

                // Apply tasks whose delay has elapsed
                Some(expired) = poll_fn(|cx| queue.poll_expired(cx)), if !queue.is_empty() => {
                    let pending = expired.into_inner();

                    let remaining = pending.deadline.saturating_duration_since(Instant::now());
                    if !remaining.is_zero() {
                        queue.insert(pending, remaining.min(MAX_DELAY));
                        continue;
                    }

                    let Some(target) = target.upgrade() else {
                        debug!("Store released, reaper exiting");
                        break;
                    };

                    let removed = target.expire(&pending.key, pending.stamp);
                    trace!(stamp = pending.stamp, removed, "Expiry task fired");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTarget {
        fired: Mutex<Vec<(&'static str, u64)>>,
    }

    impl ExpiryTarget<&'static str> for RecordingTarget {
        fn expire(&self, key: &&'static str, stamp: u64) -> bool {
            self.fired.lock().unwrap().push((*key, stamp));
            true
        }
    }

    fn spawn_for(target: &Arc<RecordingTarget>) -> Reaper<&'static str> {
        let weak = Arc::downgrade(target);
        let weak: Weak<dyn ExpiryTarget<&'static str>> = weak;
        Reaper::spawn(weak).unwrap()
    }

    #[test]
    fn test_tasks_fire_in_deadline_order() {
        let target = Arc::new(RecordingTarget::default());
        let reaper = spawn_for(&target);

        assert!(reaper.schedule(ExpiryTask::new("late", Duration::from_millis(150), 1)));
        assert!(reaper.schedule(ExpiryTask::new("early", Duration::from_millis(50), 2)));

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(*target.fired.lock().unwrap(), vec![("early", 2)]);

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(
            *target.fired.lock().unwrap(),
            vec![("early", 2), ("late", 1)]
        );
    }

    #[test]
    fn test_task_not_applied_before_deadline() {
        let target = Arc::new(RecordingTarget::default());
        let reaper = spawn_for(&target);

        assert!(reaper.schedule(ExpiryTask::new("key1", Duration::from_secs(60), 1)));
        std::thread::sleep(Duration::from_millis(50));

        assert!(target.fired.lock().unwrap().is_empty());
    }

    #[test]
    fn test_huge_ttl_does_not_stop_reaper() {
        let target = Arc::new(RecordingTarget::default());
        let reaper = spawn_for(&target);

        assert!(reaper.schedule(ExpiryTask::new("forever", Duration::MAX, 1)));
        assert!(reaper.schedule(ExpiryTask::new("decade", Duration::from_secs(10 * 365 * 86_400), 2)));
        assert!(reaper.schedule(ExpiryTask::new("now", Duration::ZERO, 3)));
        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(*target.fired.lock().unwrap(), vec![("now", 3)]);
        assert!(reaper.schedule(ExpiryTask::new("later", Duration::ZERO, 4)));
    }

    #[test]
    fn test_reaper_stops_when_target_dropped() {
        let target = Arc::new(RecordingTarget::default());
        let reaper = spawn_for(&target);
        drop(target);

        // The first task to fire finds the target gone and ends the loop
        assert!(reaper.schedule(ExpiryTask::new("key1", Duration::ZERO, 1)));
        std::thread::sleep(Duration::from_millis(100));

        assert!(!reaper.schedule(ExpiryTask::new("key2", Duration::ZERO, 2)));
    }
}
