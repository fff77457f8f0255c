use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

type Callback = Box<dyn FnOnce() + Send>;

struct ClockState {
    pending: Option<Callback>,
    /// Set from the first `tick` of a frame until its run has finished.
    busy: bool,
    last_tick: Instant,
}

/// Frame coalescer: runs at most one callback per frame.
///
/// A `tick` while another callback is waiting replaces it; the replaced
/// callback never runs.
#[derive(Clone)]
pub struct Clock {
    frame: Duration,
    state: Arc<Mutex<ClockState>>,
}

impl Clock {
    pub fn new(frames_per_second: u32) -> Self {
        Self {
            frame: Duration::from_secs(1) / frames_per_second.max(1),
            state: Arc::new(Mutex::new(ClockState {
                pending: None,
                busy: false,
                last_tick: Instant::now(),
            })),
        }
    }

    pub fn frame(&self) -> Duration {
        self.frame
    }

    pub fn is_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub async fn tick<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut wait = {
            let mut state = self.lock();
            state.pending = Some(Box::new(callback));
            if state.busy {
                return;
            }
            state.busy = true;
            self.frame.saturating_sub(state.last_tick.elapsed())
        };

        loop {
            if wait > Duration::from_secs(0) {
                tokio::time::sleep(wait).await;
            }

            let callback = self.lock().pending.take();
            if let Some(callback) = callback {
                callback();
            }

            {
                let mut state = self.lock();
                state.last_tick = Instant::now();
                if state.pending.is_none() {
                    state.busy = false;
                    return;
                }
            }
            // Supplied while the callback ran; it gets a frame of its own.
            wait = self.frame;
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> Box<dyn FnOnce() + Send>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |n: u32| -> Box<dyn FnOnce() + Send> {
            let sink = sink.clone();
            Box::new(move || sink.lock().unwrap().push(n))
        };
        (log, make)
    }

    #[test]
    fn frame_follows_rate() {
        assert_eq!(Clock::new(40).frame(), Duration::from_millis(25));
        assert_eq!(Clock::new(0).frame(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn burst_runs_only_the_last_callback() {
        let clock = Clock::new(40);
        let (log, make) = recorder();
        let start = Instant::now();

        tokio::join!(clock.tick(make(1)), clock.tick(make(2)), clock.tick(make(3)));

        assert_eq!(*log.lock().unwrap(), vec![3]);
        assert!(start.elapsed() >= clock.frame());
        assert!(!clock.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_once_the_frame_has_passed() {
        let clock = Clock::new(40);
        let runs = Arc::new(AtomicUsize::new(0));
        tokio::time::advance(Duration::from_millis(100)).await;

        let start = Instant::now();
        let counter = runs.clone();
        clock
            .tick(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(start.elapsed(), Duration::from_secs(0));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_only_the_rest_of_the_frame() {
        let clock = Clock::new(40);
        let (log, make) = recorder();
        clock.tick(make(1)).await;

        tokio::time::advance(Duration::from_millis(10)).await;
        let start = Instant::now();
        clock.tick(make(2)).await;

        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(15) && waited < clock.frame());
        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn tick_during_a_running_callback_waits_a_full_frame() {
        let clock = Clock::new(40);
        let runs = Arc::new(Mutex::new(Vec::new()));

        let inner_clock = clock.clone();
        let inner_runs = runs.clone();
        let outer_runs = runs.clone();
        clock
            .tick(move || {
                outer_runs.lock().unwrap().push(Instant::now());
                let queued = inner_clock
                    .tick(move || inner_runs.lock().unwrap().push(Instant::now()))
                    .now_or_never();
                assert!(queued.is_some());
            })
            .await;

        let runs = runs.lock().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[1] - runs[0] >= clock.frame());
        assert!(!clock.is_pending());
    }
}
