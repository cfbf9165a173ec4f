//! Live-Position Throttle
//!
//! Drag gestures produce dozens of position updates per second. Only the
//! most recent position matters to observers, so broadcasts are
//! rate-limited to one per interval with trailing-edge semantics: the
//! last call in a window always gets delivered, never an intermediate
//! value. The local document is updated on every drag move without
//! throttling; only the broadcast goes through here.
//!
//! Built on a spawned task and a `watch` channel so tests can drive it
//! deterministically with tokio's paused clock instead of wall-clock
//! waits. Dropping the throttle aborts the task, cancelling any pending
//! trailing emission (a timer referencing a stale shape id otherwise).

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Broadcast interval for live position updates (~30 Hz).
pub const LIVE_MOVE_INTERVAL: Duration = Duration::from_millis(33);

/// A position-only update for a shape being dragged.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveMove {
    /// Screen holding the shape
    pub screen_id: String,
    /// Shape being dragged
    pub shape_id: String,
    /// Current x position
    pub x: f64,
    /// Current y position
    pub y: f64,
}

/// Rate limiter for live position broadcasts.
pub struct PositionThrottle {
    latest: watch::Sender<Option<LiveMove>>,
    task: JoinHandle<()>,
}

impl PositionThrottle {
    /// Create a throttle invoking `emit` at most once per `interval`,
    /// always with the most recent position offered.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F>(interval: Duration, mut emit: F) -> Self
    where
        F: FnMut(LiveMove) + Send + 'static,
    {
        let (latest, mut rx) = watch::channel(None::<LiveMove>);
        let task = tokio::spawn(async move {
            let mut last_emit: Option<Instant> = None;
            while rx.changed().await.is_ok() {
                if let Some(last) = last_emit {
                    let elapsed = last.elapsed();
                    if elapsed < interval {
                        tokio::time::sleep(interval - elapsed).await;
                    }
                }
                // Take whatever is newest by the time the window opens.
                let position = rx.borrow_and_update().clone();
                if let Some(position) = position {
                    emit(position);
                    last_emit = Some(Instant::now());
                }
            }
        });
        Self { latest, task }
    }

    /// Create a throttle with the default ~30 Hz interval.
    pub fn with_default_interval<F>(emit: F) -> Self
    where
        F: FnMut(LiveMove) + Send + 'static,
    {
        Self::new(LIVE_MOVE_INTERVAL, emit)
    }

    /// Offer a new position. Never blocks; coalesces with any position
    /// still waiting for the current window to close.
    pub fn offer(&self, position: LiveMove) {
        let _ = self.latest.send(Some(position));
    }
}

impl Drop for PositionThrottle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
