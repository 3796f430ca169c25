use std::fmt;
use std::time::{Duration, Instant};

use crate::error::TileResult;

use super::context::TileContext;
use super::surface::ContentHost;

pub type TimerCallback = Box<dyn FnMut(&mut ContentHost, &mut TileContext<'_>) -> TileResult<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

pub(crate) struct TileTimer {
    id: TimerId,
    interval: Duration,
    next_due: Option<Instant>,
    callback: TimerCallback,
}

impl TileTimer {
    /// Arms on the first tick it sees, then fires once per interval.
    pub(crate) fn due(&mut self, now: Instant) -> bool {
        match self.next_due {
            None => {
                self.next_due = Some(now + self.interval);
                false
            }
            Some(due) if due <= now => {
                self.next_due = Some(now + self.interval);
                true
            }
            Some(_) => false,
        }
    }

    pub(crate) fn id(&self) -> TimerId {
        self.id
    }

    pub(crate) fn callback_mut(&mut self) -> &mut TimerCallback {
        &mut self.callback
    }
}

/// Resources a tile acquired during one render. Torn down before the tile is
/// rendered again and when it is removed, so nothing outlives its frame.
pub struct TileLifecycle {
    instance_id: String,
    timers: Vec<TileTimer>,
    teardown: Vec<Box<dyn FnOnce()>>,
    next_timer: u64,
    torn_down: bool,
}

impl TileLifecycle {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            timers: Vec::new(),
            teardown: Vec::new(),
            next_timer: 0,
            torn_down: false,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Run `callback` every `interval` while this render is live.
    pub fn every<F>(&mut self, interval: Duration, callback: F) -> TimerId
    where
        F: FnMut(&mut ContentHost, &mut TileContext<'_>) -> TileResult<()> + 'static,
    {
        self.next_timer += 1;
        let id = TimerId(self.next_timer);
        if !self.torn_down {
            self.timers.push(TileTimer {
                id,
                interval: interval.max(Duration::from_millis(1)),
                next_due: None,
                callback: Box::new(callback),
            });
        }
        id
    }

    pub fn cancel(&mut self, id: TimerId) {
        self.timers.retain(|timer| timer.id != id);
    }

    /// Register cleanup that runs exactly once on teardown.
    pub fn on_teardown<F>(&mut self, hook: F)
    where
        F: FnOnce() + 'static,
    {
        if self.torn_down {
            hook();
        } else {
            self.teardown.push(Box::new(hook));
        }
    }

    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.timers.clear();
        for hook in self.teardown.drain(..) {
            hook();
        }
    }

    pub(crate) fn take_timers(&mut self) -> Vec<TileTimer> {
        std::mem::take(&mut self.timers)
    }

    /// Put fired timers back ahead of any registered while they ran.
    pub(crate) fn restore_timers(&mut self, mut timers: Vec<TileTimer>) {
        if self.torn_down {
            return;
        }
        timers.append(&mut self.timers);
        self.timers = timers;
    }
}

impl Drop for TileLifecycle {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for TileLifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TileLifecycle")
            .field("instance_id", &self.instance_id)
            .field("timers", &self.timers.len())
            .field("teardown_hooks", &self.teardown.len())
            .field("torn_down", &self.torn_down)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn teardown_runs_hooks_once_and_drops_timers() {
        let calls = Rc::new(Cell::new(0));
        let mut lifecycle = TileLifecycle::new("clock-1");
        lifecycle.every(Duration::from_secs(1), |_host, _ctx| Ok(()));
        let seen = calls.clone();
        lifecycle.on_teardown(move || seen.set(seen.get() + 1));

        lifecycle.teardown();
        lifecycle.teardown();
        drop(lifecycle);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn timers_arm_then_fire_per_interval() {
        let mut lifecycle = TileLifecycle::new("clock-1");
        lifecycle.every(Duration::from_secs(1), |_host, _ctx| Ok(()));
        let mut timers = lifecycle.take_timers();
        let t0 = Instant::now();
        assert!(!timers[0].due(t0));
        assert!(!timers[0].due(t0 + Duration::from_millis(500)));
        assert!(timers[0].due(t0 + Duration::from_secs(1)));
        assert!(!timers[0].due(t0 + Duration::from_millis(1500)));
        lifecycle.restore_timers(timers);
        assert_eq!(lifecycle.timer_count(), 1);
    }

    #[test]
    fn cancel_removes_a_single_timer() {
        let mut lifecycle = TileLifecycle::new("t");
        let a = lifecycle.every(Duration::from_secs(1), |_h, _c| Ok(()));
        lifecycle.every(Duration::from_secs(2), |_h, _c| Ok(()));
        lifecycle.cancel(a);
        assert_eq!(lifecycle.timer_count(), 1);
    }
}
