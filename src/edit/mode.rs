use std::time::{Duration, Instant};

/// Interaction state. Process-local, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditMode {
    #[default]
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTransition {
    Unlocked,
    Locked,
}

/// Locked/unlocked state machine with the long-press trigger.
#[derive(Debug, Clone)]
pub struct EditModeController {
    mode: EditMode,
    threshold: Duration,
    pressed_at: Option<Instant>,
}

impl EditModeController {
    pub fn new(threshold: Duration) -> Self {
        Self {
            mode: EditMode::Locked,
            threshold,
            pressed_at: None,
        }
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn is_unlocked(&self) -> bool {
        self.mode == EditMode::Unlocked
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn press_pending(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// Start the long-press timer for a press on empty canvas. Ignored while
    /// already unlocked.
    pub fn press_canvas(&mut self, now: Instant) -> bool {
        if self.is_unlocked() {
            return false;
        }
        self.pressed_at = Some(now);
        true
    }

    /// Early release, pointer leave, or the press moved off empty canvas.
    pub fn cancel_press(&mut self) -> bool {
        self.pressed_at.take().is_some()
    }

    /// Unlock once a pending press has been held past the threshold.
    pub fn poll(&mut self, now: Instant) -> Option<EditTransition> {
        let started = self.pressed_at?;
        if now.saturating_duration_since(started) < self.threshold {
            return None;
        }
        self.pressed_at = None;
        self.unlock()
    }

    pub fn unlock(&mut self) -> Option<EditTransition> {
        self.pressed_at = None;
        if self.is_unlocked() {
            return None;
        }
        self.mode = EditMode::Unlocked;
        Some(EditTransition::Unlocked)
    }

    pub fn lock(&mut self) -> Option<EditTransition> {
        self.pressed_at = None;
        if !self.is_unlocked() {
            return None;
        }
        self.mode = EditMode::Locked;
        Some(EditTransition::Locked)
    }
}

impl Default for EditModeController {
    fn default() -> Self {
        Self::new(Duration::from_millis(700))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_press_unlocks_after_threshold() {
        let mut edit = EditModeController::default();
        let t0 = Instant::now();
        assert!(edit.press_canvas(t0));
        assert_eq!(edit.poll(t0 + Duration::from_millis(699)), None);
        assert_eq!(
            edit.poll(t0 + Duration::from_millis(700)),
            Some(EditTransition::Unlocked)
        );
        assert!(edit.is_unlocked());
        assert!(!edit.press_pending());
    }

    #[test]
    fn early_release_does_not_transition() {
        let mut edit = EditModeController::default();
        let t0 = Instant::now();
        edit.press_canvas(t0);
        assert!(edit.cancel_press());
        assert_eq!(edit.poll(t0 + Duration::from_secs(5)), None);
        assert_eq!(edit.mode(), EditMode::Locked);
    }

    #[test]
    fn explicit_toggles_report_only_real_changes() {
        let mut edit = EditModeController::default();
        assert_eq!(edit.lock(), None);
        assert_eq!(edit.unlock(), Some(EditTransition::Unlocked));
        assert_eq!(edit.unlock(), None);
        assert!(!edit.press_canvas(Instant::now()));
        assert_eq!(edit.lock(), Some(EditTransition::Locked));
    }
}
