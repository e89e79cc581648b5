//! # Lid-Transition Detector
//!
//! Single-bit state machine over the most recent lid signal.
//!
//! Lid readings arrive continuously while the lid sits closed, so the
//! capture workflow must fire only on the open-then-close edge, never on
//! every "closed" observation.

/// Edge detector over the system's single tracked lid signal
///
/// State starts as "not observed open". On each accepted reading frame
/// that carries a lid value, `observe` reports whether the open-to-closed
/// edge fired, evaluated against the state *before* the frame's update.
/// Frames without a lid field must not call `observe` at all.
#[derive(Debug, Default)]
pub struct LidMonitor {
    last_observed_open: bool,
}

impl LidMonitor {
    /// Create a monitor with no open observation yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one lid observation; returns true iff the close-after-open
    /// edge fired on this frame
    pub fn observe(&mut self, lid_closed: bool) -> bool {
        let fired = self.last_observed_open && lid_closed;
        self.last_observed_open = !lid_closed;
        fired
    }

    /// Whether the last lid-bearing frame reported the lid open
    pub fn last_observed_open(&self) -> bool {
        self.last_observed_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_closed_observation_does_not_fire() {
        let mut lid = LidMonitor::new();
        assert!(!lid.observe(true), "no prior open observation");
    }

    #[test]
    fn test_open_then_close_fires_exactly_once() {
        // lid_closed = [false, false, true]
        let mut lid = LidMonitor::new();
        assert!(!lid.observe(false));
        assert!(!lid.observe(false));
        assert!(lid.observe(true), "edge must fire on the third frame");
    }

    #[test]
    fn test_repeated_closed_does_not_refire() {
        let mut lid = LidMonitor::new();
        lid.observe(false);
        assert!(lid.observe(true));
        assert!(!lid.observe(true), "still closed, no new edge");
        assert!(!lid.observe(true));
    }

    #[test]
    fn test_edge_refires_after_reopening() {
        let mut lid = LidMonitor::new();
        lid.observe(false);
        assert!(lid.observe(true));
        lid.observe(false);
        assert!(lid.observe(true));
    }

    #[test]
    fn test_state_tracks_last_observation() {
        let mut lid = LidMonitor::new();
        assert!(!lid.last_observed_open());
        lid.observe(false);
        assert!(lid.last_observed_open());
        lid.observe(true);
        assert!(!lid.last_observed_open());
    }
}
