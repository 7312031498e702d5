/// Bookkeeping for the position poll: at most one request in flight, and a
/// watchdog that replaces a request that never answered.
///
/// Every request carries the generation it was started with; only the
/// current generation's answer is applied.
#[derive(Debug, Default)]
pub struct PollGate {
    in_flight: Option<u64>,
    generation: u64,
    completed: bool,
}

impl PollGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a poll unless one is already running.
    pub fn try_begin(&mut self) -> Option<u64> {
        if self.in_flight.is_some() {
            return None;
        }
        Some(self.start())
    }

    /// Returns whether the answer belongs to the current poll.
    pub fn finish(&mut self, generation: u64) -> bool {
        if self.in_flight != Some(generation) {
            return false;
        }
        self.in_flight = None;
        self.completed = true;
        true
    }

    /// A failed poll frees the gate but does not count as an answer.
    pub fn fail(&mut self, generation: u64) -> bool {
        if self.in_flight != Some(generation) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Called on every watchdog tick. When nothing was answered since the
    /// previous tick a fresh poll is forced, superseding any request still
    /// outstanding.
    pub fn watchdog(&mut self) -> Option<u64> {
        if std::mem::take(&mut self.completed) {
            return None;
        }
        Some(self.start())
    }

    /// Starts a poll unconditionally; an outstanding request becomes stale.
    pub fn restart(&mut self) -> u64 {
        self.start()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    fn start(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = Some(self.generation);
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_polls_are_absorbed() {
        let mut gate = PollGate::new();
        let first = gate.try_begin().unwrap();
        assert_eq!(gate.try_begin(), None);
        assert!(gate.finish(first));
        assert!(!gate.in_flight());
        assert!(gate.try_begin().is_some());
    }

    #[test]
    fn watchdog_supersedes_silent_poll() {
        let mut gate = PollGate::new();
        let stuck = gate.try_begin().unwrap();
        let forced = gate.watchdog().unwrap();
        assert_ne!(stuck, forced);
        assert!(!gate.finish(stuck));
        assert!(gate.finish(forced));
        // An answer arrived since the last tick.
        assert_eq!(gate.watchdog(), None);
        assert!(gate.watchdog().is_some());
    }

    #[test]
    fn restart_makes_the_outstanding_poll_stale() {
        let mut gate = PollGate::new();
        let old = gate.try_begin().unwrap();
        let new = gate.restart();
        assert!(!gate.finish(old));
        assert!(gate.in_flight());
        assert!(gate.finish(new));
    }

    #[test]
    fn failures_free_the_gate_without_counting() {
        let mut gate = PollGate::new();
        let generation = gate.try_begin().unwrap();
        assert!(gate.fail(generation));
        assert!(!gate.fail(generation));
        assert!(gate.watchdog().is_some());
    }
}
