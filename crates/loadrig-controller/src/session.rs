//! Test session state and the scaling decision rule.

use loadrig_monitor::MetricSample;
use std::time::{Duration, Instant};

/// Why the experiment stopped driving load.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Completion {
    /// The generator wrote its finished marker.
    MarkerSeen,
    /// Observed throughput reached the configured target.
    TargetMet { throughput: f64 },
}

impl std::fmt::Display for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::MarkerSeen => write!(f, "finished marker observed"),
            Completion::TargetMet { throughput } => {
                write!(f, "target met at {throughput} rps")
            }
        }
    }
}

/// What the control loop should do with the latest sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Inside the cooldown window; capacity changes need time to show up
    /// in the numbers before they may be judged.
    Wait,
    /// Stop the experiment.
    Complete(Completion),
    /// Provision one more service instance.
    ScaleUp,
}

/// The scaling decision rule.
///
/// The completion marker always wins, whatever the clock says. Otherwise
/// nothing happens until `elapsed` has reached `cooldown`; once it has,
/// throughput at or above `target` completes the experiment and anything
/// less adds capacity.
pub fn decide(
    sample: &MetricSample,
    elapsed: Duration,
    cooldown: Duration,
    target: f64,
) -> Decision {
    if sample.completed {
        return Decision::Complete(Completion::MarkerSeen);
    }
    if elapsed < cooldown {
        return Decision::Wait;
    }
    if sample.throughput >= target {
        return Decision::Complete(Completion::TargetMet {
            throughput: sample.throughput,
        });
    }
    Decision::ScaleUp
}

/// One running load test on the generator.
#[derive(Debug, Clone)]
pub struct TestSession {
    id: String,
    started_at: Instant,
    last_scale_at: Instant,
    completed: bool,
}

impl TestSession {
    /// A new session starts its cooldown clock immediately: the service
    /// instance the test began with counts as the first capacity action.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Instant::now();
        TestSession {
            id: id.into(),
            started_at: now,
            last_scale_at: now,
            completed: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn age(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time since the last capacity action.
    pub fn since_last_scale(&self) -> Duration {
        self.last_scale_at.elapsed()
    }

    /// Record a completed capacity action, restarting the cooldown window.
    pub fn record_scale(&mut self) {
        self.last_scale_at = Instant::now();
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: Duration = Duration::from_secs(100);
    const TARGET: f64 = 50.0;

    fn sample(throughput: f64, completed: bool) -> MetricSample {
        MetricSample {
            throughput,
            completed,
        }
    }

    #[test]
    fn test_marker_completes_regardless_of_clock_and_throughput() {
        let s = sample(0.0, true);
        assert_eq!(
            decide(&s, Duration::ZERO, COOLDOWN, TARGET),
            Decision::Complete(Completion::MarkerSeen)
        );
        let s = sample(99.0, true);
        assert_eq!(
            decide(&s, Duration::from_secs(500), COOLDOWN, TARGET),
            Decision::Complete(Completion::MarkerSeen)
        );
    }

    #[test]
    fn test_nothing_happens_inside_cooldown() {
        let below = sample(10.0, false);
        let above = sample(80.0, false);
        for elapsed in [Duration::ZERO, Duration::from_secs(99)] {
            assert_eq!(decide(&below, elapsed, COOLDOWN, TARGET), Decision::Wait);
            assert_eq!(decide(&above, elapsed, COOLDOWN, TARGET), Decision::Wait);
        }
    }

    #[test]
    fn test_cooldown_boundary_is_inclusive() {
        let s = sample(10.0, false);
        assert_eq!(
            decide(&s, Duration::from_secs(100), COOLDOWN, TARGET),
            Decision::ScaleUp
        );
    }

    #[test]
    fn test_below_target_scales_up_after_cooldown() {
        let s = sample(30.0, false);
        assert_eq!(
            decide(&s, Duration::from_secs(110), COOLDOWN, TARGET),
            Decision::ScaleUp
        );
    }

    #[test]
    fn test_meeting_target_completes_after_cooldown() {
        let s = sample(50.0, false);
        let decision = decide(&s, Duration::from_secs(110), COOLDOWN, TARGET);
        assert_eq!(
            decision,
            Decision::Complete(Completion::TargetMet { throughput: 50.0 })
        );
        let s = sample(62.5, false);
        assert_eq!(
            decide(&s, Duration::from_secs(110), COOLDOWN, TARGET),
            Decision::Complete(Completion::TargetMet { throughput: 62.5 })
        );
    }

    #[test]
    fn test_scale_then_hold_scenario() {
        // 110s into the window, rps 30: add capacity. 5s after that
        // action, the same reading must hold.
        let s = sample(30.0, false);
        assert_eq!(
            decide(&s, Duration::from_secs(110), COOLDOWN, TARGET),
            Decision::ScaleUp
        );
        assert_eq!(
            decide(&s, Duration::from_secs(5), COOLDOWN, TARGET),
            Decision::Wait
        );
    }

    #[test]
    fn test_session_clock_restarts_on_record_scale() {
        let mut session = TestSession::new("42");
        assert!(session.since_last_scale() < Duration::from_secs(1));
        std::thread::sleep(Duration::from_millis(20));
        let before = session.since_last_scale();
        session.record_scale();
        assert!(session.since_last_scale() < before);
        assert_eq!(session.id(), "42");
        assert!(!session.is_completed());
    }
}
