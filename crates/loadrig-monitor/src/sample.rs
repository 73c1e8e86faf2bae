//! Throughput log parsing.

/// Marker the generator writes once the test is over.
const FINISHED_MARKER: &str = "Test finished";

/// Prefix of every throughput marker.
const RPS_PREFIX: &str = "Current rps";

/// One observation of the generator's progress.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricSample {
    /// Most recent requests-per-second figure; 0.0 until one is reported.
    pub throughput: f64,
    /// Whether the completion marker has been written.
    pub completed: bool,
}

/// Extract throughput and completion from a generator log.
///
/// The log is a sequence of one-per-line markers, usually bracketed
/// (`[Current rps=12.5]`, `[Test finished]`); bare `key=value` lines are
/// accepted too. The file only grows, so when several rps markers are
/// present the last one in file order is the current figure. A marker
/// whose value does not parse is skipped and never clobbers an earlier
/// reading.
pub fn parse_metrics(log: &str) -> MetricSample {
    let mut sample = MetricSample::default();
    for line in log.lines() {
        let line = line.trim();
        let key = line
            .strip_prefix('[')
            .and_then(|l| l.strip_suffix(']'))
            .unwrap_or(line)
            .trim();
        if key == FINISHED_MARKER {
            sample.completed = true;
        } else if let Some(rest) = key.strip_prefix(RPS_PREFIX)
            && let Some(value) = rest.trim_start().strip_prefix('=')
            && let Ok(rps) = value.trim().parse::<f64>()
        {
            sample.throughput = rps;
        }
    }
    sample
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_log_is_zero_and_incomplete() {
        let sample = parse_metrics("");
        assert_eq!(sample.throughput, 0.0);
        assert!(!sample.completed);
    }

    #[test]
    fn test_last_rps_marker_wins() {
        let log = "[Test]\n[Current rps=12.5]\n[Current rps=30.0]\n";
        let sample = parse_metrics(log);
        assert_eq!(sample.throughput, 30.0);
        assert!(!sample.completed);
    }

    #[test]
    fn test_finished_marker_sets_completed() {
        let log = "[Current rps=48.0]\n[Test finished]\n";
        let sample = parse_metrics(log);
        assert!(sample.completed);
        assert_eq!(sample.throughput, 48.0);
    }

    #[test]
    fn test_bare_lines_are_accepted() {
        let log = "Current rps=7.25\nTest finished\n";
        let sample = parse_metrics(log);
        assert_eq!(sample.throughput, 7.25);
        assert!(sample.completed);
    }

    #[test]
    fn test_spaces_around_equals_are_tolerated() {
        let sample = parse_metrics("[Current rps = 19.5]\n");
        assert_eq!(sample.throughput, 19.5);
    }

    #[test]
    fn test_garbage_value_never_clobbers_a_reading() {
        let log = "[Current rps=22.0]\n[Current rps=oops]\n";
        let sample = parse_metrics(log);
        assert_eq!(sample.throughput, 22.0);
    }

    #[test]
    fn test_unrelated_markers_are_ignored() {
        let log = "[Test]\n[workers=16]\n[Current rpm=900]\n";
        let sample = parse_metrics(log);
        assert_eq!(sample.throughput, 0.0);
        assert!(!sample.completed);
    }
}
