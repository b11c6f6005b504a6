//! Per-request stage timings

use std::time::Duration;

/// Elapsed time per named stage, written at most once per stage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingRecord {
    stages: Vec<(String, Duration)>,
}

impl TimingRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stage; returns `false` and keeps the first value if the
    /// stage was already recorded
    pub fn record(&mut self, stage: impl Into<String>, elapsed: Duration) -> bool {
        let stage = stage.into();
        if self.get(&stage).is_some() {
            return false;
        }
        self.stages.push((stage, elapsed));
        true
    }

    pub fn get(&self, stage: &str) -> Option<Duration> {
        self.stages
            .iter()
            .find(|(name, _)| name == stage)
            .map(|(_, d)| *d)
    }

    /// Stages in recording order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Duration)> {
        self.stages.iter().map(|(name, d)| (name.as_str(), *d))
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|(_, d)| *d).sum()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_are_write_once() {
        let mut record = TimingRecord::new();
        assert!(record.record("routing", Duration::from_millis(10)));
        assert!(!record.record("routing", Duration::from_millis(99)));
        assert_eq!(record.get("routing"), Some(Duration::from_millis(10)));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn total_sums_stages_in_order() {
        let mut record = TimingRecord::new();
        record.record("a", Duration::from_millis(5));
        record.record("b", Duration::from_millis(7));
        assert_eq!(record.total(), Duration::from_millis(12));
        let names: Vec<_> = record.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
