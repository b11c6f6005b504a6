//! Per-request stage timing
//!
//! Stages are started and ended by name. Each stage is recorded at most
//! once; misuse (ending an unstarted stage, re-recording a finished one) is
//! logged and ignored so instrumentation can never fail a request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use domain::{RequestId, TimingRecord};
use tracing::{debug, info, warn};

/// Stage names shared by the orchestrator and the pipelines
pub mod stage {
    pub const CACHE_LOOKUP: &str = "cache_lookup";
    pub const VOICE_RESOLUTION: &str = "voice_resolution";
    pub const SPEECH_INPUT: &str = "speech_input";
    pub const PATHWAY_DECISION: &str = "pathway_decision";
    pub const INTENT_REFINEMENT: &str = "intent_refinement";
    pub const TRANSCRIPTION: &str = "transcription";
    pub const AUDIO_GENERATION: &str = "audio_generation";
    pub const TEXT_GENERATION: &str = "text_generation";
    pub const CACHE_WRITE: &str = "cache_write";
}

/// Stages slower than this are flagged in the log
const SLOW_STAGE: Duration = Duration::from_secs(5);

/// Stopwatch collection for one request
#[derive(Debug)]
pub struct TimingStats {
    request_id: RequestId,
    running: HashMap<String, Instant>,
    record: TimingRecord,
}

impl TimingStats {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            request_id,
            running: HashMap::new(),
            record: TimingRecord::new(),
        }
    }

    /// Start timing a stage
    pub fn start(&mut self, stage: &str) {
        if self.running.contains_key(stage) || self.record.get(stage).is_some() {
            warn!(request_id = %self.request_id, stage, "Stage already timed, ignoring restart");
            return;
        }
        self.running.insert(stage.to_string(), Instant::now());
        debug!(request_id = %self.request_id, stage, "Stage started");
    }

    /// Stop timing a stage and return its duration
    pub fn end(&mut self, stage: &str) -> Option<Duration> {
        let Some(started) = self.running.remove(stage) else {
            warn!(request_id = %self.request_id, stage, "No running timer for stage");
            return None;
        };
        let elapsed = started.elapsed();
        if !self.record.record(stage, elapsed) {
            warn!(request_id = %self.request_id, stage, "Stage already recorded");
            return None;
        }
        if elapsed >= SLOW_STAGE {
            warn!(
                request_id = %self.request_id,
                stage,
                elapsed_ms = elapsed.as_millis(),
                "Slow stage"
            );
        } else {
            debug!(request_id = %self.request_id, stage, elapsed_ms = elapsed.as_millis(), "Stage finished");
        }
        Some(elapsed)
    }

    /// Time an async block as one stage
    pub async fn measure<F, T>(&mut self, stage: &str, fut: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.start(stage);
        let out = fut.await;
        self.end(stage);
        out
    }

    pub const fn record(&self) -> &TimingRecord {
        &self.record
    }

    /// Emit the collected timings as one structured event, slowest first
    pub fn log_summary(&self) {
        if self.record.is_empty() {
            return;
        }
        let mut stages: Vec<(&str, Duration)> = self.record.iter().collect();
        stages.sort_by(|a, b| b.1.cmp(&a.1));
        let breakdown = stages
            .iter()
            .map(|(name, d)| format!("{name}={}ms", d.as_millis()))
            .collect::<Vec<_>>()
            .join(" ");

        info!(
            request_id = %self.request_id,
            total_ms = self.record.total().as_millis(),
            stages = %breakdown,
            "Timing summary"
        );
    }
}
