use std::collections::HashMap;
use std::time::Instant;

/// User-facing status channel for the frame pipeline.
///
/// Stands between the pipeline and whatever shows status to the user
/// (terminal, toast, status bar) so the controller never formats UI itself.
pub trait StatusReporter: Send {
    /// Neutral status line (mode changes, readiness).
    fn info(&mut self, message: &str);

    /// Soft, non-fatal problem the user should know about.
    fn warning(&mut self, message: &str);

    /// Enrollment capture progress.
    fn progress(&mut self, captured: usize, quota: usize);

    /// How long a named stage took for one request.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// End-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards everything. Used by tests and embedders with their own UI.
pub struct NullStatusReporter;

impl StatusReporter for NullStatusReporter {
    fn info(&mut self, _message: &str) {}
    fn warning(&mut self, _message: &str) {}
    fn progress(&mut self, _captured: usize, _quota: usize) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
}

/// Forwards status to the `log` facade and keeps per-stage timings for a
/// closing summary.
pub struct LogStatusReporter {
    timings: HashMap<String, Vec<f64>>,
    warnings: Vec<String>,
    start_time: Instant,
}

impl LogStatusReporter {
    pub fn new() -> Self {
        Self {
            timings: HashMap::new(),
            warnings: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn timings_for(&self, stage: &str) -> Option<&[f64]> {
        self.timings.get(stage).map(|v| v.as_slice())
    }

    /// Returns the formatted summary, or `None` if nothing was timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!("Session summary ({elapsed_s:.1}s):")];

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let durations = &self.timings[stage];
            let count = durations.len();
            let avg_ms = durations.iter().sum::<f64>() / count.max(1) as f64;
            let max_ms = durations.iter().copied().fold(0.0, f64::max);
            lines.push(format!(
                "  {stage:10}: {count:4} runs  avg {avg_ms:6.1}ms  max {max_ms:6.1}ms"
            ));
        }
        if !self.warnings.is_empty() {
            lines.push(format!("  Warnings: {}", self.warnings.len()));
        }

        Some(lines.join("\n"))
    }
}

impl Default for LogStatusReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for LogStatusReporter {
    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn warning(&mut self, message: &str) {
        self.warnings.push(message.to_string());
        log::warn!("{message}");
    }

    fn progress(&mut self, captured: usize, quota: usize) {
        log::info!("Captured {captured}/{quota}");
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .push(duration_ms);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}
