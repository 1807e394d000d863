use std::time::{Duration, Instant};

use crossbeam_channel::{after, never, select, Receiver, RecvTimeoutError};
use thiserror::Error;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_source::FrameSource;
use crate::capture::infrastructure::frame_scaler::FrameScaler;
use crate::detection::domain::detector_options::DetectorOptions;
use crate::dispatch::domain::detection_dispatch::DetectionDispatch;
use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::dispatch::domain::protocol::{
    PendingReply, ReplyBody, RequestId, WorkerAction, WorkerReply,
};
use crate::dispatch::domain::warmup::warmup_frame;
use crate::enrollment::domain::session::{Session, SessionEvent, SessionMode};
use crate::pipeline::status_reporter::StatusReporter;
use crate::shared::settings::Settings;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("warm-up image unavailable: {0}")]
    Warmup(#[from] CaptureError),
    #[error("detection worker disconnected while a request was in flight")]
    WorkerDisconnected,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Minimum gap between a reply and the next capture.
    pub tick_interval: Duration,
    pub max_working_side: u32,
    /// Consecutive capture failures before the user is warned.
    pub capture_failure_threshold: usize,
    pub detector_options: DetectorOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            tick_interval: settings.tick_interval(),
            max_working_side: settings.max_working_side,
            capture_failure_threshold: settings.capture_failure_threshold.max(1),
            detector_options: settings.detector,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub ticks: usize,
    /// Ticks that found a request already in flight.
    pub skipped_busy: usize,
    pub submitted: usize,
    pub completed: usize,
    pub detect_failures: usize,
    pub capture_failures: usize,
    pub stale_replies: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Halted,
    /// The worker has not finished its handshake.
    NotReady,
    Busy,
    CaptureFailed,
    Submitted(RequestId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HaltReason {
    /// Enrollment finalized or verification accepted.
    SessionComplete,
    FeedEnded,
    Stopped,
    WorkerLost,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineOutcome {
    pub halt_reason: HaltReason,
    /// The event that completed the session, if it completed.
    pub terminal_event: Option<SessionEvent>,
    /// Most recent session event of any kind.
    pub last_event: Option<SessionEvent>,
    pub stats: PipelineStats,
}

struct InFlight {
    pending: PendingReply,
    submitted_at: Instant,
}

/// What woke the run loop. `None` means the reply channel disconnected.
enum Wake {
    Tick,
    Reply(Option<WorkerReply>),
    Warmup(Option<WorkerReply>),
}

/// Periodic capture-and-detect loop with a single in-flight request.
///
/// A tick captures one frame, scales it to working size and submits it to
/// the detection worker. While a request is outstanding further ticks are
/// skipped, never queued, so the worker never builds a backlog and results
/// always reflect a recent frame. Replies are matched to the outstanding
/// request by id and fed to the [`Session`].
pub struct FramePipeline {
    source: Box<dyn FrameSource>,
    dispatch: Box<dyn DetectionDispatch>,
    session: Session,
    reporter: Box<dyn StatusReporter>,
    scaler: FrameScaler,
    config: PipelineConfig,
    in_flight: Option<InFlight>,
    warmup: Option<InFlight>,
    warmup_requested: bool,
    consecutive_capture_failures: usize,
    warned_no_reference: bool,
    warned_not_ready: bool,
    halted: Option<HaltReason>,
    terminal_event: Option<SessionEvent>,
    last_event: Option<SessionEvent>,
    stats: PipelineStats,
}

impl FramePipeline {
    pub fn new(
        source: Box<dyn FrameSource>,
        dispatch: Box<dyn DetectionDispatch>,
        session: Session,
        reporter: Box<dyn StatusReporter>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            dispatch,
            session,
            reporter,
            scaler: FrameScaler::new(config.max_working_side),
            config,
            in_flight: None,
            warmup: None,
            warmup_requested: false,
            consecutive_capture_failures: 0,
            warned_no_reference: false,
            warned_not_ready: false,
            halted: None,
            terminal_event: None,
            last_event: None,
            stats: PipelineStats::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn halt_reason(&self) -> Option<HaltReason> {
        self.halted
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight.as_ref().map(|f| f.pending.id())
    }

    /// Submits the one-time warm-up request. Returns `None` if it was
    /// already sent.
    pub fn start_warmup(&mut self) -> Result<Option<RequestId>, PipelineError> {
        if self.warmup_requested {
            return Ok(None);
        }
        let frame = self.scaler.fit(warmup_frame()?)?;
        let pending = self.dispatch.submit(WorkerAction::Warmup(frame))?;
        let id = pending.id();
        self.warmup_requested = true;
        self.warmup = Some(InFlight {
            pending,
            submitted_at: Instant::now(),
        });
        Ok(Some(id))
    }

    pub fn on_tick(&mut self) -> TickOutcome {
        if self.halted.is_some() {
            return TickOutcome::Halted;
        }
        self.stats.ticks += 1;

        // A dead feed is acted on only once the last reply is in.
        if self.in_flight.is_some() {
            self.stats.skipped_busy += 1;
            return TickOutcome::Busy;
        }
        if !self.source.is_live() {
            self.halt(HaltReason::FeedEnded);
            return TickOutcome::Halted;
        }
        if !self.dispatch.is_ready() {
            self.warn_not_ready();
            return TickOutcome::NotReady;
        }

        let started = Instant::now();
        let frame = match self.source.capture().and_then(|f| self.scaler.fit(f)) {
            Ok(frame) => frame,
            Err(e) => {
                self.record_capture_failure(&e);
                return TickOutcome::CaptureFailed;
            }
        };
        self.consecutive_capture_failures = 0;
        self.reporter.timing("capture", elapsed_ms(started));

        let action = WorkerAction::Detect {
            frame,
            options: self.config.detector_options,
        };
        match self.dispatch.submit(action) {
            Ok(pending) => {
                let id = pending.id();
                self.stats.submitted += 1;
                self.in_flight = Some(InFlight {
                    pending,
                    submitted_at: Instant::now(),
                });
                TickOutcome::Submitted(id)
            }
            Err(DispatchError::NotReady) => {
                self.warn_not_ready();
                TickOutcome::NotReady
            }
            Err(e) => {
                log::error!("Failed to submit frame: {e}");
                self.halt(HaltReason::WorkerLost);
                TickOutcome::Halted
            }
        }
    }

    /// Handles a detection reply. Replies that do not answer the in-flight
    /// request are counted and dropped.
    pub fn on_reply(&mut self, reply: WorkerReply) -> Option<SessionEvent> {
        let Some(in_flight) = self.in_flight.take() else {
            self.stats.stale_replies += 1;
            log::debug!("Dropping reply {} with nothing in flight", reply.id);
            return None;
        };
        let reply = match in_flight.pending.resolve(reply) {
            Ok(reply) => reply,
            Err(e) => {
                self.stats.stale_replies += 1;
                log::debug!("Dropping stale reply: {e}");
                self.in_flight = Some(in_flight);
                return None;
            }
        };

        self.stats.completed += 1;
        self.reporter.timing("detect", elapsed_ms(in_flight.submitted_at));

        let event = match reply.body {
            ReplyBody::Detected(result) => {
                let event = self.session.handle_result(&result);
                self.report(&event);
                Some(event)
            }
            ReplyBody::Failed(reason) => {
                self.stats.detect_failures += 1;
                self.reporter.warning(&format!("Face detection failed: {reason}"));
                None
            }
            other => {
                log::warn!("Unexpected reply to {}: {other:?}", reply.id);
                None
            }
        };

        if let Some(event) = &event {
            self.last_event = Some(event.clone());
            if event.is_terminal() {
                self.terminal_event = Some(event.clone());
                self.halt(HaltReason::SessionComplete);
            }
        }
        if self.halted.is_none() && !self.source.is_live() {
            self.halt(HaltReason::FeedEnded);
        }
        event
    }

    pub fn on_warmup_reply(&mut self, reply: WorkerReply) {
        let Some(warmup) = self.warmup.take() else {
            return;
        };
        match warmup.pending.resolve(reply) {
            Ok(WorkerReply {
                body: ReplyBody::WarmupComplete,
                ..
            }) => {
                let ms = elapsed_ms(warmup.submitted_at);
                self.reporter.timing("warmup", ms);
                log::info!("Warm-up finished in {ms:.0}ms");
            }
            Ok(WorkerReply {
                body: ReplyBody::Failed(reason),
                ..
            }) => {
                log::warn!("Warm-up failed: {reason}");
            }
            Ok(other) => log::warn!("Unexpected warm-up reply: {other:?}"),
            Err(e) => {
                log::debug!("Dropping reply while warming up: {e}");
                self.warmup = Some(warmup);
            }
        }
    }

    /// Blocks up to `timeout` for the in-flight reply and handles it.
    ///
    /// For embedders that drive ticks from their own event loop.
    pub fn wait_reply(&mut self, timeout: Duration) -> Result<Option<SessionEvent>, PipelineError> {
        let Some(in_flight) = &self.in_flight else {
            return Ok(None);
        };
        match in_flight.pending.receiver().recv_timeout(timeout) {
            Ok(reply) => Ok(self.on_reply(reply)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.halt(HaltReason::WorkerLost);
                Err(PipelineError::WorkerDisconnected)
            }
        }
    }

    /// Stops detection and releases the frame source.
    pub fn stop(&mut self) {
        self.halt(HaltReason::Stopped);
    }

    /// Ticks until the session completes, the feed ends or the pipeline is
    /// stopped.
    ///
    /// The dispatch should have completed its handshake; until it reports
    /// ready, ticks are retried every `tick_interval` and the user is warned
    /// once. The first tick fires immediately. After a submission the timer is
    /// disarmed and re-armed when the reply arrives, so frames are spaced at
    /// least `tick_interval` apart and never pile up behind a slow detector.
    pub fn run(&mut self) -> Result<PipelineOutcome, PipelineError> {
        if self.halted.is_none() {
            if self.session.mode() == SessionMode::Idle {
                self.reporter.warning("Nothing to do: start enrollment or verification first");
                self.halt(HaltReason::Stopped);
            } else {
                self.reporter.info(&format!(
                    "Detection running ({}), one frame every {}ms at most",
                    self.session.mode(),
                    self.config.tick_interval.as_millis()
                ));
            }
        }

        let interval = self.config.tick_interval;
        let mut ticker = after(Duration::ZERO);

        while self.halted.is_none() {
            let detect_rx = receiver_or_never(self.in_flight.as_ref());
            let warmup_rx = receiver_or_never(self.warmup.as_ref());

            let wake = select! {
                recv(ticker) -> _ => Wake::Tick,
                recv(detect_rx) -> msg => Wake::Reply(msg.ok()),
                recv(warmup_rx) -> msg => Wake::Warmup(msg.ok()),
            };

            match wake {
                Wake::Tick => {
                    ticker = match self.on_tick() {
                        TickOutcome::Submitted(_) | TickOutcome::Busy => never(),
                        _ => after(interval),
                    };
                }
                Wake::Reply(Some(reply)) => {
                    self.on_reply(reply);
                    ticker = after(interval);
                }
                Wake::Reply(None) => {
                    self.halt(HaltReason::WorkerLost);
                    self.reporter.summary();
                    return Err(PipelineError::WorkerDisconnected);
                }
                Wake::Warmup(Some(reply)) => self.on_warmup_reply(reply),
                Wake::Warmup(None) => {
                    log::warn!("Warm-up reply lost");
                    self.warmup = None;
                }
            }
        }

        self.reporter.summary();
        Ok(self.outcome())
    }

    pub fn outcome(&self) -> PipelineOutcome {
        PipelineOutcome {
            halt_reason: self.halted.unwrap_or(HaltReason::Stopped),
            terminal_event: self.terminal_event.clone(),
            last_event: self.last_event.clone(),
            stats: self.stats,
        }
    }

    fn halt(&mut self, reason: HaltReason) {
        if self.halted.is_some() {
            return;
        }
        self.halted = Some(reason);
        self.source.stop();
        if let Some(in_flight) = self.in_flight.take() {
            log::debug!("Abandoning in-flight request {}", in_flight.pending.id());
        }

        match reason {
            HaltReason::SessionComplete => self.reporter.info("Detection stopped"),
            HaltReason::FeedEnded => {
                if self.session.mode() != SessionMode::Idle {
                    self.reporter.warning(&format!(
                        "Frame feed ended while {}",
                        self.session.mode()
                    ));
                }
                self.session.stop();
            }
            HaltReason::Stopped => {
                self.session.stop();
            }
            HaltReason::WorkerLost => {
                self.reporter.warning("Detection worker is no longer available");
                self.session.stop();
            }
        }
    }

    fn warn_not_ready(&mut self) {
        if !self.warned_not_ready {
            self.warned_not_ready = true;
            self.reporter.warning("Detection worker is not ready yet; waiting for it to load");
        }
    }

    fn record_capture_failure(&mut self, error: &CaptureError) {
        self.stats.capture_failures += 1;
        self.consecutive_capture_failures += 1;
        log::warn!("Frame capture failed: {error}");

        if self.consecutive_capture_failures >= self.config.capture_failure_threshold {
            self.reporter.warning(&format!(
                "Camera frames keep failing ({} in a row): {error}",
                self.consecutive_capture_failures
            ));
            self.consecutive_capture_failures = 0;
        }
    }

    fn report(&mut self, event: &SessionEvent) {
        match event {
            SessionEvent::SampleCaptured { captured, quota } => {
                self.reporter.progress(*captured, *quota);
            }
            SessionEvent::EnrollmentFinalized(set) => {
                self.reporter.progress(set.len(), set.len());
                self.reporter.info(&format!("Enrollment complete: {} samples", set.len()));
            }
            SessionEvent::NoReference if !self.warned_no_reference => {
                self.warned_no_reference = true;
                self.reporter.warning("No reference descriptors loaded; import or enroll first");
            }
            SessionEvent::Accepted(report) => {
                self.reporter.info(&format!(
                    "Face verified (distance {:.4})",
                    report.distance
                ));
            }
            SessionEvent::Rejected { best_distance } => match best_distance {
                Some(d) => log::debug!("No match (closest distance {d:.4})"),
                None => log::debug!("No comparable reference entries"),
            },
            SessionEvent::NoFace => log::debug!("No face in frame"),
            _ => {}
        }
    }
}

impl Drop for FramePipeline {
    fn drop(&mut self) {
        self.source.stop();
    }
}

fn receiver_or_never(slot: Option<&InFlight>) -> Receiver<WorkerReply> {
    slot.map(|f| f.pending.receiver().clone()).unwrap_or_else(never)
}

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}
