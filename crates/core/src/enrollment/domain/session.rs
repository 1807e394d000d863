use crate::detection::domain::face_record::DetectionResult;
use crate::enrollment::domain::descriptor_sets::{EnrollmentSet, ReferenceSet};
use crate::enrollment::domain::enrollment_engine::{EnrollmentEngine, EnrollmentProgress};
use crate::enrollment::domain::verification_engine::{
    MatchReport, VerificationEngine, VerificationOutcome,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionMode {
    Idle,
    Enrolling,
    Verifying,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Idle => write!(f, "idle"),
            SessionMode::Enrolling => write!(f, "enrolling"),
            SessionMode::Verifying => write!(f, "verifying"),
        }
    }
}

/// What a completed detection meant for the session.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// Session is idle; the result is stale.
    Ignored,
    NoFace,
    /// The face was seen but did not qualify as an enrollment sample.
    SampleRejected,
    SampleCaptured { captured: usize, quota: usize },
    EnrollmentFinalized(EnrollmentSet),
    /// Verifying with nothing to compare against.
    NoReference,
    Rejected { best_distance: Option<f32> },
    Accepted(MatchReport),
    AlreadyVerified(MatchReport),
}

impl SessionEvent {
    /// Events after which detection should stop.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::EnrollmentFinalized(_) | SessionEvent::Accepted(_)
        )
    }
}

/// Owned enrollment/verification state. One mode at a time.
pub struct Session {
    mode: SessionMode,
    enrollment: EnrollmentEngine,
    verification: VerificationEngine,
}

impl Session {
    pub fn new(quota: usize, threshold: f32) -> Self {
        Self {
            mode: SessionMode::Idle,
            enrollment: EnrollmentEngine::new(quota),
            verification: VerificationEngine::new(threshold),
        }
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn enrollment(&self) -> &EnrollmentEngine {
        &self.enrollment
    }

    pub fn verification(&self) -> &VerificationEngine {
        &self.verification
    }

    pub fn reference(&self) -> Option<&ReferenceSet> {
        self.verification.reference()
    }

    pub fn load_reference(&mut self, reference: ReferenceSet) {
        self.verification.load_reference(reference);
    }

    pub fn begin_enrollment(&mut self) -> SessionMode {
        self.verification.restart();
        self.enrollment.begin();
        self.switch_to(SessionMode::Enrolling)
    }

    pub fn begin_verification(&mut self) -> SessionMode {
        self.enrollment.reset();
        self.verification.restart();
        if self.reference().is_none() {
            log::warn!("Verification started without a reference set; load one first");
        }
        self.switch_to(SessionMode::Verifying)
    }

    /// Back to idle, dropping any unfinished enrollment.
    pub fn stop(&mut self) -> SessionMode {
        if self.mode == SessionMode::Enrolling {
            self.enrollment.reset();
        }
        self.switch_to(SessionMode::Idle)
    }

    pub fn handle_result(&mut self, result: &DetectionResult) -> SessionEvent {
        if self.mode == SessionMode::Idle {
            return SessionEvent::Ignored;
        }
        let Some(descriptor) = result.primary_descriptor() else {
            return SessionEvent::NoFace;
        };

        match self.mode {
            SessionMode::Idle => SessionEvent::Ignored,
            SessionMode::Enrolling => match self.enrollment.submit(descriptor) {
                EnrollmentProgress::Ignored(reason) => {
                    log::debug!("Enrollment sample ignored: {reason:?}");
                    SessionEvent::SampleRejected
                }
                EnrollmentProgress::Captured { captured, quota } => {
                    SessionEvent::SampleCaptured { captured, quota }
                }
                EnrollmentProgress::Finalized(set) => {
                    self.verification.load_reference(ReferenceSet::from(set.clone()));
                    self.switch_to(SessionMode::Idle);
                    SessionEvent::EnrollmentFinalized(set)
                }
            },
            SessionMode::Verifying => match self.verification.submit(descriptor) {
                VerificationOutcome::NoReference => SessionEvent::NoReference,
                VerificationOutcome::AlreadyVerified(report) => {
                    SessionEvent::AlreadyVerified(report)
                }
                VerificationOutcome::Rejected { best_distance, .. } => {
                    SessionEvent::Rejected { best_distance }
                }
                VerificationOutcome::Accepted(report) => {
                    self.switch_to(SessionMode::Idle);
                    SessionEvent::Accepted(report)
                }
            },
        }
    }

    fn switch_to(&mut self, mode: SessionMode) -> SessionMode {
        if self.mode != mode {
            log::info!("Session mode: {} -> {}", self.mode, mode);
        }
        self.mode = mode;
        mode
    }
}
