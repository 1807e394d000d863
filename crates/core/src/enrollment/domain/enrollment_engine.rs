use crate::enrollment::domain::descriptor_sets::EnrollmentSet;
use crate::shared::descriptor::FaceDescriptor;

/// `Idle → Capturing(n/N) → Finalized`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnrollmentState {
    Idle,
    Capturing { captured: usize, quota: usize },
    Finalized,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    NotCapturing,
    Unusable,
    LengthMismatch { expected: usize, actual: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnrollmentProgress {
    Ignored(IgnoreReason),
    Captured { captured: usize, quota: usize },
    /// Quota reached; the set is frozen.
    Finalized(EnrollmentSet),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Capturing,
    Finalized,
}

/// Accumulates a fixed quota of descriptors for one subject.
pub struct EnrollmentEngine {
    quota: usize,
    samples: Vec<FaceDescriptor>,
    phase: Phase,
}

impl EnrollmentEngine {
    pub fn new(quota: usize) -> Self {
        let quota = quota.max(1);
        Self {
            quota,
            samples: Vec::with_capacity(quota),
            phase: Phase::Idle,
        }
    }

    pub fn quota(&self) -> usize {
        self.quota
    }

    pub fn state(&self) -> EnrollmentState {
        match self.phase {
            Phase::Idle => EnrollmentState::Idle,
            Phase::Capturing => EnrollmentState::Capturing {
                captured: self.samples.len(),
                quota: self.quota,
            },
            Phase::Finalized => EnrollmentState::Finalized,
        }
    }

    pub fn samples(&self) -> &[FaceDescriptor] {
        &self.samples
    }

    /// Starts a fresh capture, discarding any previous samples.
    pub fn begin(&mut self) -> EnrollmentState {
        self.samples.clear();
        self.phase = Phase::Capturing;
        self.state()
    }

    pub fn reset(&mut self) -> EnrollmentState {
        self.samples.clear();
        self.phase = Phase::Idle;
        self.state()
    }

    /// The frozen set, once finalized.
    pub fn finalized_set(&self) -> Option<EnrollmentSet> {
        (self.phase == Phase::Finalized).then(|| EnrollmentSet::new(self.samples.clone()))
    }

    pub fn submit(&mut self, descriptor: &FaceDescriptor) -> EnrollmentProgress {
        if self.phase != Phase::Capturing {
            return EnrollmentProgress::Ignored(IgnoreReason::NotCapturing);
        }
        if !descriptor.is_usable() {
            return EnrollmentProgress::Ignored(IgnoreReason::Unusable);
        }
        if let Some(first) = self.samples.first() {
            if first.len() != descriptor.len() {
                return EnrollmentProgress::Ignored(IgnoreReason::LengthMismatch {
                    expected: first.len(),
                    actual: descriptor.len(),
                });
            }
        }

        self.samples.push(descriptor.clone());
        let captured = self.samples.len();
        log::debug!("Enrollment sample {captured}/{}", self.quota);

        if captured < self.quota {
            return EnrollmentProgress::Captured {
                captured,
                quota: self.quota,
            };
        }
        self.phase = Phase::Finalized;
        log::info!("Enrollment finalized with {captured} samples");
        EnrollmentProgress::Finalized(EnrollmentSet::new(self.samples.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(values: &[f32]) -> FaceDescriptor {
        FaceDescriptor::new(values.to_vec())
    }

    #[test]
    fn test_finalizes_on_third_sample_not_before() {
        let mut engine = EnrollmentEngine::new(3);
        engine.begin();

        assert_eq!(
            engine.submit(&d(&[1.0, 0.0])),
            EnrollmentProgress::Captured {
                captured: 1,
                quota: 3
            }
        );
        assert_eq!(
            engine.submit(&d(&[1.0, 0.0])),
            EnrollmentProgress::Captured {
                captured: 2,
                quota: 3
            }
        );
        assert_eq!(
            engine.state(),
            EnrollmentState::Capturing {
                captured: 2,
                quota: 3
            }
        );

        match engine.submit(&d(&[1.0, 0.0])) {
            EnrollmentProgress::Finalized(set) => {
                assert_eq!(set.len(), 3);
                assert!(set.descriptors().iter().all(|x| x.values() == [1.0, 0.0]));
            }
            other => panic!("expected finalization, got {other:?}"),
        }
        assert_eq!(engine.state(), EnrollmentState::Finalized);
    }

    #[test]
    fn test_submissions_after_finalization_have_no_effect() {
        let mut engine = EnrollmentEngine::new(2);
        engine.begin();
        engine.submit(&d(&[0.1]));
        engine.submit(&d(&[0.2]));
        let frozen = engine.finalized_set().unwrap();

        for _ in 0..5 {
            assert_eq!(
                engine.submit(&d(&[0.9])),
                EnrollmentProgress::Ignored(IgnoreReason::NotCapturing)
            );
        }
        assert_eq!(engine.finalized_set().unwrap(), frozen);
        assert_eq!(engine.samples().len(), 2);
    }

    #[test]
    fn test_submit_while_idle_is_ignored() {
        let mut engine = EnrollmentEngine::new(3);
        assert_eq!(
            engine.submit(&d(&[1.0])),
            EnrollmentProgress::Ignored(IgnoreReason::NotCapturing)
        );
        assert!(engine.samples().is_empty());
    }

    #[test]
    fn test_unusable_descriptors_do_not_count() {
        let mut engine = EnrollmentEngine::new(2);
        engine.begin();
        assert_eq!(
            engine.submit(&d(&[])),
            EnrollmentProgress::Ignored(IgnoreReason::Unusable)
        );
        assert_eq!(
            engine.submit(&d(&[f32::NAN, 1.0])),
            EnrollmentProgress::Ignored(IgnoreReason::Unusable)
        );
        assert!(engine.samples().is_empty());
    }

    #[test]
    fn test_length_mismatch_is_ignored() {
        let mut engine = EnrollmentEngine::new(3);
        engine.begin();
        engine.submit(&d(&[1.0, 0.0]));
        assert_eq!(
            engine.submit(&d(&[1.0, 0.0, 0.0])),
            EnrollmentProgress::Ignored(IgnoreReason::LengthMismatch {
                expected: 2,
                actual: 3
            })
        );
        assert_eq!(engine.samples().len(), 1);
    }

    #[test]
    fn test_reset_clears_progress() {
        let mut engine = EnrollmentEngine::new(3);
        engine.begin();
        engine.submit(&d(&[1.0]));
        assert_eq!(engine.reset(), EnrollmentState::Idle);
        assert!(engine.samples().is_empty());
        assert!(engine.finalized_set().is_none());
    }

    #[test]
    fn test_begin_restarts_after_finalization() {
        let mut engine = EnrollmentEngine::new(1);
        engine.begin();
        engine.submit(&d(&[1.0]));
        assert_eq!(engine.state(), EnrollmentState::Finalized);

        assert_eq!(
            engine.begin(),
            EnrollmentState::Capturing {
                captured: 0,
                quota: 1
            }
        );
    }

    #[test]
    fn test_zero_quota_is_clamped() {
        assert_eq!(EnrollmentEngine::new(0).quota(), 1);
    }
}
