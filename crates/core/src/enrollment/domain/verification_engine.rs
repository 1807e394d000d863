use crate::enrollment::domain::descriptor_sets::ReferenceSet;
use crate::shared::descriptor::FaceDescriptor;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchReport {
    pub distance: f32,
    /// Position of the matched entry in the reference set.
    pub reference_index: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VerificationOutcome {
    NoReference,
    /// A match already succeeded; nothing was re-evaluated.
    AlreadyVerified(MatchReport),
    Accepted(MatchReport),
    Rejected {
        /// Smallest distance among comparable entries, if any.
        best_distance: Option<f32>,
        compared: usize,
    },
}

/// Nearest-neighbor check of live descriptors against a reference set.
///
/// Entries are scanned in insertion order; the first one strictly closer
/// than the threshold wins. Entries of a different length are skipped.
pub struct VerificationEngine {
    threshold: f32,
    reference: Option<ReferenceSet>,
    verified: Option<MatchReport>,
}

impl VerificationEngine {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            reference: None,
            verified: None,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn reference(&self) -> Option<&ReferenceSet> {
        self.reference.as_ref()
    }

    pub fn verified(&self) -> Option<MatchReport> {
        self.verified
    }

    /// Replaces the reference set and forgets any earlier success.
    pub fn load_reference(&mut self, reference: ReferenceSet) {
        log::info!("Reference set loaded ({} descriptors)", reference.len());
        self.reference = Some(reference);
        self.verified = None;
    }

    /// Starts a new verification attempt against the same reference.
    pub fn restart(&mut self) {
        self.verified = None;
    }

    pub fn submit(&mut self, descriptor: &FaceDescriptor) -> VerificationOutcome {
        if let Some(report) = self.verified {
            return VerificationOutcome::AlreadyVerified(report);
        }
        let reference = match &self.reference {
            Some(r) if !r.is_empty() => r,
            _ => return VerificationOutcome::NoReference,
        };

        let outcome = find_match(reference, descriptor, self.threshold);
        if let VerificationOutcome::Accepted(report) = outcome {
            log::info!(
                "Verified: distance {:.4} to reference #{}",
                report.distance,
                report.reference_index
            );
            self.verified = Some(report);
        }
        outcome
    }
}

/// Scans `reference` in order and stops at the first entry under `threshold`.
pub fn find_match(
    reference: &ReferenceSet,
    descriptor: &FaceDescriptor,
    threshold: f32,
) -> VerificationOutcome {
    let mut best_distance: Option<f32> = None;
    let mut compared = 0;

    for (reference_index, entry) in reference.descriptors().iter().enumerate() {
        let Some(distance) = entry.distance(descriptor) else {
            continue;
        };
        compared += 1;
        if distance < threshold {
            return VerificationOutcome::Accepted(MatchReport {
                distance,
                reference_index,
            });
        }
        best_distance = Some(best_distance.map_or(distance, |b| b.min(distance)));
    }

    VerificationOutcome::Rejected {
        best_distance,
        compared,
    }
}
