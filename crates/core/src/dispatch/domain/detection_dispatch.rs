use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::dispatch::domain::protocol::{PendingReply, WorkerAction};

/// Message-passing boundary to the context hosting the face detector.
///
/// Submission never blocks on the detector; each request yields exactly one
/// [`PendingReply`] that resolves when the worker answers.
pub trait DetectionDispatch: Send {
    /// `true` once the readiness handshake has succeeded.
    fn is_ready(&self) -> bool;

    /// Moves `action` (and any frame it carries) to the worker.
    fn submit(&mut self, action: WorkerAction) -> Result<PendingReply, DispatchError>;
}
