use std::time::Duration;

use thiserror::Error;

use crate::dispatch::domain::protocol::{RequestId, RequestKind};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("detection worker is not ready; models have not been loaded")]
    NotReady,
    #[error("detection worker disconnected")]
    Disconnected,
    #[error("{kind} request timed out after {timeout:?}")]
    Timeout { kind: RequestKind, timeout: Duration },
    #[error("model initialization failed: {0}")]
    InitFailed(String),
    #[error("failed to spawn detection worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("reply {actual} does not belong to request {expected}")]
    UnexpectedReply {
        expected: RequestId,
        actual: RequestId,
    },
}
