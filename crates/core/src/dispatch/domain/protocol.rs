//! Typed request/reply protocol between the control thread and the
//! detection worker.
//!
//! Every request carries a [`RequestId`] and its own reply channel; the
//! worker echoes the id back. Replies are therefore matched by id, never by
//! arrival order, and a reply can only ever reach the request that asked
//! for it.

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_record::DetectionResult;
use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl RequestId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminator tag of a request envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    LoadModels,
    Warmup,
    Detect,
}

impl RequestKind {
    pub fn tag(&self) -> &'static str {
        match self {
            RequestKind::LoadModels => "LOAD_MODELS",
            RequestKind::Warmup => "WARMUP",
            RequestKind::Detect => "DETECT",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Request payload. Frames are moved in, so the sender gives up the buffer.
#[derive(Debug)]
pub enum WorkerAction {
    LoadModels,
    Warmup(Frame),
    Detect {
        frame: Frame,
        options: DetectorOptions,
    },
}

impl WorkerAction {
    pub fn kind(&self) -> RequestKind {
        match self {
            WorkerAction::LoadModels => RequestKind::LoadModels,
            WorkerAction::Warmup(_) => RequestKind::Warmup,
            WorkerAction::Detect { .. } => RequestKind::Detect,
        }
    }
}

pub struct WorkerRequest {
    pub id: RequestId,
    pub action: WorkerAction,
    pub reply_to: Sender<WorkerReply>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WorkerReply {
    pub id: RequestId,
    pub body: ReplyBody,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ReplyBody {
    /// Readiness signal; sent for every successful `LOAD_MODELS`.
    ModelsLoaded,
    InitFailed(String),
    WarmupComplete,
    Detected(DetectionResult),
    Failed(String),
}

/// Handle to the single reply a submitted request will receive.
#[derive(Debug)]
pub struct PendingReply {
    id: RequestId,
    kind: RequestKind,
    rx: Receiver<WorkerReply>,
}

impl PendingReply {
    pub fn new(id: RequestId, kind: RequestKind, rx: Receiver<WorkerReply>) -> Self {
        Self { id, kind, rx }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Channel to wait on, e.g. inside a `select!`.
    pub fn receiver(&self) -> &Receiver<WorkerReply> {
        &self.rx
    }

    /// Accepts `reply` only if it answers this request.
    pub fn resolve(&self, reply: WorkerReply) -> Result<WorkerReply, DispatchError> {
        if reply.id != self.id {
            return Err(DispatchError::UnexpectedReply {
                expected: self.id,
                actual: reply.id,
            });
        }
        Ok(reply)
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Result<WorkerReply, DispatchError> {
        match self.rx.recv_timeout(timeout) {
            Ok(reply) => self.resolve(reply),
            Err(RecvTimeoutError::Timeout) => Err(DispatchError::Timeout {
                kind: self.kind,
                timeout,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(DispatchError::Disconnected),
        }
    }

    /// Non-blocking poll: `None` while the worker is still busy.
    pub fn try_take(&self) -> Option<Result<WorkerReply, DispatchError>> {
        match self.rx.try_recv() {
            Ok(reply) => Some(self.resolve(reply)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(DispatchError::Disconnected)),
        }
    }
}
