use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::FaceDetector;
use crate::detection::domain::face_record::DetectionResult;
use crate::dispatch::domain::detection_dispatch::DetectionDispatch;
use crate::dispatch::domain::dispatch_error::DispatchError;
use crate::dispatch::domain::protocol::{
    PendingReply, ReplyBody, RequestId, WorkerAction, WorkerReply, WorkerRequest,
};

/// Hosts a [`FaceDetector`] on a dedicated thread.
///
/// Requests are served one at a time in submission order; each reply goes
/// back on the channel that came with its request. Dropping the worker
/// closes the request channel and the thread exits after its current job.
pub struct ThreadedDetectionWorker {
    requests: Option<Sender<WorkerRequest>>,
    handle: Option<JoinHandle<()>>,
    next_id: u64,
    ready: bool,
}

impl ThreadedDetectionWorker {
    pub fn spawn(detector: Box<dyn FaceDetector>) -> Result<Self, DispatchError> {
        let (tx, rx) = crossbeam_channel::unbounded::<WorkerRequest>();
        let handle = thread::Builder::new()
            .name("face-detection".into())
            .spawn(move || run_worker(detector, rx))
            .map_err(DispatchError::Spawn)?;
        Ok(Self {
            requests: Some(tx),
            handle: Some(handle),
            next_id: 1,
            ready: false,
        })
    }

    /// Spawns the worker and completes the readiness handshake.
    pub fn start(
        detector: Box<dyn FaceDetector>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let mut worker = Self::spawn(detector)?;
        worker.handshake(timeout)?;
        Ok(worker)
    }

    /// Sends `LOAD_MODELS` and waits up to `timeout` for the ready signal.
    ///
    /// Safe to repeat: an already-loaded worker answers ready again.
    pub fn handshake(&mut self, timeout: Duration) -> Result<(), DispatchError> {
        self.ready = false;
        let started = Instant::now();
        let pending = self.send(WorkerAction::LoadModels)?;
        match pending.wait_timeout(timeout)?.body {
            ReplyBody::ModelsLoaded => {
                log::info!(
                    "Detection worker ready in {:.0}ms",
                    started.elapsed().as_secs_f64() * 1000.0
                );
                self.ready = true;
                Ok(())
            }
            ReplyBody::InitFailed(reason) | ReplyBody::Failed(reason) => {
                log::error!("Detection worker failed to initialize: {reason}");
                Err(DispatchError::InitFailed(reason))
            }
            other => Err(DispatchError::InitFailed(format!(
                "unexpected handshake reply: {other:?}"
            ))),
        }
    }

    /// Closes the request channel and waits for the thread to finish.
    pub fn shutdown(&mut self) {
        self.requests.take();
        self.ready = false;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Detection worker thread panicked");
            }
        }
    }

    fn send(&mut self, action: WorkerAction) -> Result<PendingReply, DispatchError> {
        let requests = self.requests.as_ref().ok_or(DispatchError::Disconnected)?;
        let id = RequestId::new(self.next_id);
        self.next_id += 1;

        let kind = action.kind();
        let (reply_tx, reply_rx) = crossbeam_channel::bounded::<WorkerReply>(1);
        requests
            .send(WorkerRequest {
                id,
                action,
                reply_to: reply_tx,
            })
            .map_err(|_| DispatchError::Disconnected)?;
        log::debug!("Submitted {kind} {id}");
        Ok(PendingReply::new(id, kind, reply_rx))
    }
}

impl DetectionDispatch for ThreadedDetectionWorker {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn submit(&mut self, action: WorkerAction) -> Result<PendingReply, DispatchError> {
        if !self.ready && !matches!(action, WorkerAction::LoadModels) {
            return Err(DispatchError::NotReady);
        }
        self.send(action)
    }
}

impl Drop for ThreadedDetectionWorker {
    fn drop(&mut self) {
        // Closing the channel is enough; joining here could block on a hung detector.
        self.requests.take();
    }
}

fn run_worker(mut detector: Box<dyn FaceDetector>, requests: Receiver<WorkerRequest>) {
    let mut loaded = false;

    for WorkerRequest {
        id,
        action,
        reply_to,
    } in requests
    {
        let kind = action.kind();
        let started = Instant::now();
        let body = match action {
            WorkerAction::LoadModels => load_models(&mut *detector, &mut loaded),
            WorkerAction::Warmup(_) if !loaded => ReplyBody::Failed("models not loaded".into()),
            WorkerAction::Warmup(frame) => {
                match detector.detect(&frame, &DetectorOptions::default()) {
                    Ok(_) => ReplyBody::WarmupComplete,
                    Err(e) => ReplyBody::Failed(e.to_string()),
                }
            }
            WorkerAction::Detect { .. } if !loaded => {
                ReplyBody::Failed("models not loaded".into())
            }
            WorkerAction::Detect { frame, options } => match detector.detect(&frame, &options) {
                Ok(faces) => ReplyBody::Detected(
                    DetectionResult::new(faces, frame.dimensions()).apply_options(&options),
                ),
                Err(e) => ReplyBody::Failed(e.to_string()),
            },
        };
        log::debug!(
            "{kind} {id} handled in {:.1}ms",
            started.elapsed().as_secs_f64() * 1000.0
        );

        if reply_to.send(WorkerReply { id, body }).is_err() {
            log::debug!("Reply for {kind} {id} dropped: requester went away");
        }
    }
    log::debug!("Detection worker exiting");
}

fn load_models(detector: &mut dyn FaceDetector, loaded: &mut bool) -> ReplyBody {
    if *loaded {
        return ReplyBody::ModelsLoaded;
    }
    match detector.load_models() {
        Ok(()) => {
            *loaded = true;
            ReplyBody::ModelsLoaded
        }
        Err(e) => ReplyBody::InitFailed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::detection::domain::face_record::{BoundingBox, FaceRecord};
    use crate::dispatch::domain::protocol::RequestKind;
    use crate::dispatch::domain::warmup::warmup_frame;
    use crate::shared::descriptor::FaceDescriptor;
    use crate::shared::frame::Frame;

    const TIMEOUT: Duration = Duration::from_secs(5);

    struct FakeDetector {
        loads: Arc<AtomicUsize>,
        load_delay: Duration,
        load_error: Option<String>,
        faces: Vec<FaceRecord>,
    }

    impl FakeDetector {
        fn new(faces: Vec<FaceRecord>) -> (Self, Arc<AtomicUsize>) {
            let loads = Arc::new(AtomicUsize::new(0));
            let detector = Self {
                loads: loads.clone(),
                load_delay: Duration::ZERO,
                load_error: None,
                faces,
            };
            (detector, loads)
        }
    }

    impl FaceDetector for FakeDetector {
        fn load_models(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            thread::sleep(self.load_delay);
            self.loads.fetch_add(1, Ordering::SeqCst);
            match &self.load_error {
                Some(reason) => Err(reason.clone().into()),
                None => Ok(()),
            }
        }

        fn detect(
            &mut self,
            _frame: &Frame,
            _options: &DetectorOptions,
        ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>> {
            Ok(self.faces.clone())
        }
    }

    fn face(score: f32) -> FaceRecord {
        FaceRecord {
            bounding_box: BoundingBox::default(),
            landmarks: Vec::new(),
            descriptor: FaceDescriptor::new(vec![score, 0.0]),
            score,
        }
    }

    fn frame() -> Frame {
        Frame::new(vec![0u8; 8 * 6 * 3], 8, 6, 3, 0)
    }

    fn detect_action(options: DetectorOptions) -> WorkerAction {
        WorkerAction::Detect {
            frame: frame(),
            options,
        }
    }

    #[test]
    fn test_start_completes_handshake() {
        let (detector, loads) = FakeDetector::new(Vec::new());
        let worker = ThreadedDetectionWorker::start(Box::new(detector), TIMEOUT).unwrap();
        assert!(worker.is_ready());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_init_failure_carries_reason() {
        let (mut detector, _) = FakeDetector::new(Vec::new());
        detector.load_error = Some("model file missing".into());
        let err = ThreadedDetectionWorker::start(Box::new(detector), TIMEOUT)
            .err()
            .unwrap();
        match err {
            DispatchError::InitFailed(reason) => assert!(reason.contains("model file missing")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_handshake_times_out() {
        let (mut detector, _) = FakeDetector::new(Vec::new());
        detector.load_delay = Duration::from_millis(300);
        let mut worker = ThreadedDetectionWorker::spawn(Box::new(detector)).unwrap();
        let err = worker.handshake(Duration::from_millis(20)).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Timeout {
                kind: RequestKind::LoadModels,
                ..
            }
        ));
        assert!(!worker.is_ready());
    }

    #[test]
    fn test_repeated_handshake_does_not_reload() {
        let (detector, loads) = FakeDetector::new(Vec::new());
        let mut worker = ThreadedDetectionWorker::start(Box::new(detector), TIMEOUT).unwrap();
        worker.handshake(TIMEOUT).unwrap();
        assert!(worker.is_ready());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_submit_before_ready_is_rejected() {
        let (detector, _) = FakeDetector::new(Vec::new());
        let mut worker = ThreadedDetectionWorker::spawn(Box::new(detector)).unwrap();
        assert!(matches!(
            worker.submit(detect_action(DetectorOptions::default())),
            Err(DispatchError::NotReady)
        ));
    }

    #[test]
    fn test_detect_reply_is_correlated_and_filtered() {
        let (detector, _) = FakeDetector::new(vec![face(0.4), face(0.9), face(0.7)]);
        let mut worker = ThreadedDetectionWorker::start(Box::new(detector), TIMEOUT).unwrap();
        let options = DetectorOptions {
            input_size: 224,
            score_threshold: 0.5,
            max_detected_faces: 1,
        };

        let pending = worker.submit(detect_action(options)).unwrap();
        assert_eq!(pending.kind(), RequestKind::Detect);
        let reply = pending.wait_timeout(TIMEOUT).unwrap();

        assert_eq!(reply.id, pending.id());
        match reply.body {
            ReplyBody::Detected(result) => {
                assert_eq!(result.display_size, (8, 6));
                assert_eq!(result.faces.len(), 1);
                assert_eq!(result.faces[0].score, 0.9);
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    #[test]
    fn test_racing_requests_reply_to_their_own_handles() {
        let (detector, _) = FakeDetector::new(Vec::new());
        let mut worker = ThreadedDetectionWorker::start(Box::new(detector), TIMEOUT).unwrap();

        let warmup = worker
            .submit(WorkerAction::Warmup(warmup_frame().unwrap()))
            .unwrap();
        let detect = worker.submit(detect_action(DetectorOptions::default())).unwrap();
        assert_ne!(warmup.id(), detect.id());

        let detect_reply = detect.wait_timeout(TIMEOUT).unwrap();
        let warmup_reply = warmup.wait_timeout(TIMEOUT).unwrap();
        assert!(matches!(detect_reply.body, ReplyBody::Detected(_)));
        assert_eq!(warmup_reply.body, ReplyBody::WarmupComplete);
    }

    #[test]
    fn test_shutdown_disconnects() {
        let (detector, _) = FakeDetector::new(Vec::new());
        let mut worker = ThreadedDetectionWorker::start(Box::new(detector), TIMEOUT).unwrap();
        worker.shutdown();
        assert!(!worker.is_ready());
        assert!(matches!(
            worker.handshake(TIMEOUT),
            Err(DispatchError::Disconnected)
        ));
    }
}
