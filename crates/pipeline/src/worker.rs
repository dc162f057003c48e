use crate::detect::{detect_planes, DetectionRequest, DetectionSummary};
use crate::error::PipelineError;
use planeseg_segmentation::ProgressSink;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Messages from a detection worker: stage notifications, then exactly
/// one `Finished`.
#[derive(Debug)]
pub enum RunEvent {
    Stage(String),
    Finished(Result<DetectionSummary, PipelineError>),
}

struct EventSink(Sender<RunEvent>);

impl ProgressSink for EventSink {
    fn report(&mut self, stage: &str) {
        let _ = self.0.send(RunEvent::Stage(stage.to_owned()));
    }
}

/// A detection running on its own thread.
pub struct DetectionHandle {
    events: Receiver<RunEvent>,
    thread: JoinHandle<()>,
}

/// Starts `detect_planes` on a worker thread.
pub fn spawn_detection(request: DetectionRequest) -> DetectionHandle {
    let (tx, events) = mpsc::channel();
    let thread = thread::spawn(move || {
        let mut sink = EventSink(tx);
        let result = detect_planes(&request, &mut sink);
        let _ = sink.0.send(RunEvent::Finished(result));
    });
    DetectionHandle { events, thread }
}

impl DetectionHandle {
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Blocks until the run ends, passing each stage to `on_stage`.
    pub fn wait_with<F>(self, mut on_stage: F) -> Result<DetectionSummary, PipelineError>
    where
        F: FnMut(&str),
    {
        let mut outcome = None;
        for event in self.events.iter() {
            match event {
                RunEvent::Stage(stage) => on_stage(&stage),
                RunEvent::Finished(result) => {
                    outcome = Some(result);
                    break;
                }
            }
        }
        // A panicking worker drops the sender without a result.
        let _ = self.thread.join();
        outcome.unwrap_or(Err(PipelineError::WorkerLost))
    }

    pub fn wait(self) -> Result<DetectionSummary, PipelineError> {
        self.wait_with(|_| {})
    }
}
