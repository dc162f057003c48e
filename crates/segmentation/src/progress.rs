use std::sync::mpsc::Sender;

/// Stage strings reported during a detection run, in emission order.
pub mod stage {
    pub const LOADING: &str = "Loading point cloud...";
    pub const SEGMENTING: &str = "Segmenting planes...";
    pub const SAVING_PLANES: &str = "Saving planes...";
    pub const SAVING_RESULT: &str = "Saving result...";
    pub const SURFACES: &str = "Calculating surfaces...";
    pub const DONE: &str = "Done";

    /// Announced each time a plane is accepted.
    pub fn planes_detected(count: usize) -> String {
        format!("Planes detected: {}", count)
    }
}

/// One-way stage notifications for an observer. Reporting never fails
/// and never blocks the caller on a reply.
pub trait ProgressSink {
    fn report(&mut self, stage: &str);
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _stage: &str) {}
}

/// Forwards notifications to the `log` facade at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, stage: &str) {
        log::info!("{}", stage);
    }
}

impl ProgressSink for Vec<String> {
    fn report(&mut self, stage: &str) {
        self.push(stage.to_owned());
    }
}

/// A disconnected receiver is ignored; the run carries on.
impl ProgressSink for Sender<String> {
    fn report(&mut self, stage: &str) {
        let _ = self.send(stage.to_owned());
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn report(&mut self, stage: &str) {
        (**self).report(stage);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn vec_records_in_order() {
        let mut stages: Vec<String> = Vec::new();
        stages.report("a");
        stages.report("b");
        assert_eq!(stages, vec!["a", "b"]);
    }

    #[test]
    fn sender_survives_dropped_receiver() {
        let (mut tx, rx) = mpsc::channel::<String>();
        tx.report("first");
        assert_eq!(rx.recv().unwrap(), "first");
        drop(rx);
        tx.report("nobody listening");
    }

    #[test]
    fn forwards_through_mut_ref() {
        fn announce<S: ProgressSink>(mut sink: S) {
            sink.report("x");
        }
        let mut stages: Vec<String> = Vec::new();
        announce(&mut stages);
        announce(&mut stages as &mut dyn ProgressSink);
        assert_eq!(stages, vec!["x", "x"]);
    }
}
