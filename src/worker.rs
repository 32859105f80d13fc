//! An optional background thread that runs the whole pipeline so a host UI
//! thread stays responsive. The host polls for completion; there is no
//! fine-grained cancellation, and dropping the worker joins the thread.

use crossbeam_channel::Receiver;

use crate::engine::{Engine, Outcome};
use crate::needs::DirectoryProvider;
use crate::node::SourceTree;

pub struct PipelineWorker {
    receiver: Receiver<Outcome>,
    _thread_handle: jod_thread::JoinHandle<()>,
}

impl PipelineWorker {
    pub fn start<D>(engine: Engine<D>, sources: Vec<SourceTree>) -> Self
    where
        D: DirectoryProvider + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(1);

        let thread_handle = jod_thread::Builder::new()
            .name("graft pipeline".to_owned())
            .spawn(move || {
                log::trace!("patch pipeline thread started");
                let outcome = engine.run(sources);
                let _ = sender.send(outcome);
                log::trace!("patch pipeline thread stopped");
            })
            .expect("Could not start patch pipeline thread");

        Self {
            receiver,
            _thread_handle: thread_handle,
        }
    }

    /// Poll-once status check: `None` while the pipeline is still running,
    /// the outcome exactly once when it has finished.
    pub fn poll(&self) -> Option<Outcome> {
        self.receiver.try_recv().ok()
    }

    /// Blocks until the pipeline finishes.
    pub fn wait(self) -> Outcome {
        self.receiver
            .recv()
            .expect("patch pipeline thread dropped its outcome")
    }
}
