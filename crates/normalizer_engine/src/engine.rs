use std::sync::{mpsc, Arc};
use std::thread;

use normalizer_core::{BatchProgress, BatchReport, ExtractionResult};
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::batch::{BatchRunner, CallbackProgressSink, ChannelProgressSink};
use crate::config::EngineConfig;
use crate::dispatch::Dispatcher;
use crate::{EngineEvent, NormalizeError};

/// Blocking facade over the async dispatcher. Owns its own runtime.
pub struct EngineHandle {
    runtime: Runtime,
    dispatcher: Arc<Dispatcher>,
    worker_count: usize,
    post_process: bool,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, NormalizeError> {
        let dispatcher = Dispatcher::new(&config);
        Self::with_dispatcher(dispatcher, &config)
    }

    pub fn with_dispatcher(
        dispatcher: Dispatcher,
        config: &EngineConfig,
    ) -> Result<Self, NormalizeError> {
        let runtime = Runtime::new().map_err(|err| NormalizeError::Runtime(err.to_string()))?;
        Ok(Self {
            runtime,
            dispatcher: Arc::new(dispatcher),
            worker_count: config.worker_count.max(1),
            post_process: config.post_process,
        })
    }

    pub fn extract_text(&self, source: &str) -> Result<String, NormalizeError> {
        self.runtime.block_on(self.dispatcher.extract_text(source))
    }

    pub fn extract_with_metadata(&self, source: &str) -> ExtractionResult {
        self.runtime
            .block_on(self.dispatcher.extract_with_metadata(source))
    }

    /// Run a batch to completion, calling `on_progress` after each source.
    pub fn run_batch<F>(&self, sources: Vec<String>, on_progress: F) -> BatchReport
    where
        F: Fn(&BatchProgress) + Send + Sync,
    {
        let sink = CallbackProgressSink::new(on_progress);
        self.runtime
            .block_on(self.runner().run(sources, &sink, CancellationToken::new()))
    }

    /// Run a batch on a background thread. Events arrive on the returned
    /// handle, which can also cancel the batch.
    pub fn spawn_batch(&self, sources: Vec<String>) -> BatchHandle {
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();
        let runner = self.runner();
        let token = cancel.clone();

        let join = thread::spawn(move || -> Result<BatchReport, NormalizeError> {
            let runtime = Runtime::new().map_err(|err| NormalizeError::Runtime(err.to_string()))?;
            let sink = ChannelProgressSink::new(event_tx);
            Ok(runtime.block_on(runner.run(sources, &sink, token)))
        });

        BatchHandle {
            event_rx,
            cancel,
            join,
        }
    }

    fn runner(&self) -> BatchRunner {
        BatchRunner::new(self.dispatcher.clone())
            .with_worker_count(self.worker_count)
            .with_post_process(self.post_process)
    }
}

pub struct BatchHandle {
    event_rx: mpsc::Receiver<EngineEvent>,
    cancel: CancellationToken,
    join: thread::JoinHandle<Result<BatchReport, NormalizeError>>,
}

impl BatchHandle {
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the batch to finish.
    pub fn join(self) -> Result<BatchReport, NormalizeError> {
        self.join
            .join()
            .map_err(|_| NormalizeError::Runtime("batch thread panicked".to_string()))?
    }
}
