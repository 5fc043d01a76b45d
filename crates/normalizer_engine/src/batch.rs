use std::sync::mpsc;
use std::sync::Arc;

use engine_logging::{engine_debug, engine_info, engine_warn};
use futures_util::StreamExt;
use normalizer_core::{
    update, BatchProgress, BatchReport, BatchState, Effect, ExtractionResult, JobId, Msg,
    SourceKind,
};
use tokio_util::sync::CancellationToken;

use crate::cleanup::{clean_pdf_artifacts, remove_html_noise};
use crate::config::DEFAULT_WORKER_COUNT;
use crate::dispatch::Dispatcher;
use crate::EngineEvent;

/// Failure message for sources abandoned by a cancelled batch.
pub const CANCELLED: &str = "cancelled";

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Forwards progress notifications to a closure and drops other events.
pub struct CallbackProgressSink<F> {
    callback: F,
}

impl<F> CallbackProgressSink<F>
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressSink for CallbackProgressSink<F>
where
    F: Fn(&BatchProgress) + Send + Sync,
{
    fn emit(&self, event: EngineEvent) {
        if let EngineEvent::Progress(progress) = event {
            (self.callback)(&progress);
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: EngineEvent) {}
}

/// Runs many sources through a dispatcher with bounded concurrency. Batch
/// bookkeeping lives in the core state machine; this type only executes
/// the effects it asks for.
pub struct BatchRunner {
    dispatcher: Arc<Dispatcher>,
    worker_count: usize,
    post_process: bool,
}

impl BatchRunner {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            worker_count: DEFAULT_WORKER_COUNT,
            post_process: false,
        }
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    pub fn with_post_process(mut self, enabled: bool) -> Self {
        self.post_process = enabled;
        self
    }

    /// Extract every source once. Progress is emitted in completion order;
    /// results come back in submission order.
    pub async fn run(
        &self,
        sources: Vec<String>,
        sink: &dyn ProgressSink,
        cancel: CancellationToken,
    ) -> BatchReport {
        let (mut state, effects) = update(BatchState::new(), Msg::SourcesSubmitted(sources));
        let jobs = extract_jobs(effects);
        engine_info!(
            "batch started: {} sources, {} duplicates skipped, {} workers",
            state.total(),
            state.skipped_duplicates(),
            self.worker_count
        );

        let mut completions = futures_util::stream::iter(jobs)
            .map(|(job_id, source)| {
                let dispatcher = self.dispatcher.clone();
                let cancel = cancel.clone();
                async move {
                    let result = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => ExtractionResult::failure(
                            &source,
                            SourceKind::Unknown,
                            CANCELLED,
                            dispatcher.now(),
                        ),
                        result = dispatcher.extract_with_metadata(&source) => result,
                    };
                    (job_id, result)
                }
            })
            .buffer_unordered(self.worker_count);

        while let Some((job_id, result)) = completions.next().await {
            if cancel.is_cancelled() {
                let (next, effects) = update(state, Msg::CancelRequested);
                state = next;
                self.run_effects(effects, sink, &state);
            }
            let (next, effects) = update(state, Msg::SourceFinished { job_id, result });
            state = next;
            self.run_effects(effects, sink, &state);
        }

        let mut report = state.report();
        if self.post_process {
            report = report.map_results(post_process);
        }
        engine_info!(
            "batch finished: {} succeeded, {} failed",
            report.stats.success,
            report.stats.failed
        );
        sink.emit(EngineEvent::BatchFinished(report.stats.clone()));
        report
    }

    fn run_effects(&self, effects: Vec<Effect>, sink: &dyn ProgressSink, state: &BatchState) {
        for effect in effects {
            match effect {
                Effect::ReportProgress(progress) => {
                    if let Some(error) = &progress.error {
                        engine_warn!(
                            "[{}/{}] {} failed: {}",
                            progress.completed,
                            progress.total,
                            progress.source,
                            error
                        );
                    }
                    sink.emit(EngineEvent::Progress(progress));
                }
                Effect::CancelPending => {
                    let pending = state.pending();
                    engine_warn!("batch cancelled, abandoning {} pending sources", pending.len());
                    for (job_id, source) in pending {
                        engine_debug!("job {job_id} abandoned: {source}");
                    }
                }
                Effect::Extract { .. } => {}
            }
        }
    }
}

fn extract_jobs(effects: Vec<Effect>) -> Vec<(JobId, String)> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Extract { job_id, source } => Some((job_id, source)),
            _ => None,
        })
        .collect()
}

/// Kind-specific cleanup for successful results: PDF layout artifacts and
/// page whitespace. Other kinds pass through.
pub fn post_process(result: ExtractionResult) -> ExtractionResult {
    if !result.is_success() {
        return result;
    }
    match result.kind() {
        SourceKind::Pdf => {
            let text = clean_pdf_artifacts(result.text());
            result.with_text(text)
        }
        SourceKind::Url => {
            let text = remove_html_noise(result.text());
            result.with_text(text)
        }
        _ => result,
    }
}
