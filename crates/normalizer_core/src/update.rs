use crate::{BatchPhase, BatchProgress, BatchState, Effect, Msg};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: BatchState, msg: Msg) -> (BatchState, Vec<Effect>) {
    let effects = match msg {
        Msg::SourcesSubmitted(sources) => {
            if state.phase() == BatchPhase::Cancelling {
                return (state, Vec::new());
            }
            let effects: Vec<Effect> = sources
                .into_iter()
                .filter_map(|source| {
                    state
                        .register(source.clone())
                        .map(|job_id| Effect::Extract { job_id, source })
                })
                .collect();
            if !effects.is_empty() {
                state.set_phase(BatchPhase::Running);
            }
            effects
        }
        Msg::SourceFinished { job_id, result } => {
            let success = result.is_success();
            let error = result.error().map(ToOwned::to_owned);
            match state.record(job_id, result) {
                Some(source) => {
                    let progress = BatchProgress {
                        completed: state.completed(),
                        total: state.total(),
                        source,
                        success,
                        error,
                    };
                    if state.is_complete() && state.phase() == BatchPhase::Running {
                        state.set_phase(BatchPhase::Idle);
                    }
                    vec![Effect::ReportProgress(progress)]
                }
                None => Vec::new(),
            }
        }
        Msg::CancelRequested => {
            if state.phase() == BatchPhase::Running {
                state.set_phase(BatchPhase::Cancelling);
                vec![Effect::CancelPending]
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}
