use eval_engine::Evaluator;
use geom_kernel::KernelBundle;
use shape_tessellation::{TessellationJob, Tessellator};
use tracing::{info, instrument};

use crate::messages::{LoadFilePayload, WorkerReply, WorkerRequest};
use crate::worker_state::{WorkerError, WorkerState};

/// Dispatch a request to the worker state and return its reply.
///
/// Every request gets exactly one reply carrying the request's id; failures
/// become ERROR replies.
pub fn dispatch(
    state: &mut WorkerState,
    request: WorkerRequest,
    kernel: &mut dyn KernelBundle,
) -> WorkerReply {
    let id = request.id();
    match handle_request(state, request, kernel) {
        Ok(reply) => reply,
        Err(e) => WorkerReply::error(id, &e),
    }
}

#[instrument(skip_all, fields(action = request.action(), id = request.id()))]
fn handle_request(
    state: &mut WorkerState,
    request: WorkerRequest,
    kernel: &mut dyn KernelBundle,
) -> Result<WorkerReply, WorkerError> {
    match request {
        WorkerRequest::Register { id, payload } => {
            info!(consumer = %payload.id, "consumer registered");
            state.consumers.push(payload.id);
            Ok(WorkerReply::Initialized { id })
        }

        WorkerRequest::LoadFile { id, payload } => load_file(state, id, payload, kernel),

        WorkerRequest::SaveFile { .. } => Err(WorkerError::NotImplemented {
            operation: "SAVE_FILE".to_string(),
        }),
    }
}

fn load_file(
    state: &mut WorkerState,
    id: u64,
    payload: LoadFilePayload,
    kernel: &mut dyn KernelBundle,
) -> Result<WorkerReply, WorkerError> {
    let content = payload.content;
    let evaluator = Evaluator::new(state.config.import_failure);
    let outcome = match evaluator.run(kernel, &mut state.cache, &content.objects) {
        Ok(outcome) => outcome,
        Err(e) => {
            state.release_evicted(kernel);
            return Err(e.into());
        }
    };

    let config = state.config.tessellation.with_overrides(
        content.options.linear_deflection,
        content.options.angular_deflection,
    );
    let jobs: Vec<TessellationJob> = outcome
        .shapes
        .iter()
        .map(|s| TessellationJob {
            handle: s.entry.handle,
            source_name: s.name.clone(),
            metadata: s.entry.metadata,
        })
        .collect();
    let meshes = Tessellator::new(config).execute(kernel, &jobs);
    state.release_evicted(kernel);

    Ok(WorkerReply::DisplayShape {
        id,
        payload: meshes.into_iter().map(|(name, m)| (name, m.into())).collect(),
        hidden: outcome.hidden.into_iter().collect(),
    })
}
