//! Batch upload coordination.
//!
//! One `upload()` call is a fail-fast batch: every file is validated before
//! any submission, valid files fan out concurrently, and the batch settles
//! once every submission has an outcome. Observers follow progress through
//! a watch channel rather than polling the coordinator.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::errors::{BatchError, TransportFailure};
use crate::policy::UploadPolicy;
use crate::progress::ProgressTracker;
use crate::source::FileSource;
use crate::transport::{ProgressFn, Transport, TransportError, UploadPayload};
use crate::validate;

/// Observable coordinator state, published on every transition.
///
/// `progress` is 100 whenever `is_loading` is false and a call has
/// completed, on every exit path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadState {
    pub progress: u8,
    pub is_loading: bool,
    pub errors: Vec<BatchError>,
    pub files_number: usize,
}

/// Result of one successfully submitted file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Stored URL extracted from the response body, when the server
    /// returned a structured result.
    pub url: Option<String>,
    pub file_name: String,
}

/// Caller-supplied extras for one batch.
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Extra key/value pairs flattened into every file's multipart body.
    pub form_data: Vec<(String, String)>,
}

/// Drives one batch of files through validation, submission, and settling.
///
/// `upload` takes `&mut self`, so two batches can never run on the same
/// coordinator at once; each call builds its own isolated progress tracker.
pub struct BatchUploader<T: Transport> {
    transport: Arc<T>,
    policy: UploadPolicy,
    state_tx: watch::Sender<UploadState>,
}

impl<T: Transport + 'static> BatchUploader<T> {
    pub fn new(transport: Arc<T>, policy: UploadPolicy) -> Self {
        let (state_tx, _) = watch::channel(UploadState::default());
        Self {
            transport,
            policy,
            state_tx,
        }
    }

    /// Snapshot of the current observable state.
    pub fn state(&self) -> UploadState {
        self.state_tx.borrow().clone()
    }

    /// Receiver that observes state transitions while a batch is in flight.
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state_tx.subscribe()
    }

    /// Validate and submit a batch of files.
    ///
    /// Returns the per-file outcomes in input order when every submission
    /// succeeds, `None` when validation rejects the batch or any submission
    /// fails; the errors land in the observable state either way. A failed
    /// batch is not retried here; the caller resubmits in full.
    pub async fn upload(
        &mut self,
        files: Vec<FileSource>,
        options: UploadOptions,
    ) -> Option<Vec<UploadOutcome>> {
        let files_number = files.len();
        self.state_tx.send_replace(UploadState {
            progress: 0,
            is_loading: true,
            errors: Vec::new(),
            files_number,
        });

        let failures = validate::validate(&files, &self.policy);
        if !failures.is_empty() {
            info!(rejected = failures.len(), files_number, "batch rejected by validation");
            self.settle(failures.into_iter().map(BatchError::Validation).collect());
            return None;
        }

        // Fan out: one task per file, no concurrency limit. Batches are a
        // few attachments per editor action, not bulk imports.
        let tracker = Arc::new(ProgressTracker::new(files_number));
        let mut handles = Vec::with_capacity(files_number);
        let mut file_names = Vec::with_capacity(files_number);

        for (index, file) in files.into_iter().enumerate() {
            file_names.push(file.name().to_string());
            handles.push(tokio::spawn(submit_file(
                Arc::clone(&self.transport),
                self.policy.clone(),
                Arc::clone(&tracker),
                self.state_tx.clone(),
                index,
                file,
                options.form_data.clone(),
            )));
        }

        // Fan in: wait for every outcome. A failure does not cancel
        // in-flight siblings; they run to completion regardless.
        let mut outcomes = Vec::with_capacity(files_number);
        let mut first_failure: Option<TransportFailure> = None;

        for (handle, file_name) in handles.into_iter().zip(file_names) {
            match handle.await {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(failure)) => {
                    if first_failure.is_none() {
                        first_failure = Some(failure);
                    }
                }
                Err(join_error) => {
                    if first_failure.is_none() {
                        first_failure = Some(TransportFailure {
                            message: format!("upload task failed: {join_error}"),
                            context: String::new(),
                            file_name,
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(failure) => {
                error!(file = %failure.file_name, "batch failed: {}", failure.message);
                self.settle(vec![BatchError::Transport(failure)]);
                None
            }
            None => {
                debug!(files_number, "batch settled successfully");
                self.settle(Vec::new());
                Some(outcomes)
            }
        }
    }

    /// Terminal transition: progress forced to 100 on every exit path.
    fn settle(&self, errors: Vec<BatchError>) {
        self.state_tx.send_modify(|state| {
            state.progress = 100;
            state.is_loading = false;
            state.errors = errors;
        });
    }
}

async fn submit_file<T: Transport>(
    transport: Arc<T>,
    policy: UploadPolicy,
    tracker: Arc<ProgressTracker>,
    state_tx: watch::Sender<UploadState>,
    index: usize,
    file: FileSource,
    form_data: Vec<(String, String)>,
) -> Result<UploadOutcome, TransportFailure> {
    let file_name = file.name().to_string();
    debug!(file = %file_name, endpoint = %policy.endpoint, "submitting file");

    let progress_tracker = Arc::clone(&tracker);
    let progress_tx = state_tx.clone();
    let on_progress: ProgressFn = Box::new(move |sent, total| {
        // A zero total is not computable; keep the slot where it was.
        if total > 0 {
            progress_tracker.set(index, (sent as f64 / total as f64) * 100.0);
            publish_aggregate(&progress_tx, &progress_tracker);
        }
    });

    let payload = UploadPayload { file, form_data };
    match transport
        .send(policy.method, &policy.endpoint, payload, on_progress)
        .await
    {
        Ok(body) => {
            // Force the slot to 100 in case no final progress event fired.
            tracker.complete(index);
            publish_aggregate(&state_tx, &tracker);

            Ok(UploadOutcome {
                url: extract_url(&body, &policy),
                file_name,
            })
        }
        Err(err) => Err(resolve_failure(err, &file_name)),
    }
}

fn publish_aggregate(state_tx: &watch::Sender<UploadState>, tracker: &ProgressTracker) {
    state_tx.send_modify(|state| state.progress = tracker.aggregate());
}

/// Pull the stored URL out of a response body.
///
/// A body that does not parse as JSON carries no structured result; that is
/// an expected shape, not an error.
fn extract_url(body: &str, policy: &UploadPolicy) -> Option<String> {
    let parsed: serde_json::Value = serde_json::from_str(body).ok()?;

    parsed
        .get(&policy.resource_key)?
        .as_array()?
        .first()?
        .get(&policy.url_field)?
        .as_str()
        .map(str::to_owned)
}

/// Resolve a transport error into the per-file failure surfaced to callers:
/// server-structured message first, generic transport message as fallback.
fn resolve_failure(err: TransportError, file_name: &str) -> TransportFailure {
    let structured = err.payload.as_ref().and_then(|payload| payload.errors.first());

    let message = structured
        .and_then(|server| server.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or(err.message);

    let context = structured
        .and_then(|server| server.context.clone())
        .unwrap_or_default();

    TransportFailure {
        message,
        context,
        file_name: file_name.to_string(),
    }
}
