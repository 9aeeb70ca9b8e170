use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use uplift::policy::HttpMethod;
use uplift::transport::{ProgressFn, Transport, TransportError, UploadPayload};

/// Scripted outcome for one file name.
enum Scripted {
    Body(String),
    Fail(TransportError),
}

/// In-memory transport that mimics the production HTTP transport: scripted
/// per-file outcomes, synthetic progress events, and a call log the tests
/// can inspect.
#[derive(Default)]
pub struct MockTransport {
    outcomes: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful submission returning `body` for `file_name`.
    pub fn respond(self, file_name: &str, body: &str) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Scripted::Body(body.to_string()));
        self
    }

    /// Script a failed submission for `file_name`.
    pub fn fail(self, file_name: &str, error: TransportError) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Scripted::Fail(error));
        self
    }

    /// File names submitted so far, in submission order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(
        &self,
        _method: HttpMethod,
        _endpoint: &str,
        payload: UploadPayload,
        on_progress: ProgressFn,
    ) -> Result<String, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(payload.file.name().to_string());

        // Half-way event then a final one, like a real byte-counting body.
        let total = payload.file.len().max(1);
        on_progress(total / 2, total);
        on_progress(total, total);

        match self.outcomes.lock().unwrap().get(payload.file.name()) {
            Some(Scripted::Body(body)) => Ok(body.clone()),
            Some(Scripted::Fail(error)) => Err(error.clone()),
            None => Ok(String::new()),
        }
    }
}
