use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::{CompletionLlm, CompletionRequest, FerroError};

/// Scripted model that replays a fixed list of responses in order.
///
/// Every request is recorded so tests can assert on prompts and stop tokens.
/// Once the script is exhausted further calls fail with `LlmProvider`.
#[derive(Debug, Default)]
pub struct FakeListLlm {
    responses: Vec<String>,
    cursor: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl FakeListLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: responses.into_iter().map(Into::into).collect(),
            cursor: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests().len()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|request| request.prompt)
            .collect()
    }
}

#[async_trait::async_trait]
impl CompletionLlm for FakeListLlm {
    async fn complete(&self, request: CompletionRequest) -> Result<String, FerroError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(request);

        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        self.responses.get(index).cloned().ok_or_else(|| {
            FerroError::LlmProvider(format!(
                "fake llm exhausted after {} responses",
                self.responses.len()
            ))
        })
    }

    fn model_name(&self) -> &str {
        "fake-list"
    }
}
