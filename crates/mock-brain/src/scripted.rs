//! Scripted brain implementation - replays queued outcomes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use brain_core::{async_trait, Brain, BrainError, GenerationRequest};

/// A brain that returns pre-programmed outcomes in order.
///
/// Once the queue is drained every call returns the default reply. All
/// requests are recorded so tests can inspect the assembled context.
#[derive(Debug)]
pub struct ScriptedBrain {
    outcomes: Mutex<VecDeque<Result<String, BrainError>>>,
    default_reply: String,
    requests: Mutex<Vec<GenerationRequest>>,
    calls: AtomicUsize,
}

impl Default for ScriptedBrain {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBrain {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            default_reply: "OK".to_string(),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a successful reply.
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: BrainError) -> Self {
        self.push(Err(error));
        self
    }

    /// Reply returned once the queue is empty.
    pub fn with_default_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_reply = reply.into();
        self
    }

    /// Queue an outcome after construction.
    pub fn push(&self, outcome: Result<String, BrainError>) {
        if let Ok(mut outcomes) = self.outcomes.lock() {
            outcomes.push_back(outcome);
        }
    }

    /// Number of generate calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// The most recent request, if any.
    pub fn last_request(&self) -> Option<GenerationRequest> {
        self.requests().pop()
    }
}

#[async_trait]
impl Brain for ScriptedBrain {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BrainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .outcomes
            .lock()
            .ok()
            .and_then(|mut outcomes| outcomes.pop_front());

        next.unwrap_or_else(|| Ok(self.default_reply.clone()))
    }

    fn name(&self) -> &str {
        "ScriptedBrain"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brain_core::{BrainErrorKind, ChatTurn};

    fn request(text: &str) -> GenerationRequest {
        GenerationRequest::new("sys").with_turn(ChatTurn::user(text))
    }

    #[tokio::test]
    async fn test_outcomes_in_order_then_default() {
        let brain = ScriptedBrain::new()
            .with_reply("first")
            .with_error(BrainError::RateLimited("quota".into()))
            .with_default_reply("later");

        assert_eq!(brain.generate(request("a")).await.unwrap(), "first");
        let err = brain.generate(request("b")).await.unwrap_err();
        assert_eq!(err.kind(), BrainErrorKind::RateLimit);
        assert_eq!(brain.generate(request("c")).await.unwrap(), "later");
        assert_eq!(brain.call_count(), 3);
    }

    #[tokio::test]
    async fn test_requests_recorded() {
        let brain = ScriptedBrain::new();
        brain.generate(request("перше")).await.unwrap();
        brain.generate(request("друге")).await.unwrap();

        let last = brain.last_request().unwrap();
        assert_eq!(last.last_user_text(), Some("друге"));
        assert_eq!(brain.requests().len(), 2);
    }
}
