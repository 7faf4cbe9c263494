use std::{collections::VecDeque, sync::Arc};

use async_trait::async_trait;
use cleaver_core::{CleaverError, CompletionModel, CompletionParams};
use tokio::sync::Mutex;

/// Deterministic completion model for tests: pops queued replies in order.
/// A queued `Err` is returned once, allowing failure-then-success scripts.
#[derive(Clone)]
pub struct ScriptedCompletions {
    responses: Arc<Mutex<VecDeque<Result<String, CleaverError>>>>,
}

impl ScriptedCompletions {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(
                responses.into_iter().map(|r| Ok(r.to_string())).collect(),
            )),
        }
    }

    pub fn from_results(responses: Vec<Result<String, CleaverError>>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
        }
    }
}

#[async_trait]
impl CompletionModel for ScriptedCompletions {
    async fn complete(
        &self,
        _system: &str,
        _prompt: &str,
        _params: &CompletionParams,
    ) -> Result<String, CleaverError> {
        let mut responses = self.responses.lock().await;
        responses.pop_front().unwrap_or_else(|| {
            Err(CleaverError::Provider(
                "scripted model exhausted responses".to_string(),
            ))
        })
    }
}
