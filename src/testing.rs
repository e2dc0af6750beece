//! Test doubles shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::agents::Stage;
use crate::capabilities::{required_str, CapabilityOutput, CapabilityRegistry, CapabilitySpec};
use crate::capabilities::{GOOGLE_SCHOLAR, WEB_SEARCH};
use crate::llm::{AgentReply, ThinkError, ThinkProvider, ThinkRequest};

/// A think provider that replays scripted replies per stage and records
/// every request it receives.
///
/// When a stage's queue is empty it answers with a plain text reply.
#[derive(Debug, Default)]
pub(crate) struct ScriptedThink {
    replies: Mutex<HashMap<Stage, VecDeque<Result<AgentReply, ThinkError>>>>,
    requests: Mutex<Vec<ThinkRequest>>,
    delay: Option<Duration>,
}

impl ScriptedThink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before every answer.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn push(&self, stage: Stage, reply: AgentReply) {
        self.enqueue(stage, Ok(reply));
    }

    pub(crate) fn push_error(&self, stage: Stage, error: ThinkError) {
        self.enqueue(stage, Err(error));
    }

    fn enqueue(&self, stage: Stage, reply: Result<AgentReply, ThinkError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(stage)
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn requests(&self) -> Vec<ThinkRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_for(&self, stage: Stage) -> Vec<ThinkRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.stage == stage)
            .collect()
    }
}

#[async_trait]
impl ThinkProvider for ScriptedThink {
    async fn think(&self, request: ThinkRequest) -> Result<AgentReply, ThinkError> {
        let stage = request.stage;
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&stage)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| Ok(AgentReply::text(format!("{} reply", stage.display_name()))))
    }
}

/// A registry with recording `web_search` and `google_scholar` handlers.
///
/// The returned log holds the `query` argument of every invocation, in order.
pub(crate) fn recording_registry() -> (CapabilityRegistry, Arc<Mutex<Vec<String>>>) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = CapabilityRegistry::with_builtins();
    for name in [WEB_SEARCH, GOOGLE_SCHOLAR] {
        let log = log.clone();
        registry.register_fn(
            CapabilitySpec::with_string_argument(name, "Lookup", "query", "Terms"),
            move |args| {
                let log = log.clone();
                async move {
                    let query = required_str(&args, "query")?.to_string();
                    log.lock().unwrap().push(query.clone());
                    Ok(CapabilityOutput::Text(format!("{}: {}", name, query)))
                }
            },
        );
    }
    (registry, log)
}
