//! Message router between the page-side UI and the explanation backend
//!
//! Every inbound message gets exactly one [`RouterReply`]. Backend failures
//! and undecodable messages become `{ok:false}` replies; a panicking handler
//! is reported as `background_exception`.

use super::cache::{fingerprint, ResultCache, DEFAULT_TEXT_PREFIX_CHARS};
use super::classifier::{classify, resolve_mode};
use super::client::ExplainBackend;
use super::models::*;
use super::normalize::{is_truthy, join_lines, normalize};
use crate::metrics::METRICS;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

const REPHRASE_FOLLOWUP: &str =
    "Rephrase the TEXT for a layperson in 2 short sentences. Do not repeat the original text.";
const ACTION_LIST_FOLLOWUP: &str = "Provide a prioritized list of 5 concrete next actions the user can take based on the TEXT. Return as JSON with key 'action_list'.";
const BRAINSTORM_FOLLOWUP: &str = "Brainstorm 5 short ideas the user could try next based on the TEXT. Return as JSON with key 'ideas'.";
const ACTION_LIST_PLAIN_FOLLOWUP: &str = "Provide a prioritized list of 5 concrete next actions the user can take based on the TEXT. Return as plain text, each item on a new line.";

const DEFAULT_AUDIENCE: &str = "layperson";
const DEFAULT_HINT: &str = "Elaborate on: next steps";
const DEFAULT_IDEA_COUNT: u32 = 5;

/// Fields of the selected action tried, in order, for a free-text hint
const HINT_FIELDS: [&str; 3] = ["cmd", "title", "description"];

/// Fields tried, in order, for a readable follow-up answer
const ANSWER_FIELDS: [&str; 4] = ["answer", "text", "summary", "explanation"];

/// Instruction attached to an explain payload for the given action
fn explain_followup(action: BackendAction) -> Option<&'static str> {
    match action {
        BackendAction::Rephrase => Some(REPHRASE_FOLLOWUP),
        BackendAction::ActionList => Some(ACTION_LIST_FOLLOWUP),
        BackendAction::Brainstorm => Some(BRAINSTORM_FOLLOWUP),
        BackendAction::Analyze => None,
    }
}

/// Parsed `action_cmd` of an action chip
#[derive(Debug, Clone, PartialEq)]
pub enum ActionCommand {
    Rephrase { audience: String },
    ActionList,
    Brainstorm { count: u32 },
    /// Anything else: the backend gets a free-text instruction
    Perform { hint: String },
}

impl ActionCommand {
    /// Parse a command string; the raw selected `action` supplies the hint
    /// for free-text commands
    pub fn parse(cmd: &str, action: Option<&Value>) -> Self {
        if cmd.starts_with("rephrase:") {
            let audience = cmd
                .split(':')
                .nth(1)
                .filter(|s| !s.is_empty())
                .unwrap_or(DEFAULT_AUDIENCE);
            ActionCommand::Rephrase {
                audience: audience.to_string(),
            }
        } else if cmd.starts_with("action_list") {
            ActionCommand::ActionList
        } else if cmd.starts_with("brainstorm:") {
            let count = cmd
                .split(':')
                .nth(1)
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_IDEA_COUNT);
            ActionCommand::Brainstorm { count }
        } else {
            let hint = action
                .and_then(Value::as_object)
                .and_then(|map| {
                    HINT_FIELDS
                        .iter()
                        .find_map(|key| map.get(*key).filter(|v| is_truthy(v)))
                })
                .map(normalize)
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_HINT.to_string());
            ActionCommand::Perform { hint }
        }
    }

    /// Instruction text sent as the payload's `followup`
    pub fn followup(&self) -> String {
        match self {
            ActionCommand::Rephrase { audience } => format!(
                "Rephrase the following text for a {} audience in 2-3 short sentences.",
                audience
            ),
            ActionCommand::ActionList => ACTION_LIST_PLAIN_FOLLOWUP.to_string(),
            ActionCommand::Brainstorm { count } => format!(
                "Brainstorm {} short ideas the user could try next based on the TEXT.",
                count
            ),
            ActionCommand::Perform { hint } => format!("Please perform the following: {}", hint),
        }
    }
}

/// Pull one display string out of a follow-up reply
///
/// Falsy replies have no answer; everything else ends in a string.
pub fn followup_answer(reply: BackendReply) -> Option<String> {
    let value = reply.into_value();
    match &value {
        v if !is_truthy(v) => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => Some(answer_from_object(map, &value)),
        other => Some(normalize(other)),
    }
}

fn answer_from_object(map: &Map<String, Value>, whole: &Value) -> String {
    if let Some(Value::Array(items)) = map.get("followups") {
        if !items.is_empty() {
            return join_lines(items);
        }
    }
    for key in ["followup", "rephrase"] {
        if let Some(Value::String(s)) = map.get(key) {
            if !s.is_empty() {
                return s.clone();
            }
        }
    }
    for key in ["action_list", "ideas"] {
        if let Some(Value::Array(items)) = map.get(key) {
            return join_lines(items);
        }
    }

    let candidate = ANSWER_FIELDS
        .iter()
        .find_map(|key| map.get(*key).filter(|v| is_truthy(v)));
    match candidate {
        Some(Value::String(s)) => s.clone(),
        _ => normalize(whole),
    }
}

/// Routes inbound messages through the cache and the backend
pub struct MessageRouter {
    backend: Arc<dyn ExplainBackend>,
    cache: ResultCache,
    text_prefix_chars: usize,
}

impl MessageRouter {
    pub fn new(backend: Arc<dyn ExplainBackend>, cache: ResultCache) -> Self {
        Self {
            backend,
            cache,
            text_prefix_chars: DEFAULT_TEXT_PREFIX_CHARS,
        }
    }

    /// Override how much of the selection takes part in the cache key
    pub fn with_text_prefix_chars(mut self, chars: usize) -> Self {
        self.text_prefix_chars = chars;
        self
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Handle a raw message on its own task
    ///
    /// A panic inside the handler is contained and reported as
    /// `background_exception`.
    pub async fn dispatch(self: &Arc<Self>, raw: Value) -> RouterReply {
        let router = Arc::clone(self);
        let span = info_span!("message", request_id = %Uuid::new_v4());
        let handle = tokio::spawn(async move { router.handle(raw).await }.instrument(span));

        match handle.await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Message handler aborted: {}", e);
                METRICS.record_message("unknown", false);
                RouterReply::failure(error_kinds::BACKGROUND_EXCEPTION, Some(e.to_string()))
            }
        }
    }

    /// Decode and route a raw message
    pub async fn handle(&self, raw: Value) -> RouterReply {
        match serde_json::from_value::<InboundMessage>(raw) {
            Ok(message) => self.route(message).await,
            Err(e) => {
                warn!("Rejected inbound message: {}", e);
                METRICS.record_message("unknown", false);
                RouterReply::failure(error_kinds::BACKGROUND_EXCEPTION, Some(e.to_string()))
            }
        }
    }

    pub async fn route(&self, message: InboundMessage) -> RouterReply {
        match message {
            InboundMessage::Explain(request) => {
                let reply = self.explain(request).await;
                METRICS.record_message("explain", reply.is_ok());
                reply
            }
            InboundMessage::ActionInvoke(request) => {
                let reply = self.invoke_action(request).await;
                METRICS.record_message("action_invoke", reply.is_ok());
                reply
            }
        }
    }

    /// `EXPLAIN_REQUEST`: cached explanation of a selection
    pub async fn explain(&self, request: ExplainRequest) -> RouterReply {
        let text = request.text.unwrap_or_default();
        let context = request.context.unwrap_or_default();
        let action = BackendAction::from(UserAction::from_wire(request.action.as_deref()));
        let mode = resolve_mode(request.mode.as_deref(), &text);

        info!(
            "Explain request: mode={}, action={}, text_len={}",
            mode.as_str(),
            action.as_str(),
            text.len()
        );

        let key = fingerprint(&text, mode, action, self.text_prefix_chars);
        if let Some(cached) = self.cache.get(&key).await {
            debug!("Serving explain result from cache");
            return RouterReply::explained(cached, true);
        }

        let payload = BackendPayload {
            text: text.clone(),
            mode,
            action: Some(action),
            followup: explain_followup(action).map(str::to_string),
            context: Some(context.clone()),
        };

        let reply = self.backend.call(&payload).await;
        if let Some(failure) = reply.failure() {
            warn!("Explain failed: {}", failure.error);
            return RouterReply::failure(failure.error, failure.trace);
        }

        let mut result = ExplainResult::from_reply(reply);
        result.stamp_origin(&text, &context);
        self.cache.set(&key, result.clone()).await;

        RouterReply::explained(result, false)
    }

    /// `ACTION_INVOKE`: run a suggested action against the original text
    pub async fn invoke_action(&self, request: ActionInvokeRequest) -> RouterReply {
        let idx = request.index();
        let selected = request.selected();

        let cmd = request
            .action_cmd
            .as_deref()
            .filter(|c| !c.is_empty())
            .or_else(|| selected.and_then(|a| a.get("cmd")).and_then(Value::as_str))
            .unwrap_or_default();

        let command = ActionCommand::parse(cmd, selected);
        let original = request.original_text.unwrap_or_default();
        let mode = resolve_mode(request.mode.as_deref(), &original);

        info!("Action invoke: idx={:?}, command={:?}", idx, command);

        let payload = BackendPayload {
            text: original,
            mode,
            action: None,
            followup: Some(command.followup()),
            context: None,
        };

        let reply = self.backend.call(&payload).await;
        RouterReply::followup(followup_answer(reply))
    }

    /// Context-menu flow: explain a selection without the cache
    pub async fn explain_selection(&self, text: &str) -> OutboundMessage {
        let payload = BackendPayload {
            text: text.to_string(),
            mode: classify(text),
            action: None,
            followup: None,
            context: None,
        };

        info!("Context-menu explain: text_len={}", text.len());

        let reply = self.backend.call(&payload).await;
        let routed = match reply.failure() {
            Some(failure) => RouterReply::failure(failure.error, failure.trace),
            None => {
                let mut result = ExplainResult::from_reply(reply);
                result.original_text = text.to_string();
                // the message tag owns "type"
                if let Some(kind) = result.kind.take() {
                    result.extra.insert("content_type".to_string(), Value::String(kind));
                }
                RouterReply::explained(result, false)
            }
        };
        METRICS.record_message("selection", routed.is_ok());

        OutboundMessage::ExplainResult(routed)
    }
}
