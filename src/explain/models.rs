//! Data models for the explain service

use super::normalize::{is_truthy, normalize, normalize_followups};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error strings surfaced in `{ok:false, error}` replies
pub mod error_kinds {
    pub const NETWORK_ERROR: &str = "network_error";
    pub const NON_JSON_RESPONSE: &str = "non-json-response";
    pub const UNKNOWN_ERROR: &str = "unknown_error";
    pub const BACKGROUND_EXCEPTION: &str = "background_exception";
    pub const CONSENT_REQUIRED: &str = "consent_required";
}

/// Default action importance when the backend gives none
pub const DEFAULT_IMPORTANCE: u8 = 3;

/// Heuristic content category of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Code,
    Legal,
    Academic,
    General,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Code => "code",
            Mode::Legal => "legal",
            Mode::Academic => "academic",
            Mode::General => "general",
        }
    }

    /// Parse a wire value; unknown or empty strings are `None`
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Some(Mode::Code),
            "legal" => Some(Mode::Legal),
            "academic" => Some(Mode::Academic),
            "general" => Some(Mode::General),
            _ => None,
        }
    }
}

/// Operation the user picked from the selection toolbar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Explain,
    Rephrase,
    ActionList,
    Brainstorm,
}

impl UserAction {
    /// Missing or unrecognized actions fall back to `Explain`
    pub fn from_wire(s: Option<&str>) -> Self {
        match s {
            Some("rephrase") => UserAction::Rephrase,
            Some("action_list") => UserAction::ActionList,
            Some("brainstorm") => UserAction::Brainstorm,
            _ => UserAction::Explain,
        }
    }
}

/// Action name sent to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendAction {
    Analyze,
    Rephrase,
    ActionList,
    Brainstorm,
}

impl BackendAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendAction::Analyze => "analyze",
            BackendAction::Rephrase => "rephrase",
            BackendAction::ActionList => "action_list",
            BackendAction::Brainstorm => "brainstorm",
        }
    }
}

impl From<UserAction> for BackendAction {
    fn from(action: UserAction) -> Self {
        match action {
            UserAction::Explain => BackendAction::Analyze,
            UserAction::Rephrase => BackendAction::Rephrase,
            UserAction::ActionList => BackendAction::ActionList,
            UserAction::Brainstorm => BackendAction::Brainstorm,
        }
    }
}

/// Page the selection came from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surrounding: Option<String>,
}

/// `EXPLAIN_REQUEST` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExplainRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub context: Option<PageContext>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// `ACTION_INVOKE` body
///
/// `idx` and `actions` arrive loosely typed from the page and are only
/// interpreted through [`ActionInvokeRequest::index`] and
/// [`ActionInvokeRequest::selected`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionInvokeRequest {
    #[serde(default)]
    pub idx: Option<Value>,
    #[serde(default)]
    pub actions: Option<Value>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub action_cmd: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl ActionInvokeRequest {
    /// Position of the chosen action
    ///
    /// A missing or falsy `idx` selects the first action. Non-negative
    /// integers, integral floats and numeric strings select that position;
    /// anything else selects nothing.
    pub fn index(&self) -> Option<usize> {
        let idx = match &self.idx {
            Some(v) if is_truthy(v) => v,
            _ => return Some(0),
        };
        match idx {
            Value::Number(n) => n.as_u64().map(|i| i as usize).or_else(|| {
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= usize::MAX as f64)
                    .map(|f| f as usize)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Raw entry of `actions` at [`index`](Self::index); a non-array `actions` has none
    pub fn selected(&self) -> Option<&Value> {
        match &self.actions {
            Some(Value::Array(actions)) => actions.get(self.index()?),
            _ => None,
        }
    }
}

/// Messages the page-side UI sends to the router
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    #[serde(rename = "EXPLAIN_REQUEST")]
    Explain(ExplainRequest),
    #[serde(rename = "ACTION_INVOKE")]
    ActionInvoke(ActionInvokeRequest),
}

/// JSON body POSTed to the explanation backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendPayload {
    pub text: String,
    pub mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<BackendAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<PageContext>,
}

/// Failure reported by the client or by the backend itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendFailure {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl BackendFailure {
    pub fn new(error: impl Into<String>, trace: Option<String>) -> Self {
        Self {
            error: error.into(),
            trace,
            status: None,
        }
    }
}

/// Everything the backend can answer with
#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    /// A JSON object; may still carry a backend-side `error` field
    Object(Map<String, Value>),
    /// Valid JSON that is not an object
    Unstructured(Value),
    /// Transport failure or undecodable body
    Failure(BackendFailure),
}

impl BackendReply {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => BackendReply::Object(map),
            other => BackendReply::Unstructured(other),
        }
    }

    /// The failure this reply represents, if any
    ///
    /// Objects with a truthy `error` field and falsy non-object values count
    /// as failures alongside client-side ones.
    pub fn failure(&self) -> Option<BackendFailure> {
        match self {
            BackendReply::Failure(failure) => Some(failure.clone()),
            BackendReply::Object(map) => {
                let error = map.get("error").filter(|v| is_truthy(v))?;
                let error = Some(normalize(error))
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| error_kinds::UNKNOWN_ERROR.to_string());
                let trace = map
                    .get("trace")
                    .map(normalize)
                    .filter(|s| !s.is_empty());
                Some(BackendFailure::new(error, trace))
            }
            BackendReply::Unstructured(value) if !is_truthy(value) => {
                Some(BackendFailure::new(error_kinds::UNKNOWN_ERROR, None))
            }
            BackendReply::Unstructured(_) => None,
        }
    }

    /// Plain JSON view of the reply, failures included
    pub fn into_value(self) -> Value {
        match self {
            BackendReply::Object(map) => Value::Object(map),
            BackendReply::Unstructured(value) => value,
            BackendReply::Failure(failure) => serde_json::to_value(failure).unwrap_or(Value::Null),
        }
    }
}

/// Backend-suggested next step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub title: String,
    pub importance: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
}

impl Action {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            importance: DEFAULT_IMPORTANCE,
            description: None,
            cmd: None,
        }
    }

    /// Sanitize one raw entry; `None` means the entry is dropped
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(title) if !title.trim().is_empty() => Some(Action::new(title.clone())),
            Value::Object(map) => {
                let title = ["title", "name", "cmd"]
                    .iter()
                    .find_map(|key| map.get(*key).filter(|v| is_truthy(v)))
                    .map(normalize)
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "Action".to_string());

                Some(Self {
                    title,
                    importance: map
                        .get("importance")
                        .and_then(parse_importance)
                        .unwrap_or(DEFAULT_IMPORTANCE),
                    description: text_field(map, "description"),
                    cmd: text_field(map, "cmd"),
                })
            }
            _ => None,
        }
    }
}

fn parse_importance(value: &Value) -> Option<u8> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() || n == 0.0 {
        return None;
    }
    Some(n.round().clamp(1.0, 5.0) as u8)
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .filter(|v| is_truthy(v))
        .map(normalize)
        .filter(|s| !s.is_empty())
}

/// Entity extracted by the backend (person, date, amount...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub text: String,
    #[serde(default)]
    pub label: String,
}

impl Entity {
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) if !text.trim().is_empty() => Some(Self {
                text: text.clone(),
                label: String::new(),
            }),
            Value::Object(map) => Some(Self {
                text: text_field(map, "text")?,
                label: text_field(map, "label").unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

/// Normalized explanation handed to the presentation layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplainResult {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rephrase: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implication: Option<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub followups: Vec<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ideas: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub original_url: String,
    #[serde(default)]
    pub original_title: String,
    /// Backend fields with no dedicated slot, passed through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys owned by the reply envelope or stamped by the router
const RESERVED_KEYS: [&str; 7] = [
    "ok",
    "fromCache",
    "error",
    "trace",
    "original_text",
    "original_url",
    "original_title",
];

impl ExplainResult {
    /// Build from a backend object, sanitizing every list it carries
    pub fn from_object(mut map: Map<String, Value>) -> Self {
        let followups = match map.remove("followups") {
            Some(Value::Array(items)) => normalize_followups(&items),
            Some(other) => normalize_followups(&[other]),
            None => Vec::new(),
        };

        let actions = match map.remove("actions") {
            Some(Value::Array(items)) => items.iter().filter_map(Action::from_value).collect(),
            _ => Vec::new(),
        };

        let entities = match map.remove("entities") {
            Some(Value::Array(items)) => items.iter().filter_map(Entity::from_value).collect(),
            _ => Vec::new(),
        };

        let result = Self {
            kind: take_text(&mut map, "type"),
            summary: take_text(&mut map, "summary"),
            rephrase: take_text(&mut map, "rephrase"),
            explanation: take_text(&mut map, "explanation"),
            implication: take_text(&mut map, "implication"),
            actions,
            followups,
            entities,
            action_list: take_list(&mut map, "action_list"),
            ideas: take_list(&mut map, "ideas"),
            confidence: map.remove("confidence").and_then(|v| v.as_f64()),
            latency_ms: map
                .remove("latency_ms")
                .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0).round() as u64))),
            ..Default::default()
        };

        for key in RESERVED_KEYS {
            map.remove(key);
        }

        Self { extra: map, ..result }
    }

    /// Build from valid JSON that was not an object
    pub fn from_unstructured(value: &Value) -> Self {
        Self {
            summary: Some(normalize(value)).filter(|s| !s.is_empty()),
            ..Default::default()
        }
    }

    /// Build from any non-failure reply
    pub fn from_reply(reply: BackendReply) -> Self {
        match reply {
            BackendReply::Object(map) => Self::from_object(map),
            other => Self::from_unstructured(&other.into_value()),
        }
    }

    /// Record where the selection came from
    pub fn stamp_origin(&mut self, text: &str, context: &PageContext) {
        self.original_text = text.to_string();
        self.original_url = context.url.clone().unwrap_or_default();
        self.original_title = context.title.clone().unwrap_or_default();
    }
}

fn take_text(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key)
        .filter(is_truthy)
        .map(|v| normalize(&v))
        .filter(|s| !s.is_empty())
}

fn take_list(map: &mut Map<String, Value>, key: &str) -> Option<Vec<String>> {
    match map.remove(key)? {
        Value::Array(items) => Some(normalize_followups(&items)),
        other => Some(normalize_followups(&[other])),
    }
}

/// Successful explanation reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExplainedReply {
    pub ok: bool,
    #[serde(rename = "fromCache", skip_serializing_if = "std::ops::Not::not")]
    pub from_cache: bool,
    #[serde(flatten)]
    pub result: ExplainResult,
}

/// Reply to `ACTION_INVOKE`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowupReply {
    pub ok: bool,
    pub followup_answer: Option<String>,
    pub message: Option<String>,
}

/// Failed routing reply
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureReply {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// The single reply each inbound message receives
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RouterReply {
    Explained(ExplainedReply),
    Followup(FollowupReply),
    Failure(FailureReply),
}

impl RouterReply {
    pub fn explained(result: ExplainResult, from_cache: bool) -> Self {
        RouterReply::Explained(ExplainedReply {
            ok: true,
            from_cache,
            result,
        })
    }

    pub fn followup(answer: Option<String>) -> Self {
        RouterReply::Followup(FollowupReply {
            ok: true,
            message: answer.clone(),
            followup_answer: answer,
        })
    }

    pub fn failure(error: impl Into<String>, trace: Option<String>) -> Self {
        RouterReply::Failure(FailureReply {
            ok: false,
            error: error.into(),
            trace,
        })
    }

    pub fn is_ok(&self) -> bool {
        !matches!(self, RouterReply::Failure(_))
    }
}

/// Messages pushed from the router to the page (context-menu flow)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutboundMessage {
    #[serde(rename = "EXPLAIN_RESULT")]
    ExplainResult(RouterReply),
}
