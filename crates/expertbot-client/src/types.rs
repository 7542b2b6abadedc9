//! Request and response bodies of `/api/query` and `/api/test`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body posted to `/api/query` and `/api/test`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    /// Serialized as `null` when no file has been chosen.
    pub selected_file: Option<String>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            selected_file: None,
        }
    }

    pub fn with_selected_file(mut self, file_id: impl Into<String>) -> Self {
        self.selected_file = Some(file_id.into());
        self
    }
}

/// A source file offered when a query matches several files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOption {
    pub id: String,
    pub name: String,
}

/// Response of `/api/query`.
///
/// Every field is optional and loosely typed: the backend returns different
/// subsets depending on how the query was resolved. `exact_match` and
/// `ai_response` only matter as presence signals. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub file_options: Option<Vec<FileOption>>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub enhanced_response: Option<Value>,
    #[serde(default)]
    pub exact_match: Option<Value>,
    #[serde(default)]
    pub ai_response: Option<Value>,
}

/// How a query response should be presented.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    /// Several source files matched; the user must pick one.
    Disambiguation {
        options: Vec<FileOption>,
        prompt: Option<String>,
    },
    /// A plain answer.
    Direct { response: String },
    /// An answer enriched by the rule matcher or the language model.
    Enriched { enhanced: Option<String> },
    Unrecognized,
}

impl QueryResponse {
    /// Classify the response. Earlier shapes win when several apply.
    pub fn shape(&self) -> ResponseShape {
        if let Some(options) = self.file_options.as_ref().filter(|o| !o.is_empty()) {
            return ResponseShape::Disambiguation {
                options: options.clone(),
                prompt: text_of(self.enhanced_response.as_ref()),
            };
        }

        if let Some(response) = text_of(self.response.as_ref()) {
            return ResponseShape::Direct { response };
        }

        let enriched = [&self.exact_match, &self.ai_response, &self.enhanced_response]
            .into_iter()
            .any(|field| field.as_ref().is_some_and(is_truthy));
        if enriched {
            return ResponseShape::Enriched {
                enhanced: text_of(self.enhanced_response.as_ref()),
            };
        }

        ResponseShape::Unrecognized
    }

    /// Text shown after a file was picked: the enhanced answer, else the plain
    /// one.
    pub fn selection_text(&self) -> Option<String> {
        text_of(self.enhanced_response.as_ref()).or_else(|| text_of(self.response.as_ref()))
    }
}

/// Loose truthiness: `null`, `false`, `0` and `""` are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Display text of a truthy field. Non-string values are rendered as JSON.
fn text_of(value: Option<&Value>) -> Option<String> {
    match value? {
        v if !is_truthy(v) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
