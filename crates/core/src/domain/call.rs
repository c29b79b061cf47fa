use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A call as returned by the call-log API. Only the fields the export reads are
/// modelled; everything else in the payload is ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    pub id: String,
    #[serde(default)]
    pub customer: Option<Customer>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub analysis: Option<CallAnalysis>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default)]
    pub number: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    /// Rubric dependent: a string, boolean or number on the wire.
    #[serde(default)]
    pub success_evaluation: Option<Value>,
}

impl CallRecord {
    pub fn customer_number(&self) -> Option<&str> {
        self.customer.as_ref().and_then(|customer| customer.number.as_deref())
    }

    pub fn summary(&self) -> Option<&str> {
        self.analysis.as_ref().and_then(|analysis| analysis.summary.as_deref())
    }

    pub fn success_evaluation(&self) -> Option<String> {
        match self.analysis.as_ref()?.success_evaluation.as_ref()? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn transcript(&self) -> &str {
        self.transcript.as_deref().unwrap_or_default()
    }
}
