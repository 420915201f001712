//! OperationOutcome documents
//!
//! Every error the API reports to a client is a single-issue `OperationOutcome`
//! whose `diagnostics` carries the request id, so a caller can hand the value back
//! when asking about a failed request.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Fatal,
    Error,
    Warning,
    Information,
}

/// Issue codes reported by the DPC API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssueCode {
    #[serde(rename = "Exception")]
    Exception,
    #[serde(rename = "Business Rule Violation")]
    BusinessRule,
    #[serde(rename = "Not Found")]
    NotFound,
}

impl IssueCode {
    pub const fn severity(&self) -> IssueSeverity {
        match self {
            IssueCode::Exception => IssueSeverity::Error,
            IssueCode::BusinessRule | IssueCode::NotFound => IssueSeverity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueDetails {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: IssueSeverity,
    pub code: IssueCode,
    pub details: IssueDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationOutcome {
    pub resource_type: String,
    pub issue: Vec<Issue>,
}

impl OperationOutcome {
    pub fn new(code: IssueCode, text: impl Into<String>, request_id: Option<&str>) -> Self {
        Self {
            resource_type: "OperationOutcome".to_string(),
            issue: vec![Issue {
                severity: code.severity(),
                code,
                details: IssueDetails { text: text.into() },
                diagnostics: request_id.map(str::to_string),
            }],
        }
    }
}
