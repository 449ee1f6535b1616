// src/evaluation.rs
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::{KycError, Result};

/// HTTP status Alloy uses when a decision is pending an extra verification step.
pub const PARTIAL_SUCCESS_STATUS: u16 = 206;

/// The requirement key Alloy uses for an out-of-wallet challenge.
pub const OOW_REQUIREMENT_KEY: &str = "answers";

/// Top-level classification of an evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SummaryResult {
    Success,
    Denied,
    ManualReview,
    Unknown(String),
}

impl From<String> for SummaryResult {
    fn from(value: String) -> Self {
        match value.as_str() {
            "success" => SummaryResult::Success,
            "denied" => SummaryResult::Denied,
            "manual_review" => SummaryResult::ManualReview,
            _ => SummaryResult::Unknown(value),
        }
    }
}

impl From<SummaryResult> for String {
    fn from(value: SummaryResult) -> Self {
        value.to_string()
    }
}

impl std::fmt::Display for SummaryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryResult::Success => write!(f, "success"),
            SummaryResult::Denied => write!(f, "denied"),
            SummaryResult::ManualReview => write!(f, "manual_review"),
            SummaryResult::Unknown(other) => write!(f, "{}", other),
        }
    }
}

/// Deserializes `T`, falling back to its default on null or a shape mismatch.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserializes a list, keeping only the entries that parse. Null or a
/// non-array yields an empty list.
fn lenient_vec<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_items(Value::deserialize(deserializer)?))
}

fn lenient_items<T: DeserializeOwned>(value: Value) -> Vec<T> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub result: SummaryResult,

    /// Human-facing outcome label, e.g. "Approved".
    #[serde(default, deserialize_with = "lenient")]
    pub outcome: Option<String>,

    #[serde(default, deserialize_with = "lenient")]
    pub score: Option<f64>,

    #[serde(default, deserialize_with = "lenient_vec")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerChoice {
    pub id: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub answer: String,
}

/// One knowledge-based question of an out-of-wallet challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    #[serde(default, deserialize_with = "lenient")]
    pub question: String,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub answers: Vec<AnswerChoice>,
}

/// An additional verification step the service is waiting on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    #[serde(default, deserialize_with = "lenient")]
    pub key: String,
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub questions: Vec<Question>,
}

impl Requirement {
    pub fn is_oow(&self) -> bool {
        self.key == OOW_REQUIREMENT_KEY
    }
}

/// Applicant data sent when creating an evaluation.
///
/// Validation is left to the service. Fields outside the common set go in
/// `extra` and are sent at the top level of the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicantFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_last: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_ssn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line_1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_country_code: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OowAnswer {
    pub question_id: u32,
    pub answer_id: u32,
}

/// Answers to an out-of-wallet challenge, in question order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OowResponses {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_first: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_last: Option<String>,
    pub answers: Vec<OowAnswer>,
}

#[derive(Deserialize)]
struct EvaluationBody {
    #[serde(default, deserialize_with = "lenient")]
    evaluation_token: Option<String>,
    #[serde(default)]
    summary: Option<Summary>,
    #[serde(default, deserialize_with = "lenient_vec")]
    required: Vec<Requirement>,
    #[serde(default)]
    error: Option<Value>,
}

/// A single KYC decision as returned by the service.
///
/// Values are immutable; follow-up calls on the client return new ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    status_code: u16,
    error: Option<Value>,
    evaluation_token: Option<String>,
    summary: Option<Summary>,
    required: Vec<Requirement>,
    raw: Value,
}

impl Evaluation {
    /// Builds an evaluation from a raw HTTP response.
    ///
    /// Non-2xx responses never fail here: the payload lands in `error`.
    /// A 2xx body that is not JSON, or lacks `summary.result` or
    /// `evaluation_token`, is an [`KycError::UnexpectedResponse`].
    pub fn from_response(status_code: u16, body: &str) -> Result<Self> {
        let success = (200..300).contains(&status_code);

        let raw: Value = if body.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(body) {
                Ok(value) => value,
                Err(e) if success => {
                    return Err(KycError::UnexpectedResponse(format!("invalid JSON body: {}", e)));
                }
                Err(_) => Value::String(body.to_string()),
            }
        };

        if !success {
            return Ok(Self::failed(status_code, raw));
        }

        let parsed: EvaluationBody = serde_json::from_value(raw.clone())
            .map_err(|e| KycError::UnexpectedResponse(format!("{}: {}", e, raw)))?;

        if let Some(error) = parsed.error.filter(|e| !e.is_null()) {
            return Ok(Self {
                status_code,
                error: Some(error),
                evaluation_token: parsed.evaluation_token,
                summary: parsed.summary,
                required: parsed.required,
                raw,
            });
        }

        let summary = parsed
            .summary
            .ok_or_else(|| KycError::UnexpectedResponse(format!("missing summary.result: {}", raw)))?;
        let evaluation_token = parsed
            .evaluation_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| KycError::UnexpectedResponse(format!("missing evaluation_token: {}", raw)))?;

        Ok(Self {
            status_code,
            error: None,
            evaluation_token: Some(evaluation_token),
            summary: Some(summary),
            required: parsed.required,
            raw,
        })
    }

    fn failed(status_code: u16, raw: Value) -> Self {
        let error = match raw.get("error") {
            Some(e) if !e.is_null() => e.clone(),
            _ if raw.is_null() => Value::String(format!("HTTP {}", status_code)),
            _ => raw.clone(),
        };

        Self {
            status_code,
            error: Some(error),
            evaluation_token: raw
                .get("evaluation_token")
                .and_then(Value::as_str)
                .map(str::to_string),
            summary: raw
                .get("summary")
                .and_then(|s| serde_json::from_value(s.clone()).ok()),
            required: raw
                .get("required")
                .cloned()
                .map(lenient_items)
                .unwrap_or_default(),
            raw,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn error(&self) -> Option<&Value> {
        self.error.as_ref()
    }

    pub fn evaluation_token(&self) -> Option<&str> {
        self.evaluation_token.as_deref()
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn result(&self) -> Option<&SummaryResult> {
        self.summary.as_ref().map(|s| &s.result)
    }

    pub fn required(&self) -> &[Requirement] {
        &self.required
    }

    /// The full decoded response body.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn is_manual_review(&self) -> bool {
        matches!(self.result(), Some(SummaryResult::ManualReview))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self.result(), Some(SummaryResult::Denied))
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result(), Some(SummaryResult::Success)) && self.status_code != PARTIAL_SUCCESS_STATUS
    }

    pub fn is_partial_success(&self) -> bool {
        matches!(self.result(), Some(SummaryResult::Success)) && self.status_code == PARTIAL_SUCCESS_STATUS
    }

    pub fn requires_oow(&self) -> bool {
        self.required.iter().any(Requirement::is_oow)
    }

    /// Questions of any outstanding out-of-wallet challenge.
    pub fn oow_questions(&self) -> Vec<&Question> {
        self.required
            .iter()
            .filter(|r| r.is_oow())
            .flat_map(|r| r.questions.iter())
            .collect()
    }

    /// Recognized result. Fails with [`KycError::MissingResult`] without a
    /// summary and [`KycError::UnknownResult`] for anything other than
    /// success, denied or manual_review.
    pub fn classification(&self) -> Result<SummaryResult> {
        match self.result() {
            Some(SummaryResult::Unknown(other)) => Err(KycError::UnknownResult(other.clone())),
            Some(known) => Ok(known.clone()),
            None => Err(KycError::MissingResult),
        }
    }

    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        let message = match error {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .or_else(|| map.get("error").and_then(|e| e.get("message")))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
            other => other.to_string(),
        };
        Some(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(result: &str) -> String {
        json!({
            "evaluation_token": "L-abc",
            "summary": { "result": result, "score": 0.9, "tags": ["Low Fraud Risk"] },
            "required": []
        })
        .to_string()
    }

    #[test]
    fn test_success_and_partial_success_split_on_206() {
        let full = Evaluation::from_response(201, &body("success")).unwrap();
        assert!(full.is_success());
        assert!(!full.is_partial_success());

        let partial = Evaluation::from_response(206, &body("success")).unwrap();
        assert!(partial.is_partial_success());
        assert!(!partial.is_success());
        assert_eq!(partial.status_code(), 206);
    }

    #[test]
    fn test_result_predicates_are_exclusive() {
        for result in ["success", "denied", "manual_review", "something_new"] {
            let e = Evaluation::from_response(201, &body(result)).unwrap();
            let hits = [e.is_success(), e.is_partial_success(), e.is_denied(), e.is_manual_review()]
                .iter()
                .filter(|b| **b)
                .count();
            let expected = if result == "something_new" { 0 } else { 1 };
            assert_eq!(hits, expected, "result {result}");
        }
    }

    #[test]
    fn test_unknown_result_is_an_error_classification() {
        let e = Evaluation::from_response(201, &body("pending")).unwrap();
        assert_eq!(e.result(), Some(&SummaryResult::Unknown("pending".to_string())));
        assert!(matches!(e.classification(), Err(KycError::UnknownResult(r)) if r == "pending"));

        let denied = Evaluation::from_response(201, &body("denied")).unwrap();
        assert_eq!(denied.classification().unwrap(), SummaryResult::Denied);
    }

    #[test]
    fn test_missing_summary_on_2xx_is_rejected() {
        let err = Evaluation::from_response(201, r#"{"evaluation_token": "L-1"}"#).unwrap_err();
        assert!(matches!(err, KycError::UnexpectedResponse(_)));

        let err = Evaluation::from_response(201, "<html>").unwrap_err();
        assert!(matches!(err, KycError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_error_status_populates_error() {
        let e = Evaluation::from_response(
            400,
            r#"{"status_code": 400, "error": {"type": "Bad Request", "message": "Invalid birth_date"}}"#,
        )
        .unwrap();

        assert_eq!(e.status_code(), 400);
        assert!(e.error().is_some());
        assert_eq!(e.error_message().as_deref(), Some("Invalid birth_date"));
        assert!(!e.is_success());
        assert!(e.classification().is_err());
    }

    #[test]
    fn test_missing_summary_classification_is_distinct() {
        let e = Evaluation::from_response(500, "").unwrap();
        assert!(matches!(e.classification(), Err(KycError::MissingResult)));
    }

    #[test]
    fn test_null_required_is_empty() {
        let raw = json!({
            "evaluation_token": "L-1",
            "summary": { "result": "success" },
            "required": null
        });
        let e = Evaluation::from_response(201, &raw.to_string()).unwrap();
        assert!(e.required().is_empty());
        assert!(e.is_success());
    }

    #[test]
    fn test_null_summary_fields_are_tolerated() {
        let raw = json!({
            "evaluation_token": "L-2",
            "summary": { "result": "denied", "tags": null, "score": "n/a", "outcome": null }
        });
        let e = Evaluation::from_response(201, &raw.to_string()).unwrap();
        let summary = e.summary().unwrap();
        assert!(summary.tags.is_empty());
        assert_eq!(summary.score, None);
        assert!(e.is_denied());
    }

    #[test]
    fn test_requirement_without_key_is_kept() {
        let raw = json!({
            "evaluation_token": "L-3",
            "summary": { "result": "manual_review" },
            "required": [{ "type": "string", "description": "Document upload" }, "stray"]
        });
        let e = Evaluation::from_response(201, &raw.to_string()).unwrap();
        assert_eq!(e.required().len(), 1);
        assert_eq!(e.required()[0].key, "");
        assert_eq!(e.required()[0].kind.as_deref(), Some("string"));
        assert!(!e.requires_oow());
    }

    #[test]
    fn test_missing_result_inside_summary_is_rejected() {
        let raw = json!({ "evaluation_token": "L-4", "summary": { "tags": [] } });
        let err = Evaluation::from_response(201, &raw.to_string()).unwrap_err();
        assert!(matches!(err, KycError::UnexpectedResponse(_)));
    }

    #[test]
    fn test_error_status_keeps_required() {
        let raw = json!({
            "error": { "message": "Answers incomplete" },
            "evaluation_token": "L-5",
            "required": [{ "key": "answers", "type": "array", "questions": null }]
        });
        let e = Evaluation::from_response(400, &raw.to_string()).unwrap();
        assert_eq!(e.required().len(), 1);
        assert!(e.requires_oow());
        assert!(e.oow_questions().is_empty());
    }

    #[test]
    fn test_error_status_with_plain_text_body() {
        let e = Evaluation::from_response(503, "Service Unavailable").unwrap();
        assert_eq!(e.error_message().as_deref(), Some("Service Unavailable"));

        let empty = Evaluation::from_response(500, "").unwrap();
        assert_eq!(empty.error_message().as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn test_oow_requirement_exposes_questions() {
        let raw = json!({
            "evaluation_token": "L-oow",
            "summary": { "result": "manual_review" },
            "required": [{
                "key": "answers",
                "type": "array",
                "description": "Out of wallet questions",
                "questions": [{
                    "id": 1,
                    "question": "Which street have you lived on?",
                    "answers": [{ "id": 1, "answer": "MAIN" }, { "id": 2, "answer": "ELM" }]
                }]
            }]
        });

        let e = Evaluation::from_response(201, &raw.to_string()).unwrap();
        assert!(e.requires_oow());
        assert!(!e.required().is_empty());
        let questions = e.oow_questions();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].answers[1].answer, "ELM");
    }

    #[test]
    fn test_non_oow_requirement_does_not_require_oow() {
        let raw = json!({
            "evaluation_token": "L-doc",
            "summary": { "result": "manual_review" },
            "required": [{ "key": "document_ssn", "type": "string" }]
        });
        let e = Evaluation::from_response(201, &raw.to_string()).unwrap();
        assert_eq!(e.required().len(), 1);
        assert!(!e.requires_oow());
    }

    #[test]
    fn test_applicant_fields_flatten_extra() {
        let mut fields = ApplicantFields {
            name_first: Some("John".to_string()),
            ..Default::default()
        };
        fields.extra.insert("email_address".to_string(), json!("john@example.com"));

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value, json!({ "name_first": "John", "email_address": "john@example.com" }));
    }
}
