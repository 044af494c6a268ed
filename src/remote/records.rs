//! One-off record mutations: lead create/update and call logging.
//!
//! These bypass the list controller. Callers should invalidate cached queries
//! for the affected resource after a successful mutation.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{LeadboardError, Result};

use super::RawItem;
use super::http::HttpBackend;

pub const LEADS_RESOURCE: &str = "leads";
pub const CALL_HISTORY_RESOURCE: &str = "call-history";

/// Fields of a lead. Absent fields are left untouched on update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadDraft {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_plausible_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.contains(char::is_whitespace)
}

fn is_plausible_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    (7..=15).contains(&digits)
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'))
}

impl LeadDraft {
    pub fn is_empty(&self) -> bool {
        *self == LeadDraft::default()
    }

    /// Check the shape of contact fields that are present.
    pub fn validate(&self) -> Result<()> {
        if let Some(email) = present(&self.email)
            && !is_plausible_email(email)
        {
            return Err(LeadboardError::InvalidRecord(format!(
                "'{email}' is not a valid email address"
            )));
        }
        if let Some(phone) = present(&self.phone)
            && !is_plausible_phone(phone)
        {
            return Err(LeadboardError::InvalidRecord(format!(
                "'{phone}' is not a valid phone number"
            )));
        }
        Ok(())
    }

    /// A new lead needs at least a shop name.
    pub fn validate_for_create(&self) -> Result<()> {
        if present(&self.shop_name).is_none() {
            return Err(LeadboardError::InvalidRecord(
                "shop name is required".to_string(),
            ));
        }
        self.validate()
    }
}

/// Result of a sales call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Answered,
    NoAnswer,
    Voicemail,
    Callback,
    NotInterested,
    Converted,
}

impl CallOutcome {
    pub const ALL: [CallOutcome; 6] = [
        CallOutcome::Answered,
        CallOutcome::NoAnswer,
        CallOutcome::Voicemail,
        CallOutcome::Callback,
        CallOutcome::NotInterested,
        CallOutcome::Converted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Answered => "answered",
            CallOutcome::NoAnswer => "no_answer",
            CallOutcome::Voicemail => "voicemail",
            CallOutcome::Callback => "callback",
            CallOutcome::NotInterested => "not_interested",
            CallOutcome::Converted => "converted",
        }
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CallOutcome {
    type Err = LeadboardError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        CallOutcome::ALL
            .into_iter()
            .find(|o| o.as_str() == normalized)
            .ok_or_else(|| {
                LeadboardError::InvalidRecord(format!(
                    "unknown call outcome '{s}', expected one of: {}",
                    CallOutcome::ALL.map(|o| o.as_str()).join(", ")
                ))
            })
    }
}

/// One entry in a lead's call history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    #[serde(rename = "lead")]
    pub lead_id: String,
    pub outcome: CallOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub called_at: Timestamp,
}

impl CallRecord {
    pub fn new(lead_id: impl Into<String>, outcome: CallOutcome) -> Self {
        Self {
            lead_id: lead_id.into(),
            outcome,
            notes: None,
            called_at: Timestamp::now(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = (!notes.trim().is_empty()).then_some(notes);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.lead_id.trim().is_empty() {
            return Err(LeadboardError::InvalidRecord(
                "call record needs a lead id".to_string(),
            ));
        }
        Ok(())
    }
}

fn into_record(value: Value) -> Result<RawItem> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(LeadboardError::Format(format!(
            "expected the saved record, got {}",
            match other {
                Value::Null => "an empty body",
                Value::Array(_) => "an array",
                _ => "a scalar",
            }
        ))),
    }
}

/// A record id as one path segment. Dot segments would walk the path.
fn record_id(id: &str) -> Result<&str> {
    let id = id.trim();
    if id.is_empty() || id.contains('/') || id == "." || id == ".." {
        return Err(LeadboardError::InvalidRecord(format!("invalid lead id '{id}'")));
    }
    Ok(id)
}

impl HttpBackend {
    /// `POST {base}/leads/`
    pub async fn create_lead(&self, draft: &LeadDraft) -> Result<RawItem> {
        draft.validate_for_create()?;
        let url = self.endpoint(&format!("{LEADS_RESOURCE}/"))?;
        let body = serde_json::to_value(draft)?;
        tracing::debug!("creating lead");
        into_record(self.execute(Method::POST, url, &[], Some(&body)).await?)
    }

    /// `PATCH {base}/leads/{id}/`
    pub async fn update_lead(&self, id: &str, draft: &LeadDraft) -> Result<RawItem> {
        if draft.is_empty() {
            return Err(LeadboardError::InvalidRecord(
                "nothing to update".to_string(),
            ));
        }
        draft.validate()?;
        let url = self.record_endpoint(LEADS_RESOURCE, record_id(id)?)?;
        let body = serde_json::to_value(draft)?;
        tracing::debug!(id, "updating lead");
        into_record(self.execute(Method::PATCH, url, &[], Some(&body)).await?)
    }

    /// `POST {base}/call-history/`
    pub async fn log_call(&self, record: &CallRecord) -> Result<RawItem> {
        record.validate()?;
        let url = self.endpoint(&format!("{CALL_HISTORY_RESOURCE}/"))?;
        let body = serde_json::to_value(record)?;
        tracing::debug!(lead = %record.lead_id, outcome = %record.outcome, "logging call");
        into_record(self.execute(Method::POST, url, &[], Some(&body)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_shop_name() {
        let draft = LeadDraft {
            shop_name: Some("   ".to_string()),
            ..LeadDraft::default()
        };
        assert!(matches!(
            draft.validate_for_create(),
            Err(LeadboardError::InvalidRecord(_))
        ));

        let draft = LeadDraft {
            shop_name: Some("Joe's Café".to_string()),
            ..LeadDraft::default()
        };
        draft.validate_for_create().unwrap();
    }

    #[test]
    fn test_validate_email_and_phone() {
        let mut draft = LeadDraft {
            email: Some("joe@example.com".to_string()),
            phone: Some("+44 (0)113 496-0000".to_string()),
            ..LeadDraft::default()
        };
        draft.validate().unwrap();

        draft.email = Some("joe@localhost".to_string());
        assert!(draft.validate().is_err());

        draft.email = None;
        draft.phone = Some("12ab".to_string());
        assert!(draft.validate().is_err());
    }

    #[test]
    fn test_draft_serializes_only_present_fields() {
        let draft = LeadDraft {
            shop_name: Some("Joe's".to_string()),
            city: Some("Leeds".to_string()),
            ..LeadDraft::default()
        };
        let value = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"shop_name": "Joe's", "city": "Leeds"})
        );
    }

    #[test]
    fn test_call_outcome_parse() {
        assert_eq!("no-answer".parse::<CallOutcome>().unwrap(), CallOutcome::NoAnswer);
        assert_eq!("Not Interested".parse::<CallOutcome>().unwrap(), CallOutcome::NotInterested);
        assert!("maybe".parse::<CallOutcome>().is_err());
    }

    #[test]
    fn test_call_record_serialization() {
        let mut record = CallRecord::new("42", CallOutcome::Callback).with_notes("ring after 3");
        record.called_at = "2026-03-01T10:00:00Z".parse().unwrap();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["lead"], "42");
        assert_eq!(value["outcome"], "callback");
        assert_eq!(value["notes"], "ring after 3");
        assert_eq!(value["called_at"], "2026-03-01T10:00:00Z");
    }

    #[test]
    fn test_call_record_blank_notes_dropped() {
        let record = CallRecord::new("42", CallOutcome::Answered).with_notes("  ");
        assert!(record.notes.is_none());
        assert!(CallRecord::new(" ", CallOutcome::Answered).validate().is_err());
    }

    #[test]
    fn test_record_id_rejects_paths() {
        assert_eq!(record_id(" 12 ").unwrap(), "12");
        assert!(record_id("12/../admin").is_err());
        assert!(record_id("").is_err());
        assert!(record_id("..").is_err());
        assert!(record_id(".").is_err());
        assert_eq!(record_id("7?x=1").unwrap(), "7?x=1");
    }
}
