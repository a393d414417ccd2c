//! Portal entities
//!
//! Typed views of the records kept in the `investors`, `messages` and
//! `documents` collections. Field names are camelCase on the wire and
//! timestamps are epoch milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Value of the synthetic "everyone" recipient
pub const ALL_RECIPIENTS: &str = "all";

/// Who a message or document is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recipient {
    All,
    Investor(String),
}

impl Recipient {
    pub fn as_str(&self) -> &str {
        match self {
            Recipient::All => ALL_RECIPIENTS,
            Recipient::Investor(id) => id,
        }
    }
}

impl From<String> for Recipient {
    fn from(value: String) -> Self {
        if value == ALL_RECIPIENTS || value.is_empty() {
            Recipient::All
        } else {
            Recipient::Investor(value)
        }
    }
}

impl From<&str> for Recipient {
    fn from(value: &str) -> Self {
        Recipient::from(value.to_string())
    }
}

impl From<Recipient> for String {
    fn from(value: Recipient) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentCategory {
    TaxForms,
    FinancialStatements,
    #[serde(other)]
    Other,
}

impl DocumentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentCategory::TaxForms => "tax-forms",
            DocumentCategory::FinancialStatements => "financial-statements",
            DocumentCategory::Other => "other",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DocumentCategory::TaxForms => "Tax Forms",
            DocumentCategory::FinancialStatements => "Financial Statements",
            DocumentCategory::Other => "Other",
        }
    }

    pub fn all() -> [DocumentCategory; 3] {
        [
            DocumentCategory::TaxForms,
            DocumentCategory::FinancialStatements,
            DocumentCategory::Other,
        ]
    }
}

impl FromStr for DocumentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tax-forms" => Ok(DocumentCategory::TaxForms),
            "financial-statements" => Ok(DocumentCategory::FinancialStatements),
            "other" => Ok(DocumentCategory::Other),
            _ => Err(format!("Unknown document category: {}", s)),
        }
    }
}

/// Investor profile, keyed by the identity uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Investor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub last_login: Option<DateTime<Utc>>,
}

/// File attached to a message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub url: String,
    pub name: String,
    pub size_bytes: u64,
}

/// Message shown on an investor's dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub recipient_id: Recipient,
    pub subject: String,
    pub body: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub sent_at: Option<DateTime<Utc>>,
    pub sent_by: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub read_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_size: Option<u64>,
}

impl Message {
    pub fn attachment(&self) -> Option<Attachment> {
        match (&self.attachment_url, &self.attachment_name) {
            (Some(url), Some(name)) => Some(Attachment {
                url: url.clone(),
                name: name.clone(),
                size_bytes: self.attachment_size.unwrap_or(0),
            }),
            _ => None,
        }
    }

    /// Builder method: attach a stored file
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment_url = Some(attachment.url);
        self.attachment_name = Some(attachment.name);
        self.attachment_size = Some(attachment.size_bytes);
        self
    }
}

/// Metadata of an uploaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub category: DocumentCategory,
    pub recipient_id: Recipient,
    pub storage_url: String,
    #[serde(default)]
    pub file_size: u64,
    #[serde(default)]
    pub file_type: String,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub uploaded_at: Option<DateTime<Utc>>,
    pub uploaded_by: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{to_fields, Record};
    use serde_json::json;

    #[test]
    fn test_recipient_wire_format() {
        assert_eq!(serde_json::to_value(Recipient::All).unwrap(), json!("all"));
        let r: Recipient = serde_json::from_value(json!("uid-7")).unwrap();
        assert_eq!(r, Recipient::Investor("uid-7".to_string()));
    }

    #[test]
    fn test_category_parse_and_label() {
        let c: DocumentCategory = "tax-forms".parse().unwrap();
        assert_eq!(c.label(), "Tax Forms");
        assert!("bogus".parse::<DocumentCategory>().is_err());

        let unknown: DocumentCategory = serde_json::from_value(json!("k-1")).unwrap();
        assert_eq!(unknown, DocumentCategory::Other);
    }

    #[test]
    fn test_investor_fields_are_camel_case() {
        let investor = Investor {
            id: "uid-1".to_string(),
            name: "Jane".to_string(),
            email: "jane@x.com".to_string(),
            created_at: DateTime::from_timestamp_millis(1_700_000_000_000),
            last_login: None,
        };
        let fields = to_fields(&investor).unwrap();
        assert_eq!(fields["createdAt"], json!(1_700_000_000_000_i64));
        assert_eq!(fields["lastLogin"], json!(null));

        let back: Investor = Record::new("uid-1", fields).decode().unwrap();
        assert_eq!(back, investor);
    }

    #[test]
    fn test_message_attachment_roundtrip_fields() {
        let message = Message {
            id: String::new(),
            recipient_id: Recipient::All,
            subject: "Q3".to_string(),
            body: "Report attached".to_string(),
            sent_at: None,
            sent_by: "admin".to_string(),
            read_at: None,
            attachment_url: None,
            attachment_name: None,
            attachment_size: None,
        };
        assert!(message.attachment().is_none());
        assert!(!to_fields(&message).unwrap().contains_key("attachmentUrl"));

        let message = message.with_attachment(Attachment {
            url: "http://h/files/a.pdf".to_string(),
            name: "a.pdf".to_string(),
            size_bytes: 10,
        });
        let fields = to_fields(&message).unwrap();
        assert_eq!(fields["attachmentName"], json!("a.pdf"));
        assert_eq!(message.attachment().unwrap().size_bytes, 10);
    }
}
