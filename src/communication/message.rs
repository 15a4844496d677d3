//! Outbound message families.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::recipient::Recipient;

/// Message priority, 1 (highest) to 5 (lowest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Highest = 1,
    High = 2,
    Normal = 3,
    Low = 4,
    Lowest = 5,
}

impl Priority {
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Value of the `X-Priority` header, e.g. `1 (Highest)`.
    pub fn header_value(self) -> String {
        format!("{} ({self})", self.level())
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Highest => "Highest",
            Self::High => "High",
            Self::Normal => "Normal",
            Self::Low => "Low",
            Self::Lowest => "Lowest",
        };
        f.write_str(label)
    }
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Self::Highest),
            2 => Ok(Self::High),
            3 => Ok(Self::Normal),
            4 => Ok(Self::Low),
            5 => Ok(Self::Lowest),
            other => Err(format!("priority must be between 1 and 5, got {other}")),
        }
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.level()
    }
}

/// Plain text message to a set of recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMessage {
    pub text: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

impl TextMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recipients: Vec::new(),
        }
    }

    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipients.push(recipient);
        self
    }
}

/// Email: a text message plus subject, priority and extra headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub text: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// Message-level headers, applied after the connector's defaults.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl EmailMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            recipients: Vec::new(),
            subject: None,
            priority: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipients.push(recipient);
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// In-app notification. Not deliverable by mail connectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub title: String,
    pub text: String,
    #[serde(default)]
    pub recipients: Vec<Recipient>,
}

/// Any outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommunicationMessage {
    Text(TextMessage),
    Email(EmailMessage),
    Notification(NotificationMessage),
}

impl CommunicationMessage {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Email(_) => "email",
            Self::Notification(_) => "notification",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Text(m) => &m.text,
            Self::Email(m) => &m.text,
            Self::Notification(m) => &m.text,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        match self {
            Self::Text(m) => &m.recipients,
            Self::Email(m) => &m.recipients,
            Self::Notification(m) => &m.recipients,
        }
    }
}

impl From<TextMessage> for CommunicationMessage {
    fn from(message: TextMessage) -> Self {
        Self::Text(message)
    }
}

impl From<EmailMessage> for CommunicationMessage {
    fn from(message: EmailMessage) -> Self {
        Self::Email(message)
    }
}

impl From<NotificationMessage> for CommunicationMessage {
    fn from(message: NotificationMessage) -> Self {
        Self::Notification(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_header_value() {
        assert_eq!(Priority::Highest.header_value(), "1 (Highest)");
        assert_eq!(Priority::Lowest.header_value(), "5 (Lowest)");
    }

    #[test]
    fn priority_rejects_out_of_range() {
        assert!(Priority::try_from(0).is_err());
        assert!(Priority::try_from(6).is_err());
        assert_eq!(Priority::try_from(2), Ok(Priority::High));
    }

    #[test]
    fn email_deserializes_with_numeric_priority() {
        let json = r#"{
            "type": "email",
            "text": "Hello",
            "subject": "Status",
            "priority": 2,
            "recipients": [{"kind": "individual", "address": "ops@example.com"}]
        }"#;
        let message: CommunicationMessage = serde_json::from_str(json).unwrap();
        let CommunicationMessage::Email(email) = &message else {
            panic!("expected email, got {}", message.type_name());
        };
        assert_eq!(email.priority, Some(Priority::High));
        assert_eq!(email.subject.as_deref(), Some("Status"));
        assert_eq!(message.recipients().len(), 1);
    }

    #[test]
    fn accessors_cover_every_family() {
        let note: CommunicationMessage = NotificationMessage {
            title: "t".into(),
            text: "body".into(),
            recipients: vec![],
        }
        .into();
        assert_eq!(note.type_name(), "notification");
        assert_eq!(note.text(), "body");

        let text: CommunicationMessage = TextMessage::new("plain").into();
        assert_eq!(text.type_name(), "text");
        assert_eq!(text.text(), "plain");
    }
}
