//! Proof of delivery.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::message::CommunicationMessage;

/// Created only after a successful send; binds the message to the connector
/// that delivered it.
#[derive(Debug, Clone, Serialize)]
pub struct Receipt {
    id: Uuid,
    message: CommunicationMessage,
    connector: String,
    sent_at: DateTime<Utc>,
}

impl Receipt {
    pub(crate) fn new(message: CommunicationMessage, connector: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
            connector: connector.to_string(),
            sent_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn message(&self) -> &CommunicationMessage {
        &self.message
    }

    /// Alias of the connector that sent the message.
    pub fn connector(&self) -> &str {
        &self.connector
    }

    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::communication::TextMessage;

    #[test]
    fn receipt_binds_message_and_connector() {
        let message: CommunicationMessage = TextMessage::new("hi").into();
        let before = Utc::now();
        let receipt = Receipt::new(message.clone(), "mailer");
        assert_eq!(receipt.message(), &message);
        assert_eq!(receipt.connector(), "mailer");
        assert!(receipt.sent_at() >= before);
    }

    #[test]
    fn receipts_get_distinct_ids() {
        let message: CommunicationMessage = TextMessage::new("hi").into();
        let a = Receipt::new(message.clone(), "mailer");
        let b = Receipt::new(message, "mailer");
        assert_ne!(a.id(), b.id());
    }
}
