//! Outbound communication: message families, recipient trees and receipts.

pub mod message;
pub mod receipt;
pub mod recipient;

pub use message::{CommunicationMessage, EmailMessage, NotificationMessage, Priority, TextMessage};
pub use receipt::Receipt;
pub use recipient::{Recipient, RecipientGroup, UserRecipient, flatten_addresses};
