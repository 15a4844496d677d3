//! Concrete connectors.

pub mod file_finder;
pub mod smtp;

pub use file_finder::{FileFinderConnector, FileSearchResult};
pub use smtp::{MailDelivery, SmtpConnector};
