//! Recipient trees.

use serde::{Deserialize, Serialize};

/// A message recipient: an individual or a named group of recipients.
///
/// Groups nest arbitrarily. Trees are assumed to be finite and acyclic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipient {
    Individual(UserRecipient),
    Group(RecipientGroup),
}

/// A single recipient. The address may be unknown (e.g. a user without an
/// email on file).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecipient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A named group of recipients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientGroup {
    pub name: String,
    #[serde(default)]
    pub members: Vec<Recipient>,
}

impl Recipient {
    /// Individual recipient with a known address.
    pub fn address(address: impl Into<String>) -> Self {
        Self::Individual(UserRecipient {
            address: Some(address.into()),
            name: None,
        })
    }

    /// Individual recipient known only by name.
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::Individual(UserRecipient {
            address: None,
            name: Some(name.into()),
        })
    }

    pub fn group(name: impl Into<String>, members: Vec<Recipient>) -> Self {
        Self::Group(RecipientGroup {
            name: name.into(),
            members,
        })
    }
}

/// Flatten a recipient tree into addresses, in traversal order.
///
/// Individuals without an address contribute nothing. Duplicates across
/// branches are kept.
pub fn flatten_addresses(recipients: &[Recipient]) -> Vec<String> {
    let mut addresses = Vec::new();
    collect(recipients, &mut addresses);
    addresses
}

fn collect(recipients: &[Recipient], out: &mut Vec<String>) {
    for recipient in recipients {
        match recipient {
            Recipient::Individual(user) => {
                if let Some(address) = user.address.as_deref().filter(|a| !a.is_empty()) {
                    out.push(address.to_string());
                }
            }
            Recipient::Group(group) => collect(&group.members, out),
        }
    }
}
