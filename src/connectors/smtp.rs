//! SMTP connector. Sends text and email messages through a mail transport.
//!
//! The transport is built from configuration on every send unless
//! `reuse_transport` is set. Connector-level headers, sender and footer are
//! validated once at construction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use lettre::message::header::{HeaderName, HeaderValue};
use lettre::message::{Mailbox, MessageBuilder, SinglePart};
use lettre::Message;
use regex::Regex;

use crate::communication::{CommunicationMessage, flatten_addresses};
use crate::config::SmtpConfig;
use crate::connector::{CommunicationBackend, ConnectorBackend, MailQuery};
use crate::error::{CommunicationError, ConfigError, ConnectorError};
use crate::transport::{
    Dsn, MailTransport, SmtpTransportFactory, TransportFactory, TransportPolicy,
};

/// Header telling auto-repliers not to answer automated mail.
pub const AUTO_RESPONSE_SUPPRESS_HEADER: &str = "X-Auto-Response-Suppress";
pub const AUTO_RESPONSE_SUPPRESS_VALUE: &str = "OOF, DR, RN, NRN, AutoReply";

const PRIORITY_HEADER: &str = "X-Priority";

/// Any opening, closing or self-closing tag, doctype or comment.
static MARKUP_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[A-Za-z][A-Za-z0-9:-]*(\s[^<>]*)?/?>|<!(--|[A-Za-z])").expect("markup pattern is valid")
});

/// Outcome of a mail query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDelivery {
    /// Envelope recipients the message was handed to.
    pub recipients: Vec<String>,
}

/// Body after footer placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedBody {
    Html(String),
    Plain(String),
}

/// Whether the text contains markup.
pub fn is_markup(text: &str) -> bool {
    MARKUP_PATTERN.is_match(text)
}

/// Pick the content type and append the footer.
///
/// Markup bodies get `<footer>…</footer>` appended; plain bodies get the
/// footer after a blank line.
pub fn render_body(text: &str, footer: Option<&str>) -> RenderedBody {
    if is_markup(text) {
        RenderedBody::Html(match footer {
            Some(footer) => format!("{text}<footer>{footer}</footer>"),
            None => text.to_string(),
        })
    } else {
        RenderedBody::Plain(match footer {
            Some(footer) => format!("{text}\n\n{footer}"),
            None => text.to_string(),
        })
    }
}

/// Outbound mail connector.
pub struct SmtpConnector {
    dsn: Dsn,
    from: Option<Mailbox>,
    headers: Vec<(HeaderName, String)>,
    footer: Option<String>,
    policy: TransportPolicy,
    factory: Box<dyn TransportFactory>,
    cached: Option<Box<dyn MailTransport>>,
}

impl std::fmt::Debug for SmtpConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConnector")
            .field("dsn", &self.dsn.to_string())
            .field("from", &self.from)
            .field("policy", &self.policy)
            .field("transport_cached", &self.cached.is_some())
            .finish_non_exhaustive()
    }
}

impl SmtpConnector {
    /// Validate configuration and create a connector using lettre's SMTP
    /// transport.
    pub fn new(config: SmtpConfig) -> Result<Self, ConfigError> {
        Self::with_factory(config, SmtpTransportFactory)
    }

    /// Same as [`SmtpConnector::new`] with a custom transport factory.
    pub fn with_factory(
        config: SmtpConfig,
        factory: impl TransportFactory + 'static,
    ) -> Result<Self, ConfigError> {
        let dsn = Dsn::from_config(&config)?;

        let from = match config.from.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => Some(raw.parse::<Mailbox>().map_err(|e| {
                ConfigError::invalid("from", format!("invalid from-address \"{raw}\": {e}"))
            })?),
            _ => None,
        };

        let mut merged = config.message_headers.clone();
        if config.suppress_auto_response {
            merged.insert(
                AUTO_RESPONSE_SUPPRESS_HEADER.to_string(),
                AUTO_RESPONSE_SUPPRESS_VALUE.to_string(),
            );
        }
        let headers = validate_headers(&merged).map_err(|message| {
            ConfigError::invalid("message_headers", message)
        })?;

        let policy = if config.reuse_transport {
            TransportPolicy::Reuse
        } else {
            TransportPolicy::RebuildPerSend
        };

        Ok(Self {
            dsn,
            from,
            headers,
            footer: config.footer.filter(|f| !f.is_empty()),
            policy,
            factory: Box::new(factory),
            cached: None,
        })
    }

    pub fn dsn(&self) -> &Dsn {
        &self.dsn
    }

    /// Headers added to every message, in application order.
    pub fn message_headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(name, value)| (&**name, value.as_str()))
    }

    pub fn footer(&self) -> Option<&str> {
        self.footer.as_deref()
    }

    /// Assemble the wire message for a text or email message.
    pub fn build_email(
        &self,
        alias: &str,
        message: &CommunicationMessage,
    ) -> Result<Message, CommunicationError> {
        let (text, recipients, email) = match message {
            CommunicationMessage::Text(m) => (&m.text, &m.recipients, None),
            CommunicationMessage::Email(m) => (&m.text, &m.recipients, Some(m)),
            CommunicationMessage::Notification(_) => {
                return Err(CommunicationError::UnsupportedMessageType {
                    connector: alias.to_string(),
                    message_type: message.type_name().to_string(),
                });
            }
        };

        let mut builder = Message::builder();
        for (name, value) in &self.headers {
            builder = builder.raw_header(HeaderValue::new(name.clone(), value.clone()));
        }

        if let Some(from) = &self.from {
            builder = builder.from(from.clone());
        }

        let addresses = flatten_addresses(recipients);
        if addresses.is_empty() {
            return Err(CommunicationError::not_sent(alias, "message has no resolvable recipient"));
        }
        for address in &addresses {
            let mailbox = address.parse::<Mailbox>().map_err(|e| CommunicationError::NotSent {
                connector: alias.to_string(),
                reason: format!("invalid recipient address \"{address}\""),
                source: Some(Box::new(e)),
            })?;
            builder = builder.to(mailbox);
        }

        if let Some(email) = email {
            builder = apply_email_fields(builder, alias, email)?;
        }

        let part = match render_body(text, self.footer.as_deref()) {
            RenderedBody::Html(body) => SinglePart::html(body),
            RenderedBody::Plain(body) => SinglePart::plain(body),
        };

        builder.singlepart(part).map_err(|e| CommunicationError::NotSent {
            connector: alias.to_string(),
            reason: "failed to build message".into(),
            source: Some(Box::new(e)),
        })
    }

    /// Send through the transport, honoring the transport policy.
    fn send(&mut self, message: &Message) -> Result<(), SendError> {
        let transport = match self.cached.take() {
            Some(transport) => transport,
            None => self.factory.create(&self.dsn).map_err(SendError::Build)?,
        };
        let result = transport.send(message).map_err(SendError::Send);
        if self.policy == TransportPolicy::Reuse {
            self.cached = Some(transport);
        }
        result
    }
}

enum SendError {
    Build(crate::error::BoxError),
    Send(crate::error::BoxError),
}

impl SendError {
    fn into_communication(self, alias: &str) -> CommunicationError {
        let (reason, source) = match self {
            Self::Build(e) => ("failed to build transport", e),
            Self::Send(e) => ("transport rejected the message", e),
        };
        CommunicationError::NotSent {
            connector: alias.to_string(),
            reason: format!("{reason}: {source}"),
            source: Some(source),
        }
    }

    fn into_source(self) -> crate::error::BoxError {
        match self {
            Self::Build(e) | Self::Send(e) => e,
        }
    }
}

fn apply_email_fields(
    mut builder: MessageBuilder,
    alias: &str,
    email: &crate::communication::EmailMessage,
) -> Result<MessageBuilder, CommunicationError> {
    if let Some(priority) = email.priority {
        builder = builder.raw_header(HeaderValue::new(
            HeaderName::new_from_ascii_str(PRIORITY_HEADER),
            priority.header_value(),
        ));
    }

    let extra = validate_headers(&email.headers)
        .map_err(|message| CommunicationError::not_sent(alias, message))?;
    for (name, value) in extra {
        builder = builder.raw_header(HeaderValue::new(name, value));
    }

    Ok(builder.subject(email.subject.as_deref().unwrap_or_default()))
}

/// Check header names and values; returns them ready for use.
fn validate_headers(headers: &BTreeMap<String, String>) -> Result<Vec<(HeaderName, String)>, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let header = HeaderName::new_from_ascii(name.clone())
                .map_err(|_| format!("invalid header name \"{name}\""))?;
            if value.contains(['\r', '\n']) {
                return Err(format!("header \"{name}\" contains a line break"));
            }
            Ok((header, value.clone()))
        })
        .collect()
}

impl ConnectorBackend for SmtpConnector {
    type Query = MailQuery;
    type Output = MailDelivery;

    fn perform_connect(&mut self, _alias: &str) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn perform_query(
        &mut self,
        alias: &str,
        query: &MailQuery,
    ) -> Result<MailDelivery, ConnectorError> {
        self.send(&query.message)
            .map_err(|e| ConnectorError::QueryFailed {
                connector: alias.to_string(),
                source: e.into_source(),
            })?;
        let recipients = query
            .message
            .envelope()
            .to()
            .iter()
            .map(ToString::to_string)
            .collect();
        Ok(MailDelivery { recipients })
    }

    fn perform_disconnect(&mut self) -> Result<(), ConnectorError> {
        self.cached = None;
        Ok(())
    }
}

impl CommunicationBackend for SmtpConnector {
    fn supports(&self, message: &CommunicationMessage) -> bool {
        matches!(
            message,
            CommunicationMessage::Text(_) | CommunicationMessage::Email(_)
        )
    }

    fn communicate(
        &mut self,
        alias: &str,
        message: &CommunicationMessage,
    ) -> Result<(), CommunicationError> {
        let email = self.build_email(alias, message)?;
        self.send(&email).map_err(|e| e.into_communication(alias))?;
        tracing::info!(
            connector = %alias,
            recipients = email.envelope().to().len(),
            "Message sent"
        );
        Ok(())
    }
}
