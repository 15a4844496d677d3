//! Mail transport construction.
//!
//! A [`Dsn`] describes where and how to connect. A [`TransportFactory`]
//! turns it into a [`MailTransport`]; the default factory builds a lettre
//! `SmtpTransport`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::extension::ClientId;
use lettre::{Message, SmtpTransport, Transport};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{DEFAULT_SMTP_PORT, SmtpConfig};
use crate::error::{BoxError, ConfigError};

/// `scheme://[user[:password]@]host[:port][?query]`
static DSN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?:(?P<user>[^:@/]*)(?::(?P<password>[^@/]*))?@)?(?P<host>[^:/?]+)(?::(?P<port>\d+))?/?(?:\?(?P<query>.*))?$",
    )
    .expect("DSN pattern is valid")
});

/// Connection descriptor.
#[derive(Debug, Clone)]
pub struct Dsn {
    pub scheme: String,
    pub host: String,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub port: Option<u16>,
    pub options: BTreeMap<String, String>,
}

impl Dsn {
    /// Parse a DSN string. User and password are percent-decoded.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let caps = DSN_PATTERN
            .captures(raw.trim())
            .ok_or_else(|| ConfigError::invalid("dsn", format!("not a valid DSN: \"{raw}\"")))?;

        let decode = |key: &str| -> Result<Option<String>, ConfigError> {
            match caps.name(key).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
                Some(value) => urlencoding::decode(value)
                    .map(|v| Some(v.into_owned()))
                    .map_err(|e| ConfigError::invalid("dsn", format!("bad {key} encoding: {e}"))),
                None => Ok(None),
            }
        };

        let port = match caps.name("port") {
            Some(m) => Some(
                m.as_str()
                    .parse::<u16>()
                    .map_err(|e| ConfigError::invalid("dsn", format!("bad port: {e}")))?,
            ),
            None => None,
        };

        let mut options = BTreeMap::new();
        if let Some(query) = caps.name("query") {
            for pair in query.as_str().split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let value = urlencoding::decode(value)
                    .map_err(|e| ConfigError::invalid("dsn", format!("bad option {key}: {e}")))?;
                options.insert(key.to_string(), value.into_owned());
            }
        }

        Ok(Self {
            scheme: caps["scheme"].to_ascii_lowercase(),
            host: caps["host"].to_string(),
            user: decode("user")?,
            password: decode("password")?.map(SecretString::from),
            port,
            options,
        })
    }

    /// Assemble a DSN from discrete configuration fields, or parse
    /// `config.dsn` when present.
    pub fn from_config(config: &SmtpConfig) -> Result<Self, ConfigError> {
        if let Some(raw) = config.dsn.as_deref() {
            return Self::parse(raw);
        }
        let host = config
            .host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingRequired {
                key: "host".into(),
                hint: "Set either `dsn` or `host`.".into(),
            })?;
        Ok(Self {
            scheme: config.scheme().to_ascii_lowercase(),
            host,
            user: config.user.clone(),
            password: config.password.clone(),
            port: Some(config.port),
            options: config.options.clone(),
        })
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Whether the scheme asks for implicit TLS.
    pub fn implicit_tls(&self) -> bool {
        self.scheme == "smtps"
    }
}

impl fmt::Display for Dsn {
    /// Renders the DSN with the password masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme)?;
        if let Some(user) = &self.user {
            write!(f, "{user}")?;
            if self.password.is_some() {
                f.write_str(":****")?;
            }
            f.write_str("@")?;
        }
        write!(f, "{}", self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

// ── Transport seam ──────────────────────────────────────────────────

/// Sends one assembled message.
pub trait MailTransport: Send {
    fn send(&self, message: &Message) -> Result<(), BoxError>;
}

/// Builds transports from a DSN.
pub trait TransportFactory: Send {
    fn create(&self, dsn: &Dsn) -> Result<Box<dyn MailTransport>, BoxError>;
}

/// Whether a connector keeps its transport between sends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportPolicy {
    /// Build a new transport for every send.
    #[default]
    RebuildPerSend,
    /// Build once, keep until disconnect.
    Reuse,
}

impl MailTransport for SmtpTransport {
    fn send(&self, message: &Message) -> Result<(), BoxError> {
        Transport::send(self, message)?;
        Ok(())
    }
}

/// lettre-backed SMTP transport factory.
///
/// - `smtps` → implicit TLS
/// - `smtp` with `tls=true` option or port 587 → STARTTLS
/// - `smtp` → plain connection
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransportFactory;

impl TransportFactory for SmtpTransportFactory {
    fn create(&self, dsn: &Dsn) -> Result<Box<dyn MailTransport>, BoxError> {
        let starttls = dsn.option("tls").is_some_and(|v| v == "true" || v == "1")
            || dsn.port == Some(587);

        let mut builder = if dsn.implicit_tls() {
            SmtpTransport::relay(&dsn.host)?
        } else if dsn.scheme == "smtp" && starttls {
            SmtpTransport::starttls_relay(&dsn.host)?
        } else if dsn.scheme == "smtp" {
            SmtpTransport::builder_dangerous(dsn.host.as_str())
        } else {
            return Err(format!("unsupported mail scheme \"{}\"", dsn.scheme).into());
        };

        if let Some(port) = dsn.port {
            builder = builder.port(port);
        } else if !dsn.implicit_tls() && !starttls {
            builder = builder.port(DEFAULT_SMTP_PORT);
        }

        if let Some(user) = &dsn.user {
            let password = dsn
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            builder = builder.credentials(Credentials::new(user.clone(), password));
        }

        if let Some(domain) = dsn.option("local_domain") {
            builder = builder.hello_name(ClientId::Domain(domain.to_string()));
        }

        if let Some(raw) = dsn.option("timeout") {
            let secs: u64 = raw.parse().map_err(|e| format!("bad timeout option: {e}"))?;
            builder = builder.timeout(Some(Duration::from_secs(secs)));
        }

        tracing::debug!(dsn = %dsn, "Built SMTP transport");
        Ok(Box::new(builder.build()))
    }
}
