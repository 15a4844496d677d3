//! Error types for the connector framework.

/// Boxed low-level cause carried by wrapping errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Communication error: {0}")]
    Communication(#[from] CommunicationError),

    #[error("No connector named \"{0}\"")]
    UnknownAlias(String),

    #[error("Connector \"{0}\" cannot send messages")]
    NotMessaging(String),
}

/// Configuration-related errors.
///
/// Raised while a connector is being constructed, never from the query or
/// send path.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A named connector entry failed to build.
    #[error("Invalid configuration for connector \"{alias}\": {source}")]
    Connection {
        alias: String,
        #[source]
        source: Box<ConfigError>,
    },
}

impl ConfigError {
    pub(crate) fn for_connection(alias: &str, source: ConfigError) -> Self {
        Self::Connection {
            alias: alias.to_string(),
            source: Box::new(source),
        }
    }

    pub(crate) fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Errors raised by the connector lifecycle and query path.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The query belongs to another connector family. This is a caller bug.
    #[error("Connector \"{connector}\" expects a {expected} query, {given} given instead")]
    WrongQueryType {
        connector: String,
        expected: String,
        given: String,
    },

    /// The native primitive failed after all preconditions were satisfied.
    #[error("Query on connector \"{connector}\" failed: {source}")]
    QueryFailed {
        connector: String,
        #[source]
        source: BoxError,
    },

    /// Connecting failed. The connection stays unusable until reconfigured.
    #[error("Connector \"{connector}\" failed to connect: {reason}")]
    ConnectionFailed { connector: String, reason: String },
}

/// Errors raised while sending a communication message.
#[derive(Debug, thiserror::Error)]
pub enum CommunicationError {
    /// The connector cannot render this message family. This is a caller bug.
    #[error("Connector \"{connector}\" cannot send messages of type {message_type}")]
    UnsupportedMessageType {
        connector: String,
        message_type: String,
    },

    /// Transport-level failure (network, auth, protocol, message assembly).
    #[error("Message not sent via \"{connector}\": {reason}")]
    NotSent {
        connector: String,
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

impl CommunicationError {
    pub(crate) fn not_sent(connector: &str, reason: impl Into<String>) -> Self {
        Self::NotSent {
            connector: connector.to_string(),
            reason: reason.into(),
            source: None,
        }
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_query_type_message_names_both_families() {
        let err = ConnectorError::WrongQueryType {
            connector: "files".into(),
            expected: "file_search".into(),
            given: "mail".into(),
        };
        let text = err.to_string();
        assert!(text.contains("\"files\""));
        assert!(text.contains("file_search"));
        assert!(text.contains("mail"));
    }

    #[test]
    fn query_failed_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = ConnectorError::QueryFailed {
            connector: "files".into(),
            source: Box::new(io),
        };
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "gone");
    }

    #[test]
    fn connection_error_keeps_inner_variant() {
        let inner = ConfigError::MissingRequired {
            key: "host".into(),
            hint: "Set either `dsn` or `host`.".into(),
        };
        let err = ConfigError::for_connection("mailer", inner);
        assert!(err.to_string().contains("\"mailer\""));
        let source = std::error::Error::source(&err).unwrap();
        assert!(source.to_string().contains("host"));
    }

    #[test]
    fn config_error_converts_into_top_level() {
        let err: Error = ConfigError::invalid("from", "not an address").into();
        assert!(matches!(err, Error::Config(ConfigError::InvalidValue { .. })));
        assert!(err.to_string().contains("from"));
    }
}
