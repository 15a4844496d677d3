//! Connector lifecycle contract.
//!
//! A concrete connector implements [`ConnectorBackend`] (the `perform_*`
//! hooks). [`Connection`] wraps it and owns the lifecycle: lazy connect,
//! idempotent connect/disconnect, the query family gate and the optional
//! transaction boundary. [`DataConnector`] is the object-safe face used by
//! callers that hold heterogeneous connectors.

pub mod query;

use crate::communication::{CommunicationMessage, Receipt};
use crate::error::{CommunicationError, ConnectorError};

pub use query::{FileSearchQuery, MailQuery, Query, QueryFamily, QueryKind, QueryResult};

/// Backend-specific half of a connector.
pub trait ConnectorBackend: Send {
    /// Query family this backend accepts.
    type Query: QueryFamily;
    /// Typed result of a successful query.
    type Output: Into<QueryResult>;

    /// Establish backend state. Only called while disconnected.
    fn perform_connect(&mut self, alias: &str) -> Result<(), ConnectorError>;

    /// Run a query. Only called while connected.
    fn perform_query(
        &mut self,
        alias: &str,
        query: &Self::Query,
    ) -> Result<Self::Output, ConnectorError>;

    /// Release backend state. Only called while connected.
    fn perform_disconnect(&mut self) -> Result<(), ConnectorError>;

    fn supports_transactions(&self) -> bool {
        false
    }

    fn perform_transaction_begin(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn perform_transaction_commit(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }

    fn perform_transaction_rollback(&mut self) -> Result<(), ConnectorError> {
        Ok(())
    }
}

/// Backends that can also deliver communication messages.
pub trait CommunicationBackend: ConnectorBackend {
    /// Whether this backend knows how to render the message family.
    fn supports(&self, message: &CommunicationMessage) -> bool;

    /// Render and send. Only called while connected and for supported messages.
    fn communicate(
        &mut self,
        alias: &str,
        message: &CommunicationMessage,
    ) -> Result<(), CommunicationError>;
}

/// Object-safe connector interface.
pub trait DataConnector: Send {
    fn alias(&self) -> &str;

    fn query_kind(&self) -> QueryKind;

    fn is_connected(&self) -> bool;

    /// Connect if not connected yet. Calling it again is a no-op.
    fn connect(&mut self) -> Result<(), ConnectorError>;

    /// Run a query, connecting lazily. Foreign query families are rejected
    /// before any backend interaction.
    fn query(&mut self, query: &Query) -> Result<QueryResult, ConnectorError>;

    /// Disconnect. Safe to call repeatedly or before `connect`.
    fn disconnect(&mut self) -> Result<(), ConnectorError>;

    fn supports_transactions(&self) -> bool;

    fn transaction_begin(&mut self) -> Result<(), ConnectorError>;

    fn transaction_commit(&mut self) -> Result<(), ConnectorError>;

    fn transaction_rollback(&mut self) -> Result<(), ConnectorError>;
}

/// Connectors that send communication messages.
pub trait CommunicationConnection {
    /// Send a message and return proof of delivery.
    fn communicate(&mut self, message: &CommunicationMessage) -> Result<Receipt, CommunicationError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    Disconnected,
    Connected,
    InTransaction,
    /// Connect failed; the instance stays unusable until reconfigured.
    Failed(String),
}

/// Lifecycle wrapper around a backend.
#[derive(Debug)]
pub struct Connection<B> {
    alias: String,
    backend: B,
    state: ConnectionState,
}

impl<B: ConnectorBackend> Connection<B> {
    pub fn new(alias: impl Into<String>, backend: B) -> Self {
        Self {
            alias: alias.into(),
            backend,
            state: ConnectionState::Disconnected,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Replace the backend, clearing a failed state. A live connection is
    /// disconnected first.
    pub fn reconfigure(&mut self, backend: B) -> Result<(), ConnectorError> {
        self.disconnect_backend()?;
        self.backend = backend;
        self.state = ConnectionState::Disconnected;
        tracing::debug!(connector = %self.alias, "Connector reconfigured");
        Ok(())
    }

    /// Run a query of this backend's own family.
    pub fn query_typed(&mut self, query: &B::Query) -> Result<B::Output, ConnectorError> {
        self.ensure_connected()?;
        self.backend.perform_query(&self.alias, query)
    }

    fn ensure_connected(&mut self) -> Result<(), ConnectorError> {
        match self.state.clone() {
            ConnectionState::Connected | ConnectionState::InTransaction => Ok(()),
            ConnectionState::Failed(reason) => Err(ConnectorError::ConnectionFailed {
                connector: self.alias.clone(),
                reason,
            }),
            ConnectionState::Disconnected => match self.backend.perform_connect(&self.alias) {
                Ok(()) => {
                    self.state = ConnectionState::Connected;
                    tracing::debug!(connector = %self.alias, "Connector connected");
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!(connector = %self.alias, error = %e, "Connector failed to connect");
                    self.state = ConnectionState::Failed(e.to_string());
                    Err(e)
                }
            },
        }
    }

    fn disconnect_backend(&mut self) -> Result<(), ConnectorError> {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Failed(_) => Ok(()),
            ConnectionState::InTransaction => {
                self.backend.perform_transaction_rollback()?;
                self.state = ConnectionState::Connected;
                self.disconnect_backend()
            }
            ConnectionState::Connected => {
                let result = self.backend.perform_disconnect();
                self.state = ConnectionState::Disconnected;
                tracing::debug!(connector = %self.alias, "Connector disconnected");
                result
            }
        }
    }
}

impl<B: ConnectorBackend> DataConnector for Connection<B> {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn query_kind(&self) -> QueryKind {
        <B::Query as QueryFamily>::KIND
    }

    fn is_connected(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::InTransaction
        )
    }

    fn connect(&mut self) -> Result<(), ConnectorError> {
        self.ensure_connected()
    }

    fn query(&mut self, query: &Query) -> Result<QueryResult, ConnectorError> {
        let Some(typed) = B::Query::from_query(query) else {
            return Err(ConnectorError::WrongQueryType {
                connector: self.alias.clone(),
                expected: self.query_kind().to_string(),
                given: query.kind().to_string(),
            });
        };
        self.query_typed(typed).map(Into::into)
    }

    fn disconnect(&mut self) -> Result<(), ConnectorError> {
        self.disconnect_backend()
    }

    fn supports_transactions(&self) -> bool {
        self.backend.supports_transactions()
    }

    fn transaction_begin(&mut self) -> Result<(), ConnectorError> {
        if !self.backend.supports_transactions() {
            return Ok(());
        }
        self.ensure_connected()?;
        if self.state == ConnectionState::InTransaction {
            return Ok(());
        }
        self.backend.perform_transaction_begin()?;
        self.state = ConnectionState::InTransaction;
        Ok(())
    }

    fn transaction_commit(&mut self) -> Result<(), ConnectorError> {
        if self.state != ConnectionState::InTransaction {
            return Ok(());
        }
        self.backend.perform_transaction_commit()?;
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn transaction_rollback(&mut self) -> Result<(), ConnectorError> {
        if self.state != ConnectionState::InTransaction {
            return Ok(());
        }
        self.backend.perform_transaction_rollback()?;
        self.state = ConnectionState::Connected;
        Ok(())
    }
}

impl<B: CommunicationBackend> CommunicationConnection for Connection<B> {
    fn communicate(&mut self, message: &CommunicationMessage) -> Result<Receipt, CommunicationError> {
        if !self.backend.supports(message) {
            return Err(CommunicationError::UnsupportedMessageType {
                connector: self.alias.clone(),
                message_type: message.type_name().to_string(),
            });
        }
        self.ensure_connected()?;
        self.backend.communicate(&self.alias, message)?;
        Ok(Receipt::new(message.clone(), &self.alias))
    }
}
