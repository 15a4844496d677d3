//! Registry of configured connectors, keyed by alias.

use std::collections::BTreeMap;

use crate::communication::{CommunicationMessage, Receipt};
use crate::config::{ConnectionsFile, ConnectorConfig};
use crate::connector::{
    CommunicationConnection, Connection, DataConnector, Query, QueryResult,
};
use crate::connectors::{FileFinderConnector, SmtpConnector};
use crate::error::{ConfigError, ConnectorError, Error, Result};

/// A connector that may also send messages.
pub trait RegisteredConnector: DataConnector {
    /// Messaging face of the connector, if it has one.
    fn messaging(&mut self) -> Option<&mut dyn CommunicationConnection>;
}

impl RegisteredConnector for Connection<FileFinderConnector> {
    fn messaging(&mut self) -> Option<&mut dyn CommunicationConnection> {
        None
    }
}

impl RegisteredConnector for Connection<SmtpConnector> {
    fn messaging(&mut self) -> Option<&mut dyn CommunicationConnection> {
        Some(self)
    }
}

/// Named collection of connectors.
#[derive(Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, Box<dyn RegisteredConnector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every connector described by a connections file. Construction
    /// errors name the offending alias.
    pub fn from_config(file: &ConnectionsFile) -> std::result::Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (alias, config) in &file.connections {
            let connector: Box<dyn RegisteredConnector> = match config {
                ConnectorConfig::FileFinder(config) => Box::new(Connection::new(
                    alias.clone(),
                    FileFinderConnector::new(config.clone()),
                )),
                ConnectorConfig::Smtp(config) => {
                    let backend = SmtpConnector::new(config.clone())
                        .map_err(|e| ConfigError::for_connection(alias, e))?;
                    Box::new(Connection::new(alias.clone(), backend))
                }
            };
            registry.register(connector);
        }
        tracing::debug!(count = registry.count(), "Connector registry built");
        Ok(registry)
    }

    /// Register a connector under its alias, replacing any previous one.
    pub fn register(&mut self, connector: Box<dyn RegisteredConnector>) {
        let alias = connector.alias().to_string();
        if self.connectors.insert(alias.clone(), connector).is_some() {
            tracing::warn!(connector = %alias, "Replaced existing connector");
        }
    }

    pub fn unregister(&mut self, alias: &str) -> Option<Box<dyn RegisteredConnector>> {
        self.connectors.remove(alias)
    }

    pub fn get_mut(&mut self, alias: &str) -> Option<&mut (dyn RegisteredConnector + 'static)> {
        self.connectors.get_mut(alias).map(|c| &mut **c)
    }

    pub fn has(&self, alias: &str) -> bool {
        self.connectors.contains_key(alias)
    }

    /// Aliases in sorted order.
    pub fn list(&self) -> Vec<String> {
        self.connectors.keys().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.connectors.len()
    }

    /// Run a query on the named connector.
    pub fn query(&mut self, alias: &str, query: &Query) -> Result<QueryResult> {
        let connector = self
            .get_mut(alias)
            .ok_or_else(|| Error::UnknownAlias(alias.to_string()))?;
        Ok(connector.query(query)?)
    }

    /// Send a message through the named connector.
    pub fn communicate(&mut self, alias: &str, message: &CommunicationMessage) -> Result<Receipt> {
        let connector = self
            .get_mut(alias)
            .ok_or_else(|| Error::UnknownAlias(alias.to_string()))?;
        let messaging = connector
            .messaging()
            .ok_or_else(|| Error::NotMessaging(alias.to_string()))?;
        Ok(messaging.communicate(message)?)
    }

    /// Disconnect every connector. All connectors are visited; the first
    /// failure is returned.
    pub fn disconnect_all(&mut self) -> std::result::Result<(), ConnectorError> {
        let mut first_error = None;
        for connector in self.connectors.values_mut() {
            if let Err(e) = connector.disconnect() {
                tracing::warn!(connector = %connector.alias(), error = %e, "Disconnect failed");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
