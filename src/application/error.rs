//! Error taxonomy surfaced by broker operations.

use std::fmt;

/// Error returned by resource creation and scope resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// No resource factory is registered under the requested name.
    NotConfigured {
        /// The unknown factory name.
        factory: String,
    },
    /// A selector names an unknown implementation, or a required setting is
    /// missing or malformed for the selected implementation.
    Configuration {
        /// Human-readable description of the problem.
        message: String,
    },
    /// A requested scope type has no corresponding instance along the
    /// requesting broker's path to the root.
    ScopeResolution {
        /// Name of the scope type that could not be resolved.
        scope: String,
    },
}

impl BrokerError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        BrokerError::Configuration {
            message: message.into(),
        }
    }
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::NotConfigured { factory } => {
                write!(f, "no resource factory registered under '{}'", factory)
            }
            BrokerError::Configuration { message } => {
                write!(f, "configuration error: {}", message)
            }
            BrokerError::ScopeResolution { scope } => {
                write!(f, "no scope of type '{}' on the path to the root", scope)
            }
        }
    }
}

impl std::error::Error for BrokerError {}
