use core::fmt;

use crate::error::Error;
use crate::message_stack::MessageStack;

/// The result of one probe.
///
/// Probes never return `Err`: every failure, including a dead socket,
/// becomes a `Fail` carrying text an operator can act on.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T = ()> {
    Pass(T),
    Fail {
        details: String,
        /// The protocol messages exchanged before the failure, as JSON.
        message_stack: Option<String>,
    },
}

impl<T> Outcome<T> {
    pub fn fail(details: impl Into<String>) -> Self {
        Self::Fail {
            details: details.into(),
            message_stack: None,
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass(_))
    }

    /// Attach `stack` to a failure that does not carry one yet.
    pub fn with_message_stack(self, stack: &MessageStack) -> Self {
        match self {
            Self::Fail {
                details,
                message_stack: None,
            } => Self::Fail {
                details,
                message_stack: Some(stack.marshal()),
            },
            other => other,
        }
    }

    /// Turn an error met while probing `host`:`port` into a failure.
    pub fn from_error(err: &Error, host: &str, port: u16) -> Self {
        let details = match err {
            Error::ConnectionTimeout => format!("{}:{} connection timeout", host, port),
            Error::ConnectionRefused => format!("{}:{} connection refused", host, port),
            Error::AddressLookup(err) => format!("{}:{} address lookup failed: {}", host, port, err),
            other => other.to_string(),
        };
        Self::fail(details)
    }
}

impl<T> fmt::Display for Outcome<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass(_) => write!(f, "pass"),
            Self::Fail { details, .. } => write!(f, "{}", details),
        }
    }
}
