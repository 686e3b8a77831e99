use std::error::Error as StdError;
use std::{fmt, io};

use crate::enums::{AlertDescription, CipherSuite, ContentType};
use crate::msgs::enums::NamedGroup;

/// echspec reports failures while driving a probe using this type.
///
/// These never cross a probe boundary: each probe turns them into
/// an [`Outcome::Fail`](crate::Outcome::Fail).
#[non_exhaustive]
#[derive(Debug, PartialEq, Clone)]
pub enum Error {
    /// We received a TLS message that isn't valid right now.
    /// `expect_types` lists the message types we can expect right now.
    /// `got_type` is the type we found.
    InappropriateMessage {
        /// Which types we expected
        expect_types: Vec<ContentType>,
        /// What type we received
        got_type: ContentType,
    },

    /// The peer sent us a TLS message with invalid contents.
    InvalidMessage(InvalidMessage),

    /// The server did something before the probed situation was set up,
    /// so the targeted requirement could not be exercised.
    BeforeTargetSituation(String),

    /// The connection attempt, or a read, timed out.
    ConnectionTimeout,

    /// The target refused the TCP connection.
    ConnectionRefused,

    /// The target's hostname did not resolve to any address.
    AddressLookup(String),

    /// The peer closed the connection without sending anything further.
    ConnectionClosed,

    /// Any other socket failure.
    Io(String),

    /// We couldn't decrypt a protected record.
    DecryptError,

    /// The HPKE layer failed to set up a context or seal.
    Hpke(String),

    /// The ECHConfig offers no KEM/KDF/AEAD combination we can use.
    NoSupportedHpkeSuite,

    /// The server selected a TLS 1.3 cipher suite we cannot decrypt with.
    UnsupportedCipherSuite(CipherSuite),

    /// The server selected, or asked for, a key exchange group we did not offer.
    UnsupportedGroup(NamedGroup),

    /// The peer sent an oversized record/fragment.
    PeerSentOversizedRecord,

    /// We failed to acquire random bytes from the system.
    FailedToGetRandomBytes,

    /// A catch-all error for unlikely errors.
    General(String),
}

/// A corrupt TLS message payload that resulted in an error.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InvalidMessage {
    /// An advertised message was larger then expected.
    HandshakePayloadTooLarge,
    /// The peer sent us a syntactically incorrect ChangeCipherSpec payload.
    InvalidCcs,
    /// An unknown content type was encountered during message decoding.
    InvalidContentType,
    /// A peer's server name could not be decoded
    InvalidServerName,
    /// A TLS message payload was larger then allowed by the specification.
    MessageTooLarge,
    /// Message is shorter than the expected length
    MessageTooShort,
    /// Missing data for the named handshake payload value
    MissingData(&'static str),
    /// Trailing data found for the named handshake payload value
    TrailingData(&'static str),
    /// An unknown TLS protocol was encountered during message decoding.
    UnknownProtocolVersion,
    /// A peer sent a non-null compression method.
    UnsupportedCompression,
}

impl From<InvalidMessage> for Error {
    #[inline]
    fn from(e: InvalidMessage) -> Self {
        Self::InvalidMessage(e)
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Self::ConnectionTimeout,
            io::ErrorKind::ConnectionRefused => Self::ConnectionRefused,
            io::ErrorKind::UnexpectedEof => Self::ConnectionClosed,
            _ => Self::Io(e.to_string()),
        }
    }
}

fn join<T: fmt::Debug>(items: &[T]) -> String {
    items
        .iter()
        .map(|x| format!("{:?}", x))
        .collect::<Vec<String>>()
        .join(" or ")
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InappropriateMessage {
                ref expect_types,
                ref got_type,
            } => write!(
                f,
                "received unexpected message: got {:?} when expecting {}",
                got_type,
                join::<ContentType>(expect_types)
            ),
            Self::InvalidMessage(ref typ) => {
                write!(f, "received corrupt message of type {:?}", typ)
            }
            Self::BeforeTargetSituation(ref why) => write!(f, "{}", why),
            Self::ConnectionTimeout => write!(f, "connection timeout"),
            Self::ConnectionRefused => write!(f, "connection refused"),
            Self::AddressLookup(ref err) => write!(f, "address lookup failed: {}", err),
            Self::ConnectionClosed => write!(f, "connection closed by peer"),
            Self::Io(ref err) => write!(f, "socket error: {}", err),
            Self::DecryptError => write!(f, "cannot decrypt peer's message"),
            Self::Hpke(ref err) => write!(f, "HPKE failure: {}", err),
            Self::NoSupportedHpkeSuite => {
                write!(f, "ECHConfig has no supported HPKE cipher suite")
            }
            Self::UnsupportedCipherSuite(ref suite) => {
                write!(f, "server selected unsupported cipher suite {:?}", suite)
            }
            Self::UnsupportedGroup(ref group) => {
                write!(f, "server selected unsupported group {:?}", group)
            }
            Self::PeerSentOversizedRecord => write!(f, "peer sent excess record size"),
            Self::FailedToGetRandomBytes => write!(f, "failed to get random bytes"),
            Self::General(ref err) => write!(f, "unexpected error: {}", err),
        }
    }
}

impl StdError for Error {}

/// Reasons the run cannot obtain a usable ECHConfig.
///
/// Unlike [`Error`], these abort the whole run before any case executes.
#[non_exhaustive]
#[derive(Debug, PartialEq, Clone)]
pub enum ConfigError {
    /// The ECHConfigList (from PEM or DNS) could not be decoded.
    Parse,
    /// The ECHConfigs PEM file could not be read.
    File(String),
    /// The HTTPS record lookup failed.
    Dns(String),
    /// The HTTPS record exists but has no `ech` SvcParam.
    NoEchSvcParam,
    /// No published config carries the mandatory HPKE cipher suite.
    NoCompliantConfig,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse => write!(f, "failed to parse ECHConfigs"),
            Self::File(err) => write!(f, "failed to read ECHConfigs: {}", err),
            Self::Dns(err) => write!(f, "{}", err),
            Self::NoEchSvcParam => write!(f, "HTTPS resource record does NOT have ech SvcParams"),
            Self::NoCompliantConfig => write!(
                f,
                "EchConfigs does NOT include HPKE cipher suite: KEM: DHKEM(X25519, HKDF-SHA256), \
                 KDF: HKDF-SHA256 and AEAD: AES-128-GCM."
            ),
        }
    }
}

impl StdError for ConfigError {}

/// Convenience for probes that expected a specific alert.
pub(crate) fn missing_alert(expected: AlertDescription) -> String {
    format!(
        "did not send expected alert: {}",
        expected.registry_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_map_to_connection_failures() {
        let timeout = io::Error::new(io::ErrorKind::TimedOut, "t");
        assert_eq!(Error::from(timeout), Error::ConnectionTimeout);
        let would_block = io::Error::new(io::ErrorKind::WouldBlock, "w");
        assert_eq!(Error::from(would_block), Error::ConnectionTimeout);
        let refused = io::Error::new(io::ErrorKind::ConnectionRefused, "r");
        assert_eq!(Error::from(refused), Error::ConnectionRefused);
    }

    #[test]
    fn smoke() {
        let all = vec![
            Error::InappropriateMessage {
                expect_types: vec![ContentType::Alert],
                got_type: ContentType::Handshake,
            },
            Error::InvalidMessage(InvalidMessage::InvalidCcs),
            Error::BeforeTargetSituation("not received ServerHello".to_string()),
            Error::ConnectionTimeout,
            Error::ConnectionRefused,
            Error::AddressLookup("no such host".to_string()),
            Error::ConnectionClosed,
            Error::Io("broken pipe".to_string()),
            Error::DecryptError,
            Error::Hpke("bad key".to_string()),
            Error::NoSupportedHpkeSuite,
            Error::UnsupportedCipherSuite(CipherSuite::TLS13_AES_128_CCM_SHA256),
            Error::UnsupportedGroup(NamedGroup::X448),
            Error::PeerSentOversizedRecord,
            Error::FailedToGetRandomBytes,
            Error::General("undocumented error".to_string()),
        ];

        for err in all {
            println!("{:?}:", err);
            println!("  fmt '{}'", err);
        }
    }

    #[test]
    fn situation_not_reached_displays_its_reason() {
        let err = Error::BeforeTargetSituation("not received ServerHello".to_string());
        assert_eq!(err.to_string(), "not received ServerHello");
    }

    #[test]
    fn missing_alert_text() {
        assert_eq!(
            missing_alert(AlertDescription::DecryptError),
            "did not send expected alert: decrypt_error"
        );
    }
}
