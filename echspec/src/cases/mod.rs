//! Probes, one per MUST-statement, grouped by the draft section that
//! makes it.
//!
//! Every probe opens its own TCP connection, drives it until the server
//! has answered the situation under test, and reports an [`Outcome`].
//! Nothing is shared between probes.

use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use log::{debug, trace};

use crate::client::ech::{self, EchEncoding, EchOffer, EchState};
use crate::client::hs::{client_hello, Handshake};
use crate::crypto::kx::ALL_KX_GROUPS;
use crate::enums::AlertDescription;
use crate::error::{missing_alert, Error};
use crate::message_stack::MessageStack;
use crate::msgs::ech::EchConfigPayload;
use crate::msgs::handshake::HelloRetryRequest;
use crate::outcome::Outcome;

pub mod compliance;
mod ech_type;
mod inner_version;
mod outer_extensions;
mod padding;
mod retry_configs;
mod second_hello_decrypt;
mod second_hello_ech;

/// Where probes connect to.
#[derive(Clone, Debug)]
pub struct Target {
    pub hostname: String,
    pub port: u16,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

/// A probe checks one requirement against `Target`, using the config
/// the run selected.
pub type Probe = fn(&Target, &EchConfigPayload) -> Outcome;

/// One MUST-statement and the probe that checks it.
pub struct Case {
    pub description: &'static str,
    pub probe: Probe,
}

/// The cases of one draft section.
pub struct Section {
    /// The section anchor, e.g. `7.1.1-2`.
    pub label: &'static str,
    pub url: &'static str,
    pub cases: &'static [Case],
}

static SECTIONS: &[Section] = &[
    padding::SECTION,
    outer_extensions::SECTION,
    ech_type::SECTION,
    inner_version::SECTION,
    retry_configs::SECTION,
    second_hello_ech::SECTION,
    second_hello_decrypt::SECTION,
];

/// Every section with probes, in the order they run.
///
/// Section 9 is not listed: it is checked while choosing the config,
/// see [`compliance`].
pub fn all() -> &'static [Section] {
    SECTIONS
}

/// Run `probe` over a fresh connection to `target`.
///
/// Errors raised by `probe` become failures; the connection is closed
/// whichever way `probe` returns.
fn with_socket<F>(target: &Target, probe: F) -> Outcome
where
    F: FnOnce(&mut Handshake<TcpStream>, &mut MessageStack) -> Result<Outcome, Error>,
{
    let mut stack = MessageStack::new();
    let result = connect(target).and_then(|sock| {
        let mut hs = Handshake::new(sock);
        probe(&mut hs, &mut stack)
    });

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            debug!("Probe against {}:{} stopped: {}", target.hostname, target.port, err);
            Outcome::from_error(&err, &target.hostname, target.port)
        }
    };

    match stack.is_empty() {
        true => outcome,
        false => outcome.with_message_stack(&stack),
    }
}

fn connect(target: &Target) -> Result<TcpStream, Error> {
    let addrs = (target.hostname.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|err| Error::AddressLookup(err.to_string()))?;

    let mut last_err = Error::ConnectionRefused;
    for addr in addrs {
        trace!("Connecting to {}", addr);
        match TcpStream::connect_timeout(&addr, target.connect_timeout) {
            Ok(sock) => {
                sock.set_read_timeout(Some(target.read_timeout))?;
                sock.set_write_timeout(Some(target.read_timeout))?;
                sock.set_nodelay(true)?;
                return Ok(sock);
            }
            Err(err) => last_err = err.into(),
        }
    }
    Err(last_err)
}

/// Read the server's next message, passing only if it is the alert
/// `expected`.
///
/// A server that hangs up silently did not send the alert either.
fn expect_alert<T: Read + Write>(
    hs: &mut Handshake<T>,
    stack: &mut MessageStack,
    expected: AlertDescription,
) -> Result<Outcome, Error> {
    match hs.receive(stack) {
        Ok(msg) if msg.alert_description() == Some(expected) => Ok(Outcome::Pass(())),
        Ok(_) | Err(Error::ConnectionClosed) => Ok(Outcome::fail(missing_alert(expected))),
        Err(err) => Err(err),
    }
}

/// Send an ECH offer for `target` under `config`, laid out per `encoding`.
fn send_offer<T: Read + Write>(
    hs: &mut Handshake<T>,
    stack: &mut MessageStack,
    target: &Target,
    config: &EchConfigPayload,
    encoding: EchEncoding,
) -> Result<(), Error> {
    let (inner, key_shares) = client_hello(&target.hostname, ALL_KX_GROUPS)?;
    let (offer, _) = ech::offer_degraded(&inner, config, encoding)?;
    stack.client_hello_inner(&offer.inner);
    hs.send_client_hello(&offer.outer, key_shares, stack)
}

/// Send a conformant ECH offer without key shares, so the server has to
/// answer with HelloRetryRequest.
fn provoke_hello_retry<T: Read + Write>(
    hs: &mut Handshake<T>,
    stack: &mut MessageStack,
    target: &Target,
    config: &EchConfigPayload,
) -> Result<(EchOffer, EchState, HelloRetryRequest), Error> {
    let (inner, key_shares) = client_hello(&target.hostname, &[])?;
    let (offer, state) = ech::offer(&inner, config)?;
    stack.client_hello_inner(&offer.inner);
    hs.send_client_hello(&offer.outer, key_shares, stack)?;

    let hrr = hs.expect_hello_retry_request(stack)?;
    Ok((offer, state, hrr))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::net::TcpListener;

    use super::*;

    fn target(port: u16) -> Target {
        Target {
            hostname: "127.0.0.1".into(),
            port,
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn sections_are_unique_and_ordered() {
        let labels = all()
            .iter()
            .map(|s| s.label)
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            vec!["5.1-9", "5.1-10", "7-5", "7.1-11", "7.1-14.2.1", "7.1.1-2", "7.1.1-5"]
        );
        assert_eq!(labels.iter().collect::<HashSet<_>>().len(), labels.len());

        for section in all() {
            assert!(!section.cases.is_empty());
            assert!(section
                .url
                .starts_with("https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-"));
            assert!(section.url.ends_with(section.label));
        }
    }

    #[test]
    fn refused_connection_names_the_target() {
        // bind then drop, so nothing listens on the port
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let t = target(port);
        let outcome = with_socket(&t, |_, _| Ok(Outcome::Pass(())));
        assert_eq!(
            outcome,
            Outcome::fail(format!("127.0.0.1:{} connection refused", port))
        );
    }

    #[test]
    fn unresolvable_host_names_the_target() {
        let t = Target {
            hostname: "no-such-host.invalid".into(),
            ..target(443)
        };
        let outcome = with_socket(&t, |_, _| Ok(Outcome::Pass(())));
        assert!(outcome
            .to_string()
            .starts_with("no-such-host.invalid:443 address lookup failed: "));
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let t = target(listener.local_addr().unwrap().port());
        let outcome = with_socket(&t, |hs, stack| {
            expect_alert(hs, stack, AlertDescription::IllegalParameter)
        });
        assert_eq!(
            outcome.to_string(),
            format!("127.0.0.1:{} connection timeout", t.port)
        );
        drop(listener);
    }
}
