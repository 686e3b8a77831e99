#![allow(dead_code)]

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use echspec::internal::msgs::base::Payload;
use echspec::internal::msgs::codec::Codec;
use echspec::internal::msgs::enums::NamedGroup;
use echspec::internal::msgs::handshake::{
    HandshakeMessagePayload, HandshakePayload, HelloRetryExtension, HelloRetryRequest, SessionId,
};
use echspec::internal::msgs::message::OpaqueMessage;
use echspec::{
    ech_config, AlertDescription, CipherSuite, ContentType, EchConfigPayload, HandshakeType,
    ProtocolVersion, RunConfig,
};

pub fn init_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .try_init();
}

/// A compliant ECHConfigList: DHKEM(X25519, HKDF-SHA256) with
/// HKDF-SHA256/AES-128-GCM.
pub fn compliant_configs() -> Vec<EchConfigPayload> {
    let mut contents = vec![0x07]; // config_id
    contents.extend([0x00, 0x20]); // kem_id
    contents.extend([0x00, 0x20]);
    contents.extend([0x42; 32]);
    contents.extend([0x00, 0x04, 0x00, 0x01, 0x00, 0x01]);
    contents.push(0); // maximum_name_length
    let public_name = b"public.example";
    contents.push(public_name.len() as u8);
    contents.extend(public_name);
    contents.extend([0x00, 0x00]); // extensions

    let mut config = vec![0xfe, 0x0d];
    config.extend((contents.len() as u16).to_be_bytes());
    config.extend(contents);

    let mut list = (config.len() as u16)
        .to_be_bytes()
        .to_vec();
    list.extend(config);
    ech_config::parse(&list).unwrap()
}

pub fn run_config(port: u16, sections: &[&str]) -> RunConfig {
    let mut config = RunConfig::new("127.0.0.1", port);
    config.sections = Some(
        sections
            .iter()
            .map(|s| s.to_string())
            .collect(),
    );
    config.connect_timeout = Duration::from_secs(2);
    config.read_timeout = Duration::from_secs(2);
    config
}

/// One TLS record sent by the client.
pub struct Record {
    pub typ: u8,
    pub body: Vec<u8>,
}

pub fn read_record(sock: &mut TcpStream) -> io::Result<Record> {
    let mut header = [0u8; 5];
    sock.read_exact(&mut header)?;
    let len = usize::from(u16::from_be_bytes([header[3], header[4]]));
    let mut body = vec![0u8; len];
    sock.read_exact(&mut body)?;
    Ok(Record {
        typ: header[0],
        body,
    })
}

fn record(typ: ContentType, payload: Vec<u8>) -> Vec<u8> {
    OpaqueMessage {
        typ,
        version: ProtocolVersion::TLSv1_2,
        payload: Payload::new(payload),
    }
    .encode()
}

pub fn send_alert(sock: &mut TcpStream, desc: AlertDescription) -> io::Result<()> {
    let mut payload = vec![0x02];
    desc.encode(&mut payload);
    sock.write_all(&record(ContentType::Alert, payload))
}

pub fn send_hello_retry_request(sock: &mut TcpStream, group: NamedGroup) -> io::Result<()> {
    let hrr = HandshakeMessagePayload {
        typ: HandshakeType::HelloRetryRequest,
        payload: HandshakePayload::HelloRetryRequest(HelloRetryRequest {
            legacy_version: ProtocolVersion::TLSv1_2,
            session_id: SessionId::empty(),
            cipher_suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
            extensions: vec![
                HelloRetryExtension::SupportedVersions(ProtocolVersion::TLSv1_3),
                HelloRetryExtension::KeyShare(group),
            ],
        }),
    };
    sock.write_all(&record(ContentType::Handshake, hrr.get_encoding()))?;
    // middlebox compatibility
    sock.write_all(&[0x14, 0x03, 0x03, 0x00, 0x01, 0x01])
}

/// Serve `connections` connections on a local port, one at a time,
/// handing each to `handler`.
pub fn serve<F>(connections: usize, handler: F) -> (u16, JoinHandle<()>)
where
    F: Fn(&mut TcpStream) -> io::Result<()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        for stream in listener.incoming().take(connections) {
            let mut sock = stream.unwrap();
            if let Err(err) = handler(&mut sock) {
                println!("mock server: {}", err);
            }
        }
    });
    (port, server)
}

/// A port nothing listens on.
pub fn closed_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}
