use super::{with_socket, Case, Section, Target};
use crate::client::ech;
use crate::client::hs::client_hello;
use crate::crypto::kx::ALL_KX_GROUPS;
use crate::msgs::ech::EchConfigPayload;
use crate::msgs::handshake::ServerExtension;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "7.1-14.2.1",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-22#section-7.1-14.2.1",
    cases: &[Case {
        description: "MUST include the \"encrypted_client_hello\" extension in its \
                      EncryptedExtensions with the \"retry_configs\" field set to one or more \
                      ECHConfig.",
        probe: grease_gets_retry_configs,
    }],
};

/// Offer GREASE ECH, which no config decrypts, and look for
/// `retry_configs` in EncryptedExtensions.
fn grease_gets_retry_configs(target: &Target, _: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        let (hello, key_shares) = client_hello(&target.hostname, ALL_KX_GROUPS)?;
        let outer = ech::offer_grease(&hello)?;
        hs.send_client_hello(&outer, key_shares, stack)?;

        let sh = hs.expect_server_hello(stack)?;
        hs.start_handshake_encryption(&sh)?;
        let exts = hs.expect_encrypted_extensions(stack)?;

        let ech = exts.iter().find_map(|ext| match ext {
            ServerExtension::EncryptedClientHello(ech) => Some(ech),
            _ => None,
        });
        Ok(match ech {
            None => Outcome::fail("did not send expected extension: encrypted_client_hello"),
            Some(ech) if ech.retry_configs.is_empty() => {
                Outcome::fail("ECHConfigs did not have \"retry_configs\"")
            }
            Some(_) => Outcome::Pass(()),
        })
    })
}
