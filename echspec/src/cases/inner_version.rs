use super::{expect_alert, with_socket, Case, Section, Target};
use crate::client::ech;
use crate::client::hs::client_hello;
use crate::crypto::kx::ALL_KX_GROUPS;
use crate::enums::{AlertDescription, ProtocolVersion};
use crate::msgs::ech::EchConfigPayload;
use crate::msgs::handshake::ClientExtension;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "7.1-11",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-22#section-7.1-11",
    cases: &[Case {
        description: "MUST abort with an \"illegal_parameter\" alert, if ClientHelloInner offers \
                      TLS 1.2 or below.",
        probe: inner_offers_tls12,
    }],
};

/// ClientHelloInner offers only TLS 1.2; ClientHelloOuter still offers 1.3.
fn inner_offers_tls12(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        let (mut inner, key_shares) = client_hello(&target.hostname, ALL_KX_GROUPS)?;
        inner
            .extensions
            .insert(ClientExtension::SupportedVersions(vec![ProtocolVersion::TLSv1_2]));

        let (offer, _) = ech::offer(&inner, config)?;
        stack.client_hello_inner(&offer.inner);
        hs.send_client_hello(&offer.outer, key_shares, stack)?;
        expect_alert(hs, stack, AlertDescription::IllegalParameter)
    })
}
