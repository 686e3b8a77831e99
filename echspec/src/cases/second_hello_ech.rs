use super::{expect_alert, provoke_hello_retry, with_socket, Case, Section, Target};
use crate::client::hs::retry_extensions;
use crate::enums::AlertDescription;
use crate::msgs::ech::EchConfigPayload;
use crate::msgs::enums::ExtensionType;
use crate::msgs::handshake::ClientHelloPayload;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "7.1.1-2",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-17#section-7.1.1-2",
    cases: &[
        Case {
            description: "MUST abort with a \"missing_extension\" alert, if 2nd ClientHelloOuter \
                          does not contains the \"encrypted_client_hello\" extension",
            probe: ech_missing,
        },
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if 2nd ClientHelloOuter \
                          \"encrypted_client_hello\" enc is empty",
            probe: ech_unchanged,
        },
    ],
};

/// Answer HelloRetryRequest with the first ClientHelloOuter, minus its
/// ECH extension.
fn ech_missing(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        let (offer, _, hrr) = provoke_hello_retry(hs, stack, target, config)?;

        let (mut extensions, key_share) = retry_extensions(&offer.outer.extensions, &hrr)?;
        extensions.remove(ExtensionType::EncryptedClientHello);
        let second = ClientHelloPayload {
            extensions,
            ..offer.outer
        };
        hs.send_client_hello(&second, key_share.into_iter().collect(), stack)?;
        expect_alert(hs, stack, AlertDescription::MissingExtension)
    })
}

/// Answer HelloRetryRequest with the first ClientHelloOuter's ECH
/// extension resent as is, non-empty `enc` included.
fn ech_unchanged(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        let (offer, _, hrr) = provoke_hello_retry(hs, stack, target, config)?;

        let (extensions, key_share) = retry_extensions(&offer.outer.extensions, &hrr)?;
        let second = ClientHelloPayload {
            extensions,
            ..offer.outer
        };
        hs.send_client_hello(&second, key_share.into_iter().collect(), stack)?;
        expect_alert(hs, stack, AlertDescription::IllegalParameter)
    })
}
