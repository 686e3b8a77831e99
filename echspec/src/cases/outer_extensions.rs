use super::{expect_alert, send_offer, with_socket, Case, Section, Target};
use crate::client::ech::{EchEncoding, OuterExtensionsFault};
use crate::enums::AlertDescription;
use crate::msgs::ech::EchConfigPayload;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "5.1-10",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-17#section-5.1-10",
    cases: &[
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if any referenced \
                          extension is missing in ClientHelloOuter.",
            probe: missing_referenced,
        },
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if any extension is \
                          referenced in OuterExtensions more than once.",
            probe: duplicate_reference,
        },
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if \
                          \"encrypted_client_hello\" is referenced in OuterExtensions.",
            probe: ech_referenced,
        },
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if the extensions in \
                          ClientHelloOuter corresponding to those in OuterExtensions do not occur \
                          in the same order.",
            probe: out_of_order,
        },
    ],
};

fn probe(target: &Target, config: &EchConfigPayload, fault: OuterExtensionsFault) -> Outcome {
    with_socket(target, |hs, stack| {
        send_offer(
            hs,
            stack,
            target,
            config,
            EchEncoding::OuterExtensions(fault),
        )?;
        expect_alert(hs, stack, AlertDescription::IllegalParameter)
    })
}

fn missing_referenced(target: &Target, config: &EchConfigPayload) -> Outcome {
    probe(target, config, OuterExtensionsFault::MissingReferenced)
}

fn duplicate_reference(target: &Target, config: &EchConfigPayload) -> Outcome {
    probe(target, config, OuterExtensionsFault::DuplicateReference)
}

fn ech_referenced(target: &Target, config: &EchConfigPayload) -> Outcome {
    probe(target, config, OuterExtensionsFault::EchReferenced)
}

fn out_of_order(target: &Target, config: &EchConfigPayload) -> Outcome {
    probe(target, config, OuterExtensionsFault::OutOfOrder)
}
