//! Runs the probes against mock servers on localhost.

use echspec::internal::msgs::enums::NamedGroup;
use echspec::{AlertDescription, Outcome, Runner, Style};

mod common;
use common::*;

const ALERTING_SECTIONS: &[&str] = &["5.1-9", "5.1-10", "7-5", "7.1-11"];

fn details(outcome: &Outcome) -> &str {
    match outcome {
        Outcome::Fail { details, .. } => details,
        Outcome::Pass(_) => "",
    }
}

fn message_stack(outcome: &Outcome) -> &str {
    match outcome {
        Outcome::Fail {
            message_stack: Some(stack),
            ..
        } => stack,
        _ => panic!("no message stack in {:?}", outcome),
    }
}

#[test]
fn strict_server_passes_malformed_offer_cases() {
    init_logging();
    let (port, server) = serve(8, |sock| {
        let ch = read_record(sock)?;
        assert_eq!(ch.typ, 0x16);
        assert_eq!(ch.body[0], 0x01);
        send_alert(sock, AlertDescription::IllegalParameter)
    });

    let mut sections = vec!["9"];
    sections.extend(ALERTING_SECTIONS);
    let report = Runner::new(run_config(port, &sections)).run(&compliant_configs(), true);
    server.join().unwrap();

    let labels = report
        .results
        .iter()
        .map(|r| r.section)
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec!["9", "5.1-9", "5.1-10", "5.1-10", "5.1-10", "5.1-10", "7-5", "7-5", "7.1-11"]
    );
    for result in &report.results {
        assert!(result.outcome.is_pass(), "{:?}", result);
    }
    assert!(report.is_success());

    let mut out = Vec::new();
    report
        .render(&mut out, Style::Plain)
        .unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.ends_with("\n9 examples, 0 failures\n"));
}

#[test]
fn wrong_alert_is_reported_with_message_stack() {
    init_logging();
    let (port, server) = serve(1, |sock| {
        read_record(sock)?;
        send_alert(sock, AlertDescription::HandshakeFailure)
    });

    let mut config = run_config(port, &["5.1-9"]);
    config.verbose = true;
    let report = Runner::new(config).run(&compliant_configs(), false);
    server.join().unwrap();

    assert_eq!(report.results.len(), 1);
    let outcome = &report.results[0].outcome;
    assert_eq!(
        details(outcome),
        "did not send expected alert: illegal_parameter"
    );

    let Outcome::Fail {
        message_stack: Some(stack),
        ..
    } = outcome
    else {
        panic!("no message stack in {:?}", outcome);
    };
    let inner = stack.find("ClientHelloInner").unwrap();
    let outer = stack.find("ClientHello\"").unwrap();
    let alert = stack.find("Alert").unwrap();
    assert!(inner < outer && outer < alert);

    let mut out = Vec::new();
    report
        .render(&mut out, Style::Plain)
        .unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.contains("Failures:\n\n1) "));
    assert!(out.contains(stack.as_str()));
    assert!(!report.is_success());
}

#[test]
fn hang_up_is_not_an_alert() {
    init_logging();
    let (port, server) = serve(2, |sock| {
        read_record(sock)?;
        Ok(())
    });

    let report = Runner::new(run_config(port, &["7-5"])).run(&compliant_configs(), true);
    server.join().unwrap();

    assert_eq!(report.results.len(), 2);
    for result in &report.results {
        assert_eq!(
            details(&result.outcome),
            "did not send expected alert: illegal_parameter"
        );
    }
}

#[test]
fn second_client_hello_cases() {
    init_logging();
    let (port, server) = serve(3, |sock| {
        let ch1 = read_record(sock)?;
        assert_eq!(ch1.body[0], 0x01);
        send_hello_retry_request(sock, NamedGroup::X25519)?;

        let ch2 = read_record(sock)?;
        assert_eq!(ch2.body[0], 0x01);
        // stands in for a server that always complains about the ECH extension
        send_alert(sock, AlertDescription::MissingExtension)
    });

    let report = Runner::new(run_config(port, &["7.1.1-2", "7.1.1-5"])).run(&compliant_configs(), true);
    server.join().unwrap();

    assert_eq!(report.results.len(), 3);
    assert!(report.results[0].outcome.is_pass());
    assert_eq!(
        details(&report.results[1].outcome),
        "did not send expected alert: illegal_parameter"
    );
    assert_eq!(
        details(&report.results[2].outcome),
        "did not send expected alert: decrypt_error"
    );
    assert_eq!(report.failures().count(), 2);
}

#[test]
fn undecryptable_second_client_hello() {
    init_logging();
    let (port, server) = serve(1, |sock| {
        read_record(sock)?;
        send_hello_retry_request(sock, NamedGroup::secp256r1)?;
        read_record(sock)?;
        send_alert(sock, AlertDescription::DecryptError)
    });

    let report = Runner::new(run_config(port, &["7.1.1-5"])).run(&compliant_configs(), true);
    server.join().unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(report.results[0].outcome.is_pass());
}

#[test]
fn both_inner_hellos_are_logged() {
    init_logging();
    let (port, server) = serve(1, |sock| {
        read_record(sock)?;
        send_hello_retry_request(sock, NamedGroup::secp256r1)?;
        read_record(sock)?;
        send_alert(sock, AlertDescription::IllegalParameter)
    });

    let report = Runner::new(run_config(port, &["7.1.1-5"])).run(&compliant_configs(), true);
    server.join().unwrap();

    let stack = message_stack(&report.results[0].outcome);
    assert_eq!(stack.matches("\"ClientHelloInner\"").count(), 2);
    let second_inner = stack.rfind("ClientHelloInner").unwrap();
    let hrr = stack.find("HelloRetryRequest").unwrap();
    assert!(hrr < second_inner);
}

#[test]
fn missing_hello_retry_request() {
    init_logging();
    let (port, server) = serve(1, |sock| {
        read_record(sock)?;
        send_alert(sock, AlertDescription::HandshakeFailure)
    });

    let report = Runner::new(run_config(port, &["7.1.1-5"])).run(&compliant_configs(), true);
    server.join().unwrap();

    assert_eq!(
        details(&report.results[0].outcome),
        "did not send expected handshake message: HelloRetryRequest"
    );
}

#[test]
fn grease_without_server_hello() {
    init_logging();
    let (port, server) = serve(1, |sock| {
        read_record(sock)?;
        send_alert(sock, AlertDescription::HandshakeFailure)
    });

    let report = Runner::new(run_config(port, &["7.1-14.2.1"])).run(&compliant_configs(), true);
    server.join().unwrap();

    assert_eq!(
        details(&report.results[0].outcome),
        "not received ServerHello"
    );
    // GREASE has no inner hello
    let stack = message_stack(&report.results[0].outcome);
    assert!(!stack.contains("ClientHelloInner"));
    assert!(stack.starts_with("[{\"ClientHello\""));
}

#[test]
fn refused_connections_fail_every_case() {
    init_logging();
    let port = closed_port();
    let report = Runner::new(run_config(port, &["5.1-10", "7.1.1-2"])).run(&compliant_configs(), true);

    assert_eq!(report.results.len(), 6);
    let expected = format!("127.0.0.1:{} connection refused", port);
    for result in &report.results {
        assert_eq!(details(&result.outcome), expected);
    }
}
