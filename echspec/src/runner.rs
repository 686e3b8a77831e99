//! Running the selected sections against one server, and reporting.

use std::io::{self, Write};
use std::time::Duration;

use log::{debug, info};

use crate::cases::{self, compliance, Target};
use crate::ech_config;
use crate::error::ConfigError;
use crate::msgs::ech::EchConfigPayload;
use crate::outcome::Outcome;

/// What to test, and how.
#[derive(Clone, Debug)]
pub struct RunConfig {
    pub hostname: String,
    pub port: u16,
    /// Print each failure's message stack.
    pub verbose: bool,
    /// Section labels to run; `None` runs them all.
    pub sections: Option<Vec<String>>,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl RunConfig {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
            verbose: false,
            sections: None,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(5),
        }
    }

    fn selects(&self, label: &str) -> bool {
        match &self.sections {
            Some(sections) => sections.iter().any(|s| s == label),
            None => true,
        }
    }

    fn target(&self) -> Target {
        Target {
            hostname: self.hostname.clone(),
            port: self.port,
            connect_timeout: self.connect_timeout,
            read_timeout: self.read_timeout,
        }
    }
}

/// The outcome of one case.
#[derive(Clone, Debug)]
pub struct CaseResult {
    pub section: &'static str,
    pub description: &'static str,
    pub outcome: Outcome,
}

/// Everything one run found.
#[derive(Clone, Debug, Default)]
pub struct Report {
    pub results: Vec<CaseResult>,
    /// Set when no config could be chosen, and no result already says why.
    pub config_error: Option<ConfigError>,
    verbose: bool,
}

/// How [`Report::render`] decorates its output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Style {
    Plain,
    /// ANSI colours, for terminals.
    Colored,
}

impl Report {
    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results
            .iter()
            .filter(|r| !r.outcome.is_pass())
    }

    /// Whether a config was chosen and every executed case passed.
    pub fn is_success(&self) -> bool {
        self.config_error.is_none() && self.failures().next().is_none()
    }

    pub fn render(&self, out: &mut dyn Write, style: Style) -> io::Result<()> {
        for result in &self.results {
            let line = match result.outcome.is_pass() {
                true => paint(
                    style,
                    GREEN,
                    &format!("\t✔ {} [{}]", result.description, result.section),
                ),
                false => paint(
                    style,
                    RED,
                    &format!("\t✖ {} [{}]", result.description, result.section),
                ),
            };
            writeln!(out, "{}", line)?;
        }

        if let Some(err) = &self.config_error {
            writeln!(out)?;
            writeln!(out, "** {}", err)?;
            return Ok(());
        }

        let failures = self.failures().count();
        writeln!(out)?;
        let summary = format!("{} examples, {} failures", self.results.len(), failures);
        match failures {
            0 => writeln!(out, "{}", paint(style, GREEN, &summary))?,
            _ => writeln!(out, "{}", paint(style, RED, &summary))?,
        }
        if failures == 0 {
            return Ok(());
        }

        writeln!(out)?;
        writeln!(out, "Failures:")?;
        for (idx, result) in self.failures().enumerate() {
            writeln!(out)?;
            writeln!(
                out,
                "{}) {} [{}]",
                idx + 1,
                result.description,
                result.section
            )?;
            if let Outcome::Fail {
                details,
                message_stack,
            } = &result.outcome
            {
                writeln!(out, "    {}", paint(style, RED, details))?;
                if let (true, Some(stack)) = (self.verbose, message_stack) {
                    writeln!(out, "    {}", stack)?;
                }
            }
        }
        Ok(())
    }
}

const RED: u8 = 31;
const GREEN: u8 = 32;

fn paint(style: Style, code: u8, text: &str) -> String {
    match style {
        Style::Plain => text.to_string(),
        Style::Colored => format!("\x1b[{}m{}\x1b[0m", code, text),
    }
}

/// Runs the selected sections, in registration order.
pub struct Runner {
    config: RunConfig,
}

impl Runner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Choose a config from `ech_configs` and run every selected case
    /// with it.
    ///
    /// With `force_compliant`, only a config with the mandatory HPKE
    /// suite is acceptable and the check is itself reported, as section 9.
    pub fn run(&self, ech_configs: &[EchConfigPayload], force_compliant: bool) -> Report {
        let mut report = Report {
            verbose: self.config.verbose,
            ..Report::default()
        };

        let chosen = ech_config::select(ech_configs, force_compliant);
        let mut reported = false;
        if force_compliant && self.config.selects(compliance::LABEL) {
            let outcome = match &chosen {
                Ok(_) => Outcome::Pass(()),
                Err(err) => Outcome::fail(err.to_string()),
            };
            reported = !outcome.is_pass();
            report.results.push(CaseResult {
                section: compliance::LABEL,
                description: compliance::DESCRIPTION,
                outcome,
            });
        }

        let config = match chosen {
            Ok(config) => config,
            Err(err) => {
                info!("Cannot test {}: {}", self.config.hostname, err);
                if !reported {
                    report.config_error = Some(err);
                }
                return report;
            }
        };

        let target = self.config.target();
        for section in cases::all() {
            if !self.config.selects(section.label) {
                continue;
            }
            for case in section.cases {
                debug!("Running [{}] {}", section.label, case.description);
                let outcome = (case.probe)(&target, config);
                debug!("[{}] {}", section.label, outcome);
                report.results.push(CaseResult {
                    section: section.label,
                    description: case.description,
                    outcome,
                });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msgs::ech::tests::sample_config;
    use crate::msgs::enums::{HpkeAead, HpkeKdf, HpkeKem};

    fn rendered(report: &Report, style: Style) -> String {
        let mut out = Vec::new();
        report.render(&mut out, style).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn result(section: &'static str, outcome: Outcome) -> CaseResult {
        CaseResult {
            section,
            description: "MUST do the thing.",
            outcome,
        }
    }

    fn p256_only() -> EchConfigPayload {
        sample_config(
            1,
            HpkeKem::DHKEM_P256_HKDF_SHA256,
            &[(HpkeKdf::HKDF_SHA256, HpkeAead::AES_128_GCM)],
        )
    }

    #[test]
    fn all_passing() {
        let report = Report {
            results: vec![result("7-5", Outcome::Pass(()))],
            ..Report::default()
        };
        assert!(report.is_success());
        assert_eq!(
            rendered(&report, Style::Plain),
            "\t✔ MUST do the thing. [7-5]\n\n1 examples, 0 failures\n"
        );
    }

    #[test]
    fn failures_are_listed_with_details() {
        let failed = Outcome::Fail {
            details: "did not send expected alert: illegal_parameter".into(),
            message_stack: Some("[]".into()),
        };
        let mut report = Report {
            results: vec![result("5.1-9", Outcome::Pass(())), result("7-5", failed)],
            ..Report::default()
        };
        assert!(!report.is_success());

        let expected = "\t✔ MUST do the thing. [5.1-9]\n\
                        \t✖ MUST do the thing. [7-5]\n\
                        \n\
                        2 examples, 1 failures\n\
                        \n\
                        Failures:\n\
                        \n\
                        1) MUST do the thing. [7-5]\n    \
                        did not send expected alert: illegal_parameter\n";
        assert_eq!(rendered(&report, Style::Plain), expected);

        report.verbose = true;
        assert!(rendered(&report, Style::Plain).ends_with("illegal_parameter\n    []\n"));
    }

    #[test]
    fn colored_output() {
        let report = Report {
            results: vec![result("7-5", Outcome::fail("nope"))],
            ..Report::default()
        };
        let out = rendered(&report, Style::Colored);
        assert!(out.starts_with("\x1b[31m\t✖ MUST do the thing. [7-5]\x1b[0m\n"));
        assert!(out.contains("\x1b[31m1 examples, 1 failures\x1b[0m"));
    }

    #[test]
    fn non_compliant_configs_stop_the_run() {
        let runner = Runner::new(RunConfig::new("localhost", 1));
        let report = runner.run(&[p256_only()], true);

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].section, "9");
        assert!(!report.results[0].outcome.is_pass());
        assert_eq!(report.config_error, None);
        assert!(!report.is_success());
    }

    #[test]
    fn compliance_outside_selected_sections() {
        let mut config = RunConfig::new("localhost", 1);
        config.sections = Some(vec!["no-such-section".into()]);
        let report = Runner::new(config).run(&[p256_only()], true);

        assert!(report.results.is_empty());
        assert_eq!(report.config_error, Some(ConfigError::NoCompliantConfig));
        assert!(rendered(&report, Style::Plain).ends_with(
            "** EchConfigs does NOT include HPKE cipher suite: KEM: DHKEM(X25519, HKDF-SHA256), \
             KDF: HKDF-SHA256 and AEAD: AES-128-GCM.\n"
        ));
    }

    #[test]
    fn unknown_sections_run_nothing() {
        let mut config = RunConfig::new("localhost", 1);
        config.sections = Some(vec!["42".into()]);
        let report = Runner::new(config).run(&[p256_only()], false);
        assert!(report.results.is_empty());
        assert!(report.is_success());
    }
}
