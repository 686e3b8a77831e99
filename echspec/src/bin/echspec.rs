use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use echspec::{ech_config, RunConfig, Runner, Style};

/// Checks a TLS server's Encrypted Client Hello implementation against
/// the MUST-statements of the ECH draft.
#[derive(Parser)]
#[command(name = "echspec", override_usage = "echspec [OPTIONS] <HOSTNAME>", about)]
struct Cli {
    /// Path to ECHConfigs PEM file (default: resolve ECHConfigs via DNS)
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Server port number
    #[arg(short, long, default_value_t = 443)]
    port: u16,

    /// Do not force a compliant ECHConfig HPKE cipher suite
    #[arg(short, long)]
    not_force_compliant_hpke: bool,

    /// Verbose mode; prints the message stack of each failure
    #[arg(short, long)]
    verbose: bool,

    /// Comma-separated sections to test (default: all sections)
    #[arg(short, long, value_delimiter = ',', value_name = "SECTIONS")]
    sections: Option<Vec<String>>,

    hostname: Option<String>,
}

fn main() {
    env_logger::init();

    let cli = parse_args();
    let code = match run(cli) {
        Ok(true) => 0,
        Ok(false) => 1,
        Err(err) => {
            eprintln!("** {:#}", err);
            1
        }
    };
    process::exit(code);
}

/// Parse the command line, or exit with status 1 explaining why not.
fn parse_args() -> Cli {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => usage_error(&first_line(&err)),
    };

    if let Some(file) = &cli.file {
        if !file.exists() {
            eprintln!("** FILE is not found");
            process::exit(1);
        }
    }

    if cli.hostname.is_none() {
        usage_error("`hostname` argument is not specified");
    }
    cli
}

fn usage_error(message: &str) -> ! {
    eprintln!("{}", Cli::command().render_help());
    eprintln!("** {}", message);
    process::exit(1)
}

fn first_line(err: &clap::Error) -> String {
    let text = err.to_string();
    text.lines()
        .next()
        .unwrap_or_default()
        .trim_start_matches("error: ")
        .to_string()
}

fn run(cli: Cli) -> anyhow::Result<bool> {
    let hostname = cli
        .hostname
        .context("`hostname` argument is not specified")?;

    let ech_configs = match &cli.file {
        Some(path) => ech_config::read_pem_file(path)?,
        None => ech_config::resolve_via_dns(&hostname)?,
    };

    let mut config = RunConfig::new(hostname, cli.port);
    config.verbose = cli.verbose;
    config.sections = cli.sections;

    let report = Runner::new(config).run(&ech_configs, !cli.not_force_compliant_hpke);

    let style = match io::stdout().is_terminal() {
        true => Style::Colored,
        false => Style::Plain,
    };
    let mut stdout = io::stdout().lock();
    report
        .render(&mut stdout, style)
        .context("cannot write report")?;
    stdout.flush()?;

    Ok(report.is_success())
}
