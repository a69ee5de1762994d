use std::process;

use anyhow;
use clap::Parser;
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;

use qsnap::interfaces::cli::{log_heading, Cli};
use qsnap::interfaces::input::Input;
use qsnap::interfaces::InputHandle;
use qsnap::io::read_qsnap_yaml;

/// Builds the logging configuration: `qsnap-output` lines go to the console and, if requested,
/// to a file; diagnostic logs go to the console at a level set by the verbosity.
fn configure_logging(cli: &Cli) -> Result<Config, anyhow::Error> {
    let output_pattern = "{m}{n}";
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(output_pattern)))
        .build();
    let diagnostics = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("[{l}] {t}: {m}{n}")))
        .target(Target::Stderr)
        .build();

    let mut output_appenders = vec!["qsnap-output-console".to_string()];
    let mut builder = Config::builder()
        .appender(Appender::builder().build("qsnap-output-console", Box::new(console)))
        .appender(Appender::builder().build("diagnostics", Box::new(diagnostics)));
    if let Some(path) = cli.output.as_ref() {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(output_pattern)))
            .append(false)
            .build(path)?;
        builder = builder.appender(Appender::builder().build("qsnap-output-file", Box::new(file)));
        output_appenders.push("qsnap-output-file".to_string());
    }

    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let config = builder
        .logger(
            Logger::builder()
                .appenders(output_appenders)
                .additive(false)
                .build("qsnap-output", LevelFilter::Info),
        )
        .build(Root::builder().appender("diagnostics").build(level))?;
    Ok(config)
}

fn run(cli: &Cli) -> Result<(), anyhow::Error> {
    let mut input = if let Some(config) = cli.config.as_ref() {
        read_qsnap_yaml::<Input, _>(config)?
    } else {
        Input::default()
    };
    if let Some(nsteps) = cli.nsteps {
        anyhow::ensure!(nsteps > 0, "At least one force evaluation step is required.");
        input.force_evaluation.nsteps = nsteps;
    }
    input.handle()
}

fn main() {
    let cli = Cli::parse();
    let config = match configure_logging(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Unable to configure logging: {err}");
            process::exit(1);
        }
    };
    if let Err(err) = log4rs::init_config(config) {
        eprintln!("Unable to initialise logging: {err}");
        process::exit(1);
    }

    log_heading();
    if let Err(err) = run(&cli) {
        log::error!(target: "qsnap-output", "{err:#}");
        process::exit(1);
    }
}
