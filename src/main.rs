//! `cg635`: command-line control of a Stanford Research Systems CG635.
//!
//! ```text
//! cg635 --gpib-address 23 frequency 10e6
//! cg635 display "q/q! high"
//! cg635 diff-level 0.20 0.60
//! cg635 script sweep.rhai
//! RUST_LOG=srs_cg635=debug cg635 --mock repl
//! ```

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use srs_cg635::config::{gpib_resource, Backend, Settings, DEFAULT_CONFIG_PATH};
use srs_cg635::instrument::Cg635;
use srs_cg635::parameters::ParamArg;
use srs_cg635::scripting::{RhaiEngine, ScriptEngine};

#[derive(Parser)]
#[command(name = "cg635", author, version, about = "Control an SRS CG635 clock generator", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// VISA resource string, overrides the configured resource
    #[arg(short, long, conflicts_with = "gpib_address")]
    resource: Option<String>,

    /// GPIB primary address on board 0
    #[arg(short, long)]
    gpib_address: Option<u8>,

    /// Talk to a simulated instrument instead of real hardware
    #[arg(long)]
    mock: bool,

    /// Operation to run
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    #[command(flatten)]
    Instrument(Command),
    /// Run a Rhai script with the instrument bound to `cg`
    Script {
        /// Script file
        file: PathBuf,
    },
    /// Interactive Rhai prompt with the instrument bound to `cg`
    Repl,
    /// Print the effective configuration
    Config,
}

/// One-shot instrument operations
#[derive(Subcommand)]
enum Command {
    /// Print the identification string
    Idn,
    /// Start the instrument self test (the result is not read back)
    SelfTest,
    /// Show the displayed parameter, or select one by name or index
    Display {
        /// Parameter name or index
        param: Option<String>,
    },
    /// Show the output frequency, or set it in Hz
    Frequency {
        /// New frequency in Hz
        hz: Option<f64>,
    },
    /// Step a parameter up by its step size
    StepUp {
        /// Parameter name or index
        param: String,
    },
    /// Step a parameter down by its step size
    StepDown {
        /// Parameter name or index
        param: String,
    },
    /// Select the Q/Q! output standard
    Standard {
        /// Standard name or index
        param: String,
    },
    /// Set the step size of a parameter
    StepSize {
        /// Parameter name or index
        param: String,
        /// Step size in the parameter's unit
        value: f64,
    },
    /// Drive the Q/Q! outputs to the given levels (LVDS mode)
    DiffLevel {
        /// Low rail in volts
        low: f64,
        /// High rail in volts
        high: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load_from(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;
    if let Some(resource) = cli.resource {
        settings.instrument.resource = resource;
    }
    if let Some(address) = cli.gpib_address {
        settings.instrument.resource = gpib_resource(address);
    }
    if cli.mock {
        settings.instrument.backend = Backend::Mock;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_level)),
        )
        .init();

    match cli.action {
        Action::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
        Action::Script { file } => run_script(connect(&settings)?, &file, &settings),
        Action::Repl => repl(connect(&settings)?, &settings),
        Action::Instrument(command) => {
            let mut cg = connect(&settings)?;
            run_command(&mut cg, command)?;
            cg.close().context("failed to close the instrument session")
        }
    }
}

fn connect(settings: &Settings) -> Result<Cg635> {
    Cg635::connect(settings)
        .with_context(|| format!("failed to open '{}'", settings.instrument.resource))
}

fn run_command(cg: &mut Cg635, command: Command) -> Result<()> {
    let echo = cg.echo();
    match command {
        Command::Idn => {
            let idn = cg.identify()?;
            if !echo.identify {
                println!("{}", idn);
            }
        }
        Command::SelfTest => cg.self_test()?,
        Command::Display { param: None } => {
            let reply = cg.get_display()?;
            if !echo.display {
                println!("{}", reply);
            }
        }
        Command::Display { param: Some(param) } => {
            let selected = cg.set_display(ParamArg::parse(&param))?;
            info!("Display set to {}", selected);
        }
        Command::Frequency { hz: None } => {
            let frequency = cg.get_frequency()?;
            if !echo.frequency {
                println!("{}", frequency);
            }
        }
        Command::Frequency { hz: Some(hz) } => {
            cg.set_frequency(hz)?;
            info!("Frequency set to {} Hz", hz);
        }
        Command::StepUp { param } => {
            let step = cg.step_up(ParamArg::parse(&param))?;
            info!("Stepped {} up", step);
        }
        Command::StepDown { param } => {
            let step = cg.step_down(ParamArg::parse(&param))?;
            info!("Stepped {} down", step);
        }
        Command::Standard { param } => {
            let standard = cg.set_output_standard(ParamArg::parse(&param))?;
            info!("Q/Q! output standard set to {}", standard);
        }
        Command::StepSize { param, value } => {
            let step = cg.set_step_size(ParamArg::parse(&param), value)?;
            info!("{} step size set to {}", step, value);
        }
        Command::DiffLevel { low, high } => {
            let plan = cg.set_differential_output_level(low, high)?;
            println!(
                "Q/Q! low {:.2} V, high {:.2} V ({} steps)",
                f64::from(plan.low_target) / 100.0,
                f64::from(plan.high_target) / 100.0,
                plan.step_count()
            );
        }
    }
    Ok(())
}

fn run_script(cg: Cg635, file: &Path, settings: &Settings) -> Result<()> {
    let script = fs::read_to_string(file)
        .with_context(|| format!("failed to read script {}", file.display()))?;

    let mut engine = RhaiEngine::with_cg635(cg, settings.scripting.max_operations);
    engine
        .validate_script(&script)
        .with_context(|| format!("{} does not compile", file.display()))?;

    info!("Running {}", file.display());
    let result = engine
        .execute_script(&script)
        .with_context(|| format!("{} failed", file.display()))?;
    if !result.is_unit() {
        println!("{}", result);
    }
    Ok(())
}

fn repl(cg: Cg635, settings: &Settings) -> Result<()> {
    let mut engine = RhaiEngine::with_cg635(cg, settings.scripting.max_operations);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("CG635 Rhai prompt. The instrument is `cg`; type `exit` to quit.");
    loop {
        print!("cg635> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        match engine.execute_script(line) {
            Ok(value) if value.is_unit() => {}
            Ok(value) => println!("{}", value),
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}
