//! IREX command line.
//!
//! Validates project specifications and compiles them into the generator IR.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};

use irex_compiler::{build, inspect_source, validate, BuildOptions};
use irex_diagnostics::{has_errors, Diagnostic, Severity};
use irex_spec_parser::SpecKind;
use irex_telemetry::{init_logging, LogFormat, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "irex", about = "IREX specification compiler", version)]
struct Cli {
    /// Log level filter (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, env = "IREX_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Log format (pretty or json).
    #[arg(long, global = true, env = "IREX_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a project without producing the IR.
    ///
    /// Prints every diagnostic and exits 1 if any of them is an error.
    Validate {
        /// Project config file.
        #[arg(default_value = "irex.yaml")]
        config: PathBuf,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Compile a project into IR JSON.
    Build {
        /// Project config file.
        #[arg(default_value = "irex.yaml")]
        config: PathBuf,

        /// Write the IR to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode and check a single specification file.
    Inspect {
        /// Specification file.
        file: PathBuf,

        /// Specification kind; inferred from the path when omitted.
        #[arg(long, value_enum)]
        kind: Option<Kind>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Config,
    Schema,
    Service,
}

impl From<Kind> for SpecKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Config => SpecKind::Config,
            Kind::Schema => SpecKind::Schema,
            Kind::Service => SpecKind::Service,
        }
    }
}

fn exit_code(failed: bool) -> ExitCode {
    if failed {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn print_diagnostics(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}").context("failed to write to stdout")?;
    Ok(())
}

/// Run the validate command.
fn run_validate(config: &Path, format: Format) -> anyhow::Result<ExitCode> {
    let diagnostics = validate(&BuildOptions::new(config));
    let failed = has_errors(&diagnostics);
    let errors = count(&diagnostics, Severity::Error);
    let warnings = count(&diagnostics, Severity::Warning);

    match format {
        Format::Json => print_json(&serde_json::json!({
            "valid": !failed,
            "diagnostics": diagnostics,
            "summary": { "errors": errors, "warnings": warnings },
        }))?,
        Format::Text => {
            print_diagnostics(&diagnostics);
            if failed {
                eprintln!("✗ {} has {errors} error(s), {warnings} warning(s)", config.display());
            } else if warnings > 0 {
                eprintln!("✓ {} is valid (with {warnings} warning(s))", config.display());
            } else {
                eprintln!("✓ {} is valid", config.display());
            }
        }
    }

    Ok(exit_code(failed))
}

/// Run the build command.
fn run_build(config: &Path, output: Option<&Path>) -> anyhow::Result<ExitCode> {
    let out = build(&BuildOptions::new(config));
    print_diagnostics(&out.diagnostics);

    let ir = match out.into_result() {
        Ok(ir) => ir,
        Err(e) => {
            let errors = count(e.diagnostics(), Severity::Error);
            eprintln!("error: build failed with {errors} error(s)");
            return Ok(ExitCode::from(1));
        }
    };

    let json = ir.to_json().context("failed to serialize IR")?;
    match output {
        Some(path) => {
            fs::write(path, format!("{json}\n"))
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "compiled {} to {} ({} routes)",
                config.display(),
                path.display(),
                ir.routes.len()
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("failed to write to stdout")?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Run the inspect command.
fn run_inspect(file: &Path, kind: Option<Kind>) -> anyhow::Result<ExitCode> {
    let Some(kind) = kind.map(SpecKind::from).or_else(|| SpecKind::infer(file)) else {
        eprintln!(
            "error: cannot tell which kind of specification {} is; pass --kind",
            file.display()
        );
        return Ok(ExitCode::from(1));
    };
    let content =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;

    let inspection = inspect_source(kind, &content, &file.display().to_string())?;
    print_diagnostics(&inspection.diagnostics);
    print_json(&inspection)?;

    Ok(exit_code(has_errors(&inspection.diagnostics)))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let telemetry = TelemetryConfig::new()
        .with_log_level(&cli.log_level)
        .with_log_format(LogFormat::parse(&cli.log_format).unwrap_or_default());
    if let Err(e) = init_logging(&telemetry) {
        eprintln!("warning: {e}");
    }

    let result = match &cli.command {
        Commands::Validate { config, format } => run_validate(config, *format),
        Commands::Build { config, output } => run_build(config, output.as_deref()),
        Commands::Inspect { file, kind } => run_inspect(file, *kind),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}
