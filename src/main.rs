use clap::{Args, Parser, Subcommand};
use phantom_lint::{
    audit::Pass,
    lint::{run_check, run_expectations, LintOptions},
    logging::init_logging,
    tools::diagnostics::OutputFormat,
};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(name = "phantom", version, about = "Audits phantom-typed alias instantiations")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Report assignability and phantom type-argument findings.
    Check {
        #[command(flatten)]
        options: OptionArgs,
        /// Re-check whenever a file changes.
        #[arg(long)]
        watch: bool,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Verify `// want` expectations in fixture files.
    Test {
        #[command(flatten)]
        options: OptionArgs,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct OptionArgs {
    #[arg(long, value_enum)]
    pass: Option<Pass>,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Configuration file to use instead of a discovered `phantom.toml`.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl From<OptionArgs> for LintOptions {
    fn from(args: OptionArgs) -> Self {
        LintOptions {
            pass: args.pass,
            format: args.format,
            config: args.config,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging() {
        eprintln!("{err}");
    }

    let clean = match cli.command {
        Command::Check {
            options,
            watch,
            files,
        } => match run_check(&files, &options.into(), watch) {
            Ok(clean) => clean,
            Err(err) => {
                eprintln!("error: {err}");
                false
            }
        },
        Command::Test { options, files } => run_expectations(&files, &options.into()),
    };

    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
