use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use treelox::Lox;

/// Tree-walking interpreter for a small C-like scripting language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script to run. Starts an interactive prompt when omitted.
    script: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `treelox=trace`.
    #[arg(long, env = "TREELOX_LOG", default_value = "warn")]
    log: String,

    /// Print the parsed syntax tree instead of running the script.
    #[arg(long, requires = "script")]
    print_ast: bool,
}

fn main() -> Result<ExitCode, anyhow::Error> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log)?)
        .with_writer(std::io::stderr)
        .init();

    let mut lox = Lox::new();
    let Some(script) = args.script else {
        lox.run_prompt()?;
        return Ok(ExitCode::SUCCESS);
    };

    let source = match std::fs::read_to_string(&script) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Could not read '{}': {e}", script.display());
            return Ok(ExitCode::from(66));
        }
    };

    if args.print_ast {
        lox.print_ast(&source)?;
    } else {
        lox.run(&source)?;
    }

    // Indicate an error in the exit code.
    if lox.had_error() {
        return Ok(ExitCode::from(65));
    }
    if lox.had_runtime_error() {
        return Ok(ExitCode::from(70));
    }

    Ok(ExitCode::SUCCESS)
}
