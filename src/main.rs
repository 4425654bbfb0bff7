use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;

use face_matcher::state::MatchVerdict;
use face_matcher::{cli, constants, logging};

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let _log_guard = logging::init_tracing(constants::DEFAULT_LOG_LEVEL);

    let args = match cli::Args::try_parse() {
        Ok(args) => args,
        Err(err) if cli::is_informational(&err) => err.exit(),
        Err(err) => {
            tracing::debug!(kind = ?err.kind(), "rejected arguments");
            emit(&MatchVerdict::failure(constants::ERR_USAGE))?;
            return Ok(ExitCode::FAILURE);
        }
    };

    tracing::debug!(
        version = constants::APP_VERSION,
        frame = %args.frame_path.display(),
        profile = %args.profile_path.display(),
        "comparing faces"
    );

    let verdict = cli::commands::run(&args);
    emit(&verdict)?;
    Ok(ExitCode::SUCCESS)
}

/// Print the verdict as one JSON line on stdout.
fn emit(verdict: &MatchVerdict) -> Result<()> {
    let line = verdict
        .to_json_line()
        .wrap_err("Failed to serialize verdict")?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{line}").wrap_err("Failed to write verdict")?;
    stdout.flush().wrap_err("Failed to flush stdout")?;
    Ok(())
}
