//! Command handlers.

use crate::cli::args::Args;
use crate::config::Config;
use crate::core::matcher::{self, MatchError, MatchScore};
use crate::core::OnnxFaceEncoder;
use crate::state::MatchVerdict;

/// Run one comparison and fold every outcome into a verdict.
pub fn run(args: &Args) -> MatchVerdict {
    matcher::verdict(compare(args))
}

fn compare(args: &Args) -> Result<MatchScore, MatchError> {
    let config = Config::load(args.config.as_deref())?
        .with_overrides(args.detector_model.clone(), args.encoder_model.clone());
    let encoder = OnnxFaceEncoder::load(&config)?;
    matcher::match_files(&args.frame_path, &args.profile_path, &encoder)
}
