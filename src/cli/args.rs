//! Command-line argument definitions.

use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

/// Compare the face in a verification frame against a profile photo.
///
/// Prints a single JSON verdict on stdout.
#[derive(Parser, Debug)]
#[command(name = "face_matcher", author, version, about, long_about = None)]
pub struct Args {
    /// Still frame taken from the verification video
    #[arg(allow_hyphen_values = true)]
    pub frame_path: PathBuf,

    /// Stored profile photo to compare against
    #[arg(allow_hyphen_values = true)]
    pub profile_path: PathBuf,

    /// Config file (defaults to <config dir>/face-matcher/config.toml)
    #[arg(long, env = "FACE_MATCHER_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Face detector ONNX model, overriding the config file
    #[arg(long, env = "FACE_MATCHER_DETECTOR_MODEL", value_name = "PATH")]
    pub detector_model: Option<PathBuf>,

    /// Face embedding ONNX model, overriding the config file
    #[arg(long, env = "FACE_MATCHER_ENCODER_MODEL", value_name = "PATH")]
    pub encoder_model: Option<PathBuf>,
}

/// Errors clap raises for `--help` and `--version`, which are not usage mistakes.
pub fn is_informational(err: &clap::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
    )
}
