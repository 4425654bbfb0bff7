//! Face verification: compare the single face in a video frame against a
//! profile photo and report a similarity verdict.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod logging;
pub mod state;
