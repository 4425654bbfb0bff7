//! Result types produced by a matching run.

mod verdict;

pub use verdict::MatchVerdict;
