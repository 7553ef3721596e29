//! Ordinary least squares between two dated series and diagnostics of the
//! resulting spread.

pub mod diagnostics;
pub mod ols;

pub use diagnostics::SpreadDiagnostics;
pub use ols::{OlsEstimator, OlsFit};
