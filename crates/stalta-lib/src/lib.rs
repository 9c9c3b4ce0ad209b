pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod signal;
pub mod synth;

pub use detectors::*;
pub use error::StaLtaError;
pub use signal::*;
