use thiserror::Error;

/// Contract violations reported by the detector core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StaLtaError {
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("sample {index} is not finite ({value})")]
    NonFiniteSample { index: usize, value: f64 },
}

impl StaLtaError {
    pub(crate) fn invalid(name: &'static str, value: f64, reason: &'static str) -> Self {
        StaLtaError::InvalidParameter {
            name,
            value,
            reason,
        }
    }
}
