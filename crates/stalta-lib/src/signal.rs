use crate::error::StaLtaError;
use serde::{Deserialize, Serialize};

/// Single-channel, uniformly sampled series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Uniform sampling frequency in Hz
    pub fs: f64,
    /// Samples
    pub data: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, rejecting a non-positive sampling rate or non-finite samples.
    pub fn new(fs: f64, data: Vec<f64>) -> Result<Self, StaLtaError> {
        let ts = Self { fs, data };
        ts.validate()?;
        Ok(ts)
    }

    pub fn validate(&self) -> Result<(), StaLtaError> {
        if !self.fs.is_finite() || self.fs <= 0.0 {
            return Err(StaLtaError::invalid(
                "fs",
                self.fs,
                "sampling rate must be positive and finite",
            ));
        }
        if let Some((index, &value)) = self.data.iter().enumerate().find(|(_, v)| !v.is_finite())
        {
            return Err(StaLtaError::NonFiniteSample { index, value });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
    pub fn duration(&self) -> f64 {
        self.data.len() as f64 / self.fs
    }
}

/// Half-open sample interval `[start, end)` on the ratio time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub start: usize,
    pub end: usize,
}

impl Event {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Samples between the end of `previous` and the start of this event.
    pub fn gap_after(&self, previous: &Event) -> usize {
        self.start.saturating_sub(previous.end)
    }

    /// Shift both bounds, e.g. by the LTA window length to land on raw signal indices.
    pub fn shifted(&self, offset: usize) -> Event {
        Event {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl From<(usize, usize)> for Event {
    fn from((start, end): (usize, usize)) -> Self {
        Self { start, end }
    }
}
