use crate::{
    error::StaLtaError,
    signal::{Event, TimeSeries},
};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Parameters for the STA/LTA trigger. Durations are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaLtaConfig {
    /// Short-term averaging window.
    pub sta_window_s: f64,
    /// Long-term averaging window.
    pub lta_window_s: f64,
    /// STA/LTA ratio that must be exceeded to open an event.
    pub threshold: f64,
    /// Shortest accepted event.
    pub min_event_duration_s: f64,
    /// Shortest gap between the previous accepted event's end and a new event's start.
    pub min_event_separation_s: f64,
}

impl Default for StaLtaConfig {
    fn default() -> Self {
        Self {
            sta_window_s: 0.05,
            lta_window_s: 1.0,
            threshold: 2.0,
            min_event_duration_s: DEFAULT_MIN_EVENT_DURATION_S,
            min_event_separation_s: DEFAULT_MIN_EVENT_SEPARATION_S,
        }
    }
}

pub const DEFAULT_MIN_EVENT_DURATION_S: f64 = 0.05;
pub const DEFAULT_MIN_EVENT_SEPARATION_S: f64 = 0.5;

impl StaLtaConfig {
    pub fn sta_window(&self, fs: f64) -> Result<WindowSpec, StaLtaError> {
        WindowSpec::new("sta_window_s", self.sta_window_s, fs)
    }

    pub fn lta_window(&self, fs: f64) -> Result<WindowSpec, StaLtaError> {
        WindowSpec::new("lta_window_s", self.lta_window_s, fs)
    }

    pub fn event_rules(&self, fs: f64) -> Result<EventRules, StaLtaError> {
        EventRules::from_durations(fs, self.min_event_duration_s, self.min_event_separation_s)
    }

    /// Check every parameter against the sampling rate they will be used with.
    pub fn validate(&self, fs: f64) -> Result<(), StaLtaError> {
        self.sta_window(fs)?;
        self.lta_window(fs)?;
        self.event_rules(fs)?;
        if !self.threshold.is_finite() {
            return Err(StaLtaError::invalid(
                "threshold",
                self.threshold,
                "threshold must be finite",
            ));
        }
        Ok(())
    }
}

fn check_fs(fs: f64) -> Result<(), StaLtaError> {
    if !fs.is_finite() || fs <= 0.0 {
        return Err(StaLtaError::invalid(
            "fs",
            fs,
            "sampling rate must be positive and finite",
        ));
    }
    Ok(())
}

/// Window duration paired with its length in samples (`floor(duration * fs)`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub duration_s: f64,
    pub samples: NonZeroUsize,
}

impl WindowSpec {
    pub fn new(name: &'static str, duration_s: f64, fs: f64) -> Result<Self, StaLtaError> {
        check_fs(fs)?;
        if !duration_s.is_finite() || duration_s <= 0.0 {
            return Err(StaLtaError::invalid(
                name,
                duration_s,
                "window duration must be positive and finite",
            ));
        }
        let samples = NonZeroUsize::new((duration_s * fs).floor() as usize).ok_or_else(|| {
            StaLtaError::invalid(name, duration_s, "window is shorter than one sample")
        })?;
        Ok(Self {
            duration_s,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.get()
    }
}

/// Event acceptance limits, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventRules {
    pub min_duration: usize,
    pub min_separation: usize,
}

impl EventRules {
    /// Floor both durations to whole samples.
    pub fn from_durations(
        fs: f64,
        min_duration_s: f64,
        min_separation_s: f64,
    ) -> Result<Self, StaLtaError> {
        check_fs(fs)?;
        for (name, value) in [
            ("min_event_duration_s", min_duration_s),
            ("min_event_separation_s", min_separation_s),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(StaLtaError::invalid(
                    name,
                    value,
                    "duration must be non-negative and finite",
                ));
            }
        }
        Ok(Self {
            min_duration: (min_duration_s * fs).floor() as usize,
            min_separation: (min_separation_s * fs).floor() as usize,
        })
    }

    pub fn canonical(fs: f64) -> Result<Self, StaLtaError> {
        Self::from_durations(
            fs,
            DEFAULT_MIN_EVENT_DURATION_S,
            DEFAULT_MIN_EVENT_SEPARATION_S,
        )
    }
}

/// Neumaier-compensated running total.
#[derive(Debug, Clone, Copy, Default)]
struct CompensatedSum {
    sum: f64,
    carry: f64,
}

impl CompensatedSum {
    fn add(&mut self, x: f64) {
        let t = self.sum + x;
        if self.sum.abs() >= x.abs() {
            self.carry += (self.sum - t) + x;
        } else {
            self.carry += (x - t) + self.sum;
        }
        self.sum = t;
    }

    fn value(&self) -> f64 {
        self.sum + self.carry
    }
}

fn window_total(window: &[f64], scale: f64) -> CompensatedSum {
    window.iter().fold(CompensatedSum::default(), |mut acc, x| {
        acc.add(x.abs() / scale);
        acc
    })
}

/// Mean absolute value over `[i, i + window)` for every `i` in `0..len - window`.
///
/// The last start index is `len - window - 1`; a window at least as long as the
/// input yields an empty series. Each term is divided by the window length before
/// it is added, so the mean of finite samples stays finite. The running total is
/// compensated, rebuilt from scratch once per window length, and forced to zero
/// whenever the window holds only zero samples.
pub fn windowed_average(data: &[f64], window: NonZeroUsize) -> Vec<f64> {
    let win = window.get();
    let count = data.len().saturating_sub(win);
    if count == 0 {
        return Vec::new();
    }

    let scale = win as f64;
    let mut out = Vec::with_capacity(count);
    let mut acc = window_total(&data[..win], scale);
    let mut nonzero = data[..win].iter().filter(|x| **x != 0.0).count();

    for i in 0..count {
        out.push(acc.value().max(0.0));

        let leaving = data[i];
        let entering = data[i + win];
        if leaving != 0.0 {
            nonzero -= 1;
        }
        if entering != 0.0 {
            nonzero += 1;
        }

        if nonzero == 0 {
            acc = CompensatedSum::default();
        } else if (i + 1) % win == 0 {
            acc = window_total(&data[i + 1..i + 1 + win], scale);
        } else {
            acc.add(-leaving.abs() / scale);
            acc.add(entering.abs() / scale);
        }
    }
    out
}

/// Reference form of [`windowed_average`] that re-sums every window.
pub fn windowed_average_naive(data: &[f64], window: NonZeroUsize) -> Vec<f64> {
    let win = window.get();
    let count = data.len().saturating_sub(win);
    (0..count)
        .map(|i| data[i..i + win].iter().map(|x| x.abs()).sum::<f64>() / win as f64)
        .collect()
}

/// Short-term average of `ts` over `sta_window_s` seconds.
pub fn compute_sta(ts: &TimeSeries, sta_window_s: f64) -> Result<Vec<f64>, StaLtaError> {
    let window = WindowSpec::new("sta_window_s", sta_window_s, ts.fs)?;
    Ok(windowed_average(&ts.data, window.samples))
}

/// Long-term average of `ts` over `lta_window_s` seconds.
pub fn compute_lta(ts: &TimeSeries, lta_window_s: f64) -> Result<Vec<f64>, StaLtaError> {
    let window = WindowSpec::new("lta_window_s", lta_window_s, ts.fs)?;
    Ok(windowed_average(&ts.data, window.samples))
}

/// Element-wise STA/LTA over the common prefix of both series.
///
/// Where the LTA is not positive the ratio is 1.0.
pub fn compute_ratio(sta: &[f64], lta: &[f64]) -> Vec<f64> {
    sta.iter()
        .zip(lta)
        .map(|(&short, &long)| if long > 0.0 { short / long } else { 1.0 })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Active { start: usize },
}

/// Incremental event extraction over a ratio series.
///
/// Feed ratio values in order with [`EventExtractor::push`]. A candidate opens
/// when a value is strictly above the threshold and closes on the first value
/// that is not. Closed candidates that are too short, or that start too soon
/// after the previously accepted event, are dropped. A candidate still open
/// when the series ends is never emitted.
#[derive(Debug, Clone)]
pub struct EventExtractor {
    threshold: f64,
    rules: EventRules,
    state: TriggerState,
    next_index: usize,
    last_accepted: Option<Event>,
}

impl EventExtractor {
    pub fn new(threshold: f64, rules: EventRules) -> Self {
        Self {
            threshold,
            rules,
            state: TriggerState::Idle,
            next_index: 0,
            last_accepted: None,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    /// Consume the next ratio value; returns an event when a candidate closes and passes.
    pub fn push(&mut self, value: f64) -> Option<Event> {
        let index = self.next_index;
        self.next_index += 1;
        let above = value > self.threshold;

        match (self.state, above) {
            (TriggerState::Idle, true) => {
                self.state = TriggerState::Active { start: index };
                None
            }
            (TriggerState::Active { start }, false) => {
                self.state = TriggerState::Idle;
                self.close(Event { start, end: index })
            }
            _ => None,
        }
    }

    fn close(&mut self, candidate: Event) -> Option<Event> {
        if candidate.len() < self.rules.min_duration {
            trace!(
                "dropping {:?}: {} samples < {}",
                candidate,
                candidate.len(),
                self.rules.min_duration
            );
            return None;
        }
        if let Some(previous) = &self.last_accepted {
            if candidate.gap_after(previous) < self.rules.min_separation {
                trace!(
                    "dropping {:?}: {} samples after {:?} < {}",
                    candidate,
                    candidate.gap_after(previous),
                    previous,
                    self.rules.min_separation
                );
                return None;
            }
        }
        trace!("accepted {:?}", candidate);
        self.last_accepted = Some(candidate);
        Some(candidate)
    }

    /// End the series. An open candidate is discarded; its start index is returned.
    pub fn finish(&mut self) -> Option<usize> {
        match std::mem::replace(&mut self.state, TriggerState::Idle) {
            TriggerState::Active { start } => {
                trace!("discarding open candidate starting at {}", start);
                Some(start)
            }
            TriggerState::Idle => None,
        }
    }
}

/// Extract events with the canonical 0.05 s duration and 0.5 s separation rules.
pub fn detect_events(ratio: &[f64], threshold: f64, fs: f64) -> Result<Vec<Event>, StaLtaError> {
    let rules = EventRules::canonical(fs)?;
    Ok(detect_events_with_rules(ratio, threshold, rules))
}

pub fn detect_events_with_rules(ratio: &[f64], threshold: f64, rules: EventRules) -> Vec<Event> {
    let mut extractor = EventExtractor::new(threshold, rules);
    let mut events = Vec::new();
    for &value in ratio {
        if let Some(event) = extractor.push(value) {
            events.push(event);
        }
    }
    extractor.finish();
    events
}

/// Every artifact of one STA/LTA pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaLtaResult {
    pub fs: f64,
    pub sample_count: usize,
    pub threshold: f64,
    pub sta_window: WindowSpec,
    pub lta_window: WindowSpec,
    pub rules: EventRules,
    pub sta: Vec<f64>,
    pub lta: Vec<f64>,
    pub ratio: Vec<f64>,
    pub events: Vec<Event>,
}

/// Per-event report on the raw signal's time axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    /// 1-based position in the event list.
    pub number: usize,
    pub start: usize,
    pub end: usize,
    pub signal_start: usize,
    pub signal_end: usize,
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
    pub peak_ratio: f64,
}

impl StaLtaResult {
    /// Offset between ratio indices and raw signal indices.
    pub fn signal_offset(&self) -> usize {
        self.lta_window.len()
    }

    pub fn summaries(&self) -> Vec<EventSummary> {
        let offset = self.signal_offset();
        self.events
            .iter()
            .enumerate()
            .map(|(i, event)| {
                let on_signal = event.shifted(offset);
                let start_s = on_signal.start as f64 / self.fs;
                let end_s = on_signal.end as f64 / self.fs;
                let peak_ratio = self.ratio[event.start..event.end]
                    .iter()
                    .copied()
                    .fold(f64::MIN, f64::max);
                EventSummary {
                    number: i + 1,
                    start: event.start,
                    end: event.end,
                    signal_start: on_signal.start,
                    signal_end: on_signal.end,
                    start_s,
                    end_s,
                    duration_s: end_s - start_s,
                    peak_ratio,
                }
            })
            .collect()
    }
}

/// Run STA, LTA, ratio and event extraction over one channel.
pub fn staltatrigger(ts: &TimeSeries, cfg: &StaLtaConfig) -> Result<StaLtaResult, StaLtaError> {
    ts.validate()?;
    cfg.validate(ts.fs)?;
    let sta_window = cfg.sta_window(ts.fs)?;
    let lta_window = cfg.lta_window(ts.fs)?;
    let rules = cfg.event_rules(ts.fs)?;
    debug!(
        "sta={} lta={} samples, min duration={} separation={} samples, n={}",
        sta_window.len(),
        lta_window.len(),
        rules.min_duration,
        rules.min_separation,
        ts.len()
    );
    if lta_window.len() >= ts.len() {
        warn!(
            "LTA window ({} samples) covers the whole signal ({} samples); no events possible",
            lta_window.len(),
            ts.len()
        );
    }

    let sta = windowed_average(&ts.data, sta_window.samples);
    let lta = windowed_average(&ts.data, lta_window.samples);
    let ratio = compute_ratio(&sta, &lta);
    let events = detect_events_with_rules(&ratio, cfg.threshold, rules);
    debug!("ratio length {}, {} event(s)", ratio.len(), events.len());

    Ok(StaLtaResult {
        fs: ts.fs,
        sample_count: ts.len(),
        threshold: cfg.threshold,
        sta_window,
        lta_window,
        rules,
        sta,
        lta,
        ratio,
        events,
    })
}
