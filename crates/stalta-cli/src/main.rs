use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use stalta_lib::{
    config::read_config,
    detectors::stalta::{staltatrigger, EventRules, EventSummary, StaLtaConfig},
    io::{csv as csv_io, text as text_io},
    signal::{Event, TimeSeries},
    synth::StepSignal,
};
use std::{
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "stalta",
    version,
    about = "STA/LTA event detection for single-channel recordings"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect STA/LTA events in newline-delimited samples (stdin or --input) or a CSV column
    Detect {
        /// Sampling rate in Hz; overrides a `# fs = ...` line in the input
        #[arg(long)]
        fs: Option<f64>,
        #[arg(long, conflicts_with = "csv")]
        input: Option<PathBuf>,
        #[arg(long)]
        csv: Option<PathBuf>,
        #[arg(long, default_value = "amplitude")]
        column: String,
        #[arg(long, default_value_t = ',')]
        delimiter: char,
        /// TOML file with detector parameters; flags below override it
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        sta_window_s: Option<f64>,
        #[arg(long)]
        lta_window_s: Option<f64>,
        #[arg(long)]
        threshold: Option<f64>,
        #[arg(long)]
        min_event_duration_s: Option<f64>,
        #[arg(long)]
        min_event_separation_s: Option<f64>,
        /// Include the STA, LTA and ratio series in the output
        #[arg(long)]
        series: bool,
        /// Also write the event table as CSV
        #[arg(long)]
        events_csv: Option<PathBuf>,
    },
    /// Print a synthetic step signal in the format `detect` reads
    SynthStep {
        #[arg(long, default_value_t = 100.0)]
        fs: f64,
        #[arg(long, default_value_t = 10.0)]
        duration_s: f64,
        #[arg(long, default_value_t = 5.0)]
        step_at_s: f64,
        #[arg(long)]
        step_end_s: Option<f64>,
        #[arg(long, default_value_t = 1.0)]
        low: f64,
        #[arg(long, default_value_t = 2.0)]
        high: f64,
        #[arg(long, default_value_t = 1e-6)]
        noise_std: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

/// Detector overrides collected from the command line.
struct ConfigOverrides {
    sta_window_s: Option<f64>,
    lta_window_s: Option<f64>,
    threshold: Option<f64>,
    min_event_duration_s: Option<f64>,
    min_event_separation_s: Option<f64>,
}

impl ConfigOverrides {
    fn apply(&self, cfg: &mut StaLtaConfig) {
        if let Some(v) = self.sta_window_s {
            cfg.sta_window_s = v;
        }
        if let Some(v) = self.lta_window_s {
            cfg.lta_window_s = v;
        }
        if let Some(v) = self.threshold {
            cfg.threshold = v;
        }
        if let Some(v) = self.min_event_duration_s {
            cfg.min_event_duration_s = v;
        }
        if let Some(v) = self.min_event_separation_s {
            cfg.min_event_separation_s = v;
        }
    }
}

enum SampleSource<'a> {
    Text(Option<&'a Path>),
    Csv {
        path: &'a Path,
        column: &'a str,
        delimiter: u8,
    },
}

#[derive(Serialize)]
struct DetectOutput<'a> {
    fs: f64,
    sample_count: usize,
    threshold: f64,
    sta_window_samples: usize,
    lta_window_samples: usize,
    signal_offset: usize,
    rules: EventRules,
    events: &'a [Event],
    summaries: &'a [EventSummary],
    #[serde(skip_serializing_if = "Option::is_none")]
    sta: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lta: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ratio: Option<&'a [f64]>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Detect {
            fs,
            input,
            csv,
            column,
            delimiter,
            config,
            sta_window_s,
            lta_window_s,
            threshold,
            min_event_duration_s,
            min_event_separation_s,
            series,
            events_csv,
        } => {
            let source = match csv.as_deref() {
                Some(path) => SampleSource::Csv {
                    path,
                    column: &column,
                    delimiter: delimiter_byte(delimiter)?,
                },
                None => SampleSource::Text(input.as_deref()),
            };
            let overrides = ConfigOverrides {
                sta_window_s,
                lta_window_s,
                threshold,
                min_event_duration_s,
                min_event_separation_s,
            };
            cmd_detect(
                fs,
                source,
                config.as_deref(),
                &overrides,
                series,
                events_csv.as_deref(),
            )?
        }
        Commands::SynthStep {
            fs,
            duration_s,
            step_at_s,
            step_end_s,
            low,
            high,
            noise_std,
            seed,
        } => cmd_synth_step(StepSignal {
            fs,
            duration_s,
            step_at_s,
            step_end_s,
            low,
            high,
            noise_std,
            seed,
        })?,
    }
    Ok(())
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| anyhow!("delimiter must be a single ASCII character, got {:?}", delimiter))
}

fn load_time_series(fs: Option<f64>, source: SampleSource<'_>) -> Result<TimeSeries> {
    let (declared_fs, data) = match source {
        SampleSource::Csv {
            path,
            column,
            delimiter,
        } => (None, csv_io::read_column(path, column, delimiter)?),
        SampleSource::Text(Some(path)) => {
            let parsed = text_io::read_samples(path)?;
            (parsed.fs, parsed.data)
        }
        SampleSource::Text(None) => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading samples from stdin")?;
            let parsed = text_io::parse_samples(&buf)?;
            (parsed.fs, parsed.data)
        }
    };
    let fs = fs
        .or(declared_fs)
        .ok_or_else(|| anyhow!("no sampling rate: pass --fs or add a `# fs = <hz>` line"))?;
    Ok(TimeSeries::new(fs, data)?)
}

fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<StaLtaConfig> {
    let mut cfg = match path {
        Some(path) => read_config(path)?,
        None => StaLtaConfig::default(),
    };
    overrides.apply(&mut cfg);
    Ok(cfg)
}

fn cmd_detect(
    fs: Option<f64>,
    source: SampleSource<'_>,
    config: Option<&Path>,
    overrides: &ConfigOverrides,
    series: bool,
    events_csv: Option<&Path>,
) -> Result<()> {
    let ts = load_time_series(fs, source)?;
    let cfg = load_config(config, overrides)?;
    info!(
        "{} samples at {} Hz ({:.2} s), config {:?}",
        ts.len(),
        ts.fs,
        ts.duration(),
        cfg
    );
    let result = staltatrigger(&ts, &cfg)?;
    let summaries = result.summaries();
    info!("detected {} event(s)", summaries.len());

    if let Some(path) = events_csv {
        csv_io::write_summaries_to_path(path, &summaries)?;
    }

    let output = DetectOutput {
        fs: result.fs,
        sample_count: result.sample_count,
        threshold: result.threshold,
        sta_window_samples: result.sta_window.len(),
        lta_window_samples: result.lta_window.len(),
        signal_offset: result.signal_offset(),
        rules: result.rules,
        events: &result.events,
        summaries: &summaries,
        sta: series.then_some(result.sta.as_slice()),
        lta: series.then_some(result.lta.as_slice()),
        ratio: series.then_some(result.ratio.as_slice()),
    };
    let js = serde_json::to_string(&output)?;
    println!("{}", js);
    Ok(())
}

fn cmd_synth_step(step: StepSignal) -> Result<()> {
    let ts = step.generate()?;
    let text = text_io::format_samples(ts.fs, &ts.data);
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle.write_all(text.as_bytes())?;
    handle.flush()?;
    Ok(())
}
