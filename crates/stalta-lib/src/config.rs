use crate::detectors::stalta::StaLtaConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse detector parameters from TOML. Missing keys keep their defaults.
pub fn parse_config(text: &str) -> Result<StaLtaConfig> {
    let cfg: StaLtaConfig = toml::from_str(text).context("parsing detector config")?;
    Ok(cfg)
}

pub fn read_config(path: &Path) -> Result<StaLtaConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg = parse_config("threshold = 3.5\nlta_window_s = 2.0\n").expect("parse");
        assert_eq!(cfg.threshold, 3.5);
        assert_eq!(cfg.lta_window_s, 2.0);
        let defaults = StaLtaConfig::default();
        assert_eq!(cfg.sta_window_s, defaults.sta_window_s);
        assert_eq!(cfg.min_event_separation_s, defaults.min_event_separation_s);
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(parse_config("").expect("parse"), StaLtaConfig::default());
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(parse_config("threshold = \"high\"").is_err());
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "sta_window_s = 0.1").expect("write");
        let cfg = read_config(file.path()).expect("read");
        assert_eq!(cfg.sta_window_s, 0.1);
        assert!(read_config(Path::new("/nonexistent/stalta.toml")).is_err());
    }
}
