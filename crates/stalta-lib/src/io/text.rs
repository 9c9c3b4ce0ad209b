use anyhow::{Context, Result};
use std::path::Path;

/// Samples read from a newline-delimited text file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleText {
    /// Sampling rate declared by a `# fs = <hz>` comment, if any.
    pub fs: Option<f64>,
    pub data: Vec<f64>,
}

fn fs_directive(comment: &str) -> Option<&str> {
    let (key, value) = comment.split_once(['=', ':'])?;
    key.trim().eq_ignore_ascii_case("fs").then(|| value.trim())
}

/// Parse newline-delimited floating point samples.
///
/// Blank lines and `#` comments are skipped, except `# fs = <hz>` which sets
/// the sampling rate. A file with no samples is valid and yields an empty series.
pub fn parse_samples(text: &str) -> Result<SampleText> {
    let mut out = SampleText::default();
    for (idx, line) in text.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            if let Some(value) = fs_directive(comment) {
                let fs: f64 = value
                    .parse()
                    .with_context(|| format!("line {} has a bad fs directive: {}", idx + 1, value))?;
                out.fs = Some(fs);
            }
            continue;
        }
        let val: f64 = trimmed
            .parse()
            .with_context(|| format!("line {} is not f64: {}", idx + 1, trimmed))?;
        if !val.is_finite() {
            anyhow::bail!("line {} is not a finite sample: {}", idx + 1, trimmed);
        }
        out.data.push(val);
    }
    Ok(out)
}

/// Read newline-delimited samples from disk.
pub fn read_samples(path: &Path) -> Result<SampleText> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_samples(&text).with_context(|| format!("in {}", path.display()))
}

/// Render samples in the format [`parse_samples`] reads, with an fs header.
pub fn format_samples(fs: f64, data: &[f64]) -> String {
    let mut out = format!("# fs = {}\n", fs);
    for value in data {
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_comments_and_blank_lines() {
        let parsed = parse_samples("# recorded on site 4\n\n1.5\n -2 \n# note\n3e-3\n").unwrap();
        assert_eq!(parsed.fs, None);
        assert_eq!(parsed.data, vec![1.5, -2.0, 3e-3]);
    }

    #[test]
    fn reads_fs_directive() {
        let parsed = parse_samples("# fs = 200\n0.1\n# FS: 250.5\n0.2\n").unwrap();
        assert_eq!(parsed.fs, Some(250.5));
        assert_eq!(parsed.data.len(), 2);
        assert!(parse_samples("# fs = fast\n1\n").is_err());
    }

    #[test]
    fn empty_input_is_an_empty_series() {
        let parsed = parse_samples("# fs = 100\n").unwrap();
        assert_eq!(parsed.fs, Some(100.0));
        assert!(parsed.data.is_empty());
        assert!(parse_samples("").unwrap().data.is_empty());
    }

    #[test]
    fn reports_offending_line() {
        let err = parse_samples("1.0\n2.0\nabc\n").unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(parse_samples("1.0\nNaN\n").is_err());
    }

    #[test]
    fn formatted_samples_parse_back() {
        let text = format_samples(100.0, &[0.25, -1.0, 1e-6]);
        let parsed = parse_samples(&text).unwrap();
        assert_eq!(parsed.fs, Some(100.0));
        assert_eq!(parsed.data, vec![0.25, -1.0, 1e-6]);
    }

    #[test]
    fn reads_fixture() {
        let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join("test_data/burst.txt");
        let parsed = read_samples(&root).expect("fixture");
        assert_eq!(parsed.fs, Some(100.0));
        assert_eq!(parsed.data.len(), 1000);
    }
}
