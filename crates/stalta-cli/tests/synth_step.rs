use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;

fn synth(args: &[&str]) -> Vec<u8> {
    let mut cmd = cargo_bin_cmd!("stalta");
    cmd.arg("synth-step").args(args);
    cmd.assert().success().get_output().stdout.clone()
}

#[test]
fn prints_header_and_samples() {
    let out = synth(&["--fs", "50", "--duration-s", "2", "--noise-std", "0"]);
    let text = String::from_utf8(out).expect("utf8");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("# fs = 50"));
    let samples: Vec<f64> = lines.map(|l| l.parse().expect("f64")).collect();
    assert_eq!(samples.len(), 100);
    assert!(samples.iter().all(|v| *v == 1.0));
}

#[test]
fn same_seed_is_reproducible() {
    let args = ["--noise-std", "0.01", "--seed", "11"];
    assert_eq!(synth(&args), synth(&args));
}

#[test]
fn step_pipes_into_detect() -> Result<(), Box<dyn Error>> {
    let signal = synth(&[
        "--step-at-s",
        "5",
        "--step-end-s",
        "5.3",
        "--low",
        "0",
        "--high",
        "1",
        "--noise-std",
        "0.001",
        "--seed",
        "3",
    ]);
    let mut cmd = cargo_bin_cmd!("stalta");
    cmd.args(["detect", "--threshold", "3"]).write_stdin(signal);
    let output = cmd.assert().success().get_output().stdout.clone();
    let value: Value = serde_json::from_slice(&output)?;
    let events = value["events"].as_array().expect("events array");
    assert_eq!(events.len(), 1, "{value}");
    let start = events[0]["start"].as_u64().expect("start") as usize;
    assert!((495..=506).contains(&start), "event starts at {start}");
    Ok(())
}

#[test]
fn rejects_bad_sampling_rate() {
    let mut cmd = cargo_bin_cmd!("stalta");
    cmd.args(["synth-step", "--fs", "0"]);
    cmd.assert().failure();
}
