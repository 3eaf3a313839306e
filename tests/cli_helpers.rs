#![allow(dead_code)]

use anyhow::{bail, Result};
use assert_cmd::cargo;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn db_path_for_home(home: &TempDir) -> PathBuf {
    home.path().join(".patrimoine").join("data.db")
}

pub fn base_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("patrimoine"));
    cmd.env("HOME", home.path());
    cmd.env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd.env_remove("PATRIMOINE_DB");
    cmd.env_remove("PATRIMOINE_API_URL");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--no-color");
    cmd
}

pub fn run_cmd(home: &TempDir, args: &[&str]) -> Result<Output> {
    let mut cmd = base_cmd(home);
    cmd.args(args);
    let output = cmd.output()?;
    if !output.status.success() {
        bail!(
            "command failed: {:?}\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

pub fn run_cmd_json(home: &TempDir, args: &[&str]) -> Result<Value> {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run_cmd(home, &full)?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(serde_json::from_str(&stdout)?)
}

pub fn add_possession(
    home: &TempDir,
    label: &str,
    value: &str,
    start: &str,
    end: Option<&str>,
    rate: &str,
) -> Result<Value> {
    let mut args = vec!["possessions", "add", label, value, start, "--rate", rate];
    if let Some(end) = end {
        args.push("--end");
        args.push(end);
    }
    run_cmd_json(home, &args)
}

pub fn value_at_json(home: &TempDir, date: &str) -> Result<Value> {
    run_cmd_json(home, &["value", "at", date])
}

pub fn list_json(home: &TempDir) -> Result<Vec<Value>> {
    let value = run_cmd_json(home, &["possessions", "list"])?;
    Ok(value.as_array().cloned().unwrap_or_default())
}
