use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use testweave_eval::ContextualComplianceReport;

use crate::atomic::{write_bytes_atomic, write_json_atomic};
use crate::settings::Settings;

use super::RegistryResult;

pub const COMPLIANCE_FILE: &str = "compliance.json";
pub const REPORT_FILE: &str = "report.md";

/// Input files a validation run was started with.
#[derive(Debug, Clone, Serialize)]
pub struct RunInputs {
    pub records: PathBuf,
    pub context: Option<PathBuf>,
    pub rules: Option<PathBuf>,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub command: String,
    pub strict: bool,
    pub run_dir: PathBuf,
    pub out: Option<PathBuf>,
    pub inputs: RunInputs,
    pub settings: Settings,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub command: String,
    pub strict: bool,
    pub inputs: RunInputs,
    pub settings: Settings,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub compliance_path: PathBuf,
    pub report_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__<run_id>/` with `config.json` and an empty
/// `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__{}", ctx.run_id));
    create_dir_all(&root)?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        compliance_path: root.join(COMPLIANCE_FILE),
        report_path: root.join(REPORT_FILE),
        root,
    };

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        command: ctx.command.clone(),
        strict: ctx.strict,
        inputs: ctx.inputs.clone(),
        settings: ctx.settings.clone(),
        git: collect_git_info(),
    };
    write_json_atomic(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

/// Write `compliance.json` and `report.md` into the run directory and, when
/// given, into `out_dir` as well.
pub fn write_validation(
    paths: &RunPaths,
    report: &ContextualComplianceReport,
    markdown: &str,
    out_dir: Option<&Path>,
) -> RegistryResult<()> {
    write_json_atomic(&paths.compliance_path, report)?;
    write_bytes_atomic(&paths.report_path, markdown.as_bytes())?;

    if let Some(out_dir) = out_dir {
        write_json_atomic(&out_dir.join(COMPLIANCE_FILE), report)?;
        write_bytes_atomic(&out_dir.join(REPORT_FILE), markdown.as_bytes())?;
    }

    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

#[cfg(test)]
mod tests {
    use testweave_core::new_id;
    use testweave_eval::{ComplianceValidator, ValidationContext, render_report};

    use super::*;

    #[test]
    fn run_directory_holds_config_logs_and_reports() {
        let base = std::env::temp_dir().join(new_id("testweave_runs"));
        let ctx = RunContext {
            run_id: new_id("run"),
            started_at: Utc::now(),
            command: "validate".to_string(),
            strict: false,
            run_dir: base.join("runs"),
            out: None,
            inputs: RunInputs {
                records: PathBuf::from("records.json"),
                context: None,
                rules: None,
            },
            settings: Settings::default(),
        };

        let paths = start_run(&ctx).expect("start run");
        assert!(paths.config_path.exists());
        assert!(paths.logs_path.exists());
        let dir_name = paths
            .root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        assert!(dir_name.ends_with(&format!("__{}", ctx.run_id)));

        let config: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&paths.config_path).expect("read"))
                .expect("config json");
        assert_eq!(config["command"], "validate");
        assert_eq!(config["settings"]["cache"]["max_size"], 1000);

        let report = ComplianceValidator::default()
            .validate_contextual_compliance(&[], &ValidationContext::default());
        let markdown = render_report(&report, 5);
        let out = base.join("out");
        write_validation(&paths, &report, &markdown, Some(&out)).expect("write");

        assert!(paths.compliance_path.exists());
        assert_eq!(
            std::fs::read_to_string(out.join(REPORT_FILE)).expect("report"),
            markdown
        );

        std::fs::remove_dir_all(&base).ok();
    }
}
