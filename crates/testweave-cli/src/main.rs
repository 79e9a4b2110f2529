mod atomic;
mod registry;
mod scenario;
mod settings;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use thiserror::Error;

use testweave_context::ContextStore;
use testweave_core::new_id;
use testweave_eval::{
    ComplianceValidator, EvalError, ValidationContext, read_context, read_records, render_report,
};
use testweave_generate::{GenerationOrchestrator, SampleDataGenerator};
use testweave_rules::{RuleSet, ValidationReport, load_rule_set, rule_set_json_schema};

use registry::{RunContext, RunInputs, init_logging, start_run, write_validation};
use scenario::{ScenarioError, read_scenario, run_scenario};
use settings::{DEFAULT_SETTINGS_FILE, Settings, SettingsError, load_settings, write_default_settings};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("validation input error: {0}")]
    Eval(#[from] EvalError),
    #[error("scenario error: {0}")]
    Scenario(#[from] ScenarioError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rule document: {0}")]
    InvalidRules(String),
    #[error("records are not compliant: score {score:.2} below threshold {threshold:.2}")]
    NotCompliant { score: f64, threshold: f64 },
}

#[derive(Parser, Debug)]
#[command(name = "testweave", version, about = "Testweave CLI")]
struct Cli {
    /// Settings file; defaults apply when it does not exist.
    #[arg(long, global = true, default_value = DEFAULT_SETTINGS_FILE)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Validate generated records against BPMN, API and business rules.
    Validate(ValidateArgs),
    /// Build, generate and resolve a context from a scenario file.
    Resolve(ResolveArgs),
    /// Print JSON Schemas.
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// Write the default settings file.
    InitConfig(InitConfigArgs),
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// JSON array of records, or an object holding `records`.
    #[arg(long)]
    records: PathBuf,
    /// Validation context (bpmnContext/diagramId, apiContext/specId, businessRules, dataFlowGraph).
    #[arg(long)]
    context: Option<PathBuf>,
    /// Rule document merged into the context.
    #[arg(long)]
    rules: Option<PathBuf>,
    /// Extra directory receiving compliance.json and report.md.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output directory for runs; overrides the settings file.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Fail when the records are not compliant.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    #[arg(long)]
    scenario: PathBuf,
}

#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Rule-set document schema.
    Rules,
}

#[derive(Args, Debug)]
struct InitConfigArgs {
    /// Overwrite an existing settings file.
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Validate(args) => {
            let settings = load_settings(&cli.config)?;
            run_validate(args, settings)
        }
        Command::Resolve(args) => {
            let settings = load_settings(&cli.config)?;
            run_resolve(args, settings).await
        }
        Command::Schema(SchemaCommand::Rules) => {
            println!("{}", serde_json::to_string_pretty(&rule_set_json_schema())?);
            Ok(())
        }
        Command::InitConfig(args) => {
            write_default_settings(&cli.config, args.force)?;
            println!("wrote {}", cli.config.display());
            Ok(())
        }
    }
}

fn run_validate(args: ValidateArgs, settings: Settings) -> Result<(), CliError> {
    let ValidateArgs {
        records,
        context,
        rules,
        out,
        run_dir,
        strict,
    } = args;

    let run_ctx = RunContext {
        run_id: new_id("run"),
        started_at: chrono::Utc::now(),
        command: "validate".to_string(),
        strict,
        run_dir: run_dir.unwrap_or_else(|| settings.logging.run_dir.clone()),
        out,
        inputs: RunInputs {
            records: records.clone(),
            context: context.clone(),
            rules: rules.clone(),
        },
        settings: settings.clone(),
    };

    let run_paths = start_run(&run_ctx)?;
    let json_log = settings.logging.json_log.then_some(run_paths.logs_path.as_path());
    init_logging(&settings.logging.filter, json_log)?;

    tracing::info!(
        event = "run_started",
        run_id = %run_ctx.run_id,
        run_dir = %run_paths.root.display()
    );
    let timer = Instant::now();

    let data = read_records(&records)?;
    let mut validation_context = match &context {
        Some(path) => read_context(path)?,
        None => ValidationContext::default(),
    };
    if let Some(path) = &rules {
        let rule_set = read_rule_set(path)?;
        validation_context = merge_rule_set(validation_context, rule_set);
    }
    tracing::info!(event = "inputs_loaded", records = data.len());

    let validator = ComplianceValidator::new(settings.pipeline_options());
    let report = validator.validate_contextual_compliance(&data, &validation_context);
    let markdown = render_report(&report, settings.validation.max_examples);

    write_validation(&run_paths, &report, &markdown, run_ctx.out.as_deref())?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    println!(
        "overall compliance {:.2} ({})",
        report.overall_compliance_score,
        if report.is_compliant { "compliant" } else { "not compliant" }
    );

    let duration_ms = timer.elapsed().as_millis();
    tracing::info!(
        event = "run_finished",
        compliant = report.is_compliant,
        duration_ms = duration_ms
    );

    if strict && !report.is_compliant {
        return Err(CliError::NotCompliant {
            score: report.overall_compliance_score,
            threshold: settings.validation.compliance_threshold,
        });
    }
    Ok(())
}

async fn run_resolve(args: ResolveArgs, settings: Settings) -> Result<(), CliError> {
    init_logging(&settings.logging.filter, None)?;

    let scenario = read_scenario(&args.scenario)?;
    let store = ContextStore::new();
    let orchestrator = GenerationOrchestrator::new(
        Arc::new(SampleDataGenerator::default()),
        settings.orchestrator_config(),
    );

    let outcome = run_scenario(&scenario, &store, &orchestrator).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

fn read_rule_set(path: &Path) -> Result<RuleSet, CliError> {
    let raw = std::fs::read_to_string(path)?;
    let rules_json: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = serde_json::to_value(rule_set_json_schema())?;

    let validated = load_rule_set(&rules_json, &schema)
        .map_err(|report| CliError::InvalidRules(describe_issues(&report)))?;
    for warning in &validated.warnings {
        tracing::warn!(code = %warning.code, path = %warning.path, "{}", warning.message);
    }
    Ok(validated.rule_set)
}

fn describe_issues(report: &ValidationReport) -> String {
    report
        .errors
        .iter()
        .map(|issue| format!("{} at {}: {}", issue.code, issue.path, issue.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Append rule-document rules to the matching context sections, enabling a
/// section under the `default` source id when the context lacks it.
fn merge_rule_set(mut context: ValidationContext, rule_set: RuleSet) -> ValidationContext {
    let RuleSet {
        bpmn_rules,
        api_rules,
        business_rules,
        ..
    } = rule_set;

    if !bpmn_rules.is_empty() {
        match context.bpmn.as_mut() {
            Some(bpmn) => bpmn.rules.extend(bpmn_rules),
            None => context = context.with_bpmn("default", bpmn_rules),
        }
    }
    if !api_rules.is_empty() {
        match context.api.as_mut() {
            Some(api) => api.rules.extend(api_rules),
            None => context = context.with_api("default", api_rules),
        }
    }
    if !business_rules.is_empty() {
        match context.business_rules.as_mut() {
            Some(rules) => rules.extend(business_rules),
            None => context = context.with_business_rules(business_rules),
        }
    }
    context
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use testweave_rules::{RuleType, ValidationRule};

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn validate_arguments_parse() {
        let cli = Cli::parse_from([
            "testweave",
            "validate",
            "--records",
            "records.json",
            "--context",
            "ctx.json",
            "--strict",
        ]);
        let Command::Validate(args) = cli.command else {
            panic!("expected validate");
        };
        assert_eq!(args.records, PathBuf::from("records.json"));
        assert_eq!(args.context, Some(PathBuf::from("ctx.json")));
        assert!(args.strict);
        assert_eq!(cli.config, PathBuf::from(DEFAULT_SETTINGS_FILE));
    }

    #[test]
    fn rule_documents_extend_existing_sections() {
        let context = ValidationContext::default()
            .with_bpmn("orders", vec![ValidationRule::new("status", RuleType::Required, "", "")]);
        let rule_set = RuleSet {
            bpmn_rules: vec![ValidationRule::new("channel", RuleType::Enum, "WEB", "")],
            business_rules: vec![ValidationRule::new(
                "positive",
                RuleType::Conditional,
                "total > 0",
                "",
            )],
            ..RuleSet::default()
        };

        let merged = merge_rule_set(context, rule_set);
        let bpmn = merged.bpmn.as_ref().expect("bpmn");
        assert_eq!(bpmn.source_id, "orders");
        assert_eq!(bpmn.rules.len(), 2);
        assert!(merged.api.is_none());
        assert_eq!(merged.business_rules.as_ref().map(Vec::len), Some(1));
    }
}
