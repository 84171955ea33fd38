//! Train the iris classifier, log its evaluation and register the model.

use std::path::PathBuf;

use irisflow::app_dirs;
use irisflow::config::{self, DEFAULT_PARAM_FILE, TrainConfig, TrainOverrides};
use irisflow::logging;
use irisflow::tracking::{FileModelRegistry, LocalArtifactStore, RunContext};
use irisflow::workflow::{self, DatasetSource};

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    if let Err(err) = logging::init("irisflow-train") {
        eprintln!("Logging disabled: {err}");
    }

    let base = match &options.param_file {
        Some(path) => config::load_param_file(path).map_err(|err| err.to_string())?,
        None => TrainConfig::default(),
    };
    let config = options.overrides.apply(base);

    let output_dir = app_dirs::outputs_dir().map_err(|err| err.to_string())?;
    let registry_dir = app_dirs::registry_dir().map_err(|err| err.to_string())?;
    let store = LocalArtifactStore::new(&output_dir);
    let registry = FileModelRegistry::in_dir(&registry_dir);
    let mut ctx = RunContext::new(&output_dir);
    tracing::info!(run_id = ctx.run_id(), ?config, "starting training run");

    let report =
        workflow::train_and_register(&config, &options.dataset, &mut ctx, &store, &registry)
            .map_err(|err| err.to_string())?;

    print!("{}", report.confusion_summary());
    println!("accuracy: {:.4}", report.evaluation.accuracy);
    println!("precision: {:.4}", report.evaluation.precision);
    println!("recall: {:.4}", report.evaluation.recall);
    println!("f1-score: {:.4}", report.evaluation.f1);
    println!("model: {}", report.artifact.path.display());
    println!(
        "registered {} version {}",
        report.registered.name, report.registered.version
    );
    Ok(())
}

#[derive(Debug)]
struct CliOptions {
    param_file: Option<PathBuf>,
    overrides: TrainOverrides,
    dataset: DatasetSource,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut param_file = None;
    let mut overrides = TrainOverrides::default();
    let mut dataset = DatasetSource::Bundled;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--kernel" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--kernel requires a value".to_string())?;
                overrides.kernel = Some(value.clone());
            }
            "--penalty" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--penalty requires a value".to_string())?;
                let penalty = value
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid --penalty value: {value}"))?;
                overrides.penalty = Some(penalty);
            }
            "--model_name" | "--model-name" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model_name requires a value".to_string())?;
                overrides.model_name = Some(value.clone());
            }
            "--param-file" => match args.get(idx + 1) {
                Some(value) if !value.starts_with("--") => {
                    idx += 1;
                    param_file = Some(PathBuf::from(value));
                }
                _ => param_file = Some(PathBuf::from(DEFAULT_PARAM_FILE)),
            },
            "--dataset" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--dataset requires a value".to_string())?;
                dataset = DatasetSource::Csv(PathBuf::from(value));
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions {
        param_file,
        overrides,
        dataset,
    })
}

fn help_text() -> String {
    [
        "irisflow-train",
        "",
        "Trains a support-vector classifier on the iris dataset, logs its evaluation",
        "and registers the fitted model.",
        "",
        "Usage:",
        "  irisflow-train [--kernel rbf] [--penalty 1.0] [--model_name iris_model]",
        "  irisflow-train --param-file [dev_params.json] [overrides]",
        "",
        "Options:",
        "  --kernel <name>        linear, poly or rbf (default: rbf).",
        "  --penalty <f64>        Regularization strength C, > 0 (default: 1.0).",
        "  --model_name <name>    Registered model name (default: iris_model).",
        "  --param-file [path]    JSON or TOML parameter file; relative names are also",
        "                         looked up under config/ (default: dev_params.json).",
        "                         Flags given alongside override file values.",
        "  --dataset <csv>        Dataset CSV instead of the bundled copy.",
        "",
        "Environment:",
        "  IRISFLOW_OUTPUT_DIR    Output root (default: outputs).",
        "  IRISFLOW_REGISTRY_DIR  Registry root (default: registry).",
        "  RUST_LOG               Log filter (default: info).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn defaults_without_flags() {
        let options = parse_args(Vec::new()).unwrap();
        assert!(options.param_file.is_none());
        assert_eq!(options.overrides.apply(TrainConfig::default()), TrainConfig::default());
        assert_eq!(options.dataset, DatasetSource::Bundled);
    }

    #[test]
    fn bare_param_file_uses_default_name() {
        let options = parse_args(args(&["--param-file", "--penalty", "2"])).unwrap();
        assert_eq!(options.param_file, Some(PathBuf::from(DEFAULT_PARAM_FILE)));
        assert_eq!(options.overrides.penalty, Some(2.0));
    }

    #[test]
    fn rejects_bad_penalty_and_unknown_flags() {
        assert!(parse_args(args(&["--penalty", "abc"])).is_err());
        assert!(parse_args(args(&["--gamma", "1"])).is_err());
    }
}
