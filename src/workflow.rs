//! End-to-end training run: fit, evaluate, render, persist and register.
//!
//! Everything observable goes through the explicit [`RunContext`] and the
//! [`ArtifactStore`]/[`ModelRegistry`] seams, so tests can drive the whole run
//! against in-memory doubles.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::TrainConfig;
use crate::dataset::{
    self, CLASS_LABELS, Dataset, DatasetError, SPLIT_SEED, TEST_FRACTION, train_test_split,
};
use crate::ml::metrics::{EvaluationReport, evaluate};
use crate::ml::svc::{KernelKind, SvcModel, TrainError, TrainOptions, train_svc};
use crate::plot::{CellFormat, ConfusionPlot, RenderError};
use crate::tracking::{
    ArtifactError, ArtifactStore, ModelRegistration, ModelRegistry, RegisteredModel,
    RegistryError, RunContext, RunContextError, StoredArtifact,
};

/// Registered model description.
pub const MODEL_DESCRIPTION: &str = "A classification model for iris dataset";
/// Library that fits the registered machines.
pub const FRAMEWORK: &str = "linfa-svm";
/// Must track the `linfa-svm` pin in Cargo.toml.
pub const FRAMEWORK_VERSION: &str = "0.8.0";
/// Artifact name of the serialized model (versioned JSON).
pub const MODEL_ARTIFACT_NAME: &str = "model.pkl";
/// Name under which the confusion matrix record is logged.
pub const CONFUSION_MATRIX_NAME: &str = "confusion_matrix";
pub const UNNORMALIZED_IMAGE_NAME: &str = "confusion_matrix_unnormalized";
pub const NORMALIZED_IMAGE_NAME: &str = "confusion_matrix_normalized";

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Train(#[from] TrainError),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    RunContext(#[from] RunContextError),
    #[error("Failed to serialize model: {0}")]
    SerializeModel(serde_json::Error),
    #[error("Failed to create output directory {path}: {source}")]
    CreateOutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where the training samples come from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DatasetSource {
    /// The copy compiled into the binary.
    #[default]
    Bundled,
    Csv(PathBuf),
}

impl DatasetSource {
    pub fn load(&self) -> Result<Dataset, DatasetError> {
        match self {
            Self::Bundled => dataset::load_bundled(),
            Self::Csv(path) => dataset::load_csv(path),
        }
    }
}

/// Outcome of a completed training run.
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub model: SvcModel,
    pub evaluation: EvaluationReport,
    pub artifact: StoredArtifact,
    pub registered: RegisteredModel,
    pub images: Vec<PathBuf>,
}

impl TrainReport {
    /// Plain-text rendering of the raw and normalized confusion matrices.
    pub fn confusion_summary(&self) -> String {
        let confusion = &self.evaluation.confusion;
        let width = CLASS_LABELS.iter().map(|label| label.len()).max().unwrap_or(0);
        let mut out = String::new();
        let _ = writeln!(out, "Confusion matrix, without normalization");
        for (label, row) in CLASS_LABELS.iter().zip(confusion.rows()) {
            let cells: Vec<String> = row.iter().map(|count| format!("{count:>4}")).collect();
            let _ = writeln!(out, "{label:<width$} {}", cells.join(""));
        }
        let _ = writeln!(out, "Normalized confusion matrix");
        for (label, row) in CLASS_LABELS.iter().zip(confusion.normalized()) {
            let cells: Vec<String> = row.iter().map(|value| format!("{value:>6.2}")).collect();
            let _ = writeln!(out, "{label:<width$} {}", cells.join(""));
        }
        out
    }
}

/// Run the full training workflow.
///
/// The kernel and penalty are validated before anything is logged, so an
/// invalid configuration leaves `ctx` untouched.
pub fn train_and_register(
    config: &TrainConfig,
    source: &DatasetSource,
    ctx: &mut RunContext,
    store: &dyn ArtifactStore,
    registry: &dyn ModelRegistry,
) -> Result<TrainReport, WorkflowError> {
    let kernel: KernelKind = config.kernel.parse()?;
    if !config.penalty.is_finite() || config.penalty <= 0.0 {
        return Err(TrainError::InvalidPenalty(config.penalty).into());
    }
    ctx.log("Kernel type", kernel.name());
    ctx.log("Penalty", config.penalty);

    let data = source.load()?;
    let split = train_test_split(&data, TEST_FRACTION, SPLIT_SEED)?;
    tracing::info!(
        train = split.train.len(),
        test = split.test.len(),
        "dataset split"
    );

    let options = TrainOptions {
        kernel,
        penalty: config.penalty,
        ..TrainOptions::default()
    };
    let model = train_svc(&split.train, &CLASS_LABELS, &options)?;
    let predicted = model.predict(&split.test.features);
    let evaluation = evaluate(CLASS_LABELS.len(), &split.test.targets, &predicted);

    ctx.log("Accuracy", evaluation.accuracy);
    ctx.log("precision", evaluation.precision);
    ctx.log("recall", evaluation.recall);
    ctx.log("f1-score", evaluation.f1);
    let record = evaluation.confusion.to_record(&CLASS_LABELS);
    ctx.log_confusion_matrix(CONFUSION_MATRIX_NAME, &record)?;

    let images = render_confusion_images(&evaluation, ctx)?;

    let bytes = model.to_json_vec().map_err(WorkflowError::SerializeModel)?;
    let artifact = store.persist(MODEL_ARTIFACT_NAME, &bytes)?;
    ctx.log("Model Name", config.model_name.as_str());

    let registered = registry.register(&ModelRegistration {
        model_name: config.model_name.clone(),
        artifact: artifact.clone(),
        description: MODEL_DESCRIPTION.to_string(),
        framework: FRAMEWORK.to_string(),
        framework_version: FRAMEWORK_VERSION.to_string(),
        run_id: ctx.run_id().to_string(),
    })?;
    ctx.flush()?;

    Ok(TrainReport {
        model,
        evaluation,
        artifact,
        registered,
        images,
    })
}

fn render_confusion_images(
    evaluation: &EvaluationReport,
    ctx: &mut RunContext,
) -> Result<Vec<PathBuf>, WorkflowError> {
    let output_dir = ctx.output_dir().to_path_buf();
    ensure_dir(&output_dir)?;

    let counts: Vec<Vec<f64>> = evaluation
        .confusion
        .rows()
        .into_iter()
        .map(|row| row.into_iter().map(f64::from).collect())
        .collect();
    let normalized = evaluation.confusion.normalized();
    let plots = [
        (
            UNNORMALIZED_IMAGE_NAME,
            ConfusionPlot {
                title: "Confusion matrix",
                labels: &CLASS_LABELS,
                values: &counts,
                format: CellFormat::Count,
            },
        ),
        (
            NORMALIZED_IMAGE_NAME,
            ConfusionPlot {
                title: "Normalized confusion matrix",
                labels: &CLASS_LABELS,
                values: &normalized,
                format: CellFormat::Fraction,
            },
        ),
    ];

    let mut paths = Vec::with_capacity(plots.len());
    for (name, plot) in &plots {
        let path = output_dir.join(format!("{name}.png"));
        plot.save_png(&path)?;
        ctx.log_image(name, &path);
        paths.push(path);
    }
    Ok(paths)
}

fn ensure_dir(path: &Path) -> Result<(), WorkflowError> {
    std::fs::create_dir_all(path).map_err(|source| WorkflowError::CreateOutputDir {
        path: path.to_path_buf(),
        source,
    })
}
