//! Library exports shared by the training and scoring binaries, tests and benches.
/// Run directory helpers.
pub mod app_dirs;
/// Training parameter loading.
pub mod config;
/// Iris dataset loading and splitting.
pub mod dataset;
pub(crate) mod http_client;
/// Tracing setup for the binaries.
pub mod logging;
/// Classifier and evaluation metrics.
pub mod ml;
/// Confusion-matrix rendering.
pub mod plot;
/// Remote scoring client.
pub mod scoring;
/// Run context, artifact store and model registry.
pub mod tracking;
/// End-to-end training run.
pub mod workflow;
