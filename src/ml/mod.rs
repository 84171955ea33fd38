//! Machine learning helpers for training and inference.
//!
//! The support-vector classifier is implemented in-crate so fitted models stay
//! deterministic and export to plain JSON.

pub mod metrics;
pub mod svc;
