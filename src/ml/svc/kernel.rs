use std::fmt;
use std::str::FromStr;

use linfa_svm::SvmParams;
use serde::{Deserialize, Serialize};

use super::TrainError;

/// Polynomial degree used by the `poly` kernel.
pub const POLY_DEGREE: f64 = 3.0;
/// Independent term used by the `poly` kernel.
pub const KERNEL_COEF0: f64 = 0.0;

/// Kernel families provided by linfa-svm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    Poly,
    Rbf,
}

impl KernelKind {
    pub const ALL: [KernelKind; 3] = [Self::Linear, Self::Poly, Self::Rbf];

    pub fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Poly => "poly",
            Self::Rbf => "rbf",
        }
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelKind {
    type Err = TrainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == value)
            .ok_or_else(|| TrainError::InvalidKernel(value.to_string()))
    }
}

/// Kernel family plus the parameters resolved for one fit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KernelSpec {
    pub kind: KernelKind,
    pub gamma: f64,
    pub coef0: f64,
    pub degree: f64,
}

impl KernelSpec {
    pub fn new(kind: KernelKind, gamma: f64) -> Self {
        Self {
            kind,
            gamma,
            coef0: KERNEL_COEF0,
            degree: POLY_DEGREE,
        }
    }

    /// Factor applied to every input before it reaches the machines.
    ///
    /// linfa's polynomial kernel is `(x·y + c)^d` with no `gamma` term, so
    /// inputs are scaled by `sqrt(gamma)` to evaluate `(gamma x·y + c)^d`.
    pub fn input_scale(&self) -> f64 {
        match self.kind {
            KernelKind::Poly => self.gamma.sqrt(),
            KernelKind::Linear | KernelKind::Rbf => 1.0,
        }
    }

    /// Select this kernel on a set of SVM hyperparameters.
    pub fn configure(&self, params: SvmParams<f64, bool>) -> SvmParams<f64, bool> {
        match self.kind {
            KernelKind::Linear => params.linear_kernel(),
            // linfa's gaussian kernel is exp(-|x - y|^2 / eps).
            KernelKind::Rbf => params.gaussian_kernel(1.0 / self.gamma),
            KernelKind::Poly => params.polynomial_kernel(self.coef0, self.degree),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_names_only() {
        assert_eq!("rbf".parse::<KernelKind>().unwrap(), KernelKind::Rbf);
        assert_eq!("linear".parse::<KernelKind>().unwrap(), KernelKind::Linear);
        assert_eq!("poly".parse::<KernelKind>().unwrap(), KernelKind::Poly);
        let err = "gaussian".parse::<KernelKind>().unwrap_err();
        assert!(err.to_string().contains("gaussian"));
        assert!("RBF".parse::<KernelKind>().is_err());
    }

    #[test]
    fn sigmoid_is_not_offered_by_the_fitting_library() {
        assert!(matches!(
            "sigmoid".parse::<KernelKind>(),
            Err(TrainError::InvalidKernel(name)) if name == "sigmoid"
        ));
    }

    #[test]
    fn only_poly_rescales_inputs() {
        assert_eq!(KernelSpec::new(KernelKind::Poly, 0.25).input_scale(), 0.5);
        assert_eq!(KernelSpec::new(KernelKind::Rbf, 0.25).input_scale(), 1.0);
        assert_eq!(KernelSpec::new(KernelKind::Linear, 0.25).input_scale(), 1.0);
    }
}
