#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Stopping criteria and numerical parameters of the refinement.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RefineSettings {
    /// Relative reduction of the cost below which the minimization stops.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_ftol"))]
    pub ftol: f64,
    /// Relative change of the parameters below which the minimization stops.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_xtol"))]
    pub xtol: f64,
    /// Orthogonality between the residuals and the Jacobian columns below which the minimization stops.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_gtol"))]
    pub gtol: f64,
    /// The evaluation budget is `patience * (parameters + 1)`.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_patience"))]
    pub patience: usize,
    /// Step of the central differences, relative to the magnitude of each parameter.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_difference_step")
    )]
    pub difference_step: f64,
}

impl RefineSettings {
    #[must_use]
    pub fn ftol(self, ftol: f64) -> Self {
        Self { ftol, ..self }
    }

    #[must_use]
    pub fn xtol(self, xtol: f64) -> Self {
        Self { xtol, ..self }
    }

    #[must_use]
    pub fn gtol(self, gtol: f64) -> Self {
        Self { gtol, ..self }
    }

    #[must_use]
    pub fn patience(self, patience: usize) -> Self {
        Self { patience, ..self }
    }

    #[must_use]
    pub fn difference_step(self, difference_step: f64) -> Self {
        Self {
            difference_step,
            ..self
        }
    }
}

impl Default for RefineSettings {
    fn default() -> Self {
        Self {
            ftol: default_ftol(),
            xtol: default_xtol(),
            gtol: default_gtol(),
            patience: default_patience(),
            difference_step: default_difference_step(),
        }
    }
}

fn default_ftol() -> f64 {
    1e-12
}

fn default_xtol() -> f64 {
    1e-12
}

fn default_gtol() -> f64 {
    0.0
}

fn default_patience() -> usize {
    100
}

fn default_difference_step() -> f64 {
    1e-6
}
