use calibro_optimize::RefineSettings;
use calibro_ransac::RansacSettings;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The settings of every estimation entry point.
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct CalibroSettings {
    /// The nonlinear refinement used by [`Method::Geometric`](crate::Method::Geometric).
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub refine: RefineSettings,
    /// The budget and threshold of RANSAC.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub ransac: RansacSettings,
    /// Seeds the RANSAC generator of front ends that create one. `None` seeds from entropy.
    #[cfg_attr(feature = "serde-serialize", serde(default))]
    pub seed: Option<u64>,
}

impl CalibroSettings {
    #[must_use]
    pub fn refine(self, refine: RefineSettings) -> Self {
        Self { refine, ..self }
    }

    #[must_use]
    pub fn ransac(self, ransac: RansacSettings) -> Self {
        Self { ransac, ..self }
    }

    #[must_use]
    pub fn seed(self, seed: Option<u64>) -> Self {
        Self { seed, ..self }
    }
}
