//! Random sample consensus with a fixed iteration budget.
//!
//! Every iteration draws [`Estimator::MIN_SAMPLES`] distinct data points uniformly at random,
//! fits the estimator to them, and counts the data points whose residual is strictly below the
//! inlier threshold. The model with the most inliers wins, and ties keep the earlier model.
//! There is no adaptive early termination: exactly [`RansacSettings::iterations`] samples are
//! drawn.
//!
//! The generator is owned by [`Ransac`], so two estimators seeded identically produce identical
//! results, and estimators running concurrently never share random state.

use calibro_core::{
    sample_consensus::{Consensus, Estimator, Model},
    Error, Result,
};
use log::{debug, info, trace};
use rand::{seq::index::sample, Rng};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The budget and the inlier threshold of [`Ransac`].
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RansacSettings {
    /// The number of samples drawn.
    #[cfg_attr(feature = "serde-serialize", serde(default = "default_iterations"))]
    pub iterations: usize,
    /// A data point is an inlier if its residual is strictly below this.
    #[cfg_attr(
        feature = "serde-serialize",
        serde(default = "default_inlier_threshold")
    )]
    pub inlier_threshold: f64,
}

impl RansacSettings {
    #[must_use]
    pub fn iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    #[must_use]
    pub fn inlier_threshold(self, inlier_threshold: f64) -> Self {
        Self {
            inlier_threshold,
            ..self
        }
    }
}

impl Default for RansacSettings {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            inlier_threshold: default_inlier_threshold(),
        }
    }
}

fn default_iterations() -> usize {
    20
}

fn default_inlier_threshold() -> f64 {
    5.0
}

/// The winning model and the indices of its inliers in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct RansacOutcome<M> {
    pub model: M,
    pub inliers: Vec<usize>,
}

impl<M> RansacOutcome<M> {
    pub fn inlier_count(&self) -> usize {
        self.inliers.len()
    }
}

#[derive(Debug, Clone)]
pub struct Ransac<R> {
    pub settings: RansacSettings,
    rng: R,
}

impl<R> Ransac<R>
where
    R: Rng,
{
    pub fn new(settings: RansacSettings, rng: R) -> Self {
        Self { settings, rng }
    }

    /// Gives back the generator, advanced past every sample drawn so far.
    pub fn into_rng(self) -> R {
        self.rng
    }

    /// Runs the full sampling budget over `data`.
    ///
    /// Fails with [`Error::InsufficientCorrespondences`] if there are fewer data points than the
    /// estimator needs, and with [`Error::DegenerateConfiguration`] if no sample produced a model
    /// with at least one inlier. Samples the estimator cannot fit are skipped but still count
    /// against the budget.
    pub fn estimate<E, Data>(
        &mut self,
        estimator: &E,
        data: &[Data],
    ) -> Result<RansacOutcome<E::Model>>
    where
        E: Estimator<Data>,
        Data: Clone,
    {
        if data.len() < E::MIN_SAMPLES {
            return Err(Error::InsufficientCorrespondences {
                required: E::MIN_SAMPLES,
                actual: data.len(),
            });
        }

        let threshold = self.settings.inlier_threshold;
        let mut best: Option<RansacOutcome<E::Model>> = None;
        let mut subset = Vec::with_capacity(E::MIN_SAMPLES);
        for iteration in 0..self.settings.iterations {
            subset.clear();
            subset.extend(
                sample(&mut self.rng, data.len(), E::MIN_SAMPLES)
                    .into_iter()
                    .map(|ix| data[ix].clone()),
            );

            let mut fitted = false;
            for model in estimator.estimate(subset.iter().cloned()) {
                fitted = true;
                let inliers: Vec<usize> = data
                    .iter()
                    .enumerate()
                    .filter(|(_, d)| model.residual(d) < threshold)
                    .map(|(ix, _)| ix)
                    .collect();
                let best_count = best.as_ref().map_or(0, RansacOutcome::inlier_count);
                if inliers.len() > best_count {
                    debug!(
                        "iteration {} found a model with {} inliers",
                        iteration,
                        inliers.len()
                    );
                    best = Some(RansacOutcome { model, inliers });
                }
            }
            if !fitted {
                trace!("iteration {} drew a degenerate sample", iteration);
            }
        }

        let best = best.ok_or(Error::DegenerateConfiguration(
            "no sample produced a model with any inliers",
        ))?;
        info!(
            "ransac kept {} of {} data points as inliers",
            best.inlier_count(),
            data.len()
        );
        Ok(best)
    }
}

impl<E, Data, R> Consensus<E, Data> for Ransac<R>
where
    E: Estimator<Data>,
    Data: Clone,
    R: Rng,
{
    type Inliers = Vec<usize>;

    fn model<I>(&mut self, estimator: &E, data: I) -> Option<E::Model>
    where
        I: Iterator<Item = Data> + Clone,
    {
        self.model_inliers(estimator, data).map(|(model, _)| model)
    }

    fn model_inliers<I>(&mut self, estimator: &E, data: I) -> Option<(E::Model, Self::Inliers)>
    where
        I: Iterator<Item = Data> + Clone,
    {
        let data: Vec<Data> = data.collect();
        self.estimate(estimator, &data)
            .map(|outcome| (outcome.model, outcome.inliers))
            .map_err(|e| debug!("consensus failed: {}", e))
            .ok()
    }
}
