use crate::RefineSettings;
use calibro_core::nalgebra::{
    dimension::{Dynamic, U1},
    DMatrix, DVector, VecStorage,
};
use core::cell::RefCell;
use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use log::debug;

/// A nonlinear least-squares objective over a flat parameter vector.
pub trait ResidualProblem {
    /// Computes the residuals at `params`. The objective is their sum of squares.
    ///
    /// Every successful call must return the same number of residuals. Returns `None` if the
    /// objective is undefined at `params` (a singular matrix, a point mapped to infinity, etc).
    fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>>;

    /// The objective at `params`, or `None` if it is undefined there.
    fn cost(&self, params: &DVector<f64>) -> Option<f64> {
        evaluate(self, params).map(|residuals| residuals.norm_squared())
    }
}

/// What happened during a refinement.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RefineReport {
    /// The objective at the starting point.
    pub initial_cost: f64,
    /// The objective at the returned point. Never larger than `initial_cost`.
    pub final_cost: f64,
    /// How many times the objective was evaluated by the strategy.
    pub evaluations: usize,
    /// Whether the strategy stopped because a convergence criterion was met.
    pub converged: bool,
}

impl RefineReport {
    fn unevaluated() -> Self {
        Self {
            initial_cost: f64::INFINITY,
            final_cost: f64::INFINITY,
            evaluations: 0,
            converged: false,
        }
    }
}

/// A strategy that minimizes a [`ResidualProblem`].
pub trait Minimizer {
    /// Minimizes `problem` starting at `start`.
    ///
    /// The returned parameters are the best ones seen, so their cost is never above the cost at
    /// `start`. If the objective is undefined at `start`, `start` is returned unchanged.
    fn minimize<P>(&self, problem: &P, start: DVector<f64>) -> (DVector<f64>, RefineReport)
    where
        P: ResidualProblem + ?Sized;
}

/// Levenberg-Marquardt with Jacobians estimated by central differences.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct LevenbergMarquardtMinimizer {
    pub settings: RefineSettings,
}

impl LevenbergMarquardtMinimizer {
    pub fn new(settings: RefineSettings) -> Self {
        Self { settings }
    }
}

impl Minimizer for LevenbergMarquardtMinimizer {
    fn minimize<P>(&self, problem: &P, start: DVector<f64>) -> (DVector<f64>, RefineReport)
    where
        P: ResidualProblem + ?Sized,
    {
        let initial_cost = match problem.cost(&start) {
            Some(cost) => cost,
            None => {
                debug!("objective is undefined at the starting point, skipping refinement");
                return (start, RefineReport::unevaluated());
            }
        };

        let settings = &self.settings;
        let (target, report) = LevenbergMarquardt::new()
            .with_ftol(settings.ftol)
            .with_xtol(settings.xtol)
            .with_gtol(settings.gtol)
            .with_patience(settings.patience)
            .minimize(CentralDifferences::new(
                problem,
                start,
                settings.difference_step,
                initial_cost,
            ));

        let (final_cost, best) = target.best.into_inner();
        debug!(
            "levenberg-marquardt stopped ({:?}) after {} evaluations, cost {} -> {}",
            report.termination, report.number_of_evaluations, initial_cost, final_cost
        );
        let report = RefineReport {
            initial_cost,
            final_cost,
            evaluations: report.number_of_evaluations,
            converged: report.termination.was_successful(),
        };
        (best, report)
    }
}

fn evaluate<P>(problem: &P, params: &DVector<f64>) -> Option<DVector<f64>>
where
    P: ResidualProblem + ?Sized,
{
    problem
        .residuals(params)
        .filter(|residuals| residuals.iter().all(|n| n.is_finite()))
}

/// Adapts a [`ResidualProblem`] to the `levenberg-marquardt` crate.
///
/// Every residual evaluation at the current parameters is checked against the best cost seen so
/// far, so that the best iterate survives even if the strategy ends on a worse one.
struct CentralDifferences<'a, P: ?Sized> {
    problem: &'a P,
    params: DVector<f64>,
    step: f64,
    best: RefCell<(f64, DVector<f64>)>,
}

impl<'a, P> CentralDifferences<'a, P>
where
    P: ResidualProblem + ?Sized,
{
    fn new(problem: &'a P, start: DVector<f64>, step: f64, start_cost: f64) -> Self {
        Self {
            problem,
            params: start.clone(),
            step,
            best: RefCell::new((start_cost, start)),
        }
    }
}

impl<'a, P> LeastSquaresProblem<f64, Dynamic, Dynamic> for CentralDifferences<'a, P>
where
    P: ResidualProblem + ?Sized,
{
    type ResidualStorage = VecStorage<f64, Dynamic, U1>;
    type JacobianStorage = VecStorage<f64, Dynamic, Dynamic>;
    type ParameterStorage = VecStorage<f64, Dynamic, U1>;

    fn set_params(&mut self, x: &DVector<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> DVector<f64> {
        self.params.clone()
    }

    fn residuals(&self) -> Option<DVector<f64>> {
        let residuals = evaluate(self.problem, &self.params)?;
        let cost = residuals.norm_squared();
        let mut best = self.best.borrow_mut();
        if cost < best.0 {
            *best = (cost, self.params.clone());
        }
        Some(residuals)
    }

    fn jacobian(&self) -> Option<DMatrix<f64>> {
        let rows = evaluate(self.problem, &self.params)?.len();
        let mut jacobian = DMatrix::zeros(rows, self.params.len());
        let mut probe = self.params.clone();
        for (column, &value) in self.params.iter().enumerate() {
            let h = self.step * value.abs().max(1.0);
            probe[column] = value + h;
            let forward = evaluate(self.problem, &probe)?;
            probe[column] = value - h;
            let backward = evaluate(self.problem, &probe)?;
            probe[column] = value;
            if forward.len() != rows || backward.len() != rows {
                return None;
            }
            jacobian.set_column(column, &((forward - backward) / (2.0 * h)));
        }
        Some(jacobian)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    /// The Rosenbrock function as a least-squares problem.
    struct Rosenbrock;

    impl ResidualProblem for Rosenbrock {
        fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
            let (x, y) = (params[0], params[1]);
            Some(DVector::from_vec(vec![1.0 - x, 10.0 * (y - x * x)]))
        }
    }

    /// Undefined everywhere except at the origin.
    struct Fragile;

    impl ResidualProblem for Fragile {
        fn residuals(&self, params: &DVector<f64>) -> Option<DVector<f64>> {
            if params.iter().all(|&n| n == 0.0) {
                Some(DVector::from_element(2, 1.0))
            } else {
                None
            }
        }
    }

    #[test]
    fn finds_rosenbrock_minimum() {
        let minimizer = LevenbergMarquardtMinimizer::default();
        let (params, report) =
            minimizer.minimize(&Rosenbrock, DVector::from_vec(vec![-1.2, 1.0]));
        assert_relative_eq!(params[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(params[1], 1.0, epsilon = 1e-6);
        assert!(report.final_cost < report.initial_cost);
        assert!(report.final_cost < 1e-12);
    }

    #[test]
    fn undefined_start_is_returned_unchanged() {
        let start = DVector::from_vec(vec![0.5, 0.5]);
        let (params, report) =
            LevenbergMarquardtMinimizer::default().minimize(&Fragile, start.clone());
        assert_eq!(params, start);
        assert_eq!(report.evaluations, 0);
        assert!(!report.converged);
    }

    #[test]
    fn failing_jacobian_keeps_start() {
        // The objective is defined at the start but nowhere around it.
        let start = DVector::zeros(2);
        let (params, report) =
            LevenbergMarquardtMinimizer::default().minimize(&Fragile, start.clone());
        assert_eq!(params, start);
        assert_relative_eq!(report.final_cost, report.initial_cost);
    }
}
