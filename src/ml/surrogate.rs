use crate::error::{AppError, Result};
use crate::ml::models::{Perturbation, SurrogateModel};
use ndarray::{Array1, Array2, Axis};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linalg::traits::cholesky::CholeskyDecomposable;

/// Fits a weighted ridge regression on perturbation masks.
///
/// The design matrix holds one row per perturbation with 1.0 for retained
/// features; the response is the classifier's probability of the target class.
/// Columns that never vary get weight exactly zero.
///
/// With more varying features than perturbations the system is solved in its
/// dual form, so the factorized matrix never exceeds `n_samples` square.
#[derive(Debug, Clone)]
pub struct SurrogateFitter {
    alpha: f64,
}

impl SurrogateFitter {
    pub fn new(alpha: f64) -> Self {
        Self { alpha }
    }

    pub fn fit(
        &self,
        perturbations: &[Perturbation],
        feature_names: &[String],
        target_class: &str,
    ) -> Result<SurrogateModel> {
        if perturbations.is_empty() {
            return Err(AppError::Validation(
                "cannot fit a surrogate without perturbations".to_string(),
            ));
        }

        let n_rows = perturbations.len();
        let n_features = feature_names.len();

        let mut x = Array2::<f64>::zeros((n_rows, n_features));
        let mut y = Array1::<f64>::zeros(n_rows);
        let mut w = Array1::<f64>::zeros(n_rows);

        for (row, p) in perturbations.iter().enumerate() {
            if p.mask.len() != n_features {
                return Err(AppError::Internal(format!(
                    "perturbation {} has {} mask entries for {} features",
                    row,
                    p.mask.len(),
                    n_features
                )));
            }
            let probabilities = p.probabilities.as_ref().ok_or_else(|| {
                AppError::Internal(format!("perturbation {} has no classifier output", row))
            })?;

            for (col, &keep) in p.mask.iter().enumerate() {
                if keep {
                    x[[row, col]] = 1.0;
                }
            }
            y[row] = probabilities.get(target_class);
            w[row] = p.weight.max(0.0);
        }

        let weight_sum = w.sum();
        if weight_sum <= 0.0 {
            return Err(AppError::Validation(
                "perturbation weights sum to zero".to_string(),
            ));
        }

        let x_mean = x.t().dot(&w) / weight_sum;
        let y_mean = y.dot(&w) / weight_sum;

        // Only columns that vary across rows enter the solve.
        let active: Vec<usize> = (0..n_features)
            .filter(|&col| {
                let column = x.column(col);
                column.iter().any(|&v| v != column[0])
            })
            .collect();

        let mut coefficients = Array1::<f64>::zeros(n_features);
        if !active.is_empty() {
            let xc = x.select(Axis(1), &active) - &x_mean.select(Axis(0), &active);
            let yc = &y - y_mean;
            let sqrt_w = w.mapv(f64::sqrt);

            let xw = &xc * &sqrt_w.view().insert_axis(Axis(1));
            let yw = &yc * &sqrt_w;

            let beta = if active.len() > n_rows {
                solve_dual(&xw, &yw, self.alpha)?
            } else {
                solve_primal(&xw, &yw, self.alpha)?
            };
            for (k, &col) in active.iter().enumerate() {
                coefficients[col] = beta[k];
            }
        }

        let intercept = y_mean - x_mean.dot(&coefficients);
        let fitted = x.dot(&coefficients) + intercept;

        let residual: f64 = (&y - &fitted).mapv(|r| r * r).dot(&w);
        let total: f64 = y.mapv(|v| (v - y_mean) * (v - y_mean)).dot(&w);
        let score = if total > 0.0 {
            1.0 - residual / total
        } else if residual <= f64::EPSILON {
            1.0
        } else {
            0.0
        };

        let local_prediction = intercept + coefficients.sum();

        Ok(SurrogateModel {
            target_class: target_class.to_string(),
            weights: feature_names
                .iter()
                .cloned()
                .zip(coefficients.iter().copied())
                .collect(),
            intercept,
            score,
            local_prediction,
        })
    }
}

/// `(XᵀX + αI) β = Xᵀy`, one row per feature
fn solve_primal(xw: &Array2<f64>, yw: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let mut gram = xw.t().dot(xw);
    let mut diagonal = gram.diag_mut();
    diagonal += alpha;
    let rhs = xw.t().dot(yw);
    spd_solve(&gram, &rhs)
}

/// `β = Xᵀ (XXᵀ + αI)⁻¹ y`, one row per perturbation
fn solve_dual(xw: &Array2<f64>, yw: &Array1<f64>, alpha: f64) -> Result<Array1<f64>> {
    let mut kernel = xw.dot(&xw.t());
    let mut diagonal = kernel.diag_mut();
    diagonal += alpha;
    let dual = spd_solve(&kernel, yw)?;
    Ok(xw.t().dot(&dual))
}

/// Solve `a * x = b` for symmetric positive definite `a`
fn spd_solve(a: &Array2<f64>, b: &Array1<f64>) -> Result<Array1<f64>> {
    let n = a.nrows();
    let matrix = DenseMatrix::new(n, n, a.iter().copied().collect(), false);
    let rhs = DenseMatrix::new(n, 1, b.to_vec(), false);

    let solution = matrix
        .cholesky_solve_mut(rhs)
        .map_err(|e| AppError::Internal(format!("Failed to solve surrogate system: {}", e)))?;

    Ok((0..n).map(|i| *solution.get((i, 0))).collect())
}
