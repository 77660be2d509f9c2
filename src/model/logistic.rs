//! Logistic regression baseline
//!
//! Fitted by Newton-Raphson (IRLS) on the log-likelihood with a tiny ridge
//! term, which keeps the Hessian positive definite and the optimum finite
//! when the classes are separable. Each step is halved until the penalised
//! log-likelihood does not decrease.

use crate::error::{HitlabError, Result};
use crate::model::{Classifier, Dataset, ProbabilityModel};
use serde::Serialize;
use tracing::{debug, trace};

const MODEL_NAME: &str = "logistic";

/// Logistic regression settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogisticRegression {
    pub max_iter: usize,
    /// Relative change in penalised deviance that counts as converged
    pub tolerance: f64,
    /// L2 penalty on every coefficient, intercept included
    pub ridge: f64,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tolerance: 1e-10,
            ridge: 1e-6,
        }
    }
}

/// One row of the association table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coefficient {
    pub term: String,
    pub estimate: f64,
    pub std_error: f64,
    pub z_value: f64,
    pub odds_ratio: f64,
}

/// Fitted logistic model
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    /// Intercept first, then one per feature
    pub std_errors: Vec<f64>,
    pub iterations: usize,
    pub log_likelihood: f64,
}

impl LogisticModel {
    pub fn linear_predictor(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.iter())
                .map(|(b, x)| b * x)
                .sum::<f64>()
    }

    /// Estimates with standard errors, z-values and odds ratios
    pub fn coefficient_table(&self) -> Vec<Coefficient> {
        let terms = std::iter::once("(intercept)".to_string()).chain(self.feature_names.iter().cloned());
        let estimates = std::iter::once(self.intercept).chain(self.coefficients.iter().copied());

        terms
            .zip(estimates)
            .zip(self.std_errors.iter())
            .map(|((term, estimate), &std_error)| Coefficient {
                term,
                estimate,
                std_error,
                z_value: if std_error > 0.0 { estimate / std_error } else { f64::NAN },
                odds_ratio: estimate.exp(),
            })
            .collect()
    }
}

impl ProbabilityModel for LogisticModel {
    fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.linear_predictor(row))
    }
}

impl LogisticRegression {
    /// Fit on `rows` of `data`, returning the concrete model
    pub fn fit_rows(&self, data: &Dataset, rows: &[usize]) -> Result<LogisticModel> {
        if rows.is_empty() {
            return Err(HitlabError::InsufficientData {
                context: MODEL_NAME.into(),
                reason: "no training rows".into(),
            });
        }

        let dim = data.n_features() + 1;
        let mut beta = vec![0.0; dim];
        let mut objective = self.penalised_log_likelihood(data, rows, &beta);
        let mut x = vec![0.0; dim];

        for iteration in 1..=self.max_iter {
            let mut gradient: Vec<f64> = beta.iter().map(|b| -self.ridge * b).collect();
            let mut hessian = vec![vec![0.0; dim]; dim];
            for (i, row) in hessian.iter_mut().enumerate() {
                row[i] = self.ridge;
            }

            for &r in rows {
                design_row(data.row(r), &mut x);
                let p = sigmoid(dot(&beta, &x));
                let residual = if data.label(r) { 1.0 - p } else { -p };
                let weight = p * (1.0 - p);
                for a in 0..dim {
                    gradient[a] += residual * x[a];
                    for b in 0..=a {
                        hessian[a][b] += weight * x[a] * x[b];
                    }
                }
            }
            for a in 0..dim {
                for b in 0..a {
                    hessian[b][a] = hessian[a][b];
                }
            }

            let factor = cholesky(&hessian).ok_or_else(|| {
                HitlabError::training(MODEL_NAME, "information matrix is not positive definite")
            })?;
            let step = cholesky_solve(&factor, &gradient);

            let mut scale = 1.0;
            let mut candidate = beta.clone();
            let mut candidate_objective = objective;
            let mut improved = false;
            for _ in 0..40 {
                for (c, (b, s)) in candidate.iter_mut().zip(beta.iter().zip(step.iter())) {
                    *c = b + scale * s;
                }
                candidate_objective = self.penalised_log_likelihood(data, rows, &candidate);
                if candidate_objective.is_finite() && candidate_objective >= objective {
                    improved = true;
                    break;
                }
                scale *= 0.5;
            }

            if !candidate.iter().all(|b| b.is_finite()) {
                return Err(HitlabError::NotConverged {
                    model: MODEL_NAME.into(),
                    iterations: iteration,
                });
            }

            // Deviance = -2 * log-likelihood; compare relative change as glm does
            let change = 2.0 * (candidate_objective - objective).abs();
            let converged = !improved || change <= self.tolerance * (2.0 * objective.abs() + 0.1);
            trace!(
                "{} iteration {}: log-likelihood {:.8}, step scale {}",
                MODEL_NAME,
                iteration,
                candidate_objective,
                scale
            );

            if improved {
                beta = candidate;
                objective = candidate_objective;
            }

            if converged {
                let std_errors = standard_errors(&factor);
                debug!(
                    "{} converged after {} iterations (log-likelihood {:.4})",
                    MODEL_NAME, iteration, objective
                );
                return Ok(LogisticModel {
                    feature_names: data.feature_names().to_vec(),
                    intercept: beta[0],
                    coefficients: beta[1..].to_vec(),
                    std_errors,
                    iterations: iteration,
                    log_likelihood: objective,
                });
            }
        }

        Err(HitlabError::NotConverged {
            model: MODEL_NAME.into(),
            iterations: self.max_iter,
        })
    }

    fn penalised_log_likelihood(&self, data: &Dataset, rows: &[usize], beta: &[f64]) -> f64 {
        let mut x = vec![0.0; beta.len()];
        let mut total = 0.0;
        for &r in rows {
            design_row(data.row(r), &mut x);
            let eta = dot(beta, &x);
            // log p = -softplus(-eta), log(1 - p) = -softplus(eta)
            total -= if data.label(r) { softplus(-eta) } else { softplus(eta) };
        }
        total - 0.5 * self.ridge * beta.iter().map(|b| b * b).sum::<f64>()
    }
}

impl Classifier for LogisticRegression {
    fn fit(&self, data: &Dataset, rows: &[usize]) -> Result<Box<dyn ProbabilityModel>> {
        Ok(Box::new(self.fit_rows(data, rows)?))
    }

    fn name(&self) -> &'static str {
        MODEL_NAME
    }
}

pub(crate) fn sigmoid(eta: f64) -> f64 {
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

fn design_row(features: &[f64], out: &mut [f64]) {
    out[0] = 1.0;
    out[1..].copy_from_slice(features);
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Lower-triangular L with A = L Lᵀ, or `None` if A is not positive definite
fn cholesky(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
            if i == j {
                let d = a[i][i] - sum;
                if !(d.is_finite() && d > 0.0) {
                    return None;
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - sum) / l[j][j];
            }
        }
    }
    Some(l)
}

/// Solve L Lᵀ x = b
fn cholesky_solve(l: &[Vec<f64>], b: &[f64]) -> Vec<f64> {
    let n = b.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let sum: f64 = (0..i).map(|k| l[i][k] * y[k]).sum();
        y[i] = (b[i] - sum) / l[i][i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let sum: f64 = (i + 1..n).map(|k| l[k][i] * x[k]).sum();
        x[i] = (y[i] - sum) / l[i][i];
    }
    x
}

/// Square roots of the diagonal of (L Lᵀ)⁻¹
fn standard_errors(l: &[Vec<f64>]) -> Vec<f64> {
    let n = l.len();
    (0..n)
        .map(|i| {
            let mut e = vec![0.0; n];
            e[i] = 1.0;
            cholesky_solve(l, &e)[i].max(0.0).sqrt()
        })
        .collect()
}
