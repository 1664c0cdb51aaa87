//! Sequential Minimal Optimization for the SVM dual
//!
//! Solves
//!
//! ```text
//! min  ½ αᵀQα + pᵀα
//! s.t. yᵀα = Δ,  0 ≤ α_i ≤ C_i
//! ```
//!
//! with second-order working set selection (Fan, Chen and Lin, JMLR 2005).
//! The ν variant restricts each working pair to one sign of `y` and
//! reports the two class offsets through [`SolutionInfo::r`].
//!
//! Per-variable state lives in position order. Shrinking swaps positions so
//! that active variables stay at the front; `active_set[pos]` remembers the
//! variable index, which is how Q rows are read.

use crate::cache::Qfloat;
use crate::solver::qmatrix::QMatrix;
use log::{debug, warn};
use std::sync::Arc;

pub(crate) const TAU: f64 = 1e-12;
pub(super) const INF: f64 = f64::INFINITY;

/// Standard vs ν solver variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverVariant {
    Standard,
    Nu,
}

/// Knobs for one solver run
#[derive(Debug, Clone, Copy)]
pub struct SolverParams {
    pub variant: SolverVariant,
    pub tolerance: f64,
    pub shrinking: bool,
    pub max_iterations: usize,
}

/// Result of the solver
#[derive(Debug, Clone)]
pub struct SolutionInfo {
    /// Final objective value
    pub obj: f64,
    /// Offset of the decision function
    pub rho: f64,
    /// Box bound used for `y = +1`
    pub upper_bound_p: f64,
    /// Box bound used for `y = -1`
    pub upper_bound_n: f64,
    /// ν variant only: `(r1 + r2) / 2`
    pub r: f64,
    /// Iterations performed
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum AlphaStatus {
    LowerBound,
    UpperBound,
    Free,
}

pub struct Solver<'q, Q: QMatrix + ?Sized> {
    pub(super) q: &'q mut Q,
    pub(super) variant: SolverVariant,
    pub(super) l: usize,
    pub(super) active_size: usize,
    pub(super) y: Vec<i8>,
    pub(super) g: Vec<f64>,
    pub(super) g_bar: Vec<f64>,
    pub(super) alpha: Vec<f64>,
    pub(super) alpha_status: Vec<AlphaStatus>,
    pub(super) p: Vec<f64>,
    pub(super) active_set: Vec<usize>,
    pub(super) qd: Vec<f64>,
    pub(super) cp: f64,
    pub(super) cn: f64,
    pub(super) eps: f64,
    pub(super) unshrink: bool,
}

impl<'q, Q: QMatrix + ?Sized> Solver<'q, Q> {
    /// Run SMO to convergence.
    ///
    /// `alpha` holds the feasible starting point and receives the solution.
    /// `cp` / `cn` bound the variables with `y = +1` / `y = -1`.
    pub fn solve(
        q: &'q mut Q,
        p: &[f64],
        y: &[i8],
        alpha: &mut [f64],
        cp: f64,
        cn: f64,
        params: &SolverParams,
    ) -> SolutionInfo {
        let l = q.size();
        let qd = q.diagonal().to_vec();
        let mut solver = Solver {
            q,
            variant: params.variant,
            l,
            active_size: l,
            y: y.to_vec(),
            g: p.to_vec(),
            g_bar: vec![0.0; l],
            alpha: alpha.to_vec(),
            alpha_status: vec![AlphaStatus::LowerBound; l],
            p: p.to_vec(),
            active_set: (0..l).collect(),
            qd,
            cp,
            cn,
            eps: params.tolerance,
            unshrink: false,
        };

        for i in 0..l {
            solver.update_alpha_status(i);
        }
        solver.init_gradient();

        let max_iter = params.max_iterations;
        let mut counter = l.min(1000) + 1;
        let mut iter = 0usize;

        while iter < max_iter {
            counter -= 1;
            if counter == 0 {
                counter = l.min(1000);
                if params.shrinking {
                    solver.do_shrinking();
                }
            }

            let (i, j) = match solver.select_working_set() {
                Some(pair) => pair,
                None => {
                    // optimal on the active set; check again on everything
                    solver.reconstruct_gradient();
                    solver.active_size = l;
                    match solver.select_working_set() {
                        Some(pair) => {
                            counter = 1;
                            pair
                        }
                        None => break,
                    }
                }
            };

            iter += 1;
            solver.update_pair(i, j);
        }

        if iter >= max_iter {
            if solver.active_size < l {
                solver.reconstruct_gradient();
                solver.active_size = l;
            }
            warn!("reached max number of iterations ({max_iter})");
        }

        let (rho, r) = solver.calculate_rho();
        let obj = (0..l)
            .map(|i| solver.alpha[i] * (solver.g[i] + solver.p[i]))
            .sum::<f64>()
            / 2.0;

        for pos in 0..l {
            alpha[solver.active_set[pos]] = solver.alpha[pos];
        }

        debug!("optimization finished, #iter = {iter}");

        SolutionInfo {
            obj,
            rho,
            upper_bound_p: cp,
            upper_bound_n: cn,
            r,
            iterations: iter,
        }
    }

    fn init_gradient(&mut self) {
        for i in 0..self.l {
            if self.is_lower_bound(i) {
                continue;
            }
            let q_i = self.q_row(i);
            let alpha_i = self.alpha[i];
            let upper = self.is_upper_bound(i);
            let c_i = self.get_c(i);
            for j in 0..self.l {
                let q_ij = f64::from(q_i[self.active_set[j]]);
                self.g[j] += alpha_i * q_ij;
                if upper {
                    self.g_bar[j] += c_i * q_ij;
                }
            }
        }
    }

    /// Q row of the variable currently at position `pos`
    #[inline]
    pub(super) fn q_row(&mut self, pos: usize) -> Arc<[Qfloat]> {
        self.q.row(self.active_set[pos])
    }

    #[inline]
    pub(super) fn get_c(&self, i: usize) -> f64 {
        if self.y[i] > 0 {
            self.cp
        } else {
            self.cn
        }
    }

    #[inline]
    fn update_alpha_status(&mut self, i: usize) {
        self.alpha_status[i] = if self.alpha[i] >= self.get_c(i) {
            AlphaStatus::UpperBound
        } else if self.alpha[i] <= 0.0 {
            AlphaStatus::LowerBound
        } else {
            AlphaStatus::Free
        };
    }

    #[inline]
    pub(super) fn is_upper_bound(&self, i: usize) -> bool {
        self.alpha_status[i] == AlphaStatus::UpperBound
    }

    #[inline]
    pub(super) fn is_lower_bound(&self, i: usize) -> bool {
        self.alpha_status[i] == AlphaStatus::LowerBound
    }

    #[inline]
    pub(super) fn is_free(&self, i: usize) -> bool {
        self.alpha_status[i] == AlphaStatus::Free
    }

    pub(super) fn swap_index(&mut self, i: usize, j: usize) {
        self.y.swap(i, j);
        self.g.swap(i, j);
        self.alpha_status.swap(i, j);
        self.alpha.swap(i, j);
        self.p.swap(i, j);
        self.active_set.swap(i, j);
        self.g_bar.swap(i, j);
        self.qd.swap(i, j);
    }

    /// Pick the working pair, or `None` when the active set is optimal
    fn select_working_set(&mut self) -> Option<(usize, usize)> {
        match self.variant {
            SolverVariant::Standard => self.select_working_set_standard(),
            SolverVariant::Nu => self.select_working_set_nu(),
        }
    }

    fn select_working_set_standard(&mut self) -> Option<(usize, usize)> {
        // i maximizes -y_i ∇f(α)_i over I_up
        let mut gmax = -INF;
        let mut gmax_idx = None;
        for t in 0..self.active_size {
            if self.y[t] == 1 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmax {
                    gmax = -self.g[t];
                    gmax_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmax {
                gmax = self.g[t];
                gmax_idx = Some(t);
            }
        }

        let i = gmax_idx?;
        let q_i = self.q_row(i);

        // j minimizes the second-order decrease estimate over I_low
        let mut gmax2 = -INF;
        let mut gmin_idx = None;
        let mut obj_diff_min = INF;
        for j in 0..self.active_size {
            let q_ij = f64::from(q_i[self.active_set[j]]);
            let y_i = f64::from(self.y[i]);
            let candidate = if self.y[j] == 1 {
                if self.is_lower_bound(j) {
                    continue;
                }
                if self.g[j] >= gmax2 {
                    gmax2 = self.g[j];
                }
                (gmax + self.g[j], self.qd[i] + self.qd[j] - 2.0 * y_i * q_ij)
            } else {
                if self.is_upper_bound(j) {
                    continue;
                }
                if -self.g[j] >= gmax2 {
                    gmax2 = -self.g[j];
                }
                (gmax - self.g[j], self.qd[i] + self.qd[j] + 2.0 * y_i * q_ij)
            };

            let (grad_diff, quad_coef) = candidate;
            if grad_diff > 0.0 {
                let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad_coef);
                if obj_diff <= obj_diff_min {
                    gmin_idx = Some(j);
                    obj_diff_min = obj_diff;
                }
            }
        }

        if gmax + gmax2 < self.eps {
            return None;
        }
        gmin_idx.map(|j| (i, j))
    }

    fn select_working_set_nu(&mut self) -> Option<(usize, usize)> {
        let mut gmaxp = -INF;
        let mut gmaxp_idx = None;
        let mut gmaxn = -INF;
        let mut gmaxn_idx = None;

        for t in 0..self.active_size {
            if self.y[t] == 1 {
                if !self.is_upper_bound(t) && -self.g[t] >= gmaxp {
                    gmaxp = -self.g[t];
                    gmaxp_idx = Some(t);
                }
            } else if !self.is_lower_bound(t) && self.g[t] >= gmaxn {
                gmaxn = self.g[t];
                gmaxn_idx = Some(t);
            }
        }

        let q_ip = gmaxp_idx.map(|ip| self.q_row(ip));
        let q_in = gmaxn_idx.map(|in_| self.q_row(in_));

        let mut gmaxp2 = -INF;
        let mut gmaxn2 = -INF;
        let mut gmin_idx = None;
        let mut obj_diff_min = INF;

        for j in 0..self.active_size {
            let aj = self.active_set[j];
            let (grad_diff, pivot) = if self.y[j] == 1 {
                if self.is_lower_bound(j) {
                    continue;
                }
                if self.g[j] >= gmaxp2 {
                    gmaxp2 = self.g[j];
                }
                (gmaxp + self.g[j], gmaxp_idx.zip(q_ip.as_ref()))
            } else {
                if self.is_upper_bound(j) {
                    continue;
                }
                if -self.g[j] >= gmaxn2 {
                    gmaxn2 = -self.g[j];
                }
                (gmaxn - self.g[j], gmaxn_idx.zip(q_in.as_ref()))
            };

            if grad_diff > 0.0 {
                if let Some((pivot_pos, pivot_row)) = pivot {
                    let quad_coef =
                        self.qd[pivot_pos] + self.qd[j] - 2.0 * f64::from(pivot_row[aj]);
                    let obj_diff = -(grad_diff * grad_diff) / positive_or_tau(quad_coef);
                    if obj_diff <= obj_diff_min {
                        gmin_idx = Some(j);
                        obj_diff_min = obj_diff;
                    }
                }
            }
        }

        if f64::max(gmaxp + gmaxp2, gmaxn + gmaxn2) < self.eps {
            return None;
        }
        let j = gmin_idx?;
        let i = if self.y[j] == 1 { gmaxp_idx? } else { gmaxn_idx? };
        Some((i, j))
    }

    /// Analytic solution of the two-variable sub-problem, then gradient update
    fn update_pair(&mut self, i: usize, j: usize) {
        let q_i = self.q_row(i);
        let q_j = self.q_row(j);
        let q_ij = f64::from(q_i[self.active_set[j]]);

        let c_i = self.get_c(i);
        let c_j = self.get_c(j);
        let old_alpha_i = self.alpha[i];
        let old_alpha_j = self.alpha[j];

        if self.y[i] != self.y[j] {
            let quad_coef = positive_or_tau(self.qd[i] + self.qd[j] + 2.0 * q_ij);
            let delta = (-self.g[i] - self.g[j]) / quad_coef;
            let diff = self.alpha[i] - self.alpha[j];
            self.alpha[i] += delta;
            self.alpha[j] += delta;

            if diff > 0.0 {
                if self.alpha[j] < 0.0 {
                    self.alpha[j] = 0.0;
                    self.alpha[i] = diff;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = -diff;
            }
            if diff > c_i - c_j {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = c_i - diff;
                }
            } else if self.alpha[j] > c_j {
                self.alpha[j] = c_j;
                self.alpha[i] = c_j + diff;
            }
        } else {
            let quad_coef = positive_or_tau(self.qd[i] + self.qd[j] - 2.0 * q_ij);
            let delta = (self.g[i] - self.g[j]) / quad_coef;
            let sum = self.alpha[i] + self.alpha[j];
            self.alpha[i] -= delta;
            self.alpha[j] += delta;

            if sum > c_i {
                if self.alpha[i] > c_i {
                    self.alpha[i] = c_i;
                    self.alpha[j] = sum - c_i;
                }
            } else if self.alpha[j] < 0.0 {
                self.alpha[j] = 0.0;
                self.alpha[i] = sum;
            }
            if sum > c_j {
                if self.alpha[j] > c_j {
                    self.alpha[j] = c_j;
                    self.alpha[i] = sum - c_j;
                }
            } else if self.alpha[i] < 0.0 {
                self.alpha[i] = 0.0;
                self.alpha[j] = sum;
            }
        }

        let delta_alpha_i = self.alpha[i] - old_alpha_i;
        let delta_alpha_j = self.alpha[j] - old_alpha_j;
        for k in 0..self.active_size {
            let ak = self.active_set[k];
            self.g[k] += f64::from(q_i[ak]) * delta_alpha_i + f64::from(q_j[ak]) * delta_alpha_j;
        }

        let was_upper_i = self.is_upper_bound(i);
        let was_upper_j = self.is_upper_bound(j);
        self.update_alpha_status(i);
        self.update_alpha_status(j);

        self.update_g_bar(was_upper_i, i, c_i, &q_i);
        self.update_g_bar(was_upper_j, j, c_j, &q_j);
    }

    /// Keep `Ḡ = Σ_{α at upper bound} C_i Q_i` current after a status change
    fn update_g_bar(&mut self, was_upper: bool, pos: usize, c: f64, q_row: &[Qfloat]) {
        let now_upper = self.is_upper_bound(pos);
        if was_upper == now_upper {
            return;
        }
        let sign = if was_upper { -1.0 } else { 1.0 };
        for k in 0..self.l {
            self.g_bar[k] += sign * c * f64::from(q_row[self.active_set[k]]);
        }
    }

    fn calculate_rho(&self) -> (f64, f64) {
        match self.variant {
            SolverVariant::Standard => (self.calculate_rho_standard(), 0.0),
            SolverVariant::Nu => self.calculate_rho_nu(),
        }
    }

    fn calculate_rho_standard(&self) -> f64 {
        let mut nr_free = 0usize;
        let mut ub = INF;
        let mut lb = -INF;
        let mut sum_free = 0.0;

        for i in 0..self.active_size {
            let yg = f64::from(self.y[i]) * self.g[i];

            if self.is_upper_bound(i) {
                if self.y[i] == -1 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            } else if self.is_lower_bound(i) {
                if self.y[i] == 1 {
                    ub = ub.min(yg);
                } else {
                    lb = lb.max(yg);
                }
            } else {
                nr_free += 1;
                sum_free += yg;
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else {
            (ub + lb) / 2.0
        }
    }

    fn calculate_rho_nu(&self) -> (f64, f64) {
        // index 0 collects y = +1, index 1 collects y = -1
        let mut nr_free = [0usize; 2];
        let mut ub = [INF; 2];
        let mut lb = [-INF; 2];
        let mut sum_free = [0.0; 2];

        for i in 0..self.active_size {
            let side = usize::from(self.y[i] != 1);
            if self.is_upper_bound(i) {
                lb[side] = lb[side].max(self.g[i]);
            } else if self.is_lower_bound(i) {
                ub[side] = ub[side].min(self.g[i]);
            } else {
                nr_free[side] += 1;
                sum_free[side] += self.g[i];
            }
        }

        let offset = |side: usize| {
            if nr_free[side] > 0 {
                sum_free[side] / nr_free[side] as f64
            } else {
                (ub[side] + lb[side]) / 2.0
            }
        };
        let r1 = offset(0);
        let r2 = offset(1);
        ((r1 - r2) / 2.0, (r1 + r2) / 2.0)
    }
}

#[inline]
fn positive_or_tau(quad_coef: f64) -> f64 {
    if quad_coef > 0.0 {
        quad_coef
    } else {
        TAU
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Dense Q for hand-built problems
    struct DenseQ {
        rows: Vec<Vec<Qfloat>>,
        qd: Vec<f64>,
    }

    impl DenseQ {
        fn new(rows: Vec<Vec<f64>>) -> Self {
            let qd = (0..rows.len()).map(|i| rows[i][i]).collect();
            let rows = rows
                .into_iter()
                .map(|r| r.into_iter().map(|v| v as Qfloat).collect())
                .collect();
            Self { rows, qd }
        }
    }

    impl QMatrix for DenseQ {
        fn size(&self) -> usize {
            self.rows.len()
        }

        fn row(&mut self, i: usize) -> Arc<[Qfloat]> {
            self.rows[i].clone().into()
        }

        fn diagonal(&self) -> &[f64] {
            &self.qd
        }
    }

    fn params(variant: SolverVariant, shrinking: bool) -> SolverParams {
        SolverParams {
            variant,
            tolerance: 1e-3,
            shrinking,
            max_iterations: 10_000,
        }
    }

    #[test]
    fn test_two_point_separable_problem() {
        // x = -1 (y=-1), x = +1 (y=+1), linear kernel: Q_ij = y_i y_j x_i x_j
        let mut q = DenseQ::new(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        let mut alpha = vec![0.0, 0.0];
        let info = Solver::solve(
            &mut q,
            &[-1.0, -1.0],
            &[-1, 1],
            &mut alpha,
            10.0,
            10.0,
            &params(SolverVariant::Standard, true),
        );

        // w = 1 needs α = 0.5 on both points; the margin is symmetric
        assert_abs_diff_eq!(alpha[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(alpha[1], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(info.rho, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(info.obj, -0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_box_constraint_is_respected() {
        let mut q = DenseQ::new(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        let mut alpha = vec![0.0, 0.0];
        Solver::solve(
            &mut q,
            &[-1.0, -1.0],
            &[-1, 1],
            &mut alpha,
            0.1,
            0.1,
            &params(SolverVariant::Standard, false),
        );

        assert_abs_diff_eq!(alpha[0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(alpha[1], 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_equality_constraint_preserved() {
        // three points on a line, labels +1 +1 -1
        let x = [0.0_f64, 1.0, 3.0];
        let y = [1_i8, 1, -1];
        let rows = (0..3)
            .map(|i| {
                (0..3)
                    .map(|j| f64::from(y[i] * y[j]) * (x[i] * x[j] + 1.0))
                    .collect()
            })
            .collect();
        let mut q = DenseQ::new(rows);
        let mut alpha = vec![0.0; 3];
        Solver::solve(
            &mut q,
            &[-1.0; 3],
            &y,
            &mut alpha,
            5.0,
            5.0,
            &params(SolverVariant::Standard, true),
        );

        let balance: f64 = alpha.iter().zip(&y).map(|(a, &yi)| a * f64::from(yi)).sum();
        assert_abs_diff_eq!(balance, 0.0, epsilon = 1e-9);
        assert!(alpha.iter().all(|&a| (0.0..=5.0).contains(&a)));
    }

    #[test]
    fn test_nu_variant_keeps_per_class_sums() {
        let mut q = DenseQ::new(vec![
            vec![1.0, 0.5, -0.2, -0.1],
            vec![0.5, 1.0, -0.3, -0.4],
            vec![-0.2, -0.3, 1.0, 0.6],
            vec![-0.1, -0.4, 0.6, 1.0],
        ]);
        let y = [1_i8, 1, -1, -1];
        let mut alpha = vec![0.5, 0.0, 0.5, 0.0];
        let info = Solver::solve(
            &mut q,
            &[0.0; 4],
            &y,
            &mut alpha,
            1.0,
            1.0,
            &params(SolverVariant::Nu, true),
        );

        assert_abs_diff_eq!(alpha[0] + alpha[1], 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(alpha[2] + alpha[3], 0.5, epsilon = 1e-9);
        assert!(info.r.is_finite());
    }

    #[test]
    fn test_iteration_cap_returns_feasible_point() {
        let mut q = DenseQ::new(vec![vec![1.0, 1.0], vec![1.0, 1.0]]);
        let mut alpha = vec![0.0, 0.0];
        let info = Solver::solve(
            &mut q,
            &[-1.0, -1.0],
            &[-1, 1],
            &mut alpha,
            10.0,
            10.0,
            &SolverParams {
                max_iterations: 0,
                ..params(SolverVariant::Standard, true)
            },
        );
        assert_eq!(info.iterations, 0);
        assert_eq!(alpha, vec![0.0, 0.0]);
    }
}
