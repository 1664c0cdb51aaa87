//! Shrinking heuristic
//!
//! Variables stuck at a bound whose gradient says they will stay there are
//! moved behind `active_size` and skipped by working set selection. Their
//! gradient is rebuilt from `Ḡ` before the final optimality check, or once
//! the maximal violation drops under `10 * eps`.

use crate::solver::qmatrix::QMatrix;
use crate::solver::smo::{Solver, SolverVariant, INF};
use log::debug;

impl<Q: QMatrix + ?Sized> Solver<'_, Q> {
    pub(super) fn do_shrinking(&mut self) {
        match self.variant {
            SolverVariant::Standard => self.do_shrinking_standard(),
            SolverVariant::Nu => self.do_shrinking_nu(),
        }
    }

    /// Recompute `G` for every inactive variable
    pub(super) fn reconstruct_gradient(&mut self) {
        if self.active_size == self.l {
            return;
        }

        let active_size = self.active_size;
        let l = self.l;

        for j in active_size..l {
            self.g[j] = self.g_bar[j] + self.p[j];
        }

        let nr_free = (0..active_size).filter(|&j| self.is_free(j)).count();
        if 2 * nr_free < active_size {
            debug!("few free variables; disabling shrinking may be faster");
        }

        // walk whichever side touches fewer Q entries
        if nr_free * l > 2 * active_size * (l - active_size) {
            for i in active_size..l {
                let q_i = self.q_row(i);
                for j in 0..active_size {
                    if self.is_free(j) {
                        self.g[i] += self.alpha[j] * f64::from(q_i[self.active_set[j]]);
                    }
                }
            }
        } else {
            for i in 0..active_size {
                if !self.is_free(i) {
                    continue;
                }
                let q_i = self.q_row(i);
                let alpha_i = self.alpha[i];
                for j in active_size..l {
                    self.g[j] += alpha_i * f64::from(q_i[self.active_set[j]]);
                }
            }
        }
    }

    fn be_shrunk_standard(&self, i: usize, gmax1: f64, gmax2: f64) -> bool {
        if self.is_upper_bound(i) {
            if self.y[i] == 1 {
                -self.g[i] > gmax1
            } else {
                -self.g[i] > gmax2
            }
        } else if self.is_lower_bound(i) {
            if self.y[i] == 1 {
                self.g[i] > gmax2
            } else {
                self.g[i] > gmax1
            }
        } else {
            false
        }
    }

    fn do_shrinking_standard(&mut self) {
        // the two maxima swap roles between positive and negative variables
        let mut gmax1 = -INF;
        let mut gmax2 = -INF;

        for i in 0..self.active_size {
            let (up, low) = (-self.g[i], self.g[i]);
            let (up_slot, low_slot) = if self.y[i] == 1 {
                (&mut gmax1, &mut gmax2)
            } else {
                (&mut gmax2, &mut gmax1)
            };
            if !self.is_upper_bound(i) && up >= *up_slot {
                *up_slot = up;
            }
            if !self.is_lower_bound(i) && low >= *low_slot {
                *low_slot = low;
            }
        }

        if !self.unshrink && gmax1 + gmax2 <= self.eps * 10.0 {
            self.unshrink = true;
            self.reconstruct_gradient();
            self.active_size = self.l;
        }

        self.compact_active_set(|s, i| s.be_shrunk_standard(i, gmax1, gmax2));
    }

    fn be_shrunk_nu(&self, i: usize, gmax: [f64; 4]) -> bool {
        if self.is_upper_bound(i) {
            if self.y[i] == 1 {
                -self.g[i] > gmax[0]
            } else {
                -self.g[i] > gmax[3]
            }
        } else if self.is_lower_bound(i) {
            if self.y[i] == 1 {
                self.g[i] > gmax[1]
            } else {
                self.g[i] > gmax[2]
            }
        } else {
            false
        }
    }

    fn do_shrinking_nu(&mut self) {
        // [max -G (y=+1, not upper), max G (y=+1, not lower),
        //  max G (y=-1, not lower), max -G (y=-1, not upper)]
        let mut gmax = [-INF; 4];

        for i in 0..self.active_size {
            let positive = self.y[i] == 1;
            if !self.is_upper_bound(i) {
                let slot = if positive { 0 } else { 3 };
                if -self.g[i] > gmax[slot] {
                    gmax[slot] = -self.g[i];
                }
            }
            if !self.is_lower_bound(i) {
                let slot = if positive { 1 } else { 2 };
                if self.g[i] > gmax[slot] {
                    gmax[slot] = self.g[i];
                }
            }
        }

        if !self.unshrink && f64::max(gmax[0] + gmax[1], gmax[2] + gmax[3]) <= self.eps * 10.0 {
            self.unshrink = true;
            self.reconstruct_gradient();
            self.active_size = self.l;
        }

        self.compact_active_set(|s, i| s.be_shrunk_nu(i, gmax));
    }

    /// Move every shrinkable variable behind `active_size`
    fn compact_active_set<F>(&mut self, be_shrunk: F)
    where
        F: Fn(&Self, usize) -> bool,
    {
        let mut i = 0;
        while i < self.active_size {
            if be_shrunk(self, i) {
                self.active_size -= 1;
                while self.active_size > i {
                    if !be_shrunk(self, self.active_size) {
                        self.swap_index(i, self.active_size);
                        break;
                    }
                    self.active_size -= 1;
                }
            }
            i += 1;
        }
    }
}
