//! Dense state/rate arrays over the categorical dimensions.
//!
//! Flat `Vec` storage with explicit index arithmetic; the size-bin axis is
//! innermost. `XmzArray` spans (sex, maturity, size); `XmszArray` adds the
//! shell-condition axis and is the shape of the numbers-at-size state.

use cs_ad::Scalar;
use cs_core::dims::{N_MATURITY, N_SEXES, N_SHELL};

/// Dense array indexed by (sex, maturity, size bin).
#[derive(Debug, Clone)]
pub struct XmzArray<T> {
    data: Vec<T>,
    n_bins: usize,
}

impl<T: Scalar> XmzArray<T> {
    /// All-zero array.
    pub fn zeros(n_bins: usize) -> Self {
        Self { data: vec![T::zero(); N_SEXES * N_MATURITY * n_bins], n_bins }
    }

    /// Number of size bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    #[inline]
    fn idx(&self, x: usize, m: usize, z: usize) -> usize {
        (x * N_MATURITY + m) * self.n_bins + z
    }

    /// Read one cell.
    #[inline]
    pub fn get(&self, x: usize, m: usize, z: usize) -> T {
        self.data[self.idx(x, m, z)]
    }

    /// Write one cell.
    #[inline]
    pub fn set(&mut self, x: usize, m: usize, z: usize, v: T) {
        let i = self.idx(x, m, z);
        self.data[i] = v;
    }

    /// Flat view of the data.
    pub fn values(&self) -> &[T] {
        &self.data
    }
}

/// Dense array indexed by (sex, maturity, shell, size bin); the shape of the
/// numbers-at-size state and of capture/catchability rates.
#[derive(Debug, Clone)]
pub struct XmszArray<T> {
    data: Vec<T>,
    n_bins: usize,
}

impl<T: Scalar> XmszArray<T> {
    /// All-zero array.
    pub fn zeros(n_bins: usize) -> Self {
        Self { data: vec![T::zero(); N_SEXES * N_MATURITY * N_SHELL * n_bins], n_bins }
    }

    /// Number of size bins.
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    #[inline]
    fn idx(&self, x: usize, m: usize, s: usize, z: usize) -> usize {
        ((x * N_MATURITY + m) * N_SHELL + s) * self.n_bins + z
    }

    /// Read one cell.
    #[inline]
    pub fn get(&self, x: usize, m: usize, s: usize, z: usize) -> T {
        self.data[self.idx(x, m, s, z)]
    }

    /// Write one cell.
    #[inline]
    pub fn set(&mut self, x: usize, m: usize, s: usize, z: usize, v: T) {
        let i = self.idx(x, m, s, z);
        self.data[i] = v;
    }

    /// Add to one cell.
    #[inline]
    pub fn add(&mut self, x: usize, m: usize, s: usize, z: usize, v: T) {
        let i = self.idx(x, m, s, z);
        self.data[i] = self.data[i] + v;
    }

    /// Flat view of the data.
    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Sum over every cell.
    pub fn total(&self) -> T {
        self.data.iter().copied().sum()
    }

    /// Elementwise map into a new array.
    pub fn map<U: Scalar>(&self, f: impl Fn(T) -> U) -> XmszArray<U> {
        XmszArray { data: self.data.iter().map(|&v| f(v)).collect(), n_bins: self.n_bins }
    }

    /// Iterate `(sex, maturity, shell, bin, value)` over all cells.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, usize, usize, T)> + '_ {
        let nb = self.n_bins;
        self.data.iter().copied().enumerate().map(move |(i, v)| {
            let z = i % nb;
            let s = (i / nb) % N_SHELL;
            let m = (i / (nb * N_SHELL)) % N_MATURITY;
            let x = i / (nb * N_SHELL * N_MATURITY);
            (x, m, s, z, v)
        })
    }

    /// Snapshot of primal values (for reports and diagnostics).
    pub fn primal(&self) -> XmszArray<f64> {
        self.map(|v| v.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_core::dims::{FEMALE, IMMATURE, MALE, MATURE, NEW_SHELL, OLD_SHELL};

    #[test]
    fn test_xmsz_round_trip() {
        let mut a = XmszArray::<f64>::zeros(3);
        a.set(FEMALE, MATURE, OLD_SHELL, 2, 7.0);
        a.add(FEMALE, MATURE, OLD_SHELL, 2, 1.0);
        assert_eq!(a.get(FEMALE, MATURE, OLD_SHELL, 2), 8.0);
        assert_eq!(a.get(MALE, IMMATURE, NEW_SHELL, 0), 0.0);
        assert_eq!(a.total(), 8.0);
    }

    #[test]
    fn test_cells_enumeration_matches_get() {
        let mut a = XmszArray::<f64>::zeros(2);
        a.set(MALE, MATURE, NEW_SHELL, 1, 3.0);
        let found: Vec<_> = a.cells().filter(|&(.., v)| v != 0.0).collect();
        assert_eq!(found, vec![(MALE, MATURE, NEW_SHELL, 1, 3.0)]);
    }

    #[test]
    fn test_xmz_indexing() {
        let mut a = XmzArray::<f64>::zeros(4);
        a.set(FEMALE, IMMATURE, 3, 2.5);
        assert_eq!(a.get(FEMALE, IMMATURE, 3), 2.5);
        assert_eq!(a.values().iter().filter(|&&v| v != 0.0).count(), 1);
    }
}
