use serde::{Deserialize, Serialize};

use super::type_lib::NumericData;

/// Physical constants of the elastic-vacuum model. Fixed for the duration
/// of a run; threaded by reference into the RHS and the post-processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelParams {
    pub h0: NumericData,
    pub rho_m0_target: NumericData,
    pub a_recomb: NumericData,
    pub t_recomb: NumericData,
    pub t_today: NumericData,
    pub t_max: NumericData,
    pub v_m_total: NumericData,
    pub eta: NumericData,
    pub k_elastic: NumericData,
    pub beta: NumericData,
    pub gamma: NumericData,
}

impl ModelParams {
    pub fn new() -> Self {
        ModelParams {
            h0: 1.0,
            rho_m0_target: 0.30,
            a_recomb: 1e-3,
            t_recomb: 1e-6,
            t_today: 1.0,
            t_max: 1.5,
            v_m_total: 6.0,
            eta: 0.90,
            k_elastic: 1.0,
            beta: 0.025,
            gamma: 3.2,
        }
    }

    /// Initial state (a, V_v, E) at the start of the grid.
    pub fn initial_state(&self) -> [NumericData; 3] {
        [self.a_recomb, 1e-60, 0.0]
    }
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams::new()
    }
}

pub struct TimeGrid {
    pub t_grid: Vec<NumericData>,
}

impl TimeGrid {
    /// Strictly increasing geometrically spaced samples from t_min to t_max.
    pub fn new_geometrically_spaced(t_min: NumericData, t_max: NumericData, n_samples: usize) -> Self {
        let t_grid: Vec<NumericData> = (0..n_samples).map(|i| t_min * (t_max/t_min).powf(i as NumericData/(n_samples-1) as NumericData)).collect();
        TimeGrid {
            t_grid,
        }
    }

    pub fn from_samples(t_grid: Vec<NumericData>) -> Self {
        TimeGrid { t_grid }
    }

    pub fn len(&self) -> usize {
        self.t_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t_grid.is_empty()
    }

    /// Index of the sample closest to t by absolute difference.
    pub fn nearest_index(&self, t: NumericData) -> usize {
        let mut best = 0;
        let mut best_dist = NumericData::INFINITY;
        for (i, &ti) in self.t_grid.iter().enumerate() {
            let dist = (ti - t).abs();
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }
}
