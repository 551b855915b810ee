use ndarray::Array2;

use super::{input_params::TimeGrid, model::ModelTrait, type_lib::{NumericData, State, STATE_DIM}};

/// Dormand-Prince 5(4) Butcher tableau.
const STAGES: usize = 7;

const C: [NumericData; STAGES] = [0.0, 1.0/5.0, 3.0/10.0, 4.0/5.0, 8.0/9.0, 1.0, 1.0];

const A: [[NumericData; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0/5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0/40.0, 9.0/40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0/45.0, -56.0/15.0, 32.0/9.0, 0.0, 0.0, 0.0],
    [19372.0/6561.0, -25360.0/2187.0, 64448.0/6561.0, -212.0/729.0, 0.0, 0.0],
    [9017.0/3168.0, -355.0/33.0, 46732.0/5247.0, 49.0/176.0, -5103.0/18656.0, 0.0],
    [35.0/384.0, 0.0, 500.0/1113.0, 125.0/192.0, -2187.0/6784.0, 11.0/84.0],
];

/// Weights of the fifth order solution.
const B: [NumericData; STAGES] = [35.0/384.0, 0.0, 500.0/1113.0, 125.0/192.0, -2187.0/6784.0, 11.0/84.0, 0.0];

/// Difference between the fifth and the embedded fourth order weights.
const B_ERR: [NumericData; STAGES] = [71.0/57600.0, 0.0, -71.0/16695.0, 71.0/1920.0, -17253.0/339200.0, 22.0/525.0, -1.0/40.0];

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub fn_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
}

/// Step-size I-controller: h_new = safety * h * error^(-1/(p+1)), p = 4.
#[derive(Debug, Clone)]
pub struct StepController {
    pub safety: NumericData,
    pub max_factor: NumericData,
    pub min_factor: NumericData,
    exponent: NumericData,
}

impl Default for StepController {
    fn default() -> Self {
        StepController {
            safety: 0.9,
            max_factor: 5.0,
            min_factor: 0.2,
            exponent: 1.0 / 5.0,
        }
    }
}

impl StepController {
    pub fn compute_factor(&self, error: NumericData) -> NumericData {
        if error == 0.0 {
            return self.max_factor;
        }
        (self.safety * error.powf(-self.exponent)).clamp(self.min_factor, self.max_factor)
    }
}

/// Error is scaled as |y5 - y4| / (atol + rtol * |y5|) per component.
#[derive(Debug, Clone)]
pub struct Tolerances {
    pub rtol: NumericData,
    pub atol: NumericData,
}

impl Tolerances {
    pub fn new(rtol: NumericData, atol: NumericData) -> Self {
        Tolerances { rtol, atol }
    }
}

#[derive(Debug)]
pub enum SolverError {
    NonFiniteState { t: NumericData },
    StepSizeTooSmall { t: NumericData, h: NumericData },
    MaxStepsExceeded,
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::NonFiniteState { t } => write!(f, "state became non-finite at t = {}", t),
            SolverError::StepSizeTooSmall { t, h } => write!(f, "step size underflow at t = {} (h = {})", t, h),
            SolverError::MaxStepsExceeded => write!(f, "step budget exhausted before reaching the end of the grid"),
        }
    }
}

impl std::error::Error for SolverError {}

pub struct StepResult {
    pub y: State,
    pub t: NumericData,
    pub error: NumericData,
    pub h_next: NumericData,
    pub accepted: bool,
}

/// Adaptive Dormand-Prince 5(4) integrator reporting at the samples of a
/// prescribed time grid. Internal sub-steps never overshoot the next
/// requested sample.
pub struct Dp54 {
    tol: Tolerances,
    controller: StepController,
    pub max_steps: u64,
    k: [State; STAGES],
    pub stats: Stats,
}

impl Dp54 {
    pub fn new(tol: Tolerances) -> Self {
        Dp54 {
            tol,
            controller: StepController::default(),
            max_steps: 50_000_000,
            k: [[0.0; STATE_DIM]; STAGES],
            stats: Stats::default(),
        }
    }

    /// Single trial step of size h from (t, y).
    pub fn step<M: ModelTrait>(&mut self, model: &M, t: NumericData, y: &State, h: NumericData) -> StepResult {
        self.compute_stages(model, t, y, h);
        let y5 = self.compute_solution(y, h);
        let error = self.compute_error(&y5, h);
        let accepted = error <= 1.0;

        let factor = self.controller.compute_factor(error);
        let h_next = h * factor;

        self.stats.fn_evals += STAGES as u64;
        if accepted {
            self.stats.accepted_steps += 1;
        } else {
            self.stats.rejected_steps += 1;
        }

        StepResult {
            y: y5,
            t: t + h,
            error,
            h_next,
            accepted,
        }
    }

    /// Integrate y0 across the full grid, returning one state row per
    /// grid sample (the first row is y0 itself).
    pub fn integrate_grid<M: ModelTrait>(&mut self, model: &M, y0: &State, grid: &TimeGrid) -> Result<Array2<NumericData>, SolverError> {
        let n_samples = grid.len();
        let mut trajectory = Array2::<NumericData>::zeros((n_samples, STATE_DIM));

        let mut t = grid.t_grid[0];
        let mut y = *y0;
        for (col, value) in y.iter().enumerate() {
            trajectory[[0, col]] = *value;
        }
        if n_samples == 1 {
            return Ok(trajectory);
        }

        let mut h = (grid.t_grid[1] - grid.t_grid[0]) * 0.5;
        let mut step_count = 0u64;

        for sample in 1..n_samples {
            let target = grid.t_grid[sample];

            while t < target {
                let h_trial = h.min(target - t);
                let result = self.step(model, t, &y, h_trial);

                if result.accepted {
                    t = result.t;
                    y = result.y;
                    if !y.iter().all(|v| v.is_finite()) {
                        return Err(SolverError::NonFiniteState { t });
                    }
                } else if result.h_next < t * NumericData::EPSILON {
                    // A rejected step that can no longer shrink means the
                    // controller has stalled.
                    return Err(SolverError::StepSizeTooSmall { t, h: result.h_next });
                }

                h = result.h_next;

                step_count += 1;
                if step_count > self.max_steps {
                    return Err(SolverError::MaxStepsExceeded);
                }
            }

            for (col, value) in y.iter().enumerate() {
                trajectory[[sample, col]] = *value;
            }
        }

        Ok(trajectory)
    }

    fn compute_stages<M: ModelTrait>(&mut self, model: &M, t: NumericData, y: &State, h: NumericData) {
        self.k[0] = model.rhs(t, y);

        let mut y_temp = [0.0; STATE_DIM];
        for i in 1..STAGES {
            for n in 0..STATE_DIM {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * self.k[j][n];
                }
                y_temp[n] = y[n] + h * sum;
            }
            self.k[i] = model.rhs(t + C[i] * h, &y_temp);
        }
    }

    fn compute_solution(&self, y: &State, h: NumericData) -> State {
        let mut y_new = [0.0; STATE_DIM];
        for n in 0..STATE_DIM {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += B[i] * self.k[i][n];
            }
            y_new[n] = y[n] + h * sum;
        }
        y_new
    }

    fn compute_error(&self, y5: &State, h: NumericData) -> NumericData {
        let mut max_err: NumericData = 0.0;
        for n in 0..STATE_DIM {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += B_ERR[i] * self.k[i][n];
            }
            err_n *= h;

            let scale = self.tol.atol + self.tol.rtol * y5[n].abs();
            max_err = max_err.max(err_n.abs() / scale);
        }
        max_err
    }
}
