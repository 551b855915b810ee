use enum_dispatch::enum_dispatch;

use super::{input_params::ModelParams, type_lib::{NumericData, State}};

/// Floor on the total volume before it divides anything.
pub const V_TOTAL_FLOOR: NumericData = 1e-50;
/// Floor on H^2 before the square root.
pub const H2_FLOOR: NumericData = 1e-20;
/// Amplitude and exponent of the early positive pressure source.
pub const P_POS_AMPLITUDE: NumericData = 850.0;
pub const P_POS_EXPONENT: NumericData = 1.7;
/// Exponent of the void-growth saturation term.
pub const VOID_GROWTH_EXPONENT: NumericData = 1.8;

/// A physical law evolving the state (a, V_v, E).
///
/// The result is undefined for a <= 0 or t <= 0; the time grid and the
/// initial state of a run guarantee both stay positive.
#[enum_dispatch]
pub trait ModelTrait {
    fn rhs(&self, t: NumericData, y: &State) -> State;
}

#[enum_dispatch(ModelTrait)]
pub enum ModelKinds {
    Cei(CeiModel),
}

/// The elastic-vacuum model: matter collapse opens voids, early positive
/// pressure stores elastic energy, and rho_v = E / V_total closes the
/// Friedmann constraint H^2 = rho_m + rho_v.
pub struct CeiModel {
    pub params: ModelParams,
}

impl CeiModel {
    pub fn new(params: ModelParams) -> Self {
        CeiModel { params }
    }

    /// Early positive pressure, singular as t -> 0 and exactly zero from
    /// t_recomb onwards (the boundary takes the zero branch).
    pub fn positive_pressure(&self, t: NumericData) -> NumericData {
        if t < self.params.t_recomb {
            P_POS_AMPLITUDE * (self.params.t_recomb / t).powf(P_POS_EXPONENT)
        } else {
            0.0
        }
    }

    /// Matter density at scale factor a, diluting as a^-3.
    pub fn matter_density(&self, a: NumericData) -> NumericData {
        self.params.rho_m0_target * (self.params.a_recomb / a).powi(3)
    }
}

impl ModelTrait for CeiModel {
    fn rhs(&self, t: NumericData, y: &State) -> State {
        let p = &self.params;
        let [a, v_v, e] = *y;

        let v_total = (p.v_m_total + v_v).max(V_TOTAL_FLOOR);
        let void_fraction_left = 1.0 - v_v / v_total;

        let rho_m = self.matter_density(a);
        let p_pos = self.positive_pressure(t);

        let de_dt = if t < p.t_recomb {
            p.eta * p_pos * void_fraction_left
        } else {
            0.0
        };

        // Vacuum volume only ever grows; collapse-driven void formation
        // cannot reverse.
        let dv_v_dt = (p.beta * rho_m * p.v_m_total
            + p.gamma * e * void_fraction_left.powf(VOID_GROWTH_EXPONENT))
            .max(0.0);

        let rho_v = e / v_total;
        let h = (rho_m + rho_v).max(H2_FLOOR).sqrt();
        let da_dt = a * h;

        [da_dt, dv_v_dt, de_dt]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cei() -> CeiModel {
        CeiModel::new(ModelParams::new())
    }

    #[test]
    fn positive_pressure_vanishes_at_and_after_recombination() {
        let model = cei();
        let t_recomb = model.params.t_recomb;
        assert_eq!(model.positive_pressure(t_recomb), 0.0);
        assert_eq!(model.positive_pressure(1e-5), 0.0);
        assert_eq!(model.positive_pressure(1.0), 0.0);
        assert!(model.positive_pressure(t_recomb * 0.5) > 0.0);
    }

    #[test]
    fn elastic_sourcing_stops_at_recombination_boundary() {
        let model = cei();
        let y = [1e-3, 1e-10, 0.5];
        let at_boundary = model.rhs(model.params.t_recomb, &y);
        assert_eq!(at_boundary[2], 0.0);
        let after = model.rhs(1e-3, &y);
        assert_eq!(after[2], 0.0);
        let before = model.rhs(model.params.t_recomb * 0.9, &y);
        assert!(before[2] > 0.0);
    }

    #[test]
    fn void_growth_rate_never_negative() {
        let model = cei();
        // An artificial negative elastic energy makes the unclamped
        // formula negative; the clamp must engage.
        let y = [1e6, 1e-10, -1e12];
        let dy = model.rhs(1e-3, &y);
        assert_eq!(dy[1], 0.0);

        // A huge vacuum volume drives the saturation factor to zero but
        // the rate must stay non-negative.
        let y = [1e-3, 1e30, 1.0];
        let dy = model.rhs(1e-3, &y);
        assert!(dy[1] >= 0.0);
    }

    #[test]
    fn hubble_rate_floors_when_densities_vanish() {
        let mut params = ModelParams::new();
        params.rho_m0_target = 0.0;
        let model = CeiModel::new(params);
        let y = [1.0, 0.0, 0.0];
        let dy = model.rhs(1.0, &y);
        // H floors at sqrt(1e-20) rather than hitting a negative sqrt.
        assert!((dy[0] - 1e-10).abs() < 1e-22);
    }

    #[test]
    fn expansion_rate_positive_for_valid_states() {
        let model = cei();
        let dy = model.rhs(1e-8, &model.params.initial_state());
        assert!(dy[0] > 0.0);
        assert!(dy[1] >= 0.0);
        assert!(dy[2] > 0.0);
    }
}
