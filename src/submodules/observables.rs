use ndarray::{Array1, Array2};
use plotters::prelude::*;

use super::{input_params::{ModelParams, TimeGrid}, type_lib::NumericData};
use super::model::{P_POS_AMPLITUDE, P_POS_EXPONENT};

pub enum ObservableField {
    T,
    ANorm,
    Vv,
    E,
    OmegaM,
    OmegaV,
    RhoM,
    RhoV,
    Pv,
    Ppos,
    Ddota,
}

impl ObservableField {
    pub fn to_str(&self) -> &str {
        match self {
            ObservableField::T => "t",
            ObservableField::ANorm => "a_norm",
            ObservableField::Vv => "V_v",
            ObservableField::E => "E",
            ObservableField::OmegaM => "omega_m",
            ObservableField::OmegaV => "omega_v",
            ObservableField::RhoM => "rho_m",
            ObservableField::RhoV => "rho_v",
            ObservableField::Pv => "P_v",
            ObservableField::Ppos => "P_pos",
            ObservableField::Ddota => "ddota",
        }
    }
}

/// Derived quantities of one finished run. Built once from the raw
/// trajectory, never mutated afterwards.
pub struct Observables {
    pub t: Array1<NumericData>,
    pub a_norm: Array1<NumericData>,
    pub v_v: Array1<NumericData>,
    pub e: Array1<NumericData>,
    pub omega_m: Array1<NumericData>,
    pub omega_v: Array1<NumericData>,
    pub rho_m: Array1<NumericData>,
    pub rho_v: Array1<NumericData>,
    pub p_v: Array1<NumericData>,
    pub p_pos: Array1<NumericData>,
    pub ddota: Array1<NumericData>,
    pub idx_today: usize,
    pub t_recomb: NumericData,
}

impl Observables {
    pub fn from_trajectory(params: &ModelParams, grid: &TimeGrid, trajectory: &Array2<NumericData>) -> Self {
        let t = Array1::from_vec(grid.t_grid.clone());
        let a = trajectory.column(0).to_owned();
        let v_v = trajectory.column(1).to_owned();
        let e = trajectory.column(2).to_owned();

        let idx_today = grid.nearest_index(params.t_today);
        let a_norm = &a / a[idx_today];

        // Fractional volumes use the raw vacuum volume; the a rescaling
        // does not touch V_v.
        let v_total = v_v.mapv(|v| params.v_m_total + v);
        let omega_m = v_total.mapv(|v| params.v_m_total / v);
        let omega_v = &v_v / &v_total;

        // Reporting-side matter density from the normalized scale factor.
        // The RHS uses the raw a internally; the two passes stay distinct
        // as part of the model's calibration.
        let rho_m = a_norm.mapv(|an| params.rho_m0_target * (params.a_recomb / an).powi(3));
        let rho_v = &e / &v_total;
        let p_v = e.mapv(|ei| -params.k_elastic * ei);
        let p_pos = t.mapv(|ti| {
            if ti < params.t_recomb {
                P_POS_AMPLITUDE * (params.t_recomb / ti).powf(P_POS_EXPONENT)
            } else {
                0.0
            }
        });

        let ddota = Array1::from_shape_fn(t.len(), |i| {
            -(rho_m[i] + 3.0 * p_pos[i]) - (rho_v[i] + 3.0 * p_v[i])
        });

        Observables {
            t,
            a_norm,
            v_v,
            e,
            omega_m,
            omega_v,
            rho_m,
            rho_v,
            p_v,
            p_pos,
            ddota,
            idx_today,
            t_recomb: params.t_recomb,
        }
    }

    pub fn get(&self, field: &ObservableField) -> &Array1<NumericData> {
        match field {
            ObservableField::T => &self.t,
            ObservableField::ANorm => &self.a_norm,
            ObservableField::Vv => &self.v_v,
            ObservableField::E => &self.e,
            ObservableField::OmegaM => &self.omega_m,
            ObservableField::OmegaV => &self.omega_v,
            ObservableField::RhoM => &self.rho_m,
            ObservableField::RhoV => &self.rho_v,
            ObservableField::Pv => &self.p_v,
            ObservableField::Ppos => &self.p_pos,
            ObservableField::Ddota => &self.ddota,
        }
    }

    /// Present-day density parameters (omega_m, omega_v).
    pub fn omega_today(&self) -> (NumericData, NumericData) {
        (self.omega_m[self.idx_today], self.omega_v[self.idx_today])
    }

    pub fn report(&self) {
        let (omega_m, omega_v) = self.omega_today();
        println!("--- CEI model results ---");
        println!("\\Omega_m = {:.3}", omega_m);
        println!("\\Omega_v = {:.3}", omega_v);
    }

    /// Render the four diagnostic panels into one image: expansion,
    /// void growth, elastic memory, and the density parameters.
    pub fn plot_summary(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, (1280, 960)).into_drawing_area();
        root.fill(&WHITE)?;
        let panels = root.split_evenly((2, 2));

        self.line_panel(&panels[0], "Cosmic expansion", "a(t)", &ObservableField::ANorm, &BLUE)?;
        self.line_panel(&panels[1], "Void growth", "V_v(t)", &ObservableField::Vv, &GREEN)?;

        // Elastic memory with the recombination epoch marked.
        {
            let y = &self.e;
            let (y_min, y_max) = Observables::value_range(y);
            let x_spec = (self.t[0]..self.t[self.t.len() - 1]).log_scale();
            let mut chart = ChartBuilder::on(&panels[2])
                .caption("Elastic memory", ("sans-serif", 24).into_font())
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(50)
                .build_cartesian_2d(x_spec, y_min..y_max)?;
            chart.configure_mesh().x_desc("t").y_desc("E(t)").draw()?;
            chart
                .draw_series(LineSeries::new(
                    self.t.iter().zip(y.iter()).map(|(t, v)| (*t, *v)),
                    &RED,
                ))?;
            chart
                .draw_series(LineSeries::new(
                    vec![(self.t_recomb, y_min), (self.t_recomb, y_max)],
                    &BLACK,
                ))?
                .label("t_recomb")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        // Density parameters overlaid.
        {
            let x_spec = (self.t[0]..self.t[self.t.len() - 1]).log_scale();
            let mut chart = ChartBuilder::on(&panels[3])
                .caption("Density parameters", ("sans-serif", 24).into_font())
                .margin(10)
                .x_label_area_size(30)
                .y_label_area_size(50)
                .build_cartesian_2d(x_spec, 0.0..1.0)?;
            chart.configure_mesh().x_desc("t").y_desc("Omega").draw()?;
            chart
                .draw_series(LineSeries::new(
                    self.t.iter().zip(self.omega_m.iter()).map(|(t, v)| (*t, *v)),
                    &MAGENTA,
                ))?
                .label("Omega_m")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &MAGENTA));
            chart
                .draw_series(LineSeries::new(
                    self.t.iter().zip(self.omega_v.iter()).map(|(t, v)| (*t, *v)),
                    &RGBColor(255, 140, 0),
                ))?
                .label("Omega_v")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RGBColor(255, 140, 0)));
            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }

    fn line_panel(
        &self,
        area: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
        caption: &str,
        y_desc: &str,
        field: &ObservableField,
        color: &RGBColor,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let y = self.get(field);
        let (y_min, y_max) = Observables::value_range(y);
        let x_spec = (self.t[0]..self.t[self.t.len() - 1]).log_scale();
        let mut chart = ChartBuilder::on(area)
            .caption(caption, ("sans-serif", 24).into_font())
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_spec, y_min..y_max)?;
        chart.configure_mesh().x_desc("t").y_desc(y_desc).draw()?;
        chart.draw_series(LineSeries::new(
            self.t.iter().zip(y.iter()).map(|(t, v)| (*t, *v)),
            color,
        ))?;
        Ok(())
    }

    fn value_range(y: &Array1<NumericData>) -> (NumericData, NumericData) {
        let y_min = y.iter().fold(NumericData::INFINITY, |acc, v| acc.min(*v));
        let y_max = y.iter().fold(NumericData::NEG_INFINITY, |acc, v| acc.max(*v));
        if y_min == y_max {
            (y_min - 1.0, y_max + 1.0)
        } else {
            (y_min, y_max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn synthetic() -> (ModelParams, TimeGrid, Array2<NumericData>) {
        let params = ModelParams::new();
        let grid = TimeGrid::from_samples(vec![1e-8, 1e-7, 1e-6, 1e-4, 0.5, 1.0, 1.5]);
        let trajectory = array![
            [1e-3, 1e-60, 0.0],
            [1.1e-3, 1e-30, 5.0],
            [1.3e-3, 1e-20, 17.0],
            [2.0e-3, 1e-10, 17.0],
            [0.4, 2.0, 17.0],
            [0.8, 8.0, 17.0],
            [1.0, 14.0, 17.0],
        ];
        (params, grid, trajectory)
    }

    #[test]
    fn scale_factor_normalizes_to_one_today() {
        let (params, grid, trajectory) = synthetic();
        let obs = Observables::from_trajectory(&params, &grid, &trajectory);
        assert_eq!(obs.idx_today, 5);
        assert_eq!(obs.a_norm[obs.idx_today], 1.0);
    }

    #[test]
    fn density_parameters_sum_to_one_everywhere() {
        let (params, grid, trajectory) = synthetic();
        let obs = Observables::from_trajectory(&params, &grid, &trajectory);
        for i in 0..obs.t.len() {
            assert!((obs.omega_m[i] + obs.omega_v[i] - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn positive_pressure_piecewise_over_the_grid() {
        let (params, grid, trajectory) = synthetic();
        let obs = Observables::from_trajectory(&params, &grid, &trajectory);
        assert!(obs.p_pos[0] > 0.0);
        assert!(obs.p_pos[1] > 0.0);
        // At and past t_recomb the source is exactly zero.
        for i in 2..obs.t.len() {
            assert_eq!(obs.p_pos[i], 0.0);
        }
    }

    #[test]
    fn acceleration_combines_densities_and_pressures() {
        let (params, grid, trajectory) = synthetic();
        let obs = Observables::from_trajectory(&params, &grid, &trajectory);
        let i = 4;
        let expected = -(obs.rho_m[i] + 3.0 * obs.p_pos[i]) - (obs.rho_v[i] + 3.0 * obs.p_v[i]);
        assert_eq!(obs.ddota[i], expected);
    }

    #[test]
    fn vacuum_pressure_tracks_elastic_energy() {
        let (params, grid, trajectory) = synthetic();
        let obs = Observables::from_trajectory(&params, &grid, &trajectory);
        for i in 0..obs.t.len() {
            assert_eq!(obs.p_v[i], -params.k_elastic * obs.e[i]);
        }
    }
}
