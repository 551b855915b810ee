pub mod diagnostics;
pub mod input_params;
pub mod integrator;
pub mod model;
pub mod observables;
pub mod type_lib;
