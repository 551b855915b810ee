pub type NumericData = f64;

/// State vector of the model: (a, V_v, E).
pub type State = [NumericData; 3];

pub const STATE_DIM: usize = 3;
