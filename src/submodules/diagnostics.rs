use std::io::Write;

use serde::Serialize;

use super::observables::{ObservableField, Observables};

const OUTPUT_FOLDER: &str = "output_files";

/// JSON dumps of run arrays for external inspection.
pub struct Diagnostics;

impl Diagnostics {
    pub fn print<T: Serialize + ?Sized>(item: &T, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::create_dir_all(OUTPUT_FOLDER)?;
        let mut file = std::fs::File::create(format!("{}/{}", OUTPUT_FOLDER, filename))?;
        let json = serde_json::to_string(item)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }

    /// Dump the headline arrays of a finished run.
    pub fn dump_observables(observables: &Observables) -> Result<(), Box<dyn std::error::Error>> {
        let fields = [
            ObservableField::T,
            ObservableField::ANorm,
            ObservableField::Vv,
            ObservableField::E,
            ObservableField::OmegaM,
            ObservableField::OmegaV,
        ];
        for field in fields.iter() {
            Diagnostics::print(observables.get(field), &format!("{}.json", field.to_str()))?;
        }
        Ok(())
    }
}
