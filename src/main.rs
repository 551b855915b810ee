use scripts::cei;

mod scripts;
mod submodules;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let results = cei::run()?;
    results.report();
    results.plot_summary("cei_simulation.png")?;
    Ok(())
}
