use std::env;
use tracing::{error, info, Level};
use navie_mask::error::SimulationError;
use navie_mask::json_io::JsonOutputManager;
use navie_mask::numerical::central::CentralDifferences;
use navie_mask::numerical::donor_cell::DonorCell;
use navie_mask::numerical::{Discretization, Scheme};
use navie_mask::settings::Settings;
use navie_mask::solver::Computation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let settings_path = env::args().nth(1).ok_or("usage: navie-mask <settings.json>")?;
    let settings = Settings::from_json_file(&settings_path)?;
    info!(path = %settings_path, "Loaded settings");

    let cell_size = settings.cell_size();
    match settings.scheme {
        Scheme::CentralDifferences => simulate(&settings, CentralDifferences::new(cell_size))?,
        Scheme::DonorCell { gamma } => simulate(&settings, DonorCell::new(cell_size, gamma)?)?,
    }
    Ok(())
}

fn simulate<D: Discretization>(settings: &Settings, discretization: D) -> Result<(), SimulationError> {
    let mut computation = Computation::from_settings(settings, discretization)?;
    println!("{}", computation.mask());

    let [nx, ny] = settings.n_cells;
    let mut output = match &settings.output.path {
        Some(path) => Some(JsonOutputManager::new(path, settings.output.interval, nx, ny)?),
        None => None,
    };

    match computation.run(output.as_mut()) {
        Ok(report) => {
            if let Some(manager) = &output {
                manager.write_final_output(settings, report.steps, report.final_time)?;
            }
            info!(
                steps = report.steps,
                warnings = report.warnings.len(),
                max_divergence = computation.max_interior_divergence(),
                "Run complete"
            );
            Ok(())
        }
        Err(e) => {
            // keep whatever was collected, ending with the last state that passed the checks
            if let Some(manager) = output.as_mut() {
                let last_good = computation.last_good_snapshot();
                manager.collect_if_due(last_good, true)?;
                manager.write_final_output(settings, last_good.step, last_good.time)?;
            }
            error!(error = %e, "Run aborted");
            Err(e)
        }
    }
}
