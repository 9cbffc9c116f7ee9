// src/json_io.rs

use crate::error::SimulationError;
use crate::numerical::interpolate::{interior_cells, interpolate_u_to_cell_centers, interpolate_v_to_cell_centers};
use crate::settings::Settings;
use crate::solver::Snapshot;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Serialize, Debug)]
struct Metadata<'a> {
    nx: usize,
    ny: usize,
    dx: f64,
    dy: f64,
    re: f64,
    scheme: &'a str,
    num_steps_completed: usize,
    final_time: f64,
    output_interval: Option<f64>,
}

/// Cell-centred fields of one snapshot, flattened column-major (x fastest).
#[derive(Serialize, Debug)]
pub struct TimestepData {
    pub step: usize,
    pub time: f64,
    pub u_centers: Vec<f64>,
    pub v_centers: Vec<f64>,
    pub p_centers: Vec<f64>,
}

impl From<&Snapshot> for TimestepData {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            step: snapshot.step,
            time: snapshot.time,
            u_centers: interpolate_u_to_cell_centers(&snapshot.u).as_slice().to_vec(),
            v_centers: interpolate_v_to_cell_centers(&snapshot.v).as_slice().to_vec(),
            p_centers: interior_cells(&snapshot.p).as_slice().to_vec(),
        }
    }
}

#[derive(Serialize, Debug)]
struct SimulationOutput<'a> {
    metadata: Metadata<'a>,
    data: &'a [TimestepData],
}

/// Collects snapshots at a fixed simulated-time interval and writes them as one JSON document.
#[derive(Debug)]
pub struct JsonOutputManager {
    pub output_filepath: PathBuf,
    pub output_interval: Option<f64>,
    pub collected_data: Vec<TimestepData>,
    pub nx: usize,
    pub ny: usize,
    next_output_time: f64,
}

impl JsonOutputManager {
    pub fn new<P: AsRef<Path>>(
        output_filepath: P,
        output_interval: Option<f64>,
        nx: usize,
        ny: usize,
    ) -> Result<Self, io::Error> {
        let output_filepath = output_filepath.as_ref().to_path_buf();
        if let Some(parent_dir) = output_filepath.parent() {
            fs::create_dir_all(parent_dir)?;
            info!("Ensured output directory exists: {}", parent_dir.display());
        }

        Ok(Self {
            output_filepath,
            output_interval,
            collected_data: Vec::new(),
            nx,
            ny,
            next_output_time: 0.0,
        })
    }

    /// Without an interval every step is kept; the final state always is.
    pub fn should_collect(&self, time: f64, is_final: bool) -> bool {
        match self.output_interval {
            Some(_) => is_final || time >= self.next_output_time - 1e-12,
            None => true,
        }
    }

    pub fn collect_timestep(&mut self, snapshot: &Snapshot) -> Result<(), io::Error> {
        let (nx, ny) = (snapshot.p.nrows() - 2, snapshot.p.ncols() - 2);
        if nx != self.nx || ny != self.ny {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Grid dimensions ({},{}) do not match JsonOutputManager dimensions ({},{})",
                    nx, ny, self.nx, self.ny
                ),
            ));
        }
        debug!("Collecting data for step {} (time {:.4})...", snapshot.step, snapshot.time);
        self.collected_data.push(TimestepData::from(snapshot));
        Ok(())
    }

    /// Collects the snapshot if its time has reached the next output time.
    pub fn collect_if_due(&mut self, snapshot: &Snapshot, is_final: bool) -> Result<bool, io::Error> {
        if !self.should_collect(snapshot.time, is_final) {
            return Ok(false);
        }
        if self.collected_data.last().map(|d| d.step) == Some(snapshot.step) {
            return Ok(false);
        }
        self.collect_timestep(snapshot)?;
        if let Some(interval) = self.output_interval {
            while self.next_output_time <= snapshot.time + 1e-12 {
                self.next_output_time += interval;
            }
        }
        Ok(true)
    }

    pub fn write_final_output(
        &self,
        settings: &Settings,
        steps_completed: usize,
        final_time: f64,
    ) -> Result<(), SimulationError> {
        if self.collected_data.is_empty() {
            info!("No data collected, skipping JSON output to {}.", self.output_filepath.display());
            return Ok(());
        }
        info!("Writing collected data to JSON file: {}...", self.output_filepath.display());
        let output_start = Instant::now();
        let cell_size = settings.cell_size();
        let metadata = Metadata {
            nx: self.nx,
            ny: self.ny,
            dx: cell_size.0,
            dy: cell_size.1,
            re: settings.re,
            scheme: settings.scheme.name(),
            num_steps_completed: steps_completed,
            final_time,
            output_interval: self.output_interval,
        };
        let output_data = SimulationOutput { metadata, data: &self.collected_data };
        let file = File::create(&self.output_filepath)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &output_data)?;
        writer.flush()?;
        info!("JSON output finished in {:.2}ms", output_start.elapsed().as_millis());
        Ok(())
    }
}
