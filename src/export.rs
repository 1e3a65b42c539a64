use crate::experiment::RunSink;
use crate::lattice::Lattice;
use crate::run::RunOutput;
use anyhow::{Context, Result};
use dla_common::{OutputConfig, RunMetadata};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes every occupied cell as an `x,y,z,step` row, in lexicographic (x, y, z) order.
/// Returns the number of rows written.
pub fn write_cells<W: Write>(lattice: &Lattice, writer: W) -> Result<usize> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut rows = 0;
    for record in lattice.occupied_cells() {
        csv_writer.serialize(record)?;
        rows += 1;
    }
    if rows == 0 {
        // serde only emits the header together with the first row
        csv_writer.write_record(["x", "y", "z", "step"])?;
    }
    csv_writer.flush()?;
    Ok(rows)
}

/// Directory holding the files of the run at sticking probability `p`.
pub fn run_directory(base: &Path, p: f64) -> PathBuf {
    base.join(format!("p__{:.6}", p)).join("data")
}

/// File name of the lattice export of a run; `.csv.gz` when `compress` is set.
pub fn positions_file_name(metadata: &RunMetadata, compress: bool) -> String {
    format!(
        "particles_step_p_{:.6}_step_{}.csv{}",
        metadata.sticking_probability,
        metadata.final_step,
        if compress { ".gz" } else { "" }
    )
}

/// Writes the lattice export to `path`, gzip-compressed when `compress` is set.
pub fn write_positions(lattice: &Lattice, path: &Path, compress: bool) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("Error creating positions file '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    let rows = if compress {
        let mut encoder = GzEncoder::new(&mut writer, Compression::default());
        let rows = write_cells(lattice, &mut encoder)?;
        encoder.finish().context("Error finishing gzip stream")?;
        rows
    } else {
        write_cells(lattice, &mut writer)?
    };
    writer.flush()?;
    Ok(rows)
}

/// Sink writing each run to `<base>/p__<p>/data/` as CSV plus a JSON metadata sidecar.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    base_directory: PathBuf,
    save_positions: bool,
    save_metadata: bool,
    compress: bool,
    written: Vec<PathBuf>,
}

impl CsvExporter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            base_directory: PathBuf::from(&config.base_directory),
            save_positions: config.save_positions,
            save_metadata: config.save_metadata,
            compress: config.compress,
            written: Vec::new(),
        }
    }

    /// Paths of all files written so far.
    pub fn written_files(&self) -> &[PathBuf] {
        &self.written
    }

    fn export(&mut self, output: &RunOutput) -> Result<()> {
        let metadata = &output.metadata;
        let directory = run_directory(&self.base_directory, metadata.sticking_probability);
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create output directory '{}'", directory.display()))?;

        if self.save_positions {
            let filename = directory.join(positions_file_name(metadata, self.compress));
            let rows = write_positions(&output.lattice, &filename, self.compress)
                .with_context(|| format!("Error writing positions to '{}'", filename.display()))?;
            info!("Final lattice ({} occupied cells) saved to {}", rows, filename.display());
            self.written.push(filename);
        } else {
            info!("Skipping saving final positions as per config.");
        }

        if self.save_metadata {
            let filename = directory.join("run_metadata.json");
            let file = File::create(&filename)
                .with_context(|| format!("Error creating metadata file '{}'", filename.display()))?;
            serde_json::to_writer_pretty(BufWriter::new(file), metadata)
                .with_context(|| format!("Error serializing run metadata to '{}'", filename.display()))?;
            info!("Run metadata saved to {}", filename.display());
            self.written.push(filename);
        }

        Ok(())
    }
}

impl RunSink for CsvExporter {
    fn accept(&mut self, output: RunOutput) -> Result<()> {
        self.export(&output)
    }
}
