use crate::sonar_interface::{GridRaster, MosaicFrame, ScatterSet};
use crate::store::{FrameStore, StoreError, StoreResult};
use crate::telemetry::log::LogManager;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes each mosaic as a set of CSV tables plus a JSON manifest:
/// `raw_<n>.csv`, `linear_<n>.csv`, `knn_<n>.csv`, `knn_filtered_<n>.csv`,
/// `frame_<n>.json`.
pub struct CsvFrameStore {
    directory: PathBuf,
    logger: LogManager,
}

impl CsvFrameStore {
    pub fn new<P: AsRef<Path>>(directory: P) -> StoreResult<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|source| StoreError::Io {
            path: directory.display().to_string(),
            source,
        })?;
        Ok(Self {
            directory,
            logger: LogManager::new("sonarcore::store"),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn write_file<F>(&self, name: &str, body: F) -> StoreResult<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
    {
        let path = self.directory.join(name);
        let io_err = |source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };
        let file = File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        body(&mut writer).map_err(io_err)?;
        writer.flush().map_err(io_err)
    }
}

fn write_scatter<W: Write>(
    out: &mut W,
    scatter: &ScatterSet,
    intensity: &[f64],
) -> std::io::Result<()> {
    writeln!(out, "u,v,intensity")?;
    for ((u, v), value) in scatter.u.iter().zip(&scatter.v).zip(intensity) {
        writeln!(out, "{},{},{}", u, v, value)?;
    }
    Ok(())
}

fn write_raster<W: Write>(out: &mut W, raster: &GridRaster) -> std::io::Result<()> {
    let header: Vec<String> = (0..raster.v_axis.len()).map(|j| format!("Col{}", j)).collect();
    writeln!(out, "{}", header.join(","))?;
    for row in raster.values.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(out, "{}", cells.join(","))?;
    }
    Ok(())
}

impl FrameStore for CsvFrameStore {
    fn store(&mut self, frame: &MosaicFrame) -> StoreResult<()> {
        let n = frame.index;
        self.write_file(&format!("raw_{}.csv", n), |out| {
            write_scatter(out, &frame.scatter, &frame.scatter.intensity)
        })?;
        if let Some(linear) = &frame.linear {
            self.write_file(&format!("linear_{}.csv", n), |out| write_raster(out, linear))?;
        }
        if let Some(smoothing) = &frame.smoothing {
            self.write_file(&format!("knn_{}.csv", n), |out| {
                write_raster(out, &smoothing.mean)
            })?;
            self.write_file(&format!("knn_filtered_{}.csv", n), |out| {
                write_scatter(out, &frame.scatter, &smoothing.filtered)
            })?;
        }

        let manifest = serde_json::to_vec_pretty(&frame.manifest())?;
        self.write_file(&format!("frame_{}.json", n), |out| out.write_all(&manifest))?;

        self.logger.record(&format!(
            "frame #{} stored in {}",
            n,
            self.directory.display()
        ));
        Ok(())
    }
}
