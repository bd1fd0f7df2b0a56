use std::path::{Path, PathBuf};

use gridcalc_engine::engine::{Grid, RecomputeOptions};

use super::Document;
use crate::error::{GridcalcError, Result};

const MAX_GRID_FILE_BYTES: u64 = 16 * 1_048_576; // 16 MiB

fn read_grid_file(path: &Path) -> Result<Grid> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_GRID_FILE_BYTES {
        return Err(GridcalcError::FileTooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: MAX_GRID_FILE_BYTES,
        });
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

impl Document {
    /// Open a JSON grid file: an array of rows, each cell `null`, a number or
    /// a string (a leading `=` marks a formula).
    pub fn open(path: &Path, options: RecomputeOptions) -> Result<Self> {
        let mut doc = Document::with_options(Grid::new(), options);
        doc.load_json(path)?;
        Ok(doc)
    }

    /// Load from a JSON grid file, replacing the current grid.
    /// The document is left untouched if the file cannot be read.
    pub fn load_json(&mut self, path: &Path) -> Result<()> {
        let grid = read_grid_file(path)?;
        log::debug!(
            "loaded {} ({} rows, {} cols)",
            path.display(),
            grid.row_count(),
            grid.col_count()
        );
        self.replace_grid(grid);
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Write the raw grid as JSON. Computed values are never written.
    pub fn save_json(&mut self, path: &Path) -> Result<()> {
        let mut content = serde_json::to_string(&self.grid)?;
        content.push('\n');
        std::fs::write(path, content)?;
        self.file_path = Some(path.to_path_buf());
        self.modified = false;
        Ok(())
    }

    /// Save to current file path.
    /// Returns the path saved to.
    pub fn save(&mut self) -> Result<PathBuf> {
        let path = self.file_path.clone().ok_or(GridcalcError::NoFilePath)?;
        self.save_json(&path)?;
        Ok(path)
    }
}
