//! JSON record of a mixing run.
//!
//! After the fraction folders are written, the driver stores a manifest
//! next to them listing the inputs, the fraction strategy, the tolerance and
//! one entry per generated folder. The file is plain JSON so it can be read
//! back by scripts that post-process the runs.

use crate::fraction::FractionRequest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while saving or loading a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Reading or writing the manifest file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The manifest could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One generated structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Interpolation fraction
    pub eta: f64,
    /// Folder holding the structure
    pub folder: PathBuf,
    /// Structure file inside `folder`
    pub poscar: PathBuf,
}

/// Record of one mixing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// posmix version that wrote the record
    pub version: String,
    /// Base structure file
    pub base: PathBuf,
    /// Target structure file
    pub target: PathBuf,
    /// Atoms per structure
    pub atoms: usize,
    /// Fraction request the run was built from
    pub request: FractionRequest,
    /// Minimum-image tolerance used
    pub tolerance: f64,
    /// Warnings raised while comparing the two inputs
    pub warnings: Vec<String>,
    /// Total fractional-coordinate path length through the structures
    pub path_length: f64,
    /// Files copied into every folder
    pub auxiliary_files: Vec<PathBuf>,
    /// Generated structures in fraction order
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Writes the manifest as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reads a manifest written by [`Manifest::save`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Fractions in the order they were generated.
    pub fn fractions(&self) -> Vec<f64> {
        self.entries.iter().map(|entry| entry.eta).collect()
    }
}
