//! Packaging driver: turns a [`MixConfig`] into fraction folders on disk.
//!
//! A run reads the base and target structures, checks them, generates one
//! mixed structure per fraction and writes each into its own folder together
//! with copies of the auxiliary VASP inputs:
//!
//! ```text
//! <output>/<folder>/
//! ├── eta=0.250/
//! │   ├── POSCAR
//! │   ├── INCAR
//! │   └── KPOINTS
//! ├── eta=0.500/
//! │   └── ...
//! └── mixing_manifest.json
//! ```
//!
//! Everything that can fail before writing (missing inputs, incompatible
//! structures, bad fraction parameters, duplicate folder names) is checked
//! first, so a failing run leaves no fraction folders behind.

use crate::config::{ArgError, MixConfig};
use crate::io;
use crate::manifest::{Manifest, ManifestEntry, ManifestError};
use crate::mixing::{self, MixError, MixOptions};
use crate::naming::MANIFEST_FILE;
use crate::poscar::PoscarError;
use crate::settings::Settings;
use crate::validation::{self, ValidationError};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a packaging run.
#[derive(Error, Debug)]
pub enum PackageError {
    /// File system operation failed
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path being created, written or copied
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// An input structure could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Structure file
        path: PathBuf,
        /// Underlying error
        #[source]
        source: PoscarError,
    },

    /// Run options were inconsistent
    #[error(transparent)]
    Arguments(#[from] ArgError),

    /// A pre-flight check failed
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Structure generation failed
    #[error(transparent)]
    Mixing(#[from] MixError),

    /// The manifest could not be written
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Two fractions format to the same folder name
    #[error("Fractions {0} and {1} map to the same folder '{2}'; increase [output] precision")]
    DuplicateFolder(f64, f64, String),
}

/// Result type for packaging
pub type Result<T> = std::result::Result<T, PackageError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PackageError + '_ {
    move |source| PackageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Runs the full pipeline and returns the folders written, in fraction order.
pub fn setup_as_package(config: &MixConfig, settings: &Settings) -> Result<Vec<PathBuf>> {
    let options = MixOptions {
        tolerance: config.tolerance.unwrap_or(settings.mixing.tolerance),
        parallel: config.parallel.unwrap_or(settings.mixing.parallel),
    };
    validation::validate_tolerance(options.tolerance)?;
    validation::validate_auxiliary_files(&config.auxiliary_files)?;
    let request = config.fraction_request(settings.mixing.method)?;

    let base = io::read_poscar(&config.base).map_err(|source| PackageError::Read {
        path: config.base.clone(),
        source,
    })?;
    let target = io::read_poscar(&config.target).map_err(|source| PackageError::Read {
        path: config.target.clone(),
        source,
    })?;
    info!(
        "Loaded base {} and target {} ({} atoms)",
        config.base.display(),
        config.target.display(),
        base.total_atom_count()
    );

    let warnings = validation::validate_pair(&base, &target)?;
    let mixed = mixing::construct_mixed_configuration(&base, &target, &request, &options)?;
    mixing::validate_structures(&base, &mixed)?;

    let naming = settings.output.naming();
    let root = config.output_root();
    let mut seen: HashMap<String, f64> = HashMap::new();
    for mixed_config in &mixed {
        let name = naming.folder_name(mixed_config.eta);
        if let Some(earlier) = seen.insert(name.clone(), mixed_config.eta) {
            return Err(PackageError::DuplicateFolder(earlier, mixed_config.eta, name));
        }
    }

    fs::create_dir_all(&root).map_err(io_error(&root))?;

    let mut folders = Vec::with_capacity(mixed.len());
    let mut entries = Vec::with_capacity(mixed.len());
    for mixed_config in &mixed {
        let folder = naming.folder_path(&root, mixed_config.eta);
        fs::create_dir_all(&folder).map_err(io_error(&folder))?;

        let poscar_path = folder.join(&settings.output.poscar_name);
        io::write_poscar(&mixed_config.structure, &poscar_path).map_err(io_error(&poscar_path))?;
        debug!("Wrote {}", poscar_path.display());

        for aux in &config.auxiliary_files {
            let copied = io::copy_auxiliary_file(aux, &folder).map_err(io_error(aux))?;
            validation::log_file_operation("copy", aux, Some(&copied));
        }

        entries.push(ManifestEntry {
            eta: mixed_config.eta,
            folder: folder.clone(),
            poscar: poscar_path,
        });
        folders.push(folder);
    }
    info!("Wrote {} structures under {}", folders.len(), root.display());

    if settings.output.write_manifest {
        let manifest = Manifest {
            version: env!("CARGO_PKG_VERSION").to_string(),
            base: config.base.clone(),
            target: config.target.clone(),
            atoms: base.total_atom_count(),
            request,
            tolerance: options.tolerance,
            warnings,
            path_length: mixing::calculate_path_length(&mixed)?,
            auxiliary_files: config.auxiliary_files.clone(),
            entries,
        };
        let path = root.join(MANIFEST_FILE);
        manifest.save(&path)?;
        debug!("Wrote manifest {}", path.display());
    }

    Ok(folders)
}
