//! Pre-flight checks for a mixing run.
//!
//! This module checks that a base/target pair can be mixed, that the
//! requested auxiliary files exist and that run parameters are sensible,
//! before any output is produced. Errors carry a category and a
//! suggestion for fixing the problem; soft mismatches are returned as
//! warnings.
//!
//! # Features
//!
//! - Atom count compatibility between base and target
//! - Warnings for differing species tables, lattices and scale factors
//! - Auxiliary file existence checking
//! - Tolerance range checking

use crate::poscar::{Poscar, PoscarError};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Lattice vector components closer than this are treated as equal.
const LATTICE_TOLERANCE: f64 = 1e-6;

/// Validation error with user guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// Base and target cannot be mixed
    IncompatibleStructures,
    /// A structure field could not be read
    MalformedStructure,
    /// Required input files are missing
    MissingFiles,
    /// Invalid run parameters
    InvalidConfiguration,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<PoscarError> for ValidationError {
    fn from(err: PoscarError) -> Self {
        ValidationError {
            category: ErrorCategory::MalformedStructure,
            message: err.to_string(),
            suggestion: None,
        }
    }
}

/// Checks that `base` and `target` can be mixed.
///
/// Differing atom counts are an error. Differing species tables, lattice
/// vectors, scale factors or a velocity block present in only one file are
/// allowed, since the generated structures take those fields from `base`;
/// each is logged and returned as a warning.
///
/// # Examples
///
/// ```
/// use posmix::poscar::Poscar;
/// use posmix::validation::validate_pair;
///
/// let base = Poscar::default();
/// let mut target = Poscar::default();
/// target.set_scaling_factor(1.02).unwrap();
///
/// let warnings = validate_pair(&base, &target).unwrap();
/// assert_eq!(warnings.len(), 1);
/// ```
pub fn validate_pair(base: &Poscar, target: &Poscar) -> ValidationResult<Vec<String>> {
    if base.total_atom_count() != target.total_atom_count() {
        return Err(ValidationError {
            category: ErrorCategory::IncompatibleStructures,
            message: format!(
                "Base structure has {} atoms but target structure has {}",
                base.total_atom_count(),
                target.total_atom_count()
            ),
            suggestion: Some(
                "Both structures must list the same atoms in the same order".to_string(),
            ),
        });
    }

    let mut warnings = Vec::new();

    if base.species()? != target.species()? {
        warnings.push(
            "Species tables differ; generated structures use the base species table".to_string(),
        );
    }

    let lattice_drift = (base.cell()? - target.cell()?).amax();
    if lattice_drift > LATTICE_TOLERANCE {
        warnings.push(format!(
            "Lattice vectors differ by up to {:.3e}; generated structures use the base lattice",
            lattice_drift
        ));
    }

    let (base_scale, target_scale) = (base.scaling_factor()?, target.scaling_factor()?);
    if base_scale != target_scale {
        warnings.push(format!(
            "Scaling factors differ ({} vs {}); generated structures use {}",
            base_scale, target_scale, base_scale
        ));
    }

    if base.has_velocities() != target.has_velocities() {
        warnings.push(
            "Only one structure has a velocity block; generated structures follow the base"
                .to_string(),
        );
    }

    for warning in &warnings {
        warn!("{}", warning);
    }
    Ok(warnings)
}

/// Checks that every auxiliary file exists and is a regular file.
pub fn validate_auxiliary_files(files: &[PathBuf]) -> ValidationResult<()> {
    let missing: Vec<String> = files
        .iter()
        .filter(|path| !path.is_file())
        .map(|path| path.display().to_string())
        .collect();

    if !missing.is_empty() {
        return Err(ValidationError {
            category: ErrorCategory::MissingFiles,
            message: format!("Auxiliary files not found: {}", missing.join(", ")),
            suggestion: Some(
                "Check the --aux, --kpoints, --incar and --potcar paths".to_string(),
            ),
        });
    }
    Ok(())
}

/// Checks the minimum-image tolerance.
///
/// The two snapping windows around +1 and -1 must not reach the origin.
pub fn validate_tolerance(tolerance: f64) -> ValidationResult<()> {
    if !tolerance.is_finite() || tolerance <= 0.0 || tolerance >= 1.0 {
        return Err(ValidationError {
            category: ErrorCategory::InvalidConfiguration,
            message: format!("Periodic tolerance {} is out of range", tolerance),
            suggestion: Some("Use a positive value below 1, typically 1e-4".to_string()),
        });
    }
    Ok(())
}

/// Logs a file operation at debug level, warning when the source is missing.
pub fn log_file_operation(operation: &str, source: &Path, destination: Option<&Path>) {
    match destination {
        Some(dest) => debug!(
            "File operation: {} - {} -> {}",
            operation,
            source.display(),
            dest.display()
        ),
        None => debug!("File operation: {} - {}", operation, source.display()),
    }
    if !source.exists() {
        warn!("Source file '{}' does not exist", source.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poscar::Species;
    use nalgebra::Vector3;

    #[test]
    fn test_identical_pair_has_no_warnings() {
        let base = Poscar::default();
        assert!(validate_pair(&base, &base.clone()).unwrap().is_empty());
    }

    #[test]
    fn test_count_mismatch_is_error() {
        let base = Poscar::default();
        let mut target = Poscar::default();
        target.set_species(&[Species::new("H", 2)]).unwrap();

        let err = validate_pair(&base, &target).unwrap_err();
        assert_eq!(err.category, ErrorCategory::IncompatibleStructures);
        assert!(err.to_string().contains("Suggestion:"));
    }

    #[test]
    fn test_soft_mismatches_are_warnings() {
        let base = Poscar::default();
        let mut target = Poscar::default();
        target.set_species(&[Species::new("He", 1)]).unwrap();
        target
            .set_cell_vector(0, &Vector3::new(1.1, 0.0, 0.0))
            .unwrap();

        let warnings = validate_pair(&base, &target).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("Species"));
        assert!(warnings[1].contains("Lattice"));
    }

    #[test]
    fn test_velocity_presence_warning() {
        let base = Poscar::default();
        let text: String = base.to_string().lines().take(9).collect::<Vec<_>>().join("\n");
        let target: Poscar = text.parse().unwrap();

        let warnings = validate_pair(&base, &target).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("velocity"));
    }

    #[test]
    fn test_missing_auxiliary_files() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("KPOINTS");
        std::fs::write(&present, "Automatic\n").unwrap();
        let absent = dir.path().join("INCAR");

        assert!(validate_auxiliary_files(&[present.clone()]).is_ok());
        let err = validate_auxiliary_files(&[present, absent]).unwrap_err();
        assert_eq!(err.category, ErrorCategory::MissingFiles);
        assert!(err.message.contains("INCAR"));
    }

    #[test]
    fn test_tolerance_range() {
        assert!(validate_tolerance(1e-4).is_ok());
        assert!(validate_tolerance(0.0).is_err());
        assert!(validate_tolerance(1.0).is_err());
        assert!(validate_tolerance(f64::NAN).is_err());
    }
}
