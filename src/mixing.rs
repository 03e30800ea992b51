//! Mixed-configuration generation by linear interpolation of fractional
//! coordinates.
//!
//! For a base and a target structure with the same number of atoms the
//! displacement `target - base` is corrected for periodic wraparound and
//! each fraction `eta` yields a copy of the base with positions
//! `base + eta * displacement`. Fractions outside [0, 1] extrapolate.
//!
//! # Minimum-Image Correction
//!
//! Fractional coordinates live in a periodic unit cell, so an atom that
//! moves from 0.99995 to 0.00000 across the boundary shows a raw
//! displacement of about -1. Components within `tolerance` of +1 have 1
//! subtracted, components within `tolerance` of -1 have 1 added; all other
//! components are left alone.

use crate::fraction::{self, FractionError, FractionRequest};
use crate::poscar::{Poscar, PoscarError};
use log::{debug, info};
use nalgebra::DMatrix;
use rayon::prelude::*;
use thiserror::Error;

/// Default snapping tolerance of the minimum-image correction.
pub const PERIODIC_TOLERANCE: f64 = 1e-4;

/// Errors raised while generating mixed structures.
#[derive(Error, Debug)]
pub enum MixError {
    /// Base and target hold different numbers of atoms
    #[error("Incompatible structures: base has {base} atoms, target has {target}")]
    Incompatible {
        /// Atom count of the base structure
        base: usize,
        /// Atom count of the target structure
        target: usize,
    },

    /// A generated structure failed validation
    #[error("Invalid mixed configuration: {0}")]
    InvalidResult(String),

    /// Reading or writing a structure field failed
    #[error(transparent)]
    Poscar(#[from] PoscarError),

    /// The fraction request was invalid
    #[error(transparent)]
    Fraction(#[from] FractionError),
}

/// Result type for mixing operations
pub type Result<T> = std::result::Result<T, MixError>;

/// Knobs of a mixing run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixOptions {
    /// Minimum-image snapping tolerance
    pub tolerance: f64,
    /// Generate the structures on the rayon thread pool
    pub parallel: bool,
}

impl Default for MixOptions {
    fn default() -> Self {
        Self {
            tolerance: PERIODIC_TOLERANCE,
            parallel: false,
        }
    }
}

/// One generated structure and the fraction it was generated at.
#[derive(Debug, Clone)]
pub struct MixedConfiguration {
    /// Interpolation fraction
    pub eta: f64,
    /// Base copy with interpolated positions
    pub structure: Poscar,
}

/// Snaps a single displacement component across the periodic boundary.
pub fn wrap_component(delta: f64, tolerance: f64) -> f64 {
    let delta = if (delta - 1.0).abs() < tolerance {
        delta - 1.0
    } else {
        delta
    };
    if (delta + 1.0).abs() < tolerance {
        delta + 1.0
    } else {
        delta
    }
}

/// Computes `target - base` with the minimum-image correction applied.
///
/// # Errors
///
/// Returns [`MixError::Incompatible`] if the matrices have different row
/// counts.
pub fn minimum_image_displacement(
    base: &DMatrix<f64>,
    target: &DMatrix<f64>,
    tolerance: f64,
) -> Result<DMatrix<f64>> {
    if base.shape() != target.shape() {
        return Err(MixError::Incompatible {
            base: base.nrows(),
            target: target.nrows(),
        });
    }
    Ok((target - base).map(|delta| wrap_component(delta, tolerance)))
}

fn check_compatible(base: &Poscar, target: &Poscar) -> Result<()> {
    if base.total_atom_count() != target.total_atom_count() {
        return Err(MixError::Incompatible {
            base: base.total_atom_count(),
            target: target.total_atom_count(),
        });
    }
    Ok(())
}

fn mix_one(
    base: &Poscar,
    base_positions: &DMatrix<f64>,
    delta: &DMatrix<f64>,
    eta: f64,
) -> Result<MixedConfiguration> {
    let mut structure = base.clone();
    structure.set_positions(&(base_positions + delta * eta))?;
    debug!("Generated structure at eta = {:.6}", eta);
    Ok(MixedConfiguration { eta, structure })
}

/// Generates one structure per fraction, in the order given.
///
/// Each result is an independent copy of `base` with only its positions
/// replaced; title, lattice, species and velocities come from `base`.
pub fn interpolate(
    base: &Poscar,
    target: &Poscar,
    eta: &[f64],
    tolerance: f64,
) -> Result<Vec<MixedConfiguration>> {
    check_compatible(base, target)?;
    let base_positions = base.positions()?;
    let delta = minimum_image_displacement(&base_positions, &target.positions()?, tolerance)?;

    eta.iter()
        .map(|&e| mix_one(base, &base_positions, &delta, e))
        .collect()
}

/// Same as [`interpolate`], with the structures built on the rayon pool.
pub fn interpolate_parallel(
    base: &Poscar,
    target: &Poscar,
    eta: &[f64],
    tolerance: f64,
) -> Result<Vec<MixedConfiguration>> {
    check_compatible(base, target)?;
    let base_positions = base.positions()?;
    let delta = minimum_image_displacement(&base_positions, &target.positions()?, tolerance)?;

    eta.par_iter()
        .map(|&e| mix_one(base, &base_positions, &delta, e))
        .collect()
}

/// Builds the fraction list for `request` and interpolates between the two
/// structures.
pub fn construct_mixed_configuration(
    base: &Poscar,
    target: &Poscar,
    request: &FractionRequest,
    options: &MixOptions,
) -> Result<Vec<MixedConfiguration>> {
    check_compatible(base, target)?;
    let eta = fraction::set_eta(request)?;
    info!(
        "Mixing {} atoms at {} fractions ({} method, tolerance {:e})",
        base.total_atom_count(),
        eta.len(),
        request.method(),
        options.tolerance
    );

    if options.parallel {
        interpolate_parallel(base, target, &eta, options.tolerance)
    } else {
        interpolate(base, target, &eta, options.tolerance)
    }
}

/// Checks that every generated structure has the base's atom count and
/// finite positions.
pub fn validate_structures(base: &Poscar, mixed: &[MixedConfiguration]) -> Result<()> {
    if mixed.is_empty() {
        return Err(MixError::InvalidResult(
            "no structures to validate".to_string(),
        ));
    }

    for (i, config) in mixed.iter().enumerate() {
        let count = config.structure.total_atom_count();
        if count != base.total_atom_count() {
            return Err(MixError::InvalidResult(format!(
                "structure {} (eta = {}) has {} atoms, expected {}",
                i,
                config.eta,
                count,
                base.total_atom_count()
            )));
        }

        let positions = config.structure.positions()?;
        if let Some(value) = positions.iter().find(|v| !v.is_finite()) {
            return Err(MixError::InvalidResult(format!(
                "structure {} (eta = {}) has non-finite coordinate {}",
                i, config.eta, value
            )));
        }
    }
    Ok(())
}

/// Total length of the path through consecutive structures, in fractional
/// coordinates.
pub fn calculate_path_length(mixed: &[MixedConfiguration]) -> Result<f64> {
    let mut total_length = 0.0;
    for pair in mixed.windows(2) {
        let previous = pair[0].structure.positions()?;
        let current = pair[1].structure.positions()?;
        if previous.shape() != current.shape() {
            return Err(MixError::Incompatible {
                base: previous.nrows(),
                target: current.nrows(),
            });
        }
        total_length += (current - previous).norm();
    }
    Ok(total_length)
}
