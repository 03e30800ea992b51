#![deny(missing_docs)]

//! posmix - Mixed configurations between two VASP structures
//!
//! posmix generates a family of intermediate crystal structures between a
//! base and a target POSCAR file by linear interpolation of the fractional
//! atomic coordinates. Each structure is written into its own folder,
//! ready for a VASP run.
//!
//! # Overview
//!
//! For base positions `r0` and target positions `r1` every fraction `eta`
//! yields
//!
//! ```text
//! r(eta) = r0 + eta * mic(r1 - r0)
//! ```
//!
//! where `mic` is the minimum-image correction: displacement components
//! within a small tolerance of +1 or -1 are moved back by one cell so atoms
//! that cross the periodic boundary take the short path. Fractions outside
//! [0, 1] extrapolate beyond the two references.
//!
//! # Features
//!
//! - **Layout-preserving POSCAR model**: fields are located by a scanning
//!   state machine; untouched lines are written back verbatim
//! - **Fraction strategies**: evenly spaced (isometric) with optional
//!   extrapolation, or an explicit list
//! - **Periodic awareness**: configurable minimum-image tolerance
//! - **Packaging**: per-fraction folders with copied KPOINTS/INCAR/POTCAR
//!   and a JSON manifest
//! - **Parallel generation** on the rayon thread pool
//!
//! # Quick Start
//!
//! ```
//! use posmix::fraction::{FractionRequest, IsometricSpec};
//! use posmix::mixing::{construct_mixed_configuration, MixOptions};
//! use posmix::poscar::{Poscar, Species};
//! use nalgebra::DMatrix;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut base = Poscar::default();
//!     base.set_species(&[Species::new("Si", 2)])?;
//!     let mut target = base.clone();
//!     target.set_positions(&DMatrix::from_row_slice(2, 3, &[
//!         0.0, 0.0, 0.5,
//!         0.5, 0.5, 0.5,
//!     ]))?;
//!
//!     let request = FractionRequest::Isometric(IsometricSpec {
//!         middle: Some(3),
//!         ..Default::default()
//!     });
//!     let mixed = construct_mixed_configuration(&base, &target, &request, &MixOptions::default())?;
//!     assert_eq!(mixed.len(), 3);
//!     assert_eq!(mixed[1].structure.positions()?[(0, 2)], 0.25);
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`poscar`](poscar/index.html) - POSCAR document model
//! - [`parser`](parser/index.html) - Marker-scanning state machine
//! - [`fraction`](fraction/index.html) - Fraction generation
//! - [`mixing`](mixing/index.html) - Minimum-image interpolation
//! - [`validation`](validation/index.html) - Pre-flight checks
//! - [`io`](io/index.html) - File I/O utilities
//! - [`naming`](naming/index.html) - Fraction folder naming
//! - [`config`](config/index.html) - Command-line run configuration
//! - [`settings`](settings/index.html) - INI settings files
//! - [`package`](package/index.html) - Folder packaging driver
//! - [`manifest`](manifest/index.html) - JSON run record
//! - [`help`](help/index.html) - Built-in help system

/// Command-line run configuration
pub mod config;
/// Fraction generation
pub mod fraction;
/// Built-in help text
pub mod help;
/// File I/O
pub mod io;
/// JSON run record
pub mod manifest;
/// Minimum-image interpolation
pub mod mixing;
/// Fraction folder naming
pub mod naming;
/// Folder packaging driver
pub mod package;
/// POSCAR field scanning
pub mod parser;
/// POSCAR document model
pub mod poscar;
/// INI settings
pub mod settings;
/// Pre-flight checks
pub mod validation;

pub use config::MixConfig;
pub use poscar::{Poscar, Species};
