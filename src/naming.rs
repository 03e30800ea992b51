//! Fraction-labelled output naming
//!
//! Every generated structure is written into its own directory named after
//! the interpolation fraction it was produced at, so a run with
//! `eta = [0.25, 0.5]` yields `eta=0.250/` and `eta=0.500/`.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use posmix::naming::FractionNaming;
//!
//! let naming = FractionNaming::default();
//! assert_eq!(naming.folder_name(0.25), "eta=0.250");
//! assert_eq!(naming.folder_name(-0.1), "eta=-0.100");
//! assert_eq!(
//!     naming.folder_path(Path::new("runs"), 1.5),
//!     Path::new("runs").join("eta=1.500")
//! );
//! ```

use std::path::{Path, PathBuf};

/// Name of the JSON run record written next to the generated folders
pub const MANIFEST_FILE: &str = "mixing_manifest.json";

/// Builds per-fraction directory names
///
/// The name is `{prefix}{eta}` with `eta` printed in fixed point with
/// `precision` decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct FractionNaming {
    prefix: String,
    precision: usize,
}

impl Default for FractionNaming {
    fn default() -> Self {
        Self::new("eta=", 3)
    }
}

impl FractionNaming {
    /// Creates a naming scheme with the given prefix and decimal count
    pub fn new(prefix: impl Into<String>, precision: usize) -> Self {
        Self {
            prefix: prefix.into(),
            precision,
        }
    }

    /// Returns the directory name prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the number of decimals printed
    pub fn precision(&self) -> usize {
        self.precision
    }

    /// Returns the directory name for a fraction
    ///
    /// Format: `{prefix}{eta:.precision}`
    pub fn folder_name(&self, eta: f64) -> String {
        // Avoid "-0.000" for fractions that round to zero from below
        let rounded = format!("{:.*}", self.precision, eta);
        let rounded = match rounded.strip_prefix('-') {
            Some(magnitude) if magnitude.chars().all(|c| c == '0' || c == '.') => {
                magnitude.to_string()
            }
            _ => rounded,
        };
        format!("{}{}", self.prefix, rounded)
    }

    /// Returns the directory path for a fraction under `root`
    pub fn folder_path(&self, root: &Path, eta: f64) -> PathBuf {
        root.join(self.folder_name(eta))
    }
}
