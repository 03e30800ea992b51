//! Run configuration built from command-line arguments.
//!
//! This module defines the per-run request of the `posmix` binary:
//!
//! - [`MixConfig`]: input structures, fraction parameters and output layout
//! - [`ArgError`]: problems with the command line
//!
//! Long-lived preferences (tolerance, default method, folder naming) live in
//! [`settings`](crate::settings); values given on the command line take
//! precedence over them.
//!
//! # Command Line
//!
//! ```text
//! posmix <base> <target> [options]
//!
//!   --method isometric|arbitrary
//!   --middle N --left N --right N      isometric point counts
//!   --steps s1[,s2]                    extension steps, left then right
//!   --eta f1,f2,...                    explicit fractions
//!   --output DIR  --folder NAME        output location
//!   --aux FILE (repeatable) --kpoints FILE --incar FILE --potcar FILE
//!   --tolerance EPS  --parallel
//! ```

use crate::fraction::{self, FractionError, FractionRequest, IsometricSpec, MixMethod};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors found while interpreting the command line.
#[derive(Error, Debug, PartialEq)]
pub enum ArgError {
    /// Option given as the last argument without its value
    #[error("Missing value for {0}")]
    MissingValue(String),

    /// Option not recognised
    #[error("Unknown option: {0}")]
    UnknownOption(String),

    /// Option value that does not parse
    #[error("Invalid value '{value}' for {option}")]
    InvalidValue {
        /// Option name as typed
        option: String,
        /// Rejected value
        value: String,
    },

    /// Fewer than two structure files
    #[error("Expected a base and a target structure file")]
    MissingInput,

    /// Positional argument after base and target
    #[error("Unexpected argument: {0}")]
    UnexpectedArgument(String),

    /// Option that does not apply to the selected method
    #[error("{0} cannot be combined with the {1} method")]
    Conflict(String, MixMethod),

    /// Fraction list or method could not be parsed
    #[error(transparent)]
    Fraction(#[from] FractionError),
}

/// One mixing run as requested on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixConfig {
    /// Structure at eta = 0
    pub base: PathBuf,
    /// Structure at eta = 1
    pub target: PathBuf,
    /// Fraction strategy; falls back to settings when absent
    pub method: Option<MixMethod>,
    /// Isometric parameters
    pub isometric: IsometricSpec,
    /// Explicit fractions for the arbitrary strategy
    pub eta: Vec<f64>,
    /// Directory receiving the fraction folders (default: current directory)
    pub output: PathBuf,
    /// Optional subfolder of `output`
    pub folder: Option<String>,
    /// Files copied into every fraction folder
    pub auxiliary_files: Vec<PathBuf>,
    /// Minimum-image tolerance override
    pub tolerance: Option<f64>,
    /// Parallel generation override
    pub parallel: Option<bool>,
}

impl MixConfig {
    /// Creates a run with default options for a base/target pair.
    pub fn new(base: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            target: target.into(),
            method: None,
            isometric: IsometricSpec::default(),
            eta: Vec::new(),
            output: PathBuf::from("."),
            folder: None,
            auxiliary_files: Vec::new(),
            tolerance: None,
            parallel: None,
        }
    }

    /// Parses the arguments that follow the program name.
    ///
    /// Options take their value either as the next argument or inline as
    /// `--option=value`.
    pub fn from_args<I, S>(args: I) -> Result<Self, ArgError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
        let mut positional = Vec::new();
        let mut config = MixConfig::new("", "");

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];
            i += 1;

            if !arg.starts_with("--") {
                positional.push(arg.clone());
                continue;
            }

            let (option, inline) = match arg.split_once('=') {
                Some((option, value)) => (option.to_string(), Some(value.to_string())),
                None => (arg.clone(), None),
            };

            if option == "--parallel" {
                config.parallel = Some(true);
                continue;
            }

            let value = match inline {
                Some(value) => value,
                None => {
                    let value = args
                        .get(i)
                        .ok_or_else(|| ArgError::MissingValue(option.clone()))?;
                    i += 1;
                    value.clone()
                }
            };

            match option.as_str() {
                "--method" => config.method = Some(value.parse()?),
                "--middle" => config.isometric.middle = Some(parse_count(&option, &value)?),
                "--left" => config.isometric.left = Some(parse_count(&option, &value)?),
                "--right" => config.isometric.right = Some(parse_count(&option, &value)?),
                "--steps" => config.isometric.steps = fraction::parse_list(&value)?,
                "--eta" => config.eta = fraction::parse_list(&value)?,
                "--output" => config.output = PathBuf::from(value),
                "--folder" => config.folder = Some(value),
                "--aux" | "--kpoints" | "--incar" | "--potcar" => {
                    config.auxiliary_files.push(PathBuf::from(value))
                }
                "--tolerance" => {
                    let tolerance = value.parse::<f64>().map_err(|_| ArgError::InvalidValue {
                        option: option.clone(),
                        value: value.clone(),
                    })?;
                    config.tolerance = Some(tolerance);
                }
                _ => return Err(ArgError::UnknownOption(option)),
            }
        }

        let mut positional = positional.into_iter();
        match (positional.next(), positional.next(), positional.next()) {
            (Some(base), Some(target), None) => {
                config.base = PathBuf::from(base);
                config.target = PathBuf::from(target);
                Ok(config)
            }
            (_, _, Some(extra)) => Err(ArgError::UnexpectedArgument(extra)),
            _ => Err(ArgError::MissingInput),
        }
    }

    /// Resolves the fraction strategy of this run.
    ///
    /// Without `--method`, explicit `--eta` values imply the arbitrary
    /// strategy; otherwise `default_method` applies.
    pub fn fraction_request(&self, default_method: MixMethod) -> Result<FractionRequest, ArgError> {
        let method = match self.method {
            Some(method) => method,
            None if !self.eta.is_empty() => MixMethod::Arbitrary,
            None => default_method,
        };

        match method {
            MixMethod::Isometric => {
                if !self.eta.is_empty() {
                    return Err(ArgError::Conflict("--eta".to_string(), method));
                }
                Ok(FractionRequest::Isometric(self.isometric.clone()))
            }
            MixMethod::Arbitrary => {
                if self.isometric != IsometricSpec::default() {
                    return Err(ArgError::Conflict(
                        "--middle/--left/--right/--steps".to_string(),
                        method,
                    ));
                }
                if self.eta.is_empty() {
                    return Err(ArgError::MissingValue("--eta".to_string()));
                }
                Ok(FractionRequest::Arbitrary {
                    values: self.eta.clone(),
                })
            }
        }
    }

    /// Directory that receives the fraction folders.
    pub fn output_root(&self) -> PathBuf {
        match &self.folder {
            Some(folder) => self.output.join(folder),
            None => self.output.clone(),
        }
    }
}

fn parse_count(option: &str, value: &str) -> Result<usize, ArgError> {
    value.parse().map_err(|_| ArgError::InvalidValue {
        option: option.to_string(),
        value: value.to_string(),
    })
}
