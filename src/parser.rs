//! Marker discovery for POSCAR structure files.
//!
//! POSCAR files carry no section headers, so the fields are located by
//! content rather than by fixed offsets. The scanner walks the non-blank
//! lines once and drives an explicit state machine through the canonical
//! field order:
//!
//! ```text
//! ExpectTitle -> ExpectScale -> ExpectCellVectors(0..3) -> ExpectSpeciesNames
//!     -> ExpectSpeciesCounts -> ExpectModeKeyword -> Done
//! ```
//!
//! Each line is classified by simple content tests:
//!
//! - **alphabetic**: contains at least one ASCII letter (title, species names)
//! - **numeric**: no letters, contains a digit-like run (scale, lattice, counts)
//! - **mode keyword**: contains `Direct` or one of the capitals `C`/`K`
//!   (`Cartesian`, `Kartesisch`)
//!
//! Lines between the species counts and the mode keyword that are neither
//! (for example `Selective dynamics`) are skipped. Any other deviation from
//! the canonical order is a malformed document; the scanner does not try to
//! recover.
//!
//! # Examples
//!
//! ```
//! use posmix::parser::scan;
//!
//! let lines = [
//!     "BaF2", "1.0",
//!     "6.2 0.0 0.0", "0.0 6.2 0.0", "0.0 0.0 6.2",
//!     "Ba F", "1 2", "Direct",
//!     "0.0 0.0 0.0", "0.25 0.25 0.25", "0.75 0.75 0.75",
//! ];
//! let outcome = scan(&lines).unwrap();
//! assert_eq!(outcome.total_atoms, 3);
//! assert_eq!(outcome.markers.positions, 8);
//! assert_eq!(outcome.markers.velocities, None);
//! ```

use crate::poscar::{PoscarError, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    static ref LETTERS_RE: Regex = Regex::new(r"[a-zA-Z]+").unwrap();
    // Leading signed integer/decimal, e.g. "1.0", "-50", "+2"
    static ref SCALE_RE: Regex = Regex::new(r"^-?[0-9+.]+").unwrap();
    static ref NUMERIC_RE: Regex = Regex::new(r"-?[0-9.+]+").unwrap();
    static ref MODE_RE: Regex = Regex::new(r"Direct|[CK]+").unwrap();
}

/// Line indices of the semantic fields of a POSCAR document.
///
/// All indices refer to the document's non-blank line sequence and are
/// strictly increasing in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Markers {
    /// Title (comment) line
    pub title: usize,
    /// Universal scaling factor line
    pub scale: usize,
    /// First of the three lattice vector lines
    pub cell: usize,
    /// Whitespace-separated species symbols
    pub species_names: usize,
    /// Whitespace-separated species counts
    pub species_counts: usize,
    /// First atom position line (the line after the mode keyword)
    pub positions: usize,
    /// First atom velocity line, when the file carries a velocity block
    pub velocities: Option<usize>,
}

/// States of the marker scanner, in canonical field order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// Waiting for the first alphabetic line
    ExpectTitle,
    /// Waiting for the scaling factor
    ExpectScale,
    /// Waiting for lattice vector `n + 1` of 3
    ExpectCellVectors(usize),
    /// Waiting for the second alphabetic line
    ExpectSpeciesNames,
    /// Waiting for the integer counts line
    ExpectSpeciesCounts,
    /// Waiting for `Direct`/`Cartesian`
    ExpectModeKeyword,
    /// Mode keyword found, scan complete
    Done,
}

impl ScanState {
    fn describe(&self) -> String {
        match self {
            ScanState::ExpectTitle => "expecting a title line".to_string(),
            ScanState::ExpectScale => "expecting the scaling factor".to_string(),
            ScanState::ExpectCellVectors(n) => format!("expecting lattice vector {} of 3", n + 1),
            ScanState::ExpectSpeciesNames => "expecting the species names line".to_string(),
            ScanState::ExpectSpeciesCounts => "expecting the species counts line".to_string(),
            ScanState::ExpectModeKeyword => {
                "expecting a coordinate mode line (Direct/Cartesian)".to_string()
            }
            ScanState::Done => "done".to_string(),
        }
    }
}

/// Result of a successful scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Discovered field markers
    pub markers: Markers,
    /// Sum of the species counts line
    pub total_atoms: usize,
}

#[derive(Default)]
struct PartialMarkers {
    title: Option<usize>,
    scale: Option<usize>,
    cell: Option<usize>,
    species_names: Option<usize>,
    species_counts: Option<usize>,
    positions: Option<usize>,
    total_atoms: usize,
}

/// Returns true if the line contains ASCII letters.
pub fn is_alphabetic(line: &str) -> bool {
    LETTERS_RE.is_match(line)
}

/// Returns true if the line looks like a row of numbers (no letters).
pub fn is_numeric(line: &str) -> bool {
    !is_alphabetic(line) && NUMERIC_RE.is_match(line)
}

/// Returns true if the line is a coordinate mode keyword line.
pub fn is_mode_keyword(line: &str) -> bool {
    is_alphabetic(line) && MODE_RE.is_match(line)
}

/// Scans non-blank lines and locates every POSCAR field.
///
/// The velocity marker is set only when at least `total_atoms` lines
/// follow the position block.
///
/// # Errors
///
/// Returns [`PoscarError::Malformed`] when a line does not fit the field the
/// scanner expects, when the counts line does not parse as positive
/// integers, or when the input ends before the mode keyword is reached.
pub fn scan<S: AsRef<str>>(lines: &[S]) -> Result<ScanOutcome> {
    let mut state = ScanState::ExpectTitle;
    let mut found = PartialMarkers::default();

    for (index, line) in lines.iter().enumerate() {
        state = step(state, index, line.as_ref().trim(), &mut found)?;
        if state == ScanState::Done {
            break;
        }
    }

    if state != ScanState::Done {
        return Err(PoscarError::malformed(
            0,
            format!("reached end of input while {}", state.describe()),
        ));
    }

    let positions = found.positions.unwrap_or_default();
    let total_atoms = found.total_atoms;
    let block_end = positions.checked_add(total_atoms).ok_or_else(|| {
        PoscarError::malformed(
            lines.len(),
            format!(
                "expected {} position lines, found {}",
                total_atoms,
                lines.len().saturating_sub(positions)
            ),
        )
    })?;
    let velocities = block_end
        .checked_add(total_atoms)
        .filter(|&end| lines.len() >= end)
        .map(|_| block_end);

    let markers = Markers {
        title: found.title.unwrap_or_default(),
        scale: found.scale.unwrap_or_default(),
        cell: found.cell.unwrap_or_default(),
        species_names: found.species_names.unwrap_or_default(),
        species_counts: found.species_counts.unwrap_or_default(),
        positions,
        velocities,
    };
    debug!("POSCAR markers: {:?}, {} atoms", markers, total_atoms);

    Ok(ScanOutcome {
        markers,
        total_atoms,
    })
}

fn step(
    state: ScanState,
    index: usize,
    line: &str,
    found: &mut PartialMarkers,
) -> Result<ScanState> {
    let unexpected = |what: &str| {
        PoscarError::malformed(
            index + 1,
            format!("found {} while {}: '{}'", what, state.describe(), line),
        )
    };

    match state {
        ScanState::ExpectTitle => {
            if !is_alphabetic(line) {
                return Err(unexpected("a line without letters"));
            }
            found.title = Some(index);
            Ok(ScanState::ExpectScale)
        }
        ScanState::ExpectScale => {
            if is_alphabetic(line) || !SCALE_RE.is_match(line) {
                return Err(unexpected("a non-numeric line"));
            }
            parse_scale(line).map_err(|message| PoscarError::malformed(index + 1, message))?;
            found.scale = Some(index);
            Ok(ScanState::ExpectCellVectors(0))
        }
        ScanState::ExpectCellVectors(n) => {
            if !is_numeric(line) {
                return Err(unexpected("a non-numeric line"));
            }
            if n == 0 {
                found.cell = Some(index);
            }
            if n + 1 == 3 {
                Ok(ScanState::ExpectSpeciesNames)
            } else {
                Ok(ScanState::ExpectCellVectors(n + 1))
            }
        }
        ScanState::ExpectSpeciesNames => {
            if !is_alphabetic(line) {
                return Err(unexpected(
                    "a line without species symbols (files without a species line are not supported)",
                ));
            }
            found.species_names = Some(index);
            Ok(ScanState::ExpectSpeciesCounts)
        }
        ScanState::ExpectSpeciesCounts => {
            if !is_numeric(line) {
                return Err(unexpected("a non-numeric line"));
            }
            let total = parse_counts(line)
                .map_err(|message| PoscarError::malformed(index + 1, message))?
                .into_iter()
                .try_fold(0usize, |acc, count| acc.checked_add(count))
                .ok_or_else(|| {
                    PoscarError::malformed(index + 1, "species counts overflow the atom total")
                })?;
            if total == 0 {
                return Err(PoscarError::malformed(
                    index + 1,
                    "total atom count must be positive",
                ));
            }
            found.species_counts = Some(index);
            found.total_atoms = total;
            Ok(ScanState::ExpectModeKeyword)
        }
        ScanState::ExpectModeKeyword => {
            if is_mode_keyword(line) {
                found.positions = Some(index + 1);
                Ok(ScanState::Done)
            } else {
                debug!("Skipping line {} before coordinate mode: '{}'", index + 1, line);
                Ok(state)
            }
        }
        ScanState::Done => Ok(state),
    }
}

/// Parses the first token of a scale line.
pub(crate) fn parse_scale(line: &str) -> std::result::Result<f64, String> {
    let token = line
        .split_whitespace()
        .next()
        .ok_or_else(|| "empty scaling factor line".to_string())?;
    token
        .parse::<f64>()
        .map_err(|_| format!("invalid scaling factor '{}'", token))
}

/// Parses every token of a species counts line as an integer.
pub(crate) fn parse_counts(line: &str) -> std::result::Result<Vec<usize>, String> {
    line.split_whitespace()
        .map(|token| {
            token
                .parse::<usize>()
                .map_err(|_| format!("invalid species count '{}'", token))
        })
        .collect()
}

/// Parses the first three tokens of a line as a coordinate triple.
pub(crate) fn parse_row(line: &str) -> std::result::Result<[f64; 3], String> {
    let mut row = [0.0; 3];
    let mut tokens = line.split_whitespace();
    for value in row.iter_mut() {
        let token = tokens
            .next()
            .ok_or_else(|| format!("expected three numbers in '{}'", line.trim()))?;
        *value = token
            .parse::<f64>()
            .map_err(|_| format!("invalid number '{}'", token))?;
    }
    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(extra: &[&str]) -> Vec<String> {
        let mut lines: Vec<String> = [
            "Si8 test cell",
            "1.0",
            "5.43 0.00 0.00",
            "0.00 5.43 0.00",
            "0.00 0.00 5.43",
            "Si O",
            "1 1",
            "Direct",
            "0.0 0.0 0.0",
            "0.5 0.5 0.5",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        lines.extend(extra.iter().map(|s| s.to_string()));
        lines
    }

    #[test]
    fn test_scan_canonical_layout() {
        let outcome = scan(&canonical(&[])).unwrap();
        let m = outcome.markers;
        assert_eq!(m.title, 0);
        assert_eq!(m.scale, 1);
        assert_eq!(m.cell, 2);
        assert_eq!(m.species_names, 5);
        assert_eq!(m.species_counts, 6);
        assert_eq!(m.positions, 8);
        assert_eq!(m.velocities, None);
        assert_eq!(outcome.total_atoms, 2);
    }

    #[test]
    fn test_scan_detects_velocity_block() {
        let outcome = scan(&canonical(&["0.1 0.0 0.0", "0.0 0.1 0.0"])).unwrap();
        assert_eq!(outcome.markers.velocities, Some(10));
    }

    #[test]
    fn test_scan_ignores_short_trailing_block() {
        let outcome = scan(&canonical(&["0.1 0.0 0.0"])).unwrap();
        assert_eq!(outcome.markers.velocities, None);
    }

    #[test]
    fn test_scan_skips_selective_dynamics() {
        let mut lines = canonical(&[]);
        lines.insert(7, "Selective dynamics".to_string());
        let outcome = scan(&lines).unwrap();
        assert_eq!(outcome.markers.positions, 9);
    }

    #[test]
    fn test_scan_accepts_cartesian_keyword() {
        let mut lines = canonical(&[]);
        lines[7] = "Cartesian".to_string();
        assert_eq!(scan(&lines).unwrap().markers.positions, 8);
    }

    #[test]
    fn test_scan_missing_mode_keyword_is_malformed() {
        let mut lines = canonical(&[]);
        lines.truncate(7);
        let err = scan(&lines).unwrap_err();
        assert!(err.to_string().contains("coordinate mode"));
    }

    #[test]
    fn test_scan_zero_atoms_is_malformed() {
        let mut lines = canonical(&[]);
        lines[6] = "0 0".to_string();
        let err = scan(&lines).unwrap_err();
        assert!(err.to_string().contains("must be positive"));
    }

    #[test]
    fn test_scan_rejects_vasp4_counts_without_names() {
        let mut lines = canonical(&[]);
        lines.remove(5);
        assert!(scan(&lines).is_err());
    }

    #[test]
    fn test_scan_overflowing_count_sum_is_malformed() {
        let mut lines = canonical(&[]);
        lines[6] = format!("{} 1", usize::MAX);
        let err = scan(&lines).unwrap_err();
        assert!(matches!(err, PoscarError::Malformed { line: 7, .. }));
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_scan_count_past_address_space_is_malformed() {
        let mut lines = canonical(&[]);
        lines[5] = "Si".to_string();
        lines[6] = usize::MAX.to_string();
        let err = scan(&lines).unwrap_err();
        assert!(matches!(err, PoscarError::Malformed { .. }));
    }

    #[test]
    fn test_scan_huge_count_has_no_velocity_block() {
        let mut lines = canonical(&[]);
        lines[5] = "H".to_string();
        lines[6] = (usize::MAX / 2 + 1).to_string();
        let outcome = scan(&lines).unwrap();
        assert_eq!(outcome.total_atoms, usize::MAX / 2 + 1);
        assert_eq!(outcome.markers.velocities, None);
    }

    #[test]
    fn test_scan_rejects_non_integer_counts() {
        let mut lines = canonical(&[]);
        lines[6] = "1 1.5".to_string();
        let err = scan(&lines).unwrap_err();
        assert!(err.to_string().contains("invalid species count"));
    }

    #[test]
    fn test_line_classification() {
        assert!(is_alphabetic("Ba F"));
        assert!(is_numeric("  0.25  -0.5 1"));
        assert!(!is_numeric("  0.25  -0.5 1e"));
        assert!(is_numeric("   1.00000000000000     "));
        assert!(is_mode_keyword("Direct"));
        assert!(is_mode_keyword("Cartesian"));
        assert!(is_mode_keyword("Kartesisch"));
        assert!(!is_mode_keyword("Selective dynamics"));
    }

    #[test]
    fn test_parse_row_uses_first_three_tokens() {
        assert_eq!(parse_row(" 0.1 0.2 0.3 T T F").unwrap(), [0.1, 0.2, 0.3]);
        assert!(parse_row("0.1 0.2").is_err());
        assert!(parse_row("0.1 x 0.3").is_err());
    }
}
