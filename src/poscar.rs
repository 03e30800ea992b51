//! Line-preserving model of VASP POSCAR structure files.
//!
//! A [`Poscar`] owns the non-blank lines of a structure file together with a
//! set of [`Markers`] pointing at the semantic fields. Reads parse the marked
//! lines on demand; writes replace whole lines with freshly formatted text
//! and leave everything else untouched, so a document that is parsed and
//! written back keeps its original layout.
//!
//! # File Layout
//!
//! ```text
//! <title line>
//! <scale factor>
//! <3 lines: lattice vectors>
//! <species names>
//! <species counts>
//! <coordinate mode: Direct / Cartesian>
//! <N lines: atom positions>
//!
//! <N lines (optional): atom velocities>
//! ```
//!
//! # Number Formats
//!
//! | Field | Format |
//! |-------|--------|
//! | Scale factor | fixed point, 14 decimals |
//! | Lattice vectors | fixed point, 16 decimals, width 21 |
//! | Positions | fixed point, 16 decimals, width 19 |
//! | Velocities | scientific, 8 decimals, width 15 |
//!
//! # Examples
//!
//! ```
//! use posmix::poscar::{Poscar, Species};
//! use nalgebra::DMatrix;
//!
//! let mut poscar = Poscar::default();
//! poscar.set_species(&[Species::new("Ba", 1), Species::new("F", 2)]).unwrap();
//! assert_eq!(poscar.total_atom_count(), 3);
//!
//! let positions = DMatrix::from_row_slice(3, 3, &[
//!     0.0, 0.0, 0.0,
//!     0.25, 0.25, 0.25,
//!     0.75, 0.75, 0.75,
//! ]);
//! poscar.set_positions(&positions).unwrap();
//!
//! let reparsed: Poscar = poscar.to_string().parse().unwrap();
//! assert_eq!(reparsed.positions().unwrap(), positions);
//! ```

use crate::parser::{self, Markers};
use lazy_static::lazy_static;
use log::{debug, warn};
use nalgebra::{DMatrix, Matrix3, Vector3};
use regex::{NoExpand, Regex};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
    static ref NUMBER_RE: Regex = Regex::new(r"-?[0-9.]+(?:[eE][-+]?[0-9]+)?").unwrap();
}

/// Errors raised while reading or editing a POSCAR document.
#[derive(Error, Debug)]
pub enum PoscarError {
    /// I/O error when reading structure files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The text does not follow the POSCAR field order or a field fails to parse
    #[error("Malformed POSCAR at line {line}: {message}")]
    Malformed {
        /// 1-based index into the non-blank lines (0 when not tied to a line)
        line: usize,
        /// What went wrong
        message: String,
    },
    /// A setter was given a value of the wrong shape or range
    #[error("Invalid {field}: {message}")]
    Validation {
        /// Name of the field being written
        field: &'static str,
        /// What went wrong
        message: String,
    },
}

impl PoscarError {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        PoscarError::Malformed {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        PoscarError::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Type alias for POSCAR operation results
pub type Result<T> = std::result::Result<T, PoscarError>;

/// One entry of the species table: a chemical symbol and its atom count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    /// Chemical symbol as written in the file
    pub name: String,
    /// Number of consecutive atoms of this species
    pub count: usize,
}

impl Species {
    /// Creates a species table entry.
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// A POSCAR structure file held as text lines plus field markers.
///
/// Invariants maintained by every setter:
///
/// - the position block spans exactly `total_atom_count()` lines
/// - the velocity block, when present, follows it directly and spans the
///   same number of lines
/// - markers are strictly increasing in field order
///
/// Clones are fully independent documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Poscar {
    lines: Vec<String>,
    markers: Markers,
    total_atoms: usize,
}

impl Default for Poscar {
    /// Builds a one-hydrogen placeholder in a unit cube, with a zero velocity.
    fn default() -> Self {
        let lines = vec![
            "Standard".to_string(),
            format!("{:>19.14}     ", 1.0_f64),
            format_cell_row(&[1.0, 0.0, 0.0]),
            format_cell_row(&[0.0, 1.0, 0.0]),
            format_cell_row(&[0.0, 0.0, 1.0]),
            "   H".to_string(),
            "    1".to_string(),
            "Direct".to_string(),
            format_position_row(&[0.0; 3]),
            format_velocity_row(&[0.0; 3]),
        ];
        Self {
            lines,
            markers: Markers {
                title: 0,
                scale: 1,
                cell: 2,
                species_names: 5,
                species_counts: 6,
                positions: 8,
                velocities: Some(9),
            },
            total_atoms: 1,
        }
    }
}

impl Poscar {
    /// Parses a document from raw lines.
    ///
    /// Blank lines are dropped before scanning, trailing carriage returns are
    /// stripped. Every numeric field is parsed once up front, so a document
    /// that loads successfully reads back without errors.
    ///
    /// # Errors
    ///
    /// Returns [`PoscarError::Malformed`] if the markers cannot be located or
    /// any marked field fails to parse.
    pub fn from_lines<I, S>(lines: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines: Vec<String> = lines
            .into_iter()
            .map(|line| {
                line.as_ref()
                    .trim_end_matches(|c: char| c == '\r' || c == '\n')
                    .to_string()
            })
            .filter(|line| !line.trim().is_empty())
            .collect();

        let outcome = parser::scan(&lines)?;
        let poscar = Self {
            lines,
            markers: outcome.markers,
            total_atoms: outcome.total_atoms,
        };
        poscar.check_fields()?;
        Ok(poscar)
    }

    fn check_fields(&self) -> Result<()> {
        self.scaling_factor()?;
        self.cell()?;
        let species = self.species()?;
        if species.is_empty() {
            return Err(PoscarError::malformed(
                self.markers.species_names + 1,
                "empty species table",
            ));
        }
        self.positions()?;
        self.velocities()?;
        Ok(())
    }

    /// All stored lines, without line terminators.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Field markers into [`Poscar::lines`].
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Whether the document carries a velocity block.
    pub fn has_velocities(&self) -> bool {
        self.markers.velocities.is_some()
    }

    // Title

    /// Returns the title line with runs of whitespace collapsed.
    pub fn title(&self) -> String {
        self.lines[self.markers.title]
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Replaces the first word of the title line, keeping surrounding text.
    ///
    /// # Errors
    ///
    /// The title must contain a letter and no line breaks, otherwise the
    /// written file could not be scanned again.
    pub fn set_title(&mut self, title: &str) -> Result<()> {
        if title.contains(|c: char| c == '\n' || c == '\r') {
            return Err(PoscarError::validation(
                "title",
                "title must be a single line",
            ));
        }
        if !parser::is_alphabetic(title) {
            return Err(PoscarError::validation(
                "title",
                format!("'{}' must contain at least one letter", title),
            ));
        }
        let line = &self.lines[self.markers.title];
        let replaced = WORD_RE.replacen(line, 1, NoExpand(title)).into_owned();
        self.lines[self.markers.title] = replaced;
        Ok(())
    }

    // Scaling factor

    /// Universal scaling factor.
    pub fn scaling_factor(&self) -> Result<f64> {
        let index = self.markers.scale;
        parser::parse_scale(&self.lines[index])
            .map_err(|message| PoscarError::malformed(index + 1, message))
    }

    /// Rewrites the number on the scale line with 14 decimals.
    pub fn set_scaling_factor(&mut self, scale: f64) -> Result<()> {
        if !scale.is_finite() || scale == 0.0 {
            return Err(PoscarError::validation(
                "scaling factor",
                format!("{} is not a finite non-zero number", scale),
            ));
        }
        let value = format!("{:.14}", scale);
        if value.parse::<f64>().map_or(true, |printed| printed == 0.0) {
            return Err(PoscarError::validation(
                "scaling factor",
                format!("{} rounds to zero at 14 decimals", scale),
            ));
        }
        let line = &self.lines[self.markers.scale];
        let replaced = NUMBER_RE.replacen(line, 1, NoExpand(&value)).into_owned();
        self.lines[self.markers.scale] = replaced;
        Ok(())
    }

    // Lattice

    /// Lattice vectors as rows of a 3x3 matrix.
    pub fn cell(&self) -> Result<Matrix3<f64>> {
        let mut cell = Matrix3::zeros();
        for i in 0..3 {
            let index = self.markers.cell + i;
            let row = parser::parse_row(&self.lines[index])
                .map_err(|message| PoscarError::malformed(index + 1, message))?;
            for (j, value) in row.iter().enumerate() {
                cell[(i, j)] = *value;
            }
        }
        Ok(cell)
    }

    /// Replaces a single lattice vector (`index` in 0..3).
    pub fn set_cell_vector(&mut self, index: usize, vector: &Vector3<f64>) -> Result<()> {
        if index >= 3 {
            return Err(PoscarError::validation(
                "lattice vector",
                format!("index {} is out of range 0..3", index),
            ));
        }
        check_finite("lattice vector", vector.iter())?;
        self.lines[self.markers.cell + index] =
            format_cell_row(&[vector[0], vector[1], vector[2]]);
        Ok(())
    }

    /// Replaces the leading lattice vectors with the rows of an `n x 3`
    /// matrix, `1 <= n <= 3`.
    pub fn set_cell(&mut self, cell: &DMatrix<f64>) -> Result<()> {
        if cell.ncols() != 3 || cell.nrows() == 0 || cell.nrows() > 3 {
            return Err(PoscarError::validation(
                "lattice",
                format!(
                    "lattice vectors must form an n x 3 matrix with n <= 3, got {} x {}",
                    cell.nrows(),
                    cell.ncols()
                ),
            ));
        }
        check_finite("lattice", cell.iter())?;
        for (i, row) in cell.row_iter().enumerate() {
            self.lines[self.markers.cell + i] = format_cell_row(&[row[0], row[1], row[2]]);
        }
        Ok(())
    }

    // Species table

    /// Species names paired positionally with their counts, in file order.
    pub fn species(&self) -> Result<Vec<Species>> {
        let names: Vec<&str> = self.lines[self.markers.species_names]
            .split_whitespace()
            .collect();
        let counts_index = self.markers.species_counts;
        let counts = parser::parse_counts(&self.lines[counts_index])
            .map_err(|message| PoscarError::malformed(counts_index + 1, message))?;

        if names.len() != counts.len() {
            return Err(PoscarError::malformed(
                counts_index + 1,
                format!(
                    "{} species names but {} species counts",
                    names.len(),
                    counts.len()
                ),
            ));
        }

        Ok(names
            .into_iter()
            .zip(counts)
            .map(|(name, count)| Species::new(name, count))
            .collect())
    }

    /// Rewrites the species names and counts lines in the given order.
    ///
    /// The total atom count is recomputed from the table; when it changes
    /// the position and velocity blocks are truncated or zero-padded to
    /// match.
    ///
    /// # Errors
    ///
    /// Rejects an empty table, zero counts, duplicate names and names that
    /// are not a single run of non-whitespace text containing a letter.
    pub fn set_species(&mut self, species: &[Species]) -> Result<()> {
        if species.is_empty() {
            return Err(PoscarError::validation(
                "species table",
                "at least one species is required",
            ));
        }
        for (i, entry) in species.iter().enumerate() {
            if entry.name.split_whitespace().count() != 1 || !parser::is_alphabetic(&entry.name)
            {
                return Err(PoscarError::validation(
                    "species table",
                    format!("'{}' is not a valid species symbol", entry.name),
                ));
            }
            if entry.count == 0 {
                return Err(PoscarError::validation(
                    "species table",
                    format!("species '{}' has zero atoms", entry.name),
                ));
            }
            if species[..i].iter().any(|other| other.name == entry.name) {
                return Err(PoscarError::validation(
                    "species table",
                    format!("species '{}' listed twice", entry.name),
                ));
            }
        }

        let mut names = String::new();
        let mut counts = String::new();
        for entry in species {
            names.push_str(&format!(" {:>5}", entry.name));
            counts.push_str(&format!(" {:>5}", entry.count));
        }
        self.lines[self.markers.species_names] = names;
        self.lines[self.markers.species_counts] = counts;

        let total: usize = species.iter().map(|entry| entry.count).sum();
        if total != self.total_atoms {
            debug!(
                "Species table changed atom count from {} to {}",
                self.total_atoms, total
            );
            let positions = self.resized_position_lines(total);
            self.rebuild_atom_blocks(positions);
        }
        Ok(())
    }

    // Atom count

    /// Number of atoms in the position block.
    pub fn total_atom_count(&self) -> usize {
        self.total_atoms
    }

    /// Resizes the position and velocity blocks to `count` atoms.
    ///
    /// Existing rows are kept, new rows are zero. The species counts line is
    /// not rewritten; use [`Poscar::set_species`] to keep it in step.
    pub fn set_total_atom_count(&mut self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(PoscarError::validation(
                "total atom count",
                "must be greater than 0",
            ));
        }
        if count != self.total_atoms {
            let positions = self.resized_position_lines(count);
            self.rebuild_atom_blocks(positions);
            self.warn_on_species_drift();
        }
        Ok(())
    }

    // Positions

    /// Atom positions as an `N x 3` matrix.
    pub fn positions(&self) -> Result<DMatrix<f64>> {
        self.parse_block(self.markers.positions, "position")
    }

    /// Replaces the position of atom `index` (0-based).
    pub fn set_atom_position(&mut self, index: usize, position: &Vector3<f64>) -> Result<()> {
        self.check_atom_index("atom position", index)?;
        check_finite("atom position", position.iter())?;
        self.lines[self.markers.positions + index] =
            self.position_line(index, &[position[0], position[1], position[2]]);
        Ok(())
    }

    /// Writes an `M x 3` matrix of positions.
    ///
    /// With `M <= N` the first `M` position lines are replaced in place and
    /// the rest of the document is untouched. With `M > N` the document is
    /// resized: the position block becomes exactly the new rows, the atom
    /// count becomes `M` and an existing velocity block is zero-padded to
    /// match.
    pub fn set_positions(&mut self, positions: &DMatrix<f64>) -> Result<()> {
        check_shape("atom positions", positions)?;
        check_finite("atom positions", positions.iter())?;

        let rows: Vec<String> = positions
            .row_iter()
            .enumerate()
            .map(|(i, row)| self.position_line(i, &[row[0], row[1], row[2]]))
            .collect();

        if rows.len() <= self.total_atoms {
            let start = self.markers.positions;
            for (i, row) in rows.into_iter().enumerate() {
                self.lines[start + i] = row;
            }
        } else {
            debug!(
                "Resizing position block from {} to {} atoms",
                self.total_atoms,
                rows.len()
            );
            self.rebuild_atom_blocks(rows);
            self.warn_on_species_drift();
        }
        Ok(())
    }

    // Velocities

    /// Atom velocities as an `N x 3` matrix, if the document has them.
    pub fn velocities(&self) -> Result<Option<DMatrix<f64>>> {
        match self.markers.velocities {
            Some(start) => self.parse_block(start, "velocity").map(Some),
            None => Ok(None),
        }
    }

    /// Replaces the velocity of atom `index` (0-based), creating a zero
    /// velocity block first if the document has none.
    pub fn set_atom_velocity(&mut self, index: usize, velocity: &Vector3<f64>) -> Result<()> {
        self.check_atom_index("atom velocity", index)?;
        check_finite("atom velocity", velocity.iter())?;
        let start = self.ensure_velocity_block();
        self.lines[start + index] = format_velocity_row(&[velocity[0], velocity[1], velocity[2]]);
        Ok(())
    }

    /// Replaces the leading velocity lines with the rows of an `M x 3`
    /// matrix, `M <= N`.
    pub fn set_velocities(&mut self, velocities: &DMatrix<f64>) -> Result<()> {
        check_shape("atom velocities", velocities)?;
        if velocities.nrows() > self.total_atoms {
            return Err(PoscarError::validation(
                "atom velocities",
                format!(
                    "{} velocity rows for {} atoms; resize through the positions first",
                    velocities.nrows(),
                    self.total_atoms
                ),
            ));
        }
        check_finite("atom velocities", velocities.iter())?;

        let start = self.ensure_velocity_block();
        for (i, row) in velocities.row_iter().enumerate() {
            self.lines[start + i] = format_velocity_row(&[row[0], row[1], row[2]]);
        }
        Ok(())
    }

    // Internals

    fn parse_block(&self, start: usize, what: &str) -> Result<DMatrix<f64>> {
        let end = match start.checked_add(self.total_atoms) {
            Some(end) if end <= self.lines.len() => end,
            _ => {
                return Err(PoscarError::malformed(
                    self.lines.len(),
                    format!(
                        "expected {} {} lines, found {}",
                        self.total_atoms,
                        what,
                        self.lines.len().saturating_sub(start)
                    ),
                ))
            }
        };

        let mut block = DMatrix::zeros(self.total_atoms, 3);
        for (i, line) in self.lines[start..end].iter().enumerate() {
            let row = parser::parse_row(line)
                .map_err(|message| PoscarError::malformed(start + i + 1, message))?;
            for (j, value) in row.iter().enumerate() {
                block[(i, j)] = *value;
            }
        }
        Ok(block)
    }

    fn check_atom_index(&self, field: &'static str, index: usize) -> Result<()> {
        if index >= self.total_atoms {
            return Err(PoscarError::validation(
                field,
                format!(
                    "atom index {} is out of range for {} atoms",
                    index, self.total_atoms
                ),
            ));
        }
        Ok(())
    }

    /// Formats a position for atom `index`, carrying over any selective
    /// dynamics flags after the third column of the existing line.
    fn position_line(&self, index: usize, row: &[f64; 3]) -> String {
        let mut line = format_position_row(row);
        if index < self.total_atoms {
            for flag in self.lines[self.markers.positions + index]
                .split_whitespace()
                .skip(3)
            {
                line.push_str(&format!(" {:>3}", flag));
            }
        }
        line
    }

    /// Current position lines truncated or zero-padded to `count`.
    fn resized_position_lines(&self, count: usize) -> Vec<String> {
        let start = self.markers.positions;
        let mut rows = self.lines[start..start + self.total_atoms].to_vec();
        rows.resize(count, format_position_row(&[0.0; 3]));
        rows
    }

    /// Swaps in a new position block and resizes the velocity block to the
    /// same length, keeping any lines that follow both blocks.
    fn rebuild_atom_blocks(&mut self, positions: Vec<String>) {
        let start = self.markers.positions;
        let count = positions.len();
        let blocks_end = match self.markers.velocities {
            Some(velocity_start) => velocity_start + self.total_atoms,
            None => start + self.total_atoms,
        };

        let tail = self.lines.split_off(blocks_end.min(self.lines.len()));
        let velocities = self
            .markers
            .velocities
            .map(|velocity_start| self.lines.split_off(velocity_start));
        self.lines.truncate(start);
        self.lines.extend(positions);

        if let Some(mut velocities) = velocities {
            velocities.resize(count, format_velocity_row(&[0.0; 3]));
            self.markers.velocities = Some(start + count);
            self.lines.extend(velocities);
        }
        self.lines.extend(tail);
        self.total_atoms = count;
    }

    fn ensure_velocity_block(&mut self) -> usize {
        if let Some(start) = self.markers.velocities {
            return start;
        }
        let start = self.markers.positions + self.total_atoms;
        let tail = self.lines.split_off(start);
        self.lines
            .extend(vec![format_velocity_row(&[0.0; 3]); self.total_atoms]);
        self.lines.extend(tail);
        self.markers.velocities = Some(start);
        start
    }

    fn warn_on_species_drift(&self) {
        if let Ok(species) = self.species() {
            let listed: usize = species.iter().map(|entry| entry.count).sum();
            if listed != self.total_atoms {
                warn!(
                    "Species counts sum to {} but the document now holds {} atoms",
                    listed, self.total_atoms
                );
            }
        }
    }
}

impl FromStr for Poscar {
    type Err = PoscarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_lines(s.lines())
    }
}

impl fmt::Display for Poscar {
    /// Writes the file layout: everything up to the velocity block, one
    /// blank separator line, then the velocity block.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.markers.velocities {
            Some(start) => {
                for line in &self.lines[..start] {
                    writeln!(f, "{}", line)?;
                }
                writeln!(f)?;
                for line in &self.lines[start..start + self.total_atoms] {
                    writeln!(f, "{}", line)?;
                }
            }
            None => {
                let end = (self.markers.positions + self.total_atoms).min(self.lines.len());
                for line in &self.lines[..end] {
                    writeln!(f, "{}", line)?;
                }
            }
        }
        Ok(())
    }
}

fn check_shape(field: &'static str, matrix: &DMatrix<f64>) -> Result<()> {
    if matrix.ncols() != 3 || matrix.nrows() == 0 {
        return Err(PoscarError::validation(
            field,
            format!(
                "expected an n x 3 matrix, got {} x {}",
                matrix.nrows(),
                matrix.ncols()
            ),
        ));
    }
    Ok(())
}

fn check_finite<'a>(field: &'static str, mut values: impl Iterator<Item = &'a f64>) -> Result<()> {
    if values.all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(PoscarError::validation(field, "values must be finite"))
    }
}

/// Formats a lattice vector line.
pub fn format_cell_row(row: &[f64; 3]) -> String {
    let mut line = String::from(" ");
    for value in row {
        line.push_str(&format!(" {:>21.16}", value));
    }
    line
}

/// Formats an atom position line.
pub fn format_position_row(row: &[f64; 3]) -> String {
    let mut line = String::new();
    for value in row {
        line.push_str(&format!(" {:>19.16}", value));
    }
    line
}

/// Formats an atom velocity line.
pub fn format_velocity_row(row: &[f64; 3]) -> String {
    let mut line = String::new();
    for value in row {
        line.push_str(&format!(" {:>15}", format_scientific(*value, 8)));
    }
    line
}

/// Formats a number as `d.ddddddddE+XX`, the exponent padded to two digits.
pub fn format_scientific(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}
