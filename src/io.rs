//! File I/O for structure files and auxiliary VASP inputs.
//!
//! These are the collaborator operations the packaging driver uses: read the
//! non-blank lines of a file, write a structure to a path and copy an
//! auxiliary file (KPOINTS, INCAR, POTCAR, ...) into an output directory.

use crate::poscar::{self, Poscar};
use log::debug;
use std::fs;
use std::io::Result;
use std::path::{Path, PathBuf};

/// Reads a text file into its non-blank lines, without line terminators.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect())
}

/// Reads and parses a POSCAR file.
///
/// # Examples
///
/// ```
/// use posmix::io;
/// use posmix::poscar::Poscar;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let dir = std::env::temp_dir().join("posmix_io_doc");
///     std::fs::create_dir_all(&dir)?;
///     let path = dir.join("POSCAR");
///
///     io::write_poscar(&Poscar::default(), &path)?;
///     let poscar = io::read_poscar(&path)?;
///     assert_eq!(poscar.title(), "Standard");
///
///     std::fs::remove_dir_all(&dir)?;
///     Ok(())
/// }
/// ```
pub fn read_poscar(path: &Path) -> poscar::Result<Poscar> {
    let lines = read_lines(path)?;
    debug!("Read {} non-blank lines from {}", lines.len(), path.display());
    Poscar::from_lines(lines)
}

/// Writes a structure to `path`, replacing any existing file.
pub fn write_poscar(poscar: &Poscar, path: &Path) -> Result<()> {
    fs::write(path, poscar.to_string())
}

/// Copies `source` into `directory`, keeping its file name.
///
/// Returns the destination path.
pub fn copy_auxiliary_file(source: &Path, directory: &Path) -> Result<PathBuf> {
    let name = source.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("'{}' does not name a file", source.display()),
        )
    })?;
    let destination = directory.join(name);
    fs::copy(source, &destination)?;
    Ok(destination)
}
