use nalgebra::{DMatrix, Vector3};
use posmix::io;
use posmix::poscar::{Poscar, PoscarError, Species};
use std::fs;
use tempfile::tempdir;

const SELECTIVE: &str = "\
Cu3Au L12 ordered
   3.75000000000000
     1.0000000000000000    0.0000000000000000    0.0000000000000000
     0.0000000000000000    1.0000000000000000    0.0000000000000000
     0.0000000000000000    0.0000000000000000    1.0000000000000000
   Au   Cu
    1    3
Selective dynamics
Direct
  0.0000000000000000  0.0000000000000000  0.0000000000000000   F   F   F
  0.0000000000000000  0.5000000000000000  0.5000000000000000   T   T   T
  0.5000000000000000  0.0000000000000000  0.5000000000000000   T   T   T
  0.5000000000000000  0.5000000000000000  0.0000000000000000   T   T   T

  0.00000000E+00  0.00000000E+00  0.00000000E+00
  1.25000000E-03 -2.50000000E-03  0.00000000E+00
  0.00000000E+00  0.00000000E+00  0.00000000E+00
  0.00000000E+00  0.00000000E+00  5.00000000E-04
";

const CARTESIAN: &str = "\
NaCl rocksalt primitive
1.0
0.0 2.82 2.82
2.82 0.0 2.82
2.82 2.82 0.0
Na Cl
1 1
Cartesian
0.0 0.0 0.0
2.82 2.82 2.82
";

#[test]
fn test_file_round_trip_is_byte_identical() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("POSCAR");
    let output = dir.path().join("POSCAR.out");
    fs::write(&input, SELECTIVE).unwrap();

    let poscar = io::read_poscar(&input).unwrap();
    io::write_poscar(&poscar, &output).unwrap();
    assert_eq!(fs::read_to_string(&output).unwrap(), SELECTIVE);
}

#[test]
fn test_selective_dynamics_fields() {
    let poscar: Poscar = SELECTIVE.parse().unwrap();

    assert_eq!(poscar.title(), "Cu3Au L12 ordered");
    assert_eq!(poscar.scaling_factor().unwrap(), 3.75);
    assert_eq!(
        poscar.species().unwrap(),
        vec![Species::new("Au", 1), Species::new("Cu", 3)]
    );
    assert_eq!(poscar.markers().positions, 9);
    assert_eq!(poscar.markers().velocities, Some(13));

    let positions = poscar.positions().unwrap();
    assert_eq!(positions.nrows(), poscar.total_atom_count());
    assert_eq!(positions[(2, 0)], 0.5);

    let velocities = poscar.velocities().unwrap().unwrap();
    assert_eq!(velocities.nrows(), poscar.total_atom_count());
    assert_eq!(velocities[(1, 1)], -2.5e-3);
}

#[test]
fn test_single_edit_touches_one_line() {
    let mut poscar: Poscar = SELECTIVE.parse().unwrap();
    let before = poscar.lines().to_vec();

    poscar
        .set_atom_position(3, &Vector3::new(0.5, 0.5, 0.125))
        .unwrap();

    let changed: Vec<usize> = before
        .iter()
        .zip(poscar.lines())
        .enumerate()
        .filter(|(_, (a, b))| a != b)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(changed, vec![12]);
    assert_eq!(poscar.positions().unwrap()[(3, 2)], 0.125);
    assert_eq!(
        poscar.lines()[12],
        "  0.5000000000000000  0.5000000000000000  0.1250000000000000   T   T   T"
    );
}

#[test]
fn test_cartesian_without_velocities() {
    let poscar: Poscar = CARTESIAN.parse().unwrap();
    assert!(!poscar.has_velocities());
    assert_eq!(poscar.total_atom_count(), 2);
    assert_eq!(poscar.cell().unwrap()[(0, 1)], 2.82);
    assert_eq!(poscar.to_string(), CARTESIAN);
}

#[test]
fn test_growing_species_table_keeps_document_consistent() {
    let mut poscar: Poscar = CARTESIAN.parse().unwrap();
    poscar
        .set_species(&[Species::new("Na", 2), Species::new("Cl", 2)])
        .unwrap();
    assert_eq!(poscar.total_atom_count(), 4);

    let reparsed: Poscar = poscar.to_string().parse().unwrap();
    assert_eq!(reparsed.total_atom_count(), 4);
    let positions = reparsed.positions().unwrap();
    assert_eq!(positions[(1, 0)], 2.82);
    assert_eq!(positions.row(3).sum(), 0.0);
}

#[test]
fn test_resize_through_positions_then_fix_species() {
    let mut poscar: Poscar = SELECTIVE.parse().unwrap();
    let rows = DMatrix::from_fn(6, 3, |i, _| i as f64 / 8.0);
    poscar.set_positions(&rows).unwrap();
    poscar
        .set_species(&[Species::new("Au", 2), Species::new("Cu", 4)])
        .unwrap();

    let reparsed: Poscar = poscar.to_string().parse().unwrap();
    assert_eq!(reparsed.total_atom_count(), 6);
    assert_eq!(reparsed.positions().unwrap(), rows);
    let velocities = reparsed.velocities().unwrap().unwrap();
    assert_eq!(velocities.nrows(), 6);
    assert_eq!(velocities[(3, 2)], 5.0e-4);
    assert_eq!(velocities[(5, 2)], 0.0);
}

#[test]
fn test_truncated_file_is_rejected() {
    let truncated: String = SELECTIVE.lines().take(7).collect::<Vec<_>>().join("\n");
    let err = truncated.parse::<Poscar>().unwrap_err();
    assert!(matches!(err, PoscarError::Malformed { .. }));
}
