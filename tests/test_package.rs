use nalgebra::DMatrix;
use posmix::config::MixConfig;
use posmix::io;
use posmix::manifest::Manifest;
use posmix::naming::MANIFEST_FILE;
use posmix::package::{setup_as_package, PackageError};
use posmix::poscar::{Poscar, Species};
use posmix::settings::Settings;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Writes a two-atom pair; the first atom moves across the z boundary.
fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let mut base = Poscar::default();
    base.set_title("SiC").unwrap();
    base.set_species(&[Species::new("Si", 1), Species::new("C", 1)])
        .unwrap();
    let mut target = base.clone();

    base.set_positions(&DMatrix::from_row_slice(
        2,
        3,
        &[0.0, 0.0, 0.99995, 0.25, 0.25, 0.25],
    ))
    .unwrap();
    target
        .set_positions(&DMatrix::from_row_slice(
            2,
            3,
            &[0.0, 0.0, 0.0, 0.5, 0.25, 0.25],
        ))
        .unwrap();

    let base_path = dir.join("POSCAR1");
    let target_path = dir.join("POSCAR2");
    io::write_poscar(&base, &base_path).unwrap();
    io::write_poscar(&target, &target_path).unwrap();
    fs::write(dir.join("INCAR"), "ENCUT = 520\nISMEAR = 0\n").unwrap();
    fs::write(dir.join("KPOINTS"), "Automatic\n0\nGamma\n4 4 4\n").unwrap();
    (base_path, target_path)
}

#[test]
fn test_isometric_package_end_to_end() {
    let dir = tempdir().unwrap();
    let (base, target) = write_inputs(dir.path());
    let output = dir.path().join("runs");
    let incar = dir.path().join("INCAR");
    let kpoints = dir.path().join("KPOINTS");
    let args = [
        base.to_str().unwrap(),
        target.to_str().unwrap(),
        "--middle",
        "3",
        "--left",
        "1",
        "--right",
        "1",
        "--output",
        output.to_str().unwrap(),
        "--folder",
        "SiC_mix",
        "--incar",
        incar.to_str().unwrap(),
        "--kpoints",
        kpoints.to_str().unwrap(),
    ];
    let config = MixConfig::from_args(args).unwrap();

    let folders = setup_as_package(&config, &Settings::default()).unwrap();

    let root = output.join("SiC_mix");
    let names: Vec<String> = folders
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec!["eta=-0.250", "eta=0.250", "eta=0.500", "eta=0.750", "eta=1.250"]
    );

    for folder in &folders {
        assert_eq!(folder.parent().unwrap(), root);
        assert!(folder.join("POSCAR").is_file());
        assert_eq!(
            fs::read_to_string(folder.join("INCAR")).unwrap(),
            "ENCUT = 520\nISMEAR = 0\n"
        );
        assert!(folder.join("KPOINTS").is_file());
    }

    let middle = io::read_poscar(&root.join("eta=0.500").join("POSCAR")).unwrap();
    assert_eq!(middle.title(), "SiC");
    let positions = middle.positions().unwrap();
    // The first atom takes the short path across the boundary
    assert!((positions[(0, 2)] - 0.999975).abs() < 1e-12);
    assert!((positions[(1, 0)] - 0.375).abs() < 1e-12);

    let manifest = Manifest::load(&root.join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.atoms, 2);
    assert_eq!(manifest.fractions(), vec![-0.25, 0.25, 0.5, 0.75, 1.25]);
    assert_eq!(manifest.auxiliary_files.len(), 2);
    assert!(manifest.warnings.is_empty());
    assert!(manifest.path_length > 0.0);
}

#[test]
fn test_arbitrary_package_keeps_fraction_order() {
    let dir = tempdir().unwrap();
    let (base, target) = write_inputs(dir.path());
    let mut config = MixConfig::new(base, target);
    config.eta = vec![1.0, 0.0];
    config.output = dir.path().join("out");

    let folders = setup_as_package(&config, &Settings::default()).unwrap();
    assert_eq!(
        folders,
        vec![
            dir.path().join("out").join("eta=1.000"),
            dir.path().join("out").join("eta=0.000"),
        ]
    );

    let start = io::read_poscar(&folders[1].join("POSCAR")).unwrap();
    let base = io::read_poscar(&config.base).unwrap();
    assert_eq!(start.to_string(), base.to_string());
}

#[test]
fn test_incompatible_inputs_write_nothing() {
    let dir = tempdir().unwrap();
    let (base, _) = write_inputs(dir.path());

    let mut bigger = Poscar::default();
    bigger.set_species(&[Species::new("Si", 3)]).unwrap();
    let target = dir.path().join("POSCAR3");
    io::write_poscar(&bigger, &target).unwrap();

    let mut config = MixConfig::new(base, target);
    config.eta = vec![0.5];
    config.output = dir.path().join("out");

    let err = setup_as_package(&config, &Settings::default()).unwrap_err();
    assert!(matches!(err, PackageError::Validation(_)));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_settings_control_naming_and_tolerance() {
    let dir = tempdir().unwrap();
    let (base, target) = write_inputs(dir.path());
    let mut config = MixConfig::new(base, target);
    config.eta = vec![0.5];
    config.output = dir.path().to_path_buf();
    config.tolerance = Some(1e-6);

    let mut settings = Settings::default();
    settings.output.folder_prefix = "mix_".to_string();
    settings.output.precision = 2;
    settings.mixing.parallel = true;

    let folders = setup_as_package(&config, &settings).unwrap();
    assert_eq!(folders, vec![dir.path().join("mix_0.50")]);

    // Too tight a tolerance for the boundary crossing: the atom takes the long path
    let mixed = io::read_poscar(&folders[0].join("POSCAR")).unwrap();
    assert!((mixed.positions().unwrap()[(0, 2)] - 0.499975).abs() < 1e-12);
}
