use std::f64::consts::PI;
use std::fs::File;
use std::path::Path;

use ndarray::Array3;
use snapshot_common::{write_snapshot, Axis, Encoding, Field, Geometry, PlotConfig, Snapshot, SnapshotError};
use snapshot_plot::{output, pipeline};

fn edges(lo: f64, step: f64, n: usize) -> Vec<f64> {
    (0..=n).map(|i| lo + step * i as f64).collect()
}

// 4x4x1 Cartesian grid with centers 0..3 and a solid-body rotation v = w(-y, x).
fn rotating_box(omega: f64) -> Snapshot {
    let mut snap = Snapshot::new(
        0.25,
        Geometry::Cartesian,
        [
            Axis::from_edges(edges(-0.5, 1.0, 4)),
            Axis::from_edges(edges(-0.5, 1.0, 4)),
            Axis::from_edges(vec![0.0]),
        ],
    );
    let rho = Array3::from_shape_fn((4, 4, 1), |(i, j, _)| 1.0 + 0.1 * (i + j) as f64);
    let vx1 = Array3::from_shape_fn((4, 4, 1), |(_, j, _)| -omega * j as f64);
    let vx2 = Array3::from_shape_fn((4, 4, 1), |(i, _, _)| omega * i as f64);
    snap.insert_field(Field::new("RHO", rho)).unwrap();
    snap.insert_field(Field::new("VX1", vx1)).unwrap();
    snap.insert_field(Field::new("VX2", vx2)).unwrap();
    snap
}

fn polar_disc() -> Snapshot {
    let mut snap = Snapshot::new(
        1.5,
        Geometry::Polar,
        [
            Axis::from_edges(edges(1.0, 0.25, 8)),
            Axis::from_edges(edges(0.0, 2.0 * PI / 32.0, 32)),
            Axis::from_edges(vec![0.0]),
        ],
    );
    let rho = Array3::from_shape_fn((8, 32, 1), |(i, j, _)| 1.0 + i as f64 + (j as f64).cos());
    snap.insert_field(Field::new("RHO", rho)).unwrap();
    snap
}

fn write_fixture(dir: &Path, index: u32, snap: &Snapshot) {
    let path = dir.join(format!("data.{:04}.vtk", index));
    write_snapshot(File::create(path).unwrap(), snap, Encoding::Binary).unwrap();
}

fn config_for(dir: &Path) -> PlotConfig {
    let mut config = PlotConfig::default();
    config.snapshot.directory = dir.to_path_buf();
    config.render.width = 320;
    config.render.height = 240;
    config
}

fn has_snapshot_error(err: &anyhow::Error, pred: impl Fn(&SnapshotError) -> bool) -> bool {
    err.chain().any(|cause| cause.downcast_ref::<SnapshotError>().map_or(false, &pred))
}

#[test]
fn test_cartesian_snapshot_with_vorticity() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 3, &rotating_box(0.75));
    let mut config = config_for(dir.path());
    config.vorticity.enabled = true;

    let figures = pipeline::run(&config, 3).unwrap();
    let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["RHO", "VX1", "VX2", "omega_z"]);
    assert_eq!(figures[0].title, "RHO @ t=0.250000");
    assert!(figures.iter().all(|f| f.image.dimensions() == (320, 240)));

    // constant curl of 2w, drawn on a range centered on zero
    let (lo, hi) = figures[3].range;
    assert!((hi - 1.5).abs() < 1e-9, "range was [{}, {}]", lo, hi);
    assert_eq!(lo, -hi);
}

#[test]
fn test_polar_snapshot_renders_disc() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 12, &polar_disc());
    let config = config_for(dir.path());

    let figures = pipeline::run(&config, 12).unwrap();
    assert_eq!(figures.len(), 1);
    assert_eq!(figures[0].title, "RHO @ t=1.500000");

    // Equal aspect centers a square box in the plot area; the hole of radius 1
    // around the origin stays background.
    let center = figures[0].image.get_pixel(145, 119);
    assert_eq!(center.0, [255, 255, 255]);
}

#[test]
fn test_missing_velocity_component_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut snap = Snapshot::new(
        0.0,
        Geometry::Cartesian,
        [
            Axis::from_edges(edges(-0.5, 1.0, 4)),
            Axis::from_edges(edges(-0.5, 1.0, 4)),
            Axis::from_edges(vec![0.0]),
        ],
    );
    snap.insert_field(Field::new("RHO", Array3::zeros((4, 4, 1)))).unwrap();
    snap.insert_field(Field::new("VX2", Array3::zeros((4, 4, 1)))).unwrap();
    write_fixture(dir.path(), 0, &snap);

    let mut config = config_for(dir.path());
    config.vorticity.enabled = true;
    let err = pipeline::run(&config, 0).unwrap_err();
    assert!(has_snapshot_error(&err, |e| matches!(e, SnapshotError::MissingField(n) if n == "VX1")));
    assert!(pipeline::is_data_failure(&err));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = pipeline::run(&config_for(dir.path()), 42).unwrap_err();
    assert!(has_snapshot_error(&err, |e| matches!(e, SnapshotError::Open { .. })));
    assert!(format!("{:#}", err).contains("data.0042.vtk"));
    assert!(!pipeline::is_data_failure(&err));
}

#[test]
fn test_field_selection() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 1, &rotating_box(1.0));

    let mut config = config_for(dir.path());
    config.vorticity.enabled = true;
    config.output.fields = vec!["VX2".to_string(), "omega_z".to_string()];
    let figures = pipeline::run(&config, 1).unwrap();
    let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["VX2", "omega_z"]);

    config.output.fields = vec!["PRS".to_string()];
    let err = pipeline::run(&config, 1).unwrap_err();
    assert!(has_snapshot_error(&err, |e| matches!(e, SnapshotError::MissingField(n) if n == "PRS")));
}

#[test]
fn test_figures_written_as_png() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 5, &rotating_box(0.5));
    let config = config_for(dir.path());

    let figures = pipeline::run(&config, 5).unwrap();
    let out = dir.path().join("plots");
    let paths = output::save_figures(&figures, &out, "data.0005").unwrap();
    assert_eq!(paths.len(), 3);
    assert!(out.join("data.0005.VX1.png").is_file());

    let sheet = output::save_sheet(&figures, &out, "data.0005", 2, image::Rgb([255, 255, 255]))
        .unwrap()
        .unwrap();
    let sheet = image::open(sheet).unwrap().to_rgb8();
    assert_eq!(sheet.dimensions(), (640, 480));
}

#[test]
fn test_repeated_field_selection_renders_once() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(dir.path(), 2, &rotating_box(1.0));

    let mut config = config_for(dir.path());
    config.output.fields = vec!["RHO".to_string(), "VX1".to_string(), "RHO".to_string()];
    let figures = pipeline::run(&config, 2).unwrap();
    let names: Vec<&str> = figures.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["RHO", "VX1"]);
}

#[test]
fn test_one_dimensional_snapshot_renders() {
    let dir = tempfile::tempdir().unwrap();
    let mut snap = Snapshot::new(
        2.0,
        Geometry::Cartesian,
        [
            Axis::from_edges(edges(0.0, 0.5, 6)),
            Axis::from_edges(vec![0.0]),
            Axis::from_edges(vec![0.0]),
        ],
    );
    let rho = Array3::from_shape_fn((6, 1, 1), |(i, _, _)| i as f64);
    snap.insert_field(Field::new("RHO", rho)).unwrap();
    write_fixture(dir.path(), 8, &snap);

    let figures = pipeline::run(&config_for(dir.path()), 8).unwrap();
    assert_eq!(figures.len(), 1);
    assert_eq!(figures[0].range, (0.0, 5.0));
}
