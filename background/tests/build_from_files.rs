//! End-to-end map construction from model files on disk
//!
//! Writes synthetic diffuse, isotropic and exposure products into a
//! temporary Fermi-style installation, builds through the configuration
//! layer and checks the result against the in-memory build.

use approx::assert_relative_eq;
use background::config::{
    DEFAULT_DIFFUSE_MODEL, DEFAULT_EXPOSURE_CUBE, DEFAULT_ISOTROPIC_MODEL, GALDIFFUSE_SUBDIR,
};
use background::io::{parse_isotropic_table, read_cube, write_cube};
use background::{
    write_sky_map, BackgroundConfig, BackgroundError, BackgroundMapBuilder, BackgroundRequest,
    BackgroundTools, ConfigurationError, ConversionType, DataFormatError, ModelKind,
    ModelProducts, Region,
};
use ndarray::Array2;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use test_helpers::{exposure_cube, galactic_plane_cube, isotropic_table, output_path};

const ROWS: usize = 37;
const COLS: usize = 72;

fn isotropic_text() -> String {
    isotropic_table(&[
        (50.0, 4.0e-6),
        (500.0, 1.5e-8),
        (5000.0, 6.0e-11),
        (6.0e5, 2.0e-16),
    ])
}

/// Lay out a fake installation with all three default products
fn fake_install() -> TempDir {
    let dir = TempDir::new().unwrap();
    let galdiffuse = dir.path().join(GALDIFFUSE_SUBDIR);
    fs::create_dir_all(&galdiffuse).unwrap();

    write_cube(
        &galactic_plane_cube(ROWS, COLS),
        galdiffuse.join(DEFAULT_DIFFUSE_MODEL),
    )
    .unwrap();
    fs::write(galdiffuse.join(DEFAULT_ISOTROPIC_MODEL), isotropic_text()).unwrap();
    write_cube(
        &exposure_cube(ROWS / 2, COLS / 2),
        galdiffuse.join(DEFAULT_EXPOSURE_CUBE),
    )
    .unwrap();

    dir
}

fn in_memory_products() -> ModelProducts {
    ModelProducts {
        diffuse: galactic_plane_cube(ROWS, COLS),
        isotropic: parse_isotropic_table(&isotropic_text()).unwrap(),
        exposure: exposure_cube(ROWS / 2, COLS / 2),
    }
}

#[test]
fn test_build_from_default_install_matches_in_memory() {
    let _ = env_logger::builder().is_test(true).try_init();

    let install = fake_install();
    let request = BackgroundRequest::new(300.0, 1.0e5, 3.0e7);
    let config = BackgroundConfig::default()
        .with_fermi_dir(install.path())
        .with_conversion(ConversionType::Back);

    let tools = BackgroundTools::new(request, &config).unwrap();
    let expected = BackgroundMapBuilder::new(ConversionType::Back)
        .build_from_products(&request, &in_memory_products())
        .unwrap();

    assert_eq!(tools.sky_map().dims(), (ROWS, COLS));
    for (read, built) in tools.sky_map().data().iter().zip(expected.data()) {
        assert_relative_eq!(*read, *built, max_relative = 1e-12);
    }

    // Galactic plane outshines the poles
    assert!(tools.point_rate(0.0, 0.0) > tools.point_rate(0.0, 80.0));
}

#[test]
fn test_explicit_paths_without_install_dir() {
    let install = fake_install();
    let galdiffuse = install.path().join(GALDIFFUSE_SUBDIR);

    let other = TempDir::new().unwrap();
    let iso_path = other.path().join("my_iso.txt");
    fs::write(&iso_path, isotropic_text().replace(' ', ", ")).unwrap();

    let config = BackgroundConfig::default()
        .with_diffuse_model(galdiffuse.join(DEFAULT_DIFFUSE_MODEL))
        .with_isotropic_model(&iso_path)
        .with_exposure_cube(galdiffuse.join(DEFAULT_EXPOSURE_CUBE));

    let request = BackgroundRequest::new(1000.0, 2.0e4, 1.0e6);
    let tools = BackgroundTools::new(request, &config).unwrap();

    let regions = [
        Region {
            centroid_lon: 0.0,
            centroid_lat: 0.0,
            size95_x: 2.0,
            size95_y: 1.0,
            size95_t: 5.0e4,
            members: 30,
        },
        Region {
            centroid_lon: 180.0,
            centroid_lat: 89.0,
            size95_x: 4.0,
            size95_y: 4.0,
            size95_t: 1.0e5,
            members: 0,
        },
    ];
    let sigs = tools.significances(&regions);
    assert_eq!(sigs.len(), 2);
    assert!(sigs[0] > 0.0 && sigs[0].is_finite());
    assert_eq!(sigs[1], 0.0);
}

#[test]
fn test_missing_products_are_configuration_errors() {
    let request = BackgroundRequest::new(100.0, 1000.0, 1.0);

    let err = BackgroundTools::new(request, &BackgroundConfig::default()).unwrap_err();
    assert!(matches!(
        err,
        BackgroundError::Configuration(ConfigurationError::MissingInstallDir { .. })
    ));

    let empty_install = TempDir::new().unwrap();
    let config = BackgroundConfig::default().with_fermi_dir(empty_install.path());
    let err = BackgroundTools::new(request, &config).unwrap_err();
    assert!(matches!(
        err,
        BackgroundError::Configuration(ConfigurationError::DefaultNotFound { .. })
    ));
}

#[test]
fn test_malformed_products_are_data_format_errors() {
    let install = fake_install();
    let galdiffuse = install.path().join(GALDIFFUSE_SUBDIR);
    let request = BackgroundRequest::new(100.0, 1000.0, 1.0);

    // Isotropic table with only two columns
    let bad_iso = install.path().join("two_columns.txt");
    fs::write(&bad_iso, "100 1e-7\n1000 1e-9\n").unwrap();
    let config = BackgroundConfig::default()
        .with_fermi_dir(install.path())
        .with_isotropic_model(&bad_iso);
    let err = BackgroundTools::new(request, &config).unwrap_err();
    assert!(matches!(
        err,
        BackgroundError::DataFormat(DataFormatError::Isotropic(_))
    ));

    // Isotropic table with a NaN energy node
    let nan_iso = install.path().join("nan_energy.txt");
    fs::write(&nan_iso, "nan 1e-7 0\n100 1e-8 0\n1000 1e-9 0\n").unwrap();
    let config = BackgroundConfig::default()
        .with_fermi_dir(install.path())
        .with_isotropic_model(&nan_iso);
    let err = BackgroundTools::new(request, &config).unwrap_err();
    assert!(matches!(
        err,
        BackgroundError::DataFormat(DataFormatError::Isotropic(_))
    ));

    // Diffuse model that is a 2-D image
    let flat = install.path().join("flat.fits");
    write_sky_map(&Array2::from_elem((4, 8), 1.0), &flat).unwrap();
    let config = BackgroundConfig::default()
        .with_fermi_dir(install.path())
        .with_diffuse_model(&flat);
    let err = BackgroundTools::new(request, &config).unwrap_err();
    assert!(matches!(
        err,
        BackgroundError::DataFormat(DataFormatError::Fits {
            model: ModelKind::Diffuse,
            ..
        })
    ));

    // Diffuse model path that does not exist
    let config = BackgroundConfig::default()
        .with_fermi_dir(install.path())
        .with_diffuse_model(galdiffuse.join("missing.fits"));
    let err = BackgroundTools::new(request, &config).unwrap_err();
    assert!(matches!(err, BackgroundError::DataFormat(_)));
}

#[test]
fn test_write_built_map() {
    let install = fake_install();
    let config = BackgroundConfig::default().with_fermi_dir(install.path());
    let tools = BackgroundTools::new(BackgroundRequest::new(50.0, 6.0e5, 1.0e7), &config).unwrap();

    let path = output_path("background_map_test.fits");
    write_sky_map(tools.sky_map().data(), &path).unwrap();
    assert!(Path::new(&path).exists());

    // A 2-D map is not a model cube
    assert!(read_cube(&path).is_err());
}
