use ndarray::Array2;
use tempfile::tempdir;
use thon_core::io::image_io::{load_image, load_spectrum, save_image};

#[test]
fn test_png_roundtrip_is_stretched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ramp.png");
    let data = Array2::from_shape_fn((8, 16), |(_, x)| 10.0 + 2.0 * x as f32);

    save_image(&data, &path).unwrap();
    let loaded = load_image(&path).unwrap();
    assert_eq!(loaded.dim(), (8, 16));
    for ((_, x), &v) in loaded.indexed_iter() {
        let expected = x as f32 / 15.0;
        assert!((v - expected).abs() < 1e-4, "pixel {x}: {v} vs {expected}");
    }
}

#[test]
fn test_load_spectrum_sets_origin() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("spectrum.png");
    let data = Array2::from_shape_fn((32, 32), |(y, x)| (x + y) as f32);
    save_image(&data, &path).unwrap();

    let spectrum = load_spectrum(&path, 1.2).unwrap();
    assert_eq!(spectrum.width(), 32);
    assert_eq!(spectrum.origin, [16.0, 16.0, 0.0]);
}

#[test]
fn test_empty_image_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.png");
    assert!(save_image(&Array2::zeros((0, 4)), &path).is_err());
}

#[test]
fn test_missing_file_is_error() {
    let dir = tempdir().unwrap();
    assert!(load_image(&dir.path().join("missing.png")).is_err());
}
