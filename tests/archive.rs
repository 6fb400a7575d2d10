use std::error::Error;

use zarrs_kerchunk::{
    archive::{
        archive, archive_with_options, normalise_archive_name, read_dataset, ArchiveError,
        ArchiveOptions, Cancellation, CompressorSpec, Dataset, FilesystemDestination, Variable,
    },
    array::{DataType, Element},
    storage::{store::ZipStore, ListableStorageTraits, StoreKey},
};

fn elements<T: Element>(shape: Vec<u64>, elements: &[T]) -> Variable {
    Variable::from_elements(shape, elements).unwrap()
}

fn raw(shape: Vec<u64>, data_type: &str) -> Variable {
    let data_type: DataType = data_type.parse().unwrap();
    let num_bytes = shape.iter().product::<u64>() as usize * data_type.size();
    let data = (0..num_bytes).map(|i| (i * 7 % 251) as u8).collect();
    Variable::new(shape, data_type, data).unwrap()
}

/// A dataset with a variable of every supported data type.
fn dataset_all_data_types() -> Dataset {
    let mut dataset = Dataset::new();
    let variables = [
        ("i1", elements(vec![7], &[-3i8, -2, -1, 0, 1, 2, 3])),
        ("i2", elements(vec![2, 3], &[i16::MIN, -1, 0, 1, 2, i16::MAX])),
        ("i4", elements(vec![3, 2], &[i32::MIN, -7, 0, 7, 9, i32::MAX])),
        ("i8", elements(vec![2], &[i64::MIN, i64::MAX])),
        ("u1", elements(vec![4], &[0u8, 1, 128, 255])),
        ("u2", elements(vec![2, 2], &[0u16, 1, 2, u16::MAX])),
        ("u4", elements(vec![3], &[0u32, 1, u32::MAX])),
        ("u8", elements(vec![1], &[u64::MAX])),
        ("f4", elements(vec![3], &[f32::MIN, 0.5, f32::NAN])),
        (
            "f8",
            elements(vec![2, 2, 2], &[0.0f64, -0.0, 1.5, f64::INFINITY, f64::NEG_INFINITY, 1e-300, 1e300, f64::NAN]),
        ),
        ("scalar", elements(vec![], &[42.0f64])),
        ("empty", elements(vec![0, 3], &[0i32; 0])),
        ("b1", raw(vec![5], "|b1")),
        ("f2", raw(vec![4], "<f2")),
        ("i4_big", raw(vec![3], ">i4")),
        ("c16", raw(vec![2], "<c16")),
        ("S4", raw(vec![3], "|S4")),
        ("U3", raw(vec![2], "<U3")),
        ("V3", raw(vec![2], "|V3")),
        ("M8", raw(vec![4], "<M8[ns]")),
        ("m8", raw(vec![4], "<m8[s]")),
    ];
    for (name, variable) in variables {
        dataset.add_variable(name, variable).unwrap();
    }
    dataset
}

fn assert_data_equal(a: &Dataset, b: &Dataset) {
    assert_eq!(a.variables().len(), b.variables().len());
    for (name, variable) in a.variables() {
        let other = b.variable(name).unwrap();
        assert_eq!(other.shape(), variable.shape(), "{name}");
        assert_eq!(other.data_type(), variable.data_type(), "{name}");
        assert_eq!(other.data(), variable.data(), "{name}");
    }
}

#[test]
fn archive_round_trip_all_data_types() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    let destination = FilesystemDestination::new(root.path());
    let dataset = dataset_all_data_types();

    for (name, compressor, zip_level) in [
        ("raw", "[]", 0),
        ("gzip", r#"{"id": "gzip", "level": 1}"#, 0),
        ("zlib", r#"[{"id": "zlib", "level": 9}, {"id": "crc32c"}]"#, 9),
        ("zstd", r#"{"id": "zstd", "level": 3, "checksum": true}"#, 1),
        ("shuffle", r#"[{"id": "zstd", "level": 0}, {"id": "shuffle", "elementsize": 2}]"#, 5),
    ] {
        let compressor: CompressorSpec = serde_json::from_str(compressor)?;
        let archive_name = archive(&dataset, &destination, name, &compressor, zip_level)?;
        assert_eq!(archive_name, format!("{name}.zarr.zip"));

        let store = ZipStore::open(destination.path(&archive_name)?)?;
        let read = read_dataset(&store)?;
        assert_data_equal(&dataset, &read);
    }
    Ok(())
}

#[test]
fn archive_chunked_round_trip() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    let destination = FilesystemDestination::new(root.path());

    let data: Vec<u16> = (0..7 * 5 * 3).collect();
    let mut dataset = Dataset::new();
    dataset.add_variable(
        "v",
        Variable::from_elements(vec![7, 5, 3], &data)?
            .with_chunk_shape(vec![3, 2, 2])
            .with_dimension_names(vec!["t".into(), "y".into(), "x".into()])
            .with_fill_value(serde_json::json!(0)),
    )?;
    let compressor: CompressorSpec =
        serde_json::from_str(r#"[{"id": "gzip", "level": 5}, {"id": "shuffle", "elementsize": 2}]"#)?;
    let name = archive(&dataset, &destination, "nested/v.zarr", &compressor, 3)?;
    assert_eq!(name, "nested/v.zarr.zip");

    let store = ZipStore::open(destination.path(&name)?)?;
    // 3 x 3 x 2 chunks, group metadata, array metadata, and consolidated metadata
    assert_eq!(store.list()?.len(), 18 + 5);
    assert!(store.list()?.contains(&StoreKey::new("v/2.2.1")?));

    let read = read_dataset(&store)?;
    let variable = read.variable("v").unwrap();
    assert_eq!(variable.to_elements::<u16>()?, data);
    assert_eq!(variable.chunk_shape(), Some(&[3, 2, 2][..]));
    assert_eq!(
        variable.dimension_names(),
        Some(&["t".to_string(), "y".to_string(), "x".to_string()][..])
    );
    assert_eq!(variable.fill_value(), &serde_json::json!(0));
    Ok(())
}

#[test]
fn archive_destination_exists_untouched() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    let destination = FilesystemDestination::new(root.path());
    let path = destination.path("existing.zarr.zip")?;
    std::fs::write(&path, b"not a zip")?;

    let result = archive(
        &dataset_all_data_types(),
        &destination,
        "existing.zip",
        &CompressorSpec::default(),
        0,
    );
    assert!(matches!(result, Err(ArchiveError::DestinationExists(_))));
    assert_eq!(std::fs::read(&path)?, b"not a zip");
    Ok(())
}

#[test]
fn archive_cancelled_then_retried() -> Result<(), Box<dyn Error>> {
    let root = tempfile::TempDir::new()?;
    let destination = FilesystemDestination::new(root.path());
    let dataset = dataset_all_data_types();

    let cancellation = Cancellation::new();
    let options = ArchiveOptions::builder()
        .cancellation(cancellation.clone())
        .discard_partial_archives(true)
        .build();
    cancellation.cancel();
    let result = archive_with_options(
        &dataset,
        &destination,
        "data",
        &CompressorSpec::default(),
        0,
        &options,
    );
    assert!(matches!(result, Err(ArchiveError::Cancelled)));
    assert!(!destination.path("data.zarr.zip")?.exists());

    let name = archive(&dataset, &destination, "data", &CompressorSpec::default(), 0)?;
    let read = read_dataset(&ZipStore::open(destination.path(&name)?)?)?;
    assert_data_equal(&dataset, &read);
    Ok(())
}

#[test]
fn archive_name_normalisation() {
    for (name, expected) in [
        ("x", "x.zarr.zip"),
        ("x.zarr", "x.zarr.zip"),
        ("x.zip", "x.zarr.zip"),
        ("x.zarr.zip", "x.zarr.zip"),
        ("dir/x.zip", "dir/x.zarr.zip"),
    ] {
        assert_eq!(normalise_archive_name(name).unwrap(), expected);
    }
    assert!(normalise_archive_name("").is_err());
    assert!(normalise_archive_name("dir/").is_err());
}
