use std::error::Error;

use ndarray::array;
use serde_json::json;
use tempfile::TempDir;

use n5zarr::{
    array::{ArrayBuilder, ArrayCreateError, DataType, ErrorClass},
    group::{File, FileMode, GroupChild},
    metadata::StorageFormat,
    sel,
};

fn read_json(path: std::path::PathBuf) -> Result<serde_json::Value, Box<dyn Error>> {
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

#[test]
fn hierarchy_require_dataset() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    for name in ["test.n5", "test.zarr"] {
        let file = File::open(path.path().join(name), FileMode::Create, None)?;
        let builder = ArrayBuilder::new(vec![10, 10], DataType::Float64, vec![5, 5]);
        let first = file.require_dataset("a/b/data", &builder)?;
        first.write_scalar(&sel![0..5], 1.5f64)?;
        let second = file.require_dataset("a/b/data", &builder)?;
        assert_eq!(second.read_array::<f64>(&sel![4, 0..2])?, array![1.5, 1.5].into_dyn());
        assert_eq!(second.name(), first.name());

        let mut other = builder.clone();
        other.shape(vec![10, 11]);
        let result = file.require_dataset("a/b/data", &other);
        assert!(matches!(result, Err(ArrayCreateError::RequireMismatch { .. })));
        assert_eq!(result.map_err(|err| err.class()).err(), Some(ErrorClass::Configuration));
        other.shape(vec![10, 10]).data_type(DataType::Float32);
        assert!(matches!(
            file.require_dataset("a/b/data", &other),
            Err(ArrayCreateError::RequireMismatch { .. })
        ));
        assert!(matches!(
            file.require_dataset("a/b", &builder),
            Err(ArrayCreateError::AlreadyExists(_))
        ));
        assert!(matches!(
            file.create_dataset("a/b/data", &builder),
            Err(ArrayCreateError::AlreadyExists(_))
        ));
        assert!(matches!(
            file.create_dataset("a/b/data/nested", &builder),
            Err(ArrayCreateError::GroupCreateError(_))
        ));
    }
    Ok(())
}

#[test]
fn hierarchy_navigation() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    for name in ["test.n5", "test.zarr"] {
        let file = File::open(path.path().join(name), FileMode::Create, None)?;
        let group = file.create_group("a")?;
        let builder = ArrayBuilder::new(vec![10000, 1000], DataType::Float64, vec![1000, 100]);
        let foo = group.create_dataset("foo", &builder)?;
        group.create_dataset("baz", &builder)?;
        group.create_dataset("/b/qux", &ArrayBuilder::new(vec![3], DataType::Int8, vec![3]))?;

        assert_eq!(foo.name(), "/a/foo");
        assert_eq!(foo.basename(), "foo");
        assert_eq!(foo.parent(), group);
        assert_eq!(foo.parent().parent(), *file.root());
        assert!(foo.file().is_root());
        assert_eq!(file.root().name(), "/");
        assert_eq!(file.root().basename(), "");
        assert_eq!(file.format(), foo.format());

        assert_eq!(file.keys()?, vec!["a", "b"]);
        assert_eq!(group.keys()?, vec!["baz", "foo"]);
        assert!(group.contains("/b/qux"));
        assert!(!group.contains("qux"));
        assert!(group.get("../b").is_err());
        match file.get("a/foo")? {
            GroupChild::Array(array) => assert_eq!(array.shape(), &[10000, 1000]),
            GroupChild::Group(_) => panic!("expected an array"),
        }
        assert!(matches!(file.get("b")?, GroupChild::Group(_)));
        assert_eq!(file.children()?.len(), 2);

        assert_eq!(
            file.hierarchy_tree()?,
            "/\n  a\n    baz [10000, 1000] float64\n    foo [10000, 1000] float64\n  b\n    qux [3] int8\n"
        );
        assert_eq!(
            group.hierarchy_tree()?,
            "a\n  baz [10000, 1000] float64\n  foo [10000, 1000] float64\n"
        );
    }
    Ok(())
}

#[test]
fn hierarchy_group_attributes() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    let n5 = File::open(path.path().join("test.n5"), FileMode::Create, None)?;
    n5.create_group("g")?.set_attribute("spam", json!("ham"))?;
    n5.set_attribute("eggs", json!(42))?;
    let root = read_json(path.path().join("test.n5/attributes.json"))?;
    assert_eq!(root, json!({"n5": "2.4.0", "eggs": 42}));
    assert_eq!(read_json(path.path().join("test.n5/g/attributes.json"))?, json!({"spam": "ham"}));

    let zarr = File::open(path.path().join("test.zarr"), FileMode::Create, None)?;
    zarr.create_group("g")?.set_attribute("spam", json!("ham"))?;
    assert_eq!(read_json(path.path().join("test.zarr/.zgroup"))?, json!({"zarr_format": 2}));
    assert_eq!(read_json(path.path().join("test.zarr/g/.zgroup"))?, json!({"zarr_format": 2}));
    assert_eq!(read_json(path.path().join("test.zarr/g/.zattrs"))?, json!({"spam": "ham"}));
    assert!(!path.path().join("test.zarr/.zattrs").exists());
    Ok(())
}

#[test]
fn hierarchy_n5_layout() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    let file = File::open(path.path().join("test.n5"), FileMode::Create, None)?;
    let mut builder = ArrayBuilder::new(vec![5, 3], DataType::UInt16, vec![2, 2]);
    builder.compression("raw", &serde_json::Map::new());
    let array = file.create_dataset("arr", &builder)?;
    array.write_scalar(&sel![0, 2], 258u16)?;

    let attributes = read_json(path.path().join("test.n5/arr/attributes.json"))?;
    assert_eq!(attributes["dimensions"], json!([3, 5]));
    assert_eq!(attributes["blockSize"], json!([2, 2]));
    assert_eq!(attributes["dataType"], "uint16");
    assert_eq!(attributes["compression"]["type"], "raw");

    // chunk (0, 1) is bounded to shape (2, 1) and stored at 1/0
    let chunk = std::fs::read(path.path().join("test.n5/arr/1/0"))?;
    assert_eq!(chunk, [0, 0, 0, 2, 0, 0, 0, 1, 0, 0, 0, 2, 1, 2, 0, 0]);
    Ok(())
}

#[test]
fn hierarchy_zarr_layout() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    let file = File::open(path.path().join("test.zarr"), FileMode::Create, None)?;
    let mut builder = ArrayBuilder::new(vec![5, 3], DataType::UInt16, vec![2, 2]);
    builder.compression("raw", &serde_json::Map::new());
    let array = file.create_dataset("arr", &builder)?;
    array.write_scalar(&sel![0, 2], 258u16)?;

    let zarray = read_json(path.path().join("test.zarr/arr/.zarray"))?;
    assert_eq!(zarray["zarr_format"], 2);
    assert_eq!(zarray["shape"], json!([5, 3]));
    assert_eq!(zarray["chunks"], json!([2, 2]));
    assert_eq!(zarray["dtype"], "<u2");
    assert_eq!(zarray["compressor"], serde_json::Value::Null);
    assert_eq!(zarray["fill_value"], 0);
    assert_eq!(zarray["order"], "C");

    // chunk (0, 1) is padded to the full chunk shape
    let chunk = std::fs::read(path.path().join("test.zarr/arr/0.1"))?;
    assert_eq!(chunk, [2, 1, 0, 0, 0, 0, 0, 0]);
    Ok(())
}

#[test]
fn hierarchy_open_existing() -> Result<(), Box<dyn Error>> {
    env_logger::try_init().ok();
    let path = TempDir::new()?;

    // an N5 container written elsewhere
    let n5 = path.path().join("external");
    std::fs::create_dir_all(n5.join("data/0"))?;
    std::fs::write(n5.join("attributes.json"), r#"{"n5": "2.0.0"}"#)?;
    std::fs::write(
        n5.join("data/attributes.json"),
        r#"{"dimensions": [3, 2], "blockSize": [3, 2], "dataType": "uint8", "compression": {"type": "raw"}, "units": "nm"}"#,
    )?;
    std::fs::write(
        n5.join("data/0/0"),
        [0u8, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0, 2, 1, 2, 3, 4, 5, 6],
    )?;
    let file = File::open(&n5, FileMode::Read, None)?;
    assert_eq!(file.format(), StorageFormat::N5);
    let array = file.open_array("data")?;
    assert_eq!(array.shape(), &[2, 3]);
    assert_eq!(array.attributes()["units"], "nm");
    assert_eq!(array.read_array::<u8>(&[])?, array![[1u8, 2, 3], [4, 5, 6]].into_dyn());
    assert_eq!(file.keys()?, vec!["data"]);

    // the N5 version is preserved when root attributes change
    let file = File::open(&n5, FileMode::ReadWrite, None)?;
    file.set_attribute("owner", json!("me"))?;
    assert_eq!(read_json(n5.join("attributes.json"))?, json!({"n5": "2.0.0", "owner": "me"}));

    // a Zarr container written elsewhere
    let zarr = path.path().join("external_zarr");
    std::fs::create_dir_all(zarr.join("data"))?;
    std::fs::write(zarr.join(".zgroup"), r#"{"zarr_format": 2}"#)?;
    std::fs::write(
        zarr.join("data/.zarray"),
        r#"{"zarr_format": 2, "shape": [2, 3], "chunks": [2, 3], "dtype": "<u2", "compressor": null, "fill_value": 0, "order": "C", "filters": null}"#,
    )?;
    std::fs::write(zarr.join("data/0.0"), [1u8, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0])?;
    let file = File::open(&zarr, FileMode::Append, None)?;
    assert!(file.format().is_zarr());
    let array = file.open_array("data")?;
    assert_eq!(array.read_array::<u16>(&[])?, array![[1u16, 2, 3], [4, 5, 6]].into_dyn());
    Ok(())
}
