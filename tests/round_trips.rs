use std::error::Error;

use ndarray::{ArrayD, IxDyn};
use serde_json::json;
use tempfile::TempDir;

use n5zarr::{
    array::{ArrayBuilder, CompressionOptions, DataType, Element},
    group::{File, FileMode},
    sel,
};

fn options(value: serde_json::Value) -> CompressionOptions {
    value.as_object().cloned().unwrap_or_default()
}

fn compressions() -> Vec<(&'static str, CompressionOptions)> {
    vec![
        ("raw", options(json!({}))),
        ("gzip", options(json!({"level": 1}))),
        ("gzip", options(json!({"level": 9, "useZlib": true}))),
        ("zlib", options(json!({"level": 5}))),
        ("bzip2", options(json!({"level": 9}))),
        ("xz", options(json!({"level": 6}))),
        ("zstd", options(json!({"level": -3}))),
        ("zstd", options(json!({"level": 19}))),
        ("blosc", options(json!({}))),
        ("blosc", options(json!({"codec": "zstd", "level": 3, "shuffle": 2}))),
        ("blosc", options(json!({"codec": "blosclz", "shuffle": 0, "blocksize": 256}))),
    ]
}

fn round_trip<T: Element>(file: &File, name: &str, builder: &ArrayBuilder) -> Result<(), Box<dyn Error>> {
    let mut builder = builder.clone();
    builder.data_type(T::DATA_TYPE);
    let array = file.create_dataset(name, &builder)?;
    let elements: Vec<T> = (0..315u64).filter_map(|i| T::cast_from((i * 31) % 127)).collect();
    let values = ArrayD::from_shape_vec(IxDyn(&[9, 7, 5]), elements)?;
    array.write(&[], &values.view())?;
    assert_eq!(array.read_array::<T>(&[])?, values);

    // reopened with the stored compression
    let reopened = file.open_array(name)?;
    assert_eq!(reopened.compression(), array.compression());
    assert_eq!(reopened.read_array::<T>(&sel![8, .., 4])?, values.slice(ndarray::s![8, .., 4]).to_owned().into_dyn());
    Ok(())
}

#[test]
fn round_trips() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    let files = [
        File::open(path.path().join("test.n5"), FileMode::Create, None)?,
        File::open(path.path().join("test.zarr"), FileMode::Create, None)?,
    ];
    for file in &files {
        for (index, (compression, options)) in compressions().iter().enumerate() {
            let mut builder = ArrayBuilder::new(vec![9, 7, 5], DataType::UInt8, vec![4, 3, 5]);
            builder.compression(compression, options);
            for data_type in DataType::ALL {
                let name = format!("{compression}{index}/{data_type}");
                match data_type {
                    DataType::Int8 => round_trip::<i8>(file, &name, &builder)?,
                    DataType::Int16 => round_trip::<i16>(file, &name, &builder)?,
                    DataType::Int32 => round_trip::<i32>(file, &name, &builder)?,
                    DataType::Int64 => round_trip::<i64>(file, &name, &builder)?,
                    DataType::UInt8 => round_trip::<u8>(file, &name, &builder)?,
                    DataType::UInt16 => round_trip::<u16>(file, &name, &builder)?,
                    DataType::UInt32 => round_trip::<u32>(file, &name, &builder)?,
                    DataType::UInt64 => round_trip::<u64>(file, &name, &builder)?,
                    DataType::Float32 => round_trip::<f32>(file, &name, &builder)?,
                    DataType::Float64 => round_trip::<f64>(file, &name, &builder)?,
                }
            }
        }
    }
    Ok(())
}

#[test]
fn round_trip_default_compression() -> Result<(), Box<dyn Error>> {
    let path = TempDir::new()?;
    for (name, compression) in [("test.n5", "gzip"), ("test.zarr", "blosc")] {
        let file = File::open(path.path().join(name), FileMode::Create, None)?;
        let builder = ArrayBuilder::new(vec![9, 7, 5], DataType::Float32, vec![4, 4, 4]);
        round_trip::<f32>(&file, "default", &builder)?;
        assert_eq!(file.open_array("default")?.compression().name(), compression);
    }
    Ok(())
}
