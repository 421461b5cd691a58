//! End-to-end checks through the public API only.

use anyhow::Result;
use blobpack::{
    capsule, pack, unpack, Cell, Column, NdArray, Opaque, PackError, PackOptions, Series, Value,
};
use serde::{Deserialize, Serialize};

fn uncompressed() -> PackOptions {
    PackOptions {
        compressed: false,
        ..PackOptions::default()
    }
}

#[test]
fn booleans_encode_to_literal_json_bytes() -> Result<()> {
    let blob = pack(&Value::Bool(true), &uncompressed())?;
    assert_eq!(blob, b"00json_true");
    assert_eq!(unpack(&blob)?, Value::Bool(true));
    Ok(())
}

#[test]
fn nested_lists_reproduce_exactly() -> Result<()> {
    let value = Value::List(vec![
        Value::from("a"),
        Value::List(vec![Value::from("3"), Value::Int(4)]),
        Value::from("b"),
        Value::Int(4),
    ]);
    assert_eq!(unpack(&pack(&value, &uncompressed())?)?, value);
    assert_eq!(unpack(&pack(&value, &PackOptions::default())?)?, value);
    Ok(())
}

#[test]
fn small_float_arrays_round_trip_bit_exactly() -> Result<()> {
    let arr = NdArray::from_shape_vec(vec![2, 2], vec![1.0f64, 2.0 / 3.0, 4.0, 5.0])?;
    let value = Value::Array(arr.clone());
    match unpack(&pack(&value, &PackOptions::default())?)? {
        Value::Array(decoded) => {
            assert_eq!(decoded, arr);
            assert_eq!(decoded.shape(), arr.shape());
            assert_eq!(decoded.dtype(), arr.dtype());
            assert_eq!(decoded.to_vec::<f64>(), arr.to_vec::<f64>());
        }
        other => panic!("expected an array, got {other:?}"),
    }
    Ok(())
}

#[test]
fn integer_keys_stay_integers() -> Result<()> {
    let map = Value::Map(vec![
        (Value::Int(1), Value::from("one")),
        (Value::from("k"), Value::Int(2)),
    ]);
    match unpack(&pack(&map, &uncompressed())?)? {
        Value::Map(pairs) => {
            assert_eq!(pairs[0].0, Value::Int(1));
            assert_eq!(pairs[1].0, Value::from("k"));
        }
        other => panic!("expected a map, got {other:?}"),
    }
    Ok(())
}

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
struct LiveResource {
    descriptor: u64,
}

#[test]
fn opaque_values_are_gated_by_the_unsafe_flag() -> Result<()> {
    capsule::register::<LiveResource>();
    let resource = LiveResource { descriptor: 42 };
    let value = Value::List(vec![
        Value::Map(vec![
            (Value::from("a"), Value::Bytes(b"some bytes".to_vec())),
            (Value::from("b"), Value::Opaque(Opaque::new(resource.clone()))),
        ]),
    ]);

    assert!(matches!(
        pack(&value, &uncompressed()),
        Err(PackError::Unsupported { .. })
    ));

    let opts = PackOptions {
        unsafe_fallback: true,
        ..PackOptions::default()
    };
    match unpack(&pack(&value, &opts)?)? {
        Value::List(members) => match &members[0] {
            Value::Map(pairs) => {
                assert_eq!(pairs[0].1, Value::Bytes(b"some bytes".to_vec()));
                match &pairs[1].1 {
                    Value::Opaque(decoded) => {
                        assert_eq!(decoded.downcast_ref::<LiveResource>(), Some(&resource));
                    }
                    other => panic!("expected a capsule, got {other:?}"),
                }
            }
            other => panic!("expected a map, got {other:?}"),
        },
        other => panic!("expected a list, got {other:?}"),
    }
    Ok(())
}

#[test]
fn integers_beyond_eight_bytes_take_the_big_integer_path() -> Result<()> {
    let value = Value::from(99999999999999999999999999999999999999i128);
    let blob = pack(&value, &uncompressed())?;
    assert_eq!(&blob[..7], b"00bint_");
    assert_eq!(&blob[7..], b"99999999999999999999999999999999999999");
    assert_eq!(unpack(&blob)?, value);
    Ok(())
}

#[test]
fn compression_is_transparent() -> Result<()> {
    let value = Value::List(vec![
        Value::from("a"),
        Value::Series(Series {
            name: Some(String::from("column")),
            index: vec![Cell::from("a"), Cell::from("b")],
            values: Column::Numeric(NdArray::from_vec(vec![5i64, 6])),
        }),
        Value::Bytes(vec![0u8; 512]),
    ]);
    let plain = pack(&value, &uncompressed())?;
    let wrapped = pack(&value, &PackOptions::default())?;
    assert_eq!(&wrapped[..7], b"00lz4__");
    assert_eq!(unpack(&plain)?, unpack(&wrapped)?);
    Ok(())
}
