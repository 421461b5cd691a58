//! Walks the safe path, the safety gate, and the determinism gate.

use anyhow::Result;
use blobpack::{capsule, pack, unpack, NdArray, Opaque, PackOptions, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
struct Callback {
    target: String,
    #[serde(flatten)]
    extra: HashMap<String, f64>,
}

fn main() -> Result<()> {
    // Plain data needs no flags beyond the defaults.
    let value = Value::List(vec![
        Value::from("a"),
        Value::Array(NdArray::from_shape_vec(
            vec![2, 2],
            vec![1.0f64, 2.0 / 3.0, 4.0, 5.0],
        )?),
        Value::Map(vec![(Value::from("x"), Value::Bytes(b"dsa".to_vec()))]),
    ]);
    let blob = pack(&value, &PackOptions::safe())?;
    println!("safe pack: {} bytes, round-trips: {}", blob.len(), unpack(&blob)? == value);

    // A capsule-only value is refused until the unsafe fallback is enabled.
    capsule::register::<Callback>();
    let callback = Value::Opaque(Opaque::new(Callback {
        target: String::from("print"),
        extra: HashMap::new(),
    }));
    println!("safe pack of a capsule: {:?}", pack(&callback, &PackOptions::safe()).err());

    // The permissive profile admits it, but cannot promise determinism:
    // this type needs the extended protocol, so requiring byte-stable
    // output refuses it.
    let strict = PackOptions {
        ensure_determinism: true,
        unsafe_fallback: true,
        ..PackOptions::default()
    };
    println!("strict pack of a capsule: {:?}", pack(&callback, &strict).err());

    let blob = pack(&callback, &PackOptions::permissive())?;
    let decoded = unpack(&blob)?;
    if let Value::Opaque(opaque) = &decoded {
        println!("permissive pack decoded back a {}", opaque.type_name());
    }
    Ok(())
}
