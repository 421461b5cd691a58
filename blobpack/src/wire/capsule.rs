//! The opaque fallback: `05pckl_` (stable protocol) and `05dill_`
//! (extended protocol) capsules.

use crate::error::{PackError, Result};
use crate::types::capsule::lookup;
use crate::types::{Frame, NdArray, Opaque, Series, Value};
use crate::wire::tag::{Tag, TAG_LEN};
use tracing::debug;

pub(crate) enum Protocol {
    Stable,
    Extended,
}

pub(crate) fn encode(value: &Value, ensure_determinism: bool) -> Result<Vec<u8>> {
    let opaque = match value {
        Value::Opaque(opaque) => opaque.clone(),
        Value::Series(series) => Opaque::new(series.clone()),
        Value::Frame(frame) => Opaque::new(frame.clone()),
        other => {
            return Err(PackError::Unsupported {
                kind: other.kind(),
                reason: String::from("the opaque codec only accepts capsule and tabular values"),
            })
        }
    };
    let codec = lookup(opaque.type_name()).ok_or_else(|| PackError::Unpicklable {
        type_name: opaque.type_name().to_string(),
    })?;

    match (codec.seal_stable)(opaque.any()) {
        Ok(dump) => Ok(frame_capsule(Tag::Pckl, opaque.type_name(), &dump)),
        Err(stable_err) => {
            if ensure_determinism {
                return Err(PackError::Nondeterminism(format!(
                    "the stable capsule protocol rejected {}: {stable_err}",
                    opaque.type_name()
                )));
            }
            debug!(
                type_name = opaque.type_name(),
                "stable capsule protocol declined, retrying with the extended protocol"
            );
            let dump = (codec.seal_extended)(opaque.any())?;
            Ok(frame_capsule(Tag::Dill, opaque.type_name(), &dump))
        }
    }
}

pub(crate) fn decode(payload: &[u8], protocol: Protocol) -> Result<Value> {
    if payload.len() < 4 {
        return Err(PackError::Malformed(String::from(
            "truncated capsule header",
        )));
    }
    let mut len_raw = [0u8; 4];
    len_raw.copy_from_slice(&payload[..4]);
    let name_len = u32::from_le_bytes(len_raw) as usize;
    let rest = &payload[4..];
    if rest.len() < name_len {
        return Err(PackError::Malformed(String::from(
            "truncated capsule type name",
        )));
    }
    let type_name = std::str::from_utf8(&rest[..name_len])
        .map_err(|_| PackError::Malformed(String::from("capsule type name is not UTF-8")))?;
    let codec = lookup(type_name).ok_or_else(|| {
        PackError::Malformed(format!("capsule names the unregistered type {type_name}"))
    })?;

    let open = match protocol {
        Protocol::Stable => codec.open_stable,
        Protocol::Extended => codec.open_extended,
    };
    Ok(reconstitute(open(&rest[name_len..])?))
}

fn frame_capsule(tag: Tag, type_name: &str, dump: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(TAG_LEN + 4 + type_name.len() + dump.len());
    out.extend_from_slice(tag.prefix());
    out.extend_from_slice(&(type_name.len() as u32).to_le_bytes());
    out.extend_from_slice(type_name.as_bytes());
    out.extend_from_slice(dump);
    out
}

/// The engine's own tabular types come back as first-class values, the
/// way they went in; everything else stays a capsule for the caller to
/// downcast.
fn reconstitute(opaque: Opaque) -> Value {
    if let Some(series) = opaque.downcast_ref::<Series>() {
        return Value::Series(series.clone());
    }
    if let Some(frame) = opaque.downcast_ref::<Frame>() {
        return Value::Frame(frame.clone());
    }
    if let Some(arr) = opaque.downcast_ref::<NdArray>() {
        return Value::Array(arr.clone());
    }
    Value::Opaque(opaque)
}

#[cfg(test)]
mod test {
    use crate::error::PackError;
    use crate::options::PackOptions;
    use crate::types::{capsule, Opaque, Value};
    use crate::wire::{pack, unpack};
    use anyhow::Result;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
    struct SensorHandle {
        id: u32,
        label: String,
    }

    /// `flatten` forces map-style serialization with no up-front length,
    /// which the stable protocol refuses; only the extended protocol can
    /// carry this one.
    #[derive(Serialize, Deserialize, PartialEq, Clone, Debug)]
    struct Telemetry {
        source: String,
        #[serde(flatten)]
        extra: HashMap<String, f64>,
    }

    struct NoHooks;

    fn uncompressed(unsafe_fallback: bool, ensure_determinism: bool) -> PackOptions {
        PackOptions {
            ensure_determinism,
            unsafe_fallback,
            compressed: false,
            ..PackOptions::default()
        }
    }

    #[test]
    fn safety_gate_blocks_and_admits_capsules() -> Result<()> {
        capsule::register::<SensorHandle>();
        let handle = SensorHandle {
            id: 7,
            label: String::from("boiler"),
        };
        let value = Value::Opaque(Opaque::new(handle.clone()));

        assert!(matches!(
            pack(&value, &uncompressed(false, false)),
            Err(PackError::Unsupported { .. })
        ));

        let blob = pack(&value, &uncompressed(true, true))?;
        assert_eq!(&blob[..7], b"05pckl_");
        match unpack(&blob)? {
            Value::Opaque(decoded) => {
                assert_eq!(decoded.downcast_ref::<SensorHandle>(), Some(&handle));
            }
            other => panic!("expected a capsule, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unregistered_types_are_unpicklable() {
        let value = Value::Opaque(Opaque::new(NoHooks));
        let err = pack(&value, &uncompressed(true, false));
        assert!(matches!(err, Err(PackError::Unpicklable { .. })));
    }

    #[test]
    fn determinism_gate_blocks_the_extended_protocol() -> Result<()> {
        capsule::register::<Telemetry>();
        let telemetry = Telemetry {
            source: String::from("probe-3"),
            extra: HashMap::from([(String::from("ratio"), 0.25)]),
        };
        let value = Value::Opaque(Opaque::new(telemetry.clone()));

        assert!(matches!(
            pack(&value, &uncompressed(true, true)),
            Err(PackError::Nondeterminism(_))
        ));

        let blob = pack(&value, &uncompressed(true, false))?;
        assert_eq!(&blob[..7], b"05dill_");
        match unpack(&blob)? {
            Value::Opaque(decoded) => {
                assert_eq!(decoded.downcast_ref::<Telemetry>(), Some(&telemetry));
            }
            other => panic!("expected a capsule, got {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn capsules_naming_unknown_types_are_malformed() {
        let mut blob = b"05pckl_".to_vec();
        blob.extend_from_slice(&7u32.to_le_bytes());
        blob.extend_from_slice(b"no_such");
        blob.extend_from_slice(&[0, 0, 0]);
        assert!(matches!(
            unpack(&blob),
            Err(PackError::Malformed(_))
        ));
    }
}
