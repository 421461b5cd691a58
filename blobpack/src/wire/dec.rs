//! The decode side: a single dispatch on the 7-byte tag, with recursion
//! mirroring the encoder. Unknown tags come back verbatim as `Bytes`.

use crate::error::{PackError, Result};
use crate::options::DEFAULT_MAX_DEPTH;
use crate::types::{BigInt, Value};
use crate::wire::capsule::{self, Protocol};
use crate::wire::tag::{Tag, TAG_LEN};
use crate::wire::{doc_from_bytes, numeric, tabular};
use bson::Bson;

pub(crate) fn decode(blob: &[u8], depth: usize) -> Result<Value> {
    if depth > DEFAULT_MAX_DEPTH {
        return Err(PackError::DepthLimit {
            max: DEFAULT_MAX_DEPTH,
        });
    }

    let tag = match Tag::parse(blob) {
        Some(tag) => tag,
        /* unclassified blob: the forward-compatibility escape hatch */
        None => return Ok(Value::Bytes(blob.to_vec())),
    };
    let payload = &blob[TAG_LEN..];

    let value = match tag {
        Tag::Json => {
            let json = serde_json::from_slice(payload).map_err(|e| {
                PackError::Malformed(format!("compact payload is not valid JSON: {e}"))
            })?;
            from_json(json)?
        }
        Tag::Bson => {
            let doc = doc_from_bytes(payload)?;
            let body = doc.get("_").ok_or_else(|| {
                PackError::Malformed(String::from("document payload is missing the '_' slot"))
            })?;
            from_bson(body)?
        }
        Tag::Bint => {
            let text = std::str::from_utf8(payload).map_err(|_| {
                PackError::Malformed(String::from("big-integer payload is not ASCII"))
            })?;
            let int: BigInt = text.parse().map_err(|_| {
                PackError::Malformed(format!("big-integer payload {text:?} is not decimal"))
            })?;
            Value::BigInt(int)
        }
        Tag::Nmpy => Value::Array(numeric::decode(payload)?),
        Tag::Npdf => Value::Frame(tabular::frame_from_numeric(numeric::decode(payload)?)?),
        Tag::Bsos => Value::Series(tabular::decode_series_doc(payload)?),
        Tag::Prqs => Value::Series(tabular::decode_parquet_series(payload)?),
        Tag::Prqd => Value::Frame(tabular::decode_parquet_frame(payload)?),
        Tag::List => Value::List(decode_seq(payload, depth)?),
        Tag::Tupl => Value::Tuple(decode_seq(payload, depth)?),
        Tag::Dict => decode_map(payload, false, depth)?,
        Tag::DicB => decode_map(payload, true, depth)?,
        Tag::Pckl => capsule::decode(payload, Protocol::Stable)?,
        Tag::Dill => capsule::decode(payload, Protocol::Extended)?,
        /* the envelope is handled before decoding starts; one nested
        deeper is not ours to interpret */
        Tag::Lz4 => Value::Bytes(blob.to_vec()),
    };
    Ok(value)
}

fn decode_seq(payload: &[u8], depth: usize) -> Result<Vec<Value>> {
    let doc = doc_from_bytes(payload)?;
    let members = match doc.get("_") {
        Some(Bson::Array(members)) => members,
        _ => {
            return Err(PackError::Malformed(String::from(
                "container payload is missing the '_' slot",
            )))
        }
    };
    members
        .iter()
        .map(|member| decode(member_bytes(member)?, depth + 1))
        .collect()
}

fn decode_map(payload: &[u8], hexed: bool, depth: usize) -> Result<Value> {
    let doc = doc_from_bytes(payload)?;
    let mut pairs = Vec::with_capacity(doc.len());
    for (slot, member) in doc.iter() {
        let key = if hexed {
            let raw = hex::decode(slot).map_err(|e| {
                PackError::Malformed(format!("map key slot is not hex: {e}"))
            })?;
            decode(&raw, depth + 1)?
        } else {
            Value::Str(slot.clone())
        };
        pairs.push((key, decode(member_bytes(member)?, depth + 1)?));
    }
    Ok(Value::Map(pairs))
}

fn member_bytes(member: &Bson) -> Result<&[u8]> {
    match member {
        Bson::Binary(binary) => Ok(&binary.bytes),
        _ => Err(PackError::Malformed(String::from(
            "container member is not a binary slot",
        ))),
    }
}

fn from_json(json: serde_json::Value) -> Result<Value> {
    let value = match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(u) = n.as_u64() {
                Value::BigInt(BigInt::from(u))
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                return Err(PackError::Malformed(String::from(
                    "compact payload holds an unrepresentable number",
                )));
            }
        }
        serde_json::Value::String(s) => Value::Str(s),
        serde_json::Value::Array(members) => {
            let members = members
                .into_iter()
                .map(from_json)
                .collect::<Result<Vec<_>>>()?;
            Value::List(members)
        }
        serde_json::Value::Object(entries) => {
            let mut pairs = Vec::with_capacity(entries.len());
            for (key, member) in entries {
                pairs.push((Value::Str(key), from_json(member)?));
            }
            Value::Map(pairs)
        }
    };
    Ok(value)
}

fn from_bson(body: &Bson) -> Result<Value> {
    let value = match body {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(*b),
        Bson::Int32(i) => Value::Int(*i as i64),
        Bson::Int64(i) => Value::Int(*i),
        Bson::Double(f) => Value::Float(*f),
        Bson::String(s) => Value::Str(s.clone()),
        Bson::Binary(binary) => Value::Bytes(binary.bytes.clone()),
        Bson::Array(members) => {
            let members = members
                .iter()
                .map(from_bson)
                .collect::<Result<Vec<_>>>()?;
            Value::List(members)
        }
        Bson::Document(doc) => {
            let mut pairs = Vec::with_capacity(doc.len());
            for (key, member) in doc.iter() {
                pairs.push((Value::Str(key.clone()), from_bson(member)?));
            }
            Value::Map(pairs)
        }
        other => {
            return Err(PackError::Malformed(format!(
                "document payload holds a {:?} element the engine never writes",
                other.element_type()
            )))
        }
    };
    Ok(value)
}
