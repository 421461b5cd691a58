//! The encode dispatch chain: a fixed priority-ordered list of candidate
//! encoders, each of which either produces a tagged blob or declines.
//! Declining is a designed branch (`Option`), never exception flow; real
//! delegate failures propagate immediately.

use crate::error::{PackError, Result};
use crate::options::PackOptions;
use crate::types::Value;
use crate::wire::tag::Tag;
use crate::wire::{capsule, doc_to_bytes, numeric, tabular};
use bson::spec::BinarySubtype;
use bson::{Binary, Bson, Document};
use tracing::debug;

pub(crate) fn encode(value: &Value, options: &PackOptions, depth: usize) -> Result<Vec<u8>> {
    if depth > options.max_depth {
        return Err(PackError::DepthLimit {
            max: options.max_depth,
        });
    }

    /* 1. raw bytes pass through untagged */
    if let Value::Bytes(bytes) = value {
        return Ok(bytes.clone());
    }

    /* 2. fixed-arity sequences, ahead of the document encoders so they
    keep a tag distinct from ordered lists */
    if let Value::Tuple(members) = value {
        return encode_seq(Tag::Tupl, members, options, depth);
    }

    /* 3. compact encoder */
    let budget = options.max_depth.saturating_sub(depth);
    if let Some(json) = to_json(value, budget) {
        let payload = serde_json::to_vec(&json)?;
        return Ok(Tag::Json.wrap(&payload));
    }

    /* 4. schema-free document encoder; integers beyond its 8-byte width
    go out as decimal text */
    if let Value::BigInt(int) = value {
        return Ok(Tag::Bint.wrap(int.to_string().as_bytes()));
    }
    if let Some(body) = to_bson(value, budget) {
        let mut doc = Document::new();
        doc.insert("_", body);
        return Ok(Tag::Bson.wrap(&doc_to_bytes(&doc)?));
    }

    /* 5. containers */
    match value {
        Value::List(members) => return encode_seq(Tag::List, members, options, depth),
        Value::Map(pairs) => return encode_map(pairs, options, depth),
        _ => {}
    }

    /* 6.-7. numeric buffers and tabular values */
    let mut reason = String::from("no safe encoder accepts this value");
    match value {
        Value::Array(arr) => return Ok(Tag::Nmpy.wrap(&numeric::encode(arr)?)),
        Value::Series(series) => match tabular::encode_series(series)? {
            Some(blob) => return Ok(blob),
            None => {
                reason = String::from(
                    "cells are not uniformly typed, so the columnar delegate cannot hold them",
                );
            }
        },
        Value::Frame(frame) => match tabular::encode_frame(frame)? {
            Some(blob) => return Ok(blob),
            None => {
                reason = String::from(
                    "cells are not uniformly typed per column, so the columnar delegate cannot hold them",
                );
            }
        },
        Value::Opaque(opaque) => {
            reason = format!(
                "{} is only expressible through the opaque fallback",
                opaque.type_name()
            );
        }
        _ => {}
    }

    /* 8. opaque fallback, behind the capability flag */
    if options.unsafe_fallback {
        debug!(kind = %value.kind(), "no safe encoder applied, using the opaque fallback");
        return capsule::encode(value, options.ensure_determinism);
    }

    Err(PackError::Unsupported {
        kind: value.kind(),
        reason,
    })
}

fn encode_seq(tag: Tag, members: &[Value], options: &PackOptions, depth: usize) -> Result<Vec<u8>> {
    let mut blobs = Vec::with_capacity(members.len());
    for member in members {
        blobs.push(binary(encode(member, options, depth + 1)?));
    }
    let mut doc = Document::new();
    doc.insert("_", Bson::Array(blobs));
    Ok(tag.wrap(&doc_to_bytes(&doc)?))
}

fn encode_map(pairs: &[(Value, Value)], options: &PackOptions, depth: usize) -> Result<Vec<u8>> {
    /* one non-text key switches every key of the map to the hex-encoded
    variant, so the decoder has a single rule per blob */
    let hexed = pairs.iter().any(|(key, _)| !matches!(key, Value::Str(_)));
    let mut doc = Document::new();
    for (key, value) in pairs {
        let slot = match (hexed, key) {
            (false, Value::Str(text)) => text.clone(),
            _ => hex::encode(encode(key, options, depth + 1)?),
        };
        doc.insert(slot, binary(encode(value, options, depth + 1)?));
    }
    let tag = if hexed { Tag::DicB } else { Tag::Dict };
    Ok(tag.wrap(&doc_to_bytes(&doc)?))
}

fn binary(blob: Vec<u8>) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Generic,
        bytes: blob,
    })
}

/// The JSON-representable subset: null, bool, i64 ints, finite floats,
/// text, and lists/text-keyed maps thereof. `budget` bounds recursion so
/// pathological nesting falls through to the depth-checked container path
/// instead of exhausting the stack here.
fn to_json(value: &Value, budget: usize) -> Option<serde_json::Value> {
    use serde_json::{Map, Number, Value as Json};

    let json = match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number(Number::from(*i)),
        /* from_f64 declines NaN and the infinities, which JSON cannot
        carry; those route to the document encoder */
        Value::Float(f) => Json::Number(Number::from_f64(*f)?),
        Value::Str(s) => Json::String(s.clone()),
        Value::List(members) => {
            if budget == 0 {
                return None;
            }
            let mut out = Vec::with_capacity(members.len());
            for member in members {
                out.push(to_json(member, budget - 1)?);
            }
            Json::Array(out)
        }
        Value::Map(pairs) => {
            if budget == 0 {
                return None;
            }
            let mut out = Map::with_capacity(pairs.len());
            for (key, value) in pairs {
                let key = match key {
                    Value::Str(text) => text.clone(),
                    _ => return None,
                };
                out.insert(key, to_json(value, budget - 1)?);
            }
            Json::Object(out)
        }
        _ => return None,
    };
    Some(json)
}

/// The document-representable subset: everything `to_json` takes, plus
/// byte blobs and non-finite floats. Tuples are deliberately excluded even
/// though the document format could hold them as arrays; they would decode
/// as lists and lose their tag.
fn to_bson(value: &Value, budget: usize) -> Option<Bson> {
    let body = match value {
        Value::Null => Bson::Null,
        Value::Bool(b) => Bson::Boolean(*b),
        Value::Int(i) => Bson::Int64(*i),
        Value::Float(f) => Bson::Double(*f),
        Value::Str(s) => Bson::String(s.clone()),
        Value::Bytes(bytes) => Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: bytes.clone(),
        }),
        Value::List(members) => {
            if budget == 0 {
                return None;
            }
            let mut out = Vec::with_capacity(members.len());
            for member in members {
                out.push(to_bson(member, budget - 1)?);
            }
            Bson::Array(out)
        }
        Value::Map(pairs) => {
            if budget == 0 {
                return None;
            }
            let mut doc = Document::new();
            for (key, value) in pairs {
                let key = match key {
                    Value::Str(text) => text.clone(),
                    _ => return None,
                };
                doc.insert(key, to_bson(value, budget - 1)?);
            }
            Bson::Document(doc)
        }
        _ => return None,
    };
    Some(body)
}
