//! The outermost compression envelope. Applied exactly once, after the
//! dispatch chain has produced its blob; sniffed, not flagged, on the way
//! back in.

use crate::error::{PackError, Result};
use crate::options::PackOptions;
use crate::types::Value;
use crate::wire::tag::{Tag, TAG_LEN};
use crate::wire::{dec, enc};
use lz4_flex::frame::{FrameDecoder, FrameEncoder};
use std::borrow::Cow;
use std::io::{Read, Write};
use tracing::trace;

/// Serialize `value` to a self-describing blob under `options`.
///
/// With `options.unsafe_fallback` set this is total over all values whose
/// opaque types are registered; decoding the resulting capsules runs the
/// registered delegate deserializers, so such blobs must only be unpacked
/// from trusted sources.
pub fn pack(value: &Value, options: &PackOptions) -> Result<Vec<u8>> {
    let blob = enc::encode(value, options, 0)?;
    if !options.compressed {
        return Ok(blob);
    }
    let mut encoder = FrameEncoder::new(Vec::new());
    encoder.write_all(&blob)?;
    let compressed = encoder.finish()?;
    trace!(
        inner = blob.len(),
        compressed = compressed.len(),
        "applied the compression envelope"
    );
    Ok(Tag::Lz4.wrap(&compressed))
}

/// Decode a blob produced by [`pack`], compressed or not.
pub fn unpack(blob: &[u8]) -> Result<Value> {
    let inner: Cow<[u8]> = match Tag::parse(blob) {
        Some(Tag::Lz4) => {
            let mut out = Vec::new();
            FrameDecoder::new(&blob[TAG_LEN..])
                .read_to_end(&mut out)
                .map_err(|e| {
                    PackError::Malformed(format!("envelope payload is not an LZ4 frame: {e}"))
                })?;
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(blob),
    };
    dec::decode(&inner, 0)
}
