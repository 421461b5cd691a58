//! # Wire format
//!
//! Every blob leads with a 7-byte ASCII tag: a 2-character format-version
//! marker (`"00"` for the stable self-describing tags, `"05"` for the
//! versioned opaque protocol), a 5-character type identifier, and an `_`
//! separator. The tag is assigned at encode time and is the sole dispatch
//! key at decode time; the payload carries no other type metadata.
//!
//! | Tag       | Meaning                   | Payload |
//! |-----------|---------------------------|---------|
//! | `00json_` | compact scalar/list/map   | JSON bytes |
//! | `00bson_` | schema-free document      | BSON doc wrapping `{_: value}` |
//! | `00bint_` | big integer               | decimal ASCII text |
//! | `00nmpy_` | numeric array             | numeric header + raw bytes |
//! | `00npdf_` | numeric frame             | numeric header + raw bytes |
//! | `00bsos_` | labeled numeric series    | BSON doc: `i` index, `v` numeric payload, optional `n` name |
//! | `00prqs_` | non-numeric series        | Parquet bytes, one data column |
//! | `00prqd_` | non-numeric frame         | Parquet bytes |
//! | `00list_` | ordered list              | BSON doc wrapping `{_: [blobs...]}` |
//! | `00tupl_` | fixed-arity sequence      | BSON doc wrapping `{_: [blobs...]}` |
//! | `00dict_` | text-keyed map            | BSON doc of `{key: blob}` |
//! | `00dicB_` | non-text-keyed map        | BSON doc of `{hex(encoded-key): blob}` |
//! | `05pckl_` | opaque, stable protocol   | capsule header + bincode bytes |
//! | `05dill_` | opaque, extended protocol | capsule header + JSON bytes |
//! | `00lz4__` | envelope (compressed)     | LZ4 frame over an inner blob |
//!
//! The below pseudocode depicts the payloads this module writes itself;
//! everything else is a delegate's format carried verbatim.
//!
//! ```text
//! struct NumericPayload {
//!     header_len:     ascii decimal,       // length of the rest of the header
//!     mark:           "§",                 // two bytes, 0xC2 0xA7
//!     ndims:          ascii decimal,
//!     mark:           "§",
//!     dtype:          ascii name,          // "int64", "float32", ...
//!     mark:           "§",
//!     shape:          [u32 le; ndims],
//!     data:           [u8; ...],           // elements, little-endian
//! }
//!
//! struct CapsulePayload {
//!     type_name_len:  u32 le,
//!     type_name:      [u8; type_name_len],
//!     dump:           [u8; ...],           // delegate serializer bytes
//! }
//! ```
//!
//! Decoding rules worth knowing:
//!
//! - A blob whose first 7 bytes match no known tag decodes verbatim as a
//!   `Bytes` value. This is the designed forward-compatibility escape
//!   hatch, and it is also how tag-less raw bytes nested in containers
//!   come back. The flip side: a caller-supplied `Bytes` value whose
//!   content happens to begin with a recognized tag will be decoded as
//!   that tag says; the tag is the only metadata there is.
//! - Container recursion reconstructs the exact variant that was encoded:
//!   a tuple never comes back as a list, a map with one non-text key keeps
//!   every key's type.
//! - A `00dicB_` document can hold one slot per distinct encoded key; a
//!   map built with duplicate logical keys ends last-writer-wins.

mod dec;
mod enc;
mod envelope;
mod numeric;
mod tabular;
mod tag;

mod capsule;

mod roundtrip_test;

pub use envelope::{pack, unpack};

use crate::error::{PackError, Result};
use bson::Document;

pub(crate) fn doc_to_bytes(doc: &Document) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    doc.to_writer(&mut out)?;
    Ok(out)
}

pub(crate) fn doc_from_bytes(payload: &[u8]) -> Result<Document> {
    Document::from_reader(payload)
        .map_err(|e| PackError::Malformed(format!("bad document payload: {e}")))
}
