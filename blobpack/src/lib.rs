//! Self-describing tagged binary serialization.
//!
//! [`pack`] turns a [`Value`] into a compact byte blob whose 7-byte tag
//! prefix is the only metadata needed to decode it; [`unpack`] reverses it.
//! Two safety axes are controlled per call through [`PackOptions`]:
//!
//! - `ensure_determinism`: refuse any encoder that cannot promise
//!   byte-stable output for the same logical value.
//! - `unsafe_fallback`: permit the opaque capsule codec for values no safe
//!   encoder accepts. Decoding a capsule runs whatever delegate
//!   deserializer its type name selects; never feed capsules untrusted
//!   input.
//!
//! The wire format is documented on the [`wire`] module.
//!
//! ```
//! use blobpack::{pack, unpack, PackOptions, Value};
//!
//! let opts = PackOptions {
//!     compressed: false,
//!     ..PackOptions::default()
//! };
//! let blob = pack(&Value::Bool(true), &opts)?;
//! assert_eq!(blob, b"00json_true");
//! assert_eq!(unpack(&blob)?, Value::Bool(true));
//! # Ok::<(), blobpack::PackError>(())
//! ```

mod error;
mod options;

pub mod types;
pub mod wire;

pub use error::{PackError, Result};
pub use options::{PackOptions, DEFAULT_MAX_DEPTH};
pub use types::capsule;
pub use types::*;
pub use wire::{pack, unpack};
