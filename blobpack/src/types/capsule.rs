//! Capsule registry for the opaque fallback codec.
//!
//! A capsule carries a value no safe encoder accepts. The engine cannot
//! reflect over arbitrary types, so callers declare up front which types
//! may travel as capsules: [`register`] stores monomorphized seal/open
//! hooks keyed by the type's name. A type without an entry is the
//! "unpicklable" case. Type names come from [`std::any::type_name`] and
//! are not stable across compilers or crate versions; capsules are
//! explicitly non-portable.

use crate::error::{PackError, Result};
use crate::types::{Frame, NdArray, Series};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::ser::Error as _;
use serde::Serialize;
use std::any::{self, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// A value held behind a type-erased handle, serializable only through the
/// capsule registry.
///
/// Equality is identity: two capsules are equal when they share the same
/// handle. A decoded capsule never equals the one it was encoded from;
/// compare through [`Opaque::downcast_ref`] instead.
#[derive(Clone)]
pub struct Opaque {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Opaque {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref()
    }

    pub(crate) fn any(&self) -> &(dyn Any + Send + Sync) {
        self.value.as_ref()
    }
}

impl PartialEq for Opaque {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Opaque")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct CapsuleCodec {
    pub(crate) seal_stable: fn(&(dyn Any + Send + Sync)) -> bincode::Result<Vec<u8>>,
    pub(crate) seal_extended: fn(&(dyn Any + Send + Sync)) -> serde_json::Result<Vec<u8>>,
    pub(crate) open_stable: fn(&[u8]) -> Result<Opaque>,
    pub(crate) open_extended: fn(&[u8]) -> Result<Opaque>,
}

type Registry = HashMap<&'static str, CapsuleCodec>;

/* The engine's own tabular types are pre-registered so that tables the
columnar delegate declines can still take the opaque route. */
static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| {
    let mut registry = Registry::new();
    insert::<Series>(&mut registry);
    insert::<Frame>(&mut registry);
    insert::<NdArray>(&mut registry);
    RwLock::new(registry)
});

/// Register `T` with the capsule codec, keyed by its type name.
///
/// Required before a `Value::Opaque` holding a `T` can be packed (under
/// `unsafe_fallback`) or a capsule naming `T` can be unpacked.
pub fn register<T>()
where
    T: Serialize + DeserializeOwned + Any + Send + Sync,
{
    let mut registry = REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    insert::<T>(&mut registry);
}

pub(crate) fn lookup(type_name: &str) -> Option<CapsuleCodec> {
    let registry = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.get(type_name).copied()
}

fn insert<T>(registry: &mut Registry)
where
    T: Serialize + DeserializeOwned + Any + Send + Sync,
{
    registry.insert(
        any::type_name::<T>(),
        CapsuleCodec {
            seal_stable: seal_stable::<T>,
            seal_extended: seal_extended::<T>,
            open_stable: open_stable::<T>,
            open_extended: open_extended::<T>,
        },
    );
}

fn seal_stable<T>(value: &(dyn Any + Send + Sync)) -> bincode::Result<Vec<u8>>
where
    T: Serialize + Any,
{
    match value.downcast_ref::<T>() {
        Some(concrete) => bincode::serialize(concrete),
        None => Err(Box::new(bincode::ErrorKind::Custom(String::from(
            "capsule holds a different type than its registration",
        )))),
    }
}

fn seal_extended<T>(value: &(dyn Any + Send + Sync)) -> serde_json::Result<Vec<u8>>
where
    T: Serialize + Any,
{
    match value.downcast_ref::<T>() {
        Some(concrete) => serde_json::to_vec(concrete),
        None => Err(serde_json::Error::custom(
            "capsule holds a different type than its registration",
        )),
    }
}

fn open_stable<T>(payload: &[u8]) -> Result<Opaque>
where
    T: DeserializeOwned + Any + Send + Sync,
{
    let value: T = bincode::deserialize(payload).map_err(|e| {
        PackError::Malformed(format!(
            "capsule payload does not deserialize as {}: {e}",
            any::type_name::<T>()
        ))
    })?;
    Ok(Opaque::new(value))
}

fn open_extended<T>(payload: &[u8]) -> Result<Opaque>
where
    T: DeserializeOwned + Any + Send + Sync,
{
    let value: T = serde_json::from_slice(payload).map_err(|e| {
        PackError::Malformed(format!(
            "capsule payload does not deserialize as {}: {e}",
            any::type_name::<T>()
        ))
    })?;
    Ok(Opaque::new(value))
}
