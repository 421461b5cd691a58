/// Depth limit applied when no explicit limit is available, notably by
/// [`unpack`](crate::unpack), which takes no options record.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Immutable per-call configuration for [`pack`](crate::pack).
///
/// The flags are threaded explicitly through every recursive encode call;
/// the engine keeps no ambient state.
#[derive(Clone, Copy, Debug)]
pub struct PackOptions {
    /// Refuse encoders that cannot promise byte-identical output for the
    /// same logical value across runs.
    pub ensure_determinism: bool,
    /// Permit the opaque capsule codec when no safe encoder applies.
    pub unsafe_fallback: bool,
    /// Wrap the result in the outermost compression envelope.
    pub compressed: bool,
    /// Maximum value nesting depth before encoding fails fast.
    pub max_depth: usize,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            ensure_determinism: false,
            unsafe_fallback: false,
            compressed: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl PackOptions {
    /// Strictest profile: deterministic output, no opaque fallback.
    pub fn safe() -> Self {
        Self {
            ensure_determinism: true,
            unsafe_fallback: false,
            ..Self::default()
        }
    }

    /// Most permissive profile: opaque fallback allowed, determinism not
    /// required.
    pub fn permissive() -> Self {
        Self {
            ensure_determinism: false,
            unsafe_fallback: true,
            ..Self::default()
        }
    }
}
