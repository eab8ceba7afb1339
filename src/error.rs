//! The narrow error taxonomy this crate exposes as `Result::Err`.
//!
//! Most of the recoverable outcomes a cache can produce (a miss, an
//! oversized object, an expired entry, a random-probe that ran dry) are
//! ordinary control flow in this crate, returned as [`crate::request::CacheResult`]
//! variants, `Option::None`, or a `log::warn!`, matching the teacher's own
//! `Option`-returning API surface. `CacheError` is reserved for invariant
//! violations caught at construction time, where the teacher's own
//! `SlruCacheConfig::new` uses a bare `assert!` — this crate follows the
//! pack's typed-error idiom (seen across `cyberlife-coder-velesdb` and
//! `harborgrid-justin-caddy`) of turning those into a matchable enum instead
//! of a panic or a bare string.

use core::fmt;

/// Errors raised while constructing cache configuration or components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// A construction-time invariant was violated, e.g. `n_seg == 0` or a
    /// tier capacity of zero.
    InvalidConfig {
        /// Human-readable description of the violated invariant.
        reason: &'static str,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::InvalidConfig { reason } => {
                write!(f, "invalid cache configuration: {reason}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CacheError {}
