//! # marquise
//!
//! Client library for the marquise time-series spool daemon.
//!
//! marquise queues time-series datapoints and per-series metadata into
//! append-only spool files, where a separate daemon picks them up for
//! delivery. Every series is identified by a 64-bit address, supplied
//! directly or derived by hashing a textual identifier with SipHash-2-4
//! under a fixed all-zero key — so independent producers agree on addresses
//! without coordination. This crate is the validation and identity layer in
//! front of the spool: it owns nothing of the delivery pipeline.
//!
//! ## Key Properties
//!
//! - Deterministic address resolution: identical identifier bytes map to the
//!   identical address in every process, with no per-process salt
//! - Fail-fast local validation: malformed requests never reach the spool
//! - Strict handle lifecycle: operations succeed only while open, close is
//!   idempotent, a closed handle never reopens
//! - Synchronous and in-order: each call appends one frame before returning;
//!   no background work, queuing, or timeouts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use marquise::{AddressSpec, Marquise, SourceDict};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Open a handle; spool files live under $MARQUISE_SPOOL_DIR.
//! let mut handle = Marquise::new("mynamespace")?;
//!
//! // Queue a numeric datapoint, addressing the series by identifier.
//! let spec = AddressSpec::BySource(
//!     "hostname:fe1.example.com,metric:BytesUsed,service:memory,".to_string(),
//! );
//! handle.send_simple(&spec, None, 42)?;
//!
//! // Attach metadata to the same address.
//! let metadata = SourceDict::from_pairs([
//!     ("hostname", "fe1.example.com"),
//!     ("service", "memory"),
//! ])?;
//! handle.update_source(&spec, &metadata)?;
//!
//! handle.close();
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Marquise`] — Handle owning one namespace's spool context; gates every
//!   operation on open/closed state
//! - [`AddressSpec`] — Tagged address-or-source choice; [`hash_identifier`]
//!   is the resolution function
//! - [`SourceDict`] — Validated string-to-string metadata mapping
//! - [`spool`] — Append-only spool layout and frame encoding
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`handle`] — Handle lifecycle, dispatch, submission
//! - [`address`] — Address resolution and the address-or-source rule
//! - [`source`] — Source dictionary validation
//! - [`spool`] — Spool backend: layout, frames, metadata
//! - [`error`] — Error types

pub mod address;
pub mod error;
pub mod handle;
pub mod source;
pub mod spool;

// Re-export primary API types at crate root for convenience.
pub use address::{AddressSpec, hash_identifier};
pub use error::{MarquiseError, Result};
pub use handle::{Marquise, current_timestamp};
pub use source::SourceDict;
