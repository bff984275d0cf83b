//! Handle lifecycle and datapoint dispatch.
//!
//! A [`Marquise`] handle owns the spool context for one namespace and gates
//! every operation on its lifecycle state.
//!
//! # Lifecycle
//!
//! ```text
//! Uninitialized --new()--> Open --close()--> Closed (terminal)
//! ```
//!
//! Construction validates the namespace and initializes the spool; on
//! success the handle retains the two spool file locations for display.
//! [`Marquise::close`] always succeeds and is idempotent; a closed handle
//! never reopens, and every dispatch or submit operation on one fails with
//! the closed-handle error. Dropping an open handle closes it, but explicit
//! `close()` is preferred since drop order is not always obvious.
//!
//! # Dispatch
//!
//! The send and update methods share one shape: resolve the address from an
//! [`AddressSpec`], default the timestamp to the current wall clock when
//! omitted, and forward the canonicalized words to the spool. Sends map the
//! spool code to a boolean (`0` → `true`); hard I/O failures and operations
//! on a closed handle are errors instead.
//!
//! # Example
//!
//! ```rust,no_run
//! use marquise::{AddressSpec, Marquise, SourceDict};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut handle = Marquise::new("mynamespace")?;
//!
//! let spec = AddressSpec::BySource(
//!     "hostname:fe1.example.com,metric:BytesUsed,service:memory,".to_string(),
//! );
//! handle.send_simple(&spec, None, 42)?;
//!
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

use std::fmt;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::address::AddressSpec;
use crate::error::{HandleError, MarquiseError, Result, SpoolError};
use crate::source::SourceDict;
use crate::spool::{self, SourceRecord, SpoolContext};

/// Client handle for one spool namespace.
///
/// Submits simple and extended datapoints and source dictionaries to the
/// namespace's spool. Operations succeed only while the handle is open.
///
/// # Thread Safety
///
/// The handle is synchronous and designed for single-threaded use; it owns
/// its spool context exclusively. External synchronization must be provided
/// if one handle is shared across threads.
#[derive(Debug)]
pub struct Marquise {
    /// The validated namespace.
    namespace: String,
    /// Points spool location, retained for display and introspection.
    spool_path_points: String,
    /// Contents spool location, retained for display and introspection.
    spool_path_contents: String,
    /// The spool context; `None` once the handle is closed.
    ctx: Option<SpoolContext>,
}

impl Marquise {
    /// Opens a handle for `namespace`, spooling under `$MARQUISE_SPOOL_DIR`
    /// (default `/var/spool/marquise`).
    ///
    /// # Errors
    ///
    /// See [`Marquise::with_spool_dir`].
    pub fn new(namespace: &str) -> Result<Self> {
        Self::with_spool_dir(namespace, spool::default_spool_dir())
    }

    /// Opens a handle for `namespace`, spooling under an explicit base
    /// directory.
    ///
    /// The namespace must be nonempty lowercase alphanumeric (`[a-z0-9]+`)
    /// and short enough for a directory name on the spool filesystem.
    ///
    /// # Errors
    ///
    /// - [`HandleError::InvalidNamespace`] if the namespace fails the
    ///   character check
    /// - [`HandleError::NamespaceTooLong`] if the spool filesystem rejects
    ///   the namespace as an over-long name, with the raw OS code
    /// - [`SpoolError::Init`] for any other spool initialization failure
    pub fn with_spool_dir<P: AsRef<Path>>(namespace: &str, spool_dir: P) -> Result<Self> {
        if !valid_namespace(namespace) {
            return Err(HandleError::InvalidNamespace {
                namespace: namespace.to_string(),
            }
            .into());
        }

        let ctx = SpoolContext::init(spool_dir, namespace).map_err(classify_init_error)?;

        Ok(Self {
            namespace: namespace.to_string(),
            spool_path_points: ctx.points_path().display().to_string(),
            spool_path_contents: ctx.contents_path().display().to_string(),
            ctx: Some(ctx),
        })
    }

    /// The namespace this handle spools for.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Location of the spool file receiving datapoint frames.
    ///
    /// An opaque diagnostic string, reported once at construction.
    pub fn spool_path_points(&self) -> &str {
        &self.spool_path_points
    }

    /// Location of the spool file receiving source record frames.
    ///
    /// An opaque diagnostic string, reported once at construction.
    pub fn spool_path_contents(&self) -> &str {
        &self.spool_path_contents
    }

    /// Whether the handle is still open.
    pub fn is_open(&self) -> bool {
        self.ctx.is_some()
    }

    /// Closes the handle, releasing the spool context.
    ///
    /// Always succeeds and is idempotent: repeated calls are no-ops. A
    /// closed handle never reopens; build a new one instead.
    pub fn close(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            tracing::debug!(
                "shutting down handle spooling to {} and {}",
                self.spool_path_points,
                self.spool_path_contents
            );
            ctx.shutdown();
        }
    }

    /// Queues a simple datapoint: a 64-bit word at a timestamp.
    ///
    /// `timestamp: None` defaults to the current wall-clock time in
    /// nanoseconds since the epoch; the default is a convenience only and
    /// implies no ordering guarantee. Returns `Ok(true)` when the spool
    /// accepted the frame and `Ok(false)` on a nonzero spool code.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Closed`] if the handle has been closed
    /// - [`SpoolError::WriteFailed`] if the spool write fails, with the raw
    ///   OS code
    pub fn send_simple(
        &self,
        spec: &AddressSpec,
        timestamp: Option<u64>,
        value: u64,
    ) -> Result<bool> {
        let ctx = self.open_ctx()?;
        let address = spec.resolve();
        let timestamp = timestamp.unwrap_or_else(current_timestamp);

        let code = ctx.send_simple(address, timestamp, value)?;
        tracing::debug!("send_simple for address {address} returned {code}");
        Ok(code == 0)
    }

    /// [`Marquise::send_simple`] with an explicit address.
    ///
    /// # Errors
    ///
    /// See [`Marquise::send_simple`].
    pub fn send_simple_address(
        &self,
        address: u64,
        timestamp: Option<u64>,
        value: u64,
    ) -> Result<bool> {
        self.send_simple(&AddressSpec::Explicit(address), timestamp, value)
    }

    /// [`Marquise::send_simple`] with a source identifier.
    ///
    /// # Errors
    ///
    /// See [`Marquise::send_simple`].
    pub fn send_simple_source(
        &self,
        source: &str,
        timestamp: Option<u64>,
        value: u64,
    ) -> Result<bool> {
        self.send_simple(&AddressSpec::BySource(source.to_string()), timestamp, value)
    }

    /// Queues an extended datapoint: a string at a timestamp.
    ///
    /// The value's byte length, not its character count, accompanies the
    /// bytes on the wire. Timestamp defaulting and the boolean result follow
    /// [`Marquise::send_simple`].
    ///
    /// # Errors
    ///
    /// - [`HandleError::Closed`] if the handle has been closed
    /// - [`SpoolError::WriteFailed`] if the spool write fails, with the raw
    ///   OS code
    pub fn send_extended(
        &self,
        spec: &AddressSpec,
        timestamp: Option<u64>,
        value: &str,
    ) -> Result<bool> {
        let ctx = self.open_ctx()?;
        let address = spec.resolve();
        let timestamp = timestamp.unwrap_or_else(current_timestamp);

        let code = ctx.send_extended(address, timestamp, value.as_bytes())?;
        tracing::debug!(
            "send_extended of {} byte(s) for address {address} returned {code}",
            value.len()
        );
        Ok(code == 0)
    }

    /// [`Marquise::send_extended`] with an explicit address.
    ///
    /// # Errors
    ///
    /// See [`Marquise::send_extended`].
    pub fn send_extended_address(
        &self,
        address: u64,
        timestamp: Option<u64>,
        value: &str,
    ) -> Result<bool> {
        self.send_extended(&AddressSpec::Explicit(address), timestamp, value)
    }

    /// [`Marquise::send_extended`] with a source identifier.
    ///
    /// # Errors
    ///
    /// See [`Marquise::send_extended`].
    pub fn send_extended_source(
        &self,
        source: &str,
        timestamp: Option<u64>,
        value: &str,
    ) -> Result<bool> {
        self.send_extended(&AddressSpec::BySource(source.to_string()), timestamp, value)
    }

    /// Submits a source dictionary for an address.
    ///
    /// Encodes the validated dictionary into a record, submits it for the
    /// resolved address, and releases the record on every exit path. No
    /// partial submission occurs: validation failures happen before any
    /// spool write.
    ///
    /// # Errors
    ///
    /// - [`HandleError::Closed`] if the handle has been closed
    /// - [`SpoolError::WriteFailed`] if the spool write fails, with the raw
    ///   OS code
    /// - [`SpoolError::UpdateRejected`] if the spool refuses the record with
    ///   a nonzero code
    pub fn update_source(&self, spec: &AddressSpec, metadata: &SourceDict) -> Result<()> {
        let ctx = self.open_ctx()?;
        let address = spec.resolve();

        let record = SourceRecord::new(metadata);
        let code = ctx.update_source(address, &record)?;
        tracing::debug!(
            "update_source of {} pair(s) for address {address} returned {code}",
            metadata.len()
        );
        if code != 0 {
            return Err(SpoolError::UpdateRejected { code }.into());
        }
        Ok(())
    }

    /// Returns the spool context, or the closed-handle error.
    fn open_ctx(&self) -> Result<&SpoolContext> {
        self.ctx.as_ref().ok_or_else(|| HandleError::Closed.into())
    }
}

impl fmt::Display for Marquise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Marquise handle spooling to {} and {}>",
            self.spool_path_points, self.spool_path_contents
        )
    }
}

impl Drop for Marquise {
    fn drop(&mut self) {
        self.close();
    }
}

/// Returns the current wall-clock time in nanoseconds since the Unix epoch.
///
/// The convenience default for omitted timestamps; no monotonic or causal
/// ordering is implied.
#[allow(clippy::cast_possible_truncation)] // Current epoch nanos fit in u64 until year 2554
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// A namespace must be nonempty lowercase alphanumeric (`[a-z0-9]+`).
fn valid_namespace(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

/// Reclassifies a spool init failure caused by an over-long name.
///
/// Keyed on the I/O error kind so the "long name" versus "bad characters"
/// distinction survives without a code-to-class table; the raw OS code is
/// still carried for display.
fn classify_init_error(err: MarquiseError) -> MarquiseError {
    match err {
        MarquiseError::Spool(SpoolError::Init {
            ref source, code, ..
        }) if source.kind() == io::ErrorKind::InvalidFilename => {
            HandleError::NamespaceTooLong { code }.into()
        }
        other => other,
    }
}
