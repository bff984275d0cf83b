//! Append-only spool backend.
//!
//! This module owns the on-disk side of the client: it creates the
//! per-namespace spool layout, appends datapoint and source record frames,
//! and records a small metadata file for diagnostics. A separate daemon
//! drains the spool files and ships their contents upstream; nothing in this
//! crate reads them back except tests and the CLI.
//!
//! # File Layout
//!
//! ```text
//! $MARQUISE_SPOOL_DIR/               <- defaults to /var/spool/marquise
//! └── <namespace>/
//!     ├── meta.json                  <- namespace and spool file locations
//!     ├── points/
//!     │   └── spool_<pid>_<seq>      <- simple and extended datapoint frames
//!     └── contents/
//!         └── spool_<pid>_<seq>      <- source record frames
//! ```
//!
//! # Frame shapes
//!
//! All words are little-endian u64.
//!
//! ```text
//! simple:   address | timestamp | value                      (24 bytes)
//! extended: address | timestamp | length | value bytes
//! source:   address | length | field:value,field:value,...
//! ```
//!
//! # Write discipline
//!
//! The context performs no buffering and holds no file descriptors between
//! calls: each send opens the spool file in append mode, writes one frame,
//! and closes it. Frames reach the file in exactly the order issued. A spool
//! file made unwritable therefore fails on the next send, not at init.

use std::env;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpoolError};
use crate::source::SourceDict;

/// Environment variable selecting the spool base directory.
pub const SPOOL_DIR_ENV: &str = "MARQUISE_SPOOL_DIR";

/// Default spool base directory when [`SPOOL_DIR_ENV`] is unset.
pub const DEFAULT_SPOOL_DIR: &str = "/var/spool/marquise";

/// Spool metadata format version.
const METADATA_VERSION: u32 = 1;

/// Name of the metadata file in the namespace directory.
const METADATA_FILE: &str = "meta.json";

/// Distinguishes spool files created by this process within its lifetime.
static SPOOL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Returns the spool base directory from the environment, or the default.
pub fn default_spool_dir() -> PathBuf {
    env::var_os(SPOOL_DIR_ENV).map_or_else(|| PathBuf::from(DEFAULT_SPOOL_DIR), PathBuf::from)
}

/// Metadata written to the namespace's `meta.json` at init.
///
/// Purely diagnostic: the daemon discovers spool files by scanning the
/// directories, and the CLI reads this to describe a namespace.
#[derive(Debug, Serialize, Deserialize)]
pub struct SpoolMetadata {
    /// Metadata format version.
    pub version: u32,
    /// The namespace this spool belongs to.
    pub namespace: String,
    /// Spool file receiving datapoint frames.
    pub spool_path_points: String,
    /// Spool file receiving source record frames.
    pub spool_path_contents: String,
}

/// One namespace's spool: the points and contents spool file locations.
///
/// Created by [`SpoolContext::init`], released by [`SpoolContext::shutdown`]
/// (or by drop). Send methods return the spool code: 0 means the frame was
/// accepted; I/O failures are reported as errors carrying the raw OS code.
#[derive(Debug)]
pub struct SpoolContext {
    namespace: String,
    points_path: PathBuf,
    contents_path: PathBuf,
}

impl SpoolContext {
    /// Creates the namespace spool layout and empty spool files.
    ///
    /// # Errors
    ///
    /// [`SpoolError::Init`] if a directory or spool file cannot be created.
    /// The underlying `io::Error` kind distinguishes an over-long namespace
    /// (`InvalidFilename`) from other failures; callers classify on that,
    /// never on the raw code.
    pub fn init<P: AsRef<Path>>(spool_dir: P, namespace: &str) -> Result<Self> {
        let ns_dir = spool_dir.as_ref().join(namespace);
        let points_dir = ns_dir.join("points");
        let contents_dir = ns_dir.join("contents");
        for dir in [&points_dir, &contents_dir] {
            fs::create_dir_all(dir).map_err(|e| init_error(dir, e))?;
        }

        let file_name = spool_file_name();
        let points_path = points_dir.join(&file_name);
        let contents_path = contents_dir.join(&file_name);
        for path in [&points_path, &contents_path] {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| init_error(path, e))?;
        }

        let ctx = Self {
            namespace: namespace.to_string(),
            points_path,
            contents_path,
        };
        ctx.write_metadata(&ns_dir)?;

        tracing::debug!(
            "spool initialized for namespace '{}' at {}",
            ctx.namespace,
            ns_dir.display()
        );
        Ok(ctx)
    }

    /// The namespace this context spools for.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Path of the spool file receiving datapoint frames.
    pub fn points_path(&self) -> &Path {
        &self.points_path
    }

    /// Path of the spool file receiving source record frames.
    pub fn contents_path(&self) -> &Path {
        &self.contents_path
    }

    /// Appends a simple datapoint frame: three little-endian u64 words.
    ///
    /// Returns the spool code, 0 on success.
    ///
    /// # Errors
    ///
    /// [`SpoolError::WriteFailed`] carrying the raw OS code if the spool
    /// file cannot be opened or written.
    pub fn send_simple(&self, address: u64, timestamp: u64, value: u64) -> Result<i32> {
        let mut frame = [0u8; 24];
        frame[0..8].copy_from_slice(&address.to_le_bytes());
        frame[8..16].copy_from_slice(&timestamp.to_le_bytes());
        frame[16..24].copy_from_slice(&value.to_le_bytes());
        self.append(&self.points_path, &frame)
    }

    /// Appends an extended datapoint frame: address, timestamp, byte length,
    /// then the value bytes.
    ///
    /// Returns the spool code, 0 on success.
    ///
    /// # Errors
    ///
    /// [`SpoolError::WriteFailed`] carrying the raw OS code if the spool
    /// file cannot be opened or written.
    pub fn send_extended(&self, address: u64, timestamp: u64, value: &[u8]) -> Result<i32> {
        let mut frame = Vec::with_capacity(24 + value.len());
        frame.extend_from_slice(&address.to_le_bytes());
        frame.extend_from_slice(&timestamp.to_le_bytes());
        frame.extend_from_slice(&(value.len() as u64).to_le_bytes());
        frame.extend_from_slice(value);
        self.append(&self.points_path, &frame)
    }

    /// Appends a source record frame for `address`.
    ///
    /// Returns the spool code, 0 on success.
    ///
    /// # Errors
    ///
    /// [`SpoolError::WriteFailed`] carrying the raw OS code if the spool
    /// file cannot be opened or written.
    pub fn update_source(&self, address: u64, record: &SourceRecord) -> Result<i32> {
        let fields = record.as_bytes();
        let mut frame = Vec::with_capacity(16 + fields.len());
        frame.extend_from_slice(&address.to_le_bytes());
        frame.extend_from_slice(&(fields.len() as u64).to_le_bytes());
        frame.extend_from_slice(fields);
        self.append(&self.contents_path, &frame)
    }

    /// Releases the context. Always succeeds.
    pub fn shutdown(self) {
        tracing::debug!("spool context for namespace '{}' shut down", self.namespace);
    }

    /// Opens `path` in append mode and writes one frame.
    fn append(&self, path: &Path, frame: &[u8]) -> Result<i32> {
        let mut file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| write_error(path, e))?;
        file.write_all(frame).map_err(|e| write_error(path, e))?;
        Ok(0)
    }

    /// Writes the namespace's `meta.json`.
    fn write_metadata(&self, ns_dir: &Path) -> Result<()> {
        let metadata = SpoolMetadata {
            version: METADATA_VERSION,
            namespace: self.namespace.clone(),
            spool_path_points: self.points_path.display().to_string(),
            spool_path_contents: self.contents_path.display().to_string(),
        };
        let json = serde_json::to_string_pretty(&metadata).map_err(SpoolError::MetadataSerialize)?;

        let path = ns_dir.join(METADATA_FILE);
        fs::write(&path, json).map_err(|e| SpoolError::MetadataWrite {
            path: path.display().to_string(),
            source: e,
        })?;
        Ok(())
    }
}

/// A source dictionary encoded for the contents spool.
///
/// The encoding joins pairs as `field:value,` in key order; the dictionary's
/// validation already guarantees neither side contains the separator. The
/// record is scoped to one update call and released when it goes out of
/// scope, on success and failure alike.
#[derive(Debug)]
pub struct SourceRecord {
    bytes: Vec<u8>,
}

impl SourceRecord {
    /// Encodes a validated source dictionary.
    pub fn new(dict: &SourceDict) -> Self {
        let mut bytes = Vec::new();
        for (key, value) in dict.iter() {
            bytes.extend_from_slice(key.as_bytes());
            bytes.push(b':');
            bytes.extend_from_slice(value.as_bytes());
            bytes.push(b',');
        }
        Self { bytes }
    }

    /// The encoded record bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Builds an init error carrying the raw OS code.
fn init_error(path: &Path, source: io::Error) -> crate::error::MarquiseError {
    SpoolError::Init {
        path: path.display().to_string(),
        code: source.raw_os_error().unwrap_or(-1),
        source,
    }
    .into()
}

/// Builds a write error carrying the raw OS code.
fn write_error(path: &Path, source: io::Error) -> crate::error::MarquiseError {
    SpoolError::WriteFailed {
        path: path.display().to_string(),
        code: source.raw_os_error().unwrap_or(-1),
        source,
    }
    .into()
}

/// Names a spool file uniquely for this process: `spool_<pid>_<seq>`.
fn spool_file_name() -> String {
    let seq = SPOOL_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("spool_{}_{seq:06}", process::id())
}
