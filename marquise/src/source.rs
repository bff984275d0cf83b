//! Source dictionary validation.
//!
//! A source dictionary is a string-to-string mapping describing one address:
//! which host a series came from, what metric it measures, and so on. The
//! spool encodes dictionaries as `field:value,` pairs, so the `:` byte is
//! reserved and may not appear in any key or value.
//!
//! # Validation
//!
//! [`SourceDict::from_pairs`] validates in two phases:
//!
//! 1. Conversion: every key and value must be valid UTF-8, and keys must be
//!    unique.
//! 2. Format: no key or value may contain the reserved `:` separator.
//!
//! Conversion failures always win over format failures, so a dictionary with
//! both defects reports the conversion error.
//!
//! # Example
//!
//! ```
//! use marquise::SourceDict;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metadata = SourceDict::from_pairs([
//!     ("hostname", "fe1.example.com"),
//!     ("metric", "BytesUsed"),
//!     ("service", "memory"),
//! ])?;
//! assert_eq!(metadata.len(), 3);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use crate::error::{Result, SourceError};

/// The byte reserved as the field separator in the spool encoding.
pub const FIELD_SEPARATOR: char = ':';

/// A validated string-to-string metadata mapping for one address.
///
/// Construction via [`SourceDict::from_pairs`] guarantees that every key and
/// value is UTF-8, keys are unique, and nothing contains the reserved `:`
/// separator. Pairs are held in key order so the spool encoding is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDict {
    pairs: BTreeMap<String, String>,
}

impl SourceDict {
    /// Builds a source dictionary from key/value byte-string pairs.
    ///
    /// Accepts anything that yields byte strings, so callers can pass
    /// `&str` pairs, `String` pairs, or raw bytes from an external producer.
    ///
    /// # Errors
    ///
    /// - [`SourceError::KeyNotUtf8`] / [`SourceError::ValueNotUtf8`] if a
    ///   key or value fails UTF-8 conversion
    /// - [`SourceError::DuplicateKey`] if two pairs share a key
    /// - [`SourceError::KeySeparator`] / [`SourceError::ValueSeparator`] if
    ///   a converted key or value contains `:`
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        // Phase 1: conversion. Everything must be UTF-8 and keys unique
        // before any format rule is considered.
        let mut converted = BTreeMap::new();
        for (key, value) in pairs {
            let key = match std::str::from_utf8(key.as_ref()) {
                Ok(key) => key.to_string(),
                Err(_) => {
                    return Err(SourceError::KeyNotUtf8 {
                        key: key.as_ref().to_vec(),
                    }
                    .into());
                }
            };
            let value = match std::str::from_utf8(value.as_ref()) {
                Ok(value) => value.to_string(),
                Err(_) => return Err(SourceError::ValueNotUtf8 { key }.into()),
            };
            if converted.insert(key.clone(), value).is_some() {
                return Err(SourceError::DuplicateKey { key }.into());
            }
        }

        // Phase 2: format. The spool joins pairs as `field:value,` so the
        // separator byte is forbidden on both sides.
        for (key, value) in &converted {
            if key.contains(FIELD_SEPARATOR) {
                return Err(SourceError::KeySeparator { key: key.clone() }.into());
            }
            if value.contains(FIELD_SEPARATOR) {
                return Err(SourceError::ValueSeparator { key: key.clone() }.into());
            }
        }

        Ok(Self { pairs: converted })
    }

    /// Number of key/value pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the dictionary holds no pairs.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Iterates the pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Looks up the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }
}
