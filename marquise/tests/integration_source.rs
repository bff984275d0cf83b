//! Integration tests for source metadata submission.
//!
//! These tests validate source dictionaries through the full update path
//! and read the contents spool back to verify the submitted records.

use std::fs;

use marquise::error::{MarquiseError, SourceError, SpoolError};
use marquise::{AddressSpec, Marquise, SourceDict, hash_identifier};
use tempfile::tempdir;

const GOOD_NAMESPACE: &str = "mytestnamespace";
const GOOD_ADDRESS: u64 = 5753895591108871589;

/// Decodes a little-endian u64 word at `offset` in a spool frame.
fn word(frame: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(frame[offset..offset + 8].try_into().unwrap())
}

fn good_dict() -> SourceDict {
    SourceDict::from_pairs([
        ("foofoofoo", "barbarbar"),
        ("lolololol", "catte"),
        ("something else altogether", "that is rather long indeed"),
        ("test", "source_dict"),
    ])
    .unwrap()
}

#[test]
fn test_update_source_writes_record() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    handle
        .update_source(&AddressSpec::Explicit(GOOD_ADDRESS), &good_dict())
        .unwrap();

    let frame = fs::read(handle.spool_path_contents()).unwrap();
    assert_eq!(word(&frame, 0), GOOD_ADDRESS);

    let length = word(&frame, 8) as usize;
    let fields = &frame[16..];
    assert_eq!(fields.len(), length);

    // Pairs are encoded in key order.
    assert_eq!(
        fields,
        b"foofoofoo:barbarbar,lolololol:catte,\
          something else altogether:that is rather long indeed,test:source_dict,"
            .as_slice()
    );
}

#[test]
fn test_update_source_via_source_identifier() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    let source = "hostname:misaka.anchor.net.au";
    handle
        .update_source(&AddressSpec::BySource(source.to_string()), &good_dict())
        .unwrap();

    let frame = fs::read(handle.spool_path_contents()).unwrap();
    assert_eq!(word(&frame, 0), hash_identifier(source));
}

#[test]
fn test_empty_dict_is_submitted() {
    // No length constraints are imposed on the dictionary itself.
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    let empty = SourceDict::from_pairs(Vec::<(&str, &str)>::new()).unwrap();
    handle
        .update_source(&AddressSpec::Explicit(GOOD_ADDRESS), &empty)
        .unwrap();

    let frame = fs::read(handle.spool_path_contents()).unwrap();
    assert_eq!(frame.len(), 16);
    assert_eq!(word(&frame, 8), 0);
}

#[test]
fn test_non_utf8_key_is_type_error() {
    let err = SourceDict::from_pairs([
        (&b"\xff\xfe"[..], &b"barbarbar"[..]),
        (&b"trolololol"[..], &b"catte"[..]),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Source(SourceError::KeyNotUtf8 { .. })
    ));
}

#[test]
fn test_non_utf8_value_is_type_error() {
    let err = SourceDict::from_pairs([
        (&b"foofoofoo"[..], &b"barbarbar"[..]),
        (&b"trolololol"[..], &b"\xff\xfe"[..]),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Source(SourceError::ValueNotUtf8 { .. })
    ));
}

#[test]
fn test_colon_key_is_format_error() {
    let err = SourceDict::from_pairs([("foo:::foo", "barbarbar"), ("trolololol", "catte")])
        .unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Source(SourceError::KeySeparator { .. })
    ));
}

#[test]
fn test_colon_value_is_format_error() {
    let err = SourceDict::from_pairs([("foofoofoo", "bar:::bar"), ("trolololol", "catte")])
        .unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Source(SourceError::ValueSeparator { .. })
    ));
}

#[test]
fn test_type_errors_win_over_format_errors() {
    // A dictionary with both a reserved separator and a conversion failure
    // reports the conversion failure.
    let err = SourceDict::from_pairs([
        (&b"foo:::foo"[..], &b"barbarbar"[..]),
        (&b"trolololol"[..], &b"\xff\xfe"[..]),
    ])
    .unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Source(SourceError::ValueNotUtf8 { .. })
    ));
}

#[test]
fn test_no_partial_submission_on_invalid_dict() {
    // Validation failures happen before anything reaches the spool.
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    assert!(SourceDict::from_pairs([("foo:::foo", "barbarbar")]).is_err());

    let frame = fs::read(handle.spool_path_contents()).unwrap();
    assert!(frame.is_empty(), "contents spool must stay untouched");
}

#[cfg(unix)]
#[test]
fn test_update_source_write_failure_carries_permission_code() {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    // Make the contents spool file read-only so the next append fails.
    let contents = handle.spool_path_contents();
    fs::set_permissions(contents, fs::Permissions::from_mode(0o400)).unwrap();

    // Root bypasses file mode bits; nothing to observe in that environment.
    if OpenOptions::new().append(true).open(contents).is_ok() {
        return;
    }

    let err = handle
        .update_source(&AddressSpec::Explicit(GOOD_ADDRESS), &good_dict())
        .unwrap_err();
    match err {
        MarquiseError::Spool(SpoolError::WriteFailed { code, source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::PermissionDenied);
            #[cfg(target_os = "linux")]
            assert_eq!(code, 13, "expected EACCES");
            #[cfg(not(target_os = "linux"))]
            assert_ne!(code, 0);
        }
        other => panic!("Expected WriteFailed error, got: {other:?}"),
    }
}
