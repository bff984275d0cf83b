//! Integration tests for the datapoint dispatch path.
//!
//! These tests send simple and extended datapoints through a real handle
//! and read the spool frames back to verify what reached the backend.

use std::fs;

use marquise::error::{MarquiseError, RequestError, SpoolError};
use marquise::{AddressSpec, Marquise, hash_identifier};
use tempfile::tempdir;

const GOOD_NAMESPACE: &str = "mytestnamespace";
const GOOD_ADDRESS: u64 = 5753895591108871589;
const SOURCE: &str = "hostname:misaka.anchor.net.au,metric:BytesTx,service:network,";

/// Decodes a little-endian u64 word at `offset` in a spool frame.
fn word(frame: &[u8], offset: usize) -> u64 {
    u64::from_le_bytes(frame[offset..offset + 8].try_into().unwrap())
}

#[test]
fn test_send_simple_with_explicit_timestamp() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    let accepted = handle
        .send_simple(&AddressSpec::Explicit(GOOD_ADDRESS), Some(1234567890), 42)
        .unwrap();
    assert!(accepted);

    let frame = fs::read(handle.spool_path_points()).unwrap();
    assert_eq!(frame.len(), 24);
    assert_eq!(word(&frame, 0), GOOD_ADDRESS);
    assert_eq!(word(&frame, 8), 1234567890);
    assert_eq!(word(&frame, 16), 42);
}

#[test]
fn test_send_simple_defaults_timestamp_to_now() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    let before = marquise::current_timestamp();
    assert!(handle.send_simple_address(GOOD_ADDRESS, None, 42).unwrap());
    let after = marquise::current_timestamp();

    let frame = fs::read(handle.spool_path_points()).unwrap();
    let timestamp = word(&frame, 8);
    assert!(timestamp >= before && timestamp <= after);
}

#[test]
fn test_source_and_address_route_identically() {
    let temp_dir = tempdir().unwrap();
    let by_source = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();
    let by_address = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    assert!(by_source.send_simple_source(SOURCE, Some(100), 7).unwrap());
    assert!(
        by_address
            .send_simple_address(hash_identifier(SOURCE), Some(100), 7)
            .unwrap()
    );

    let frame_a = fs::read(by_source.spool_path_points()).unwrap();
    let frame_b = fs::read(by_address.spool_path_points()).unwrap();
    assert_eq!(frame_a, frame_b, "both routes must spool the same frame");
    assert_eq!(word(&frame_a, 0), hash_identifier(SOURCE));
}

#[test]
fn test_send_extended_frames_value_bytes() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    assert!(
        handle
            .send_extended(&AddressSpec::Explicit(GOOD_ADDRESS), Some(100), "lorem ipsum")
            .unwrap()
    );

    let frame = fs::read(handle.spool_path_points()).unwrap();
    assert_eq!(word(&frame, 0), GOOD_ADDRESS);
    assert_eq!(word(&frame, 8), 100);
    assert_eq!(word(&frame, 16), 11);
    assert_eq!(&frame[24..], b"lorem ipsum");
}

#[test]
fn test_extended_length_counts_bytes_not_characters() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    // Three characters, nine bytes.
    let value = "日本語";
    assert_eq!(value.chars().count(), 3);
    assert_eq!(value.len(), 9);

    assert!(
        handle
            .send_extended_address(GOOD_ADDRESS, Some(100), value)
            .unwrap()
    );

    let frame = fs::read(handle.spool_path_points()).unwrap();
    assert_eq!(word(&frame, 16), 9);
    assert_eq!(&frame[24..], value.as_bytes());
}

#[test]
fn test_extended_source_routes_through_hash() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    assert!(
        handle
            .send_extended_source(SOURCE, Some(100), "dolor")
            .unwrap()
    );

    let frame = fs::read(handle.spool_path_points()).unwrap();
    assert_eq!(word(&frame, 0), hash_identifier(SOURCE));
}

#[test]
fn test_neither_address_nor_source_is_missing_argument() {
    let err = AddressSpec::from_parts(None, None).unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Request(RequestError::MissingAddress)
    ));
}

#[test]
fn test_both_address_and_source_is_conflicting_argument() {
    let err = AddressSpec::from_parts(Some(GOOD_ADDRESS), Some(SOURCE)).unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Request(RequestError::ConflictingAddress)
    ));
}

#[test]
fn test_sends_interleave_in_issue_order() {
    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    assert!(handle.send_simple_address(5, Some(100), 200000).unwrap());
    assert!(handle.send_simple_address(5, Some(101), 200001).unwrap());
    assert!(handle.send_simple_address(5, Some(102), 200002).unwrap());
    assert!(handle.send_simple_address(5, Some(103), 200003).unwrap());

    let data = fs::read(handle.spool_path_points()).unwrap();
    assert_eq!(data.len(), 4 * 24);
    for i in 0..4 {
        assert_eq!(word(&data[i * 24..], 8), 100 + i as u64);
        assert_eq!(word(&data[i * 24..], 16), 200000 + i as u64);
    }
}

#[cfg(unix)]
#[test]
fn test_send_simple_write_failure_carries_permission_code() {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    // Make the points spool file read-only so the next append fails.
    let points = handle.spool_path_points();
    fs::set_permissions(points, fs::Permissions::from_mode(0o400)).unwrap();

    // Root bypasses file mode bits; nothing to observe in that environment.
    if OpenOptions::new().append(true).open(points).is_ok() {
        return;
    }

    let err = handle
        .send_simple(&AddressSpec::Explicit(GOOD_ADDRESS), None, 42)
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

#[cfg(unix)]
#[test]
fn test_send_extended_write_failure_carries_permission_code() {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = tempdir().unwrap();
    let handle = Marquise::with_spool_dir(GOOD_NAMESPACE, temp_dir.path()).unwrap();

    let points = handle.spool_path_points();
    fs::set_permissions(points, fs::Permissions::from_mode(0o400)).unwrap();
    if OpenOptions::new().append(true).open(points).is_ok() {
        return;
    }

    let err = handle
        .send_extended_address(GOOD_ADDRESS, None, "I love me some geology")
        .unwrap_err();
    assert!(matches!(
        err,
        MarquiseError::Spool(SpoolError::WriteFailed { .. })
    ));
}
