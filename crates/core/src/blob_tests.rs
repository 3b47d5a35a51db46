// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn serializes_as_base64_string() {
    let blob = Blob::new(b"pickle".as_slice());
    let json = serde_json::to_string(&blob).unwrap();
    assert_eq!(json, "\"cGlja2xl\"");
}

#[test]
fn roundtrips_arbitrary_bytes() {
    let blob = Blob::new(vec![0u8, 255, 128, 7]);
    let json = serde_json::to_string(&blob).unwrap();
    let back: Blob = serde_json::from_str(&json).unwrap();
    assert_eq!(back, blob);
}

#[test]
fn rejects_invalid_base64() {
    let err = serde_json::from_str::<Blob>("\"not base64!!\"");
    assert!(err.is_err());
}

#[test]
fn debug_shows_size_not_content() {
    let blob = Blob::new(vec![1, 2, 3]);
    assert_eq!(format!("{:?}", blob), "Blob(3 bytes)");
}
