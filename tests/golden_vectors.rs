//! Golden test vector validation

use ecodec::codec::{decrypt_with, encrypt_deterministic};
use ecodec::{ErrorKind, KdfParams, varmor};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct GoldenVector {
    comment: String,
    secret: String,
    plaintext: String,
    salt: String,
    iv: String,
    rounds: u32,
    envelope: String,
    armored: String,
}

fn load_golden_vectors() -> Vec<GoldenVector> {
    let json_data = include_str!("../testdata/golden-vectors.json");
    serde_json::from_str(json_data).expect("failed to parse golden vectors")
}

fn unhex(s: &str) -> Vec<u8> {
    hex::decode(s).expect("invalid hex in golden vector")
}

#[test]
fn test_golden_vectors() {
    let vectors = load_golden_vectors();
    assert!(!vectors.is_empty(), "No golden vectors were tested");

    for (i, vector) in vectors.iter().enumerate() {
        let secret = unhex(&vector.secret);
        let plaintext = unhex(&vector.plaintext);
        let expected = unhex(&vector.envelope);
        let salt: [u8; 32] = unhex(&vector.salt)
            .try_into()
            .expect("salt must be 32 bytes");
        let iv: [u8; 16] = unhex(&vector.iv).try_into().expect("iv must be 16 bytes");
        let params = KdfParams::new(vector.rounds).unwrap();

        // Deterministic encryption produces the exact envelope
        let envelope = encrypt_deterministic(&plaintext, &secret, &salt, &iv, &params)
            .unwrap_or_else(|e| panic!("vector {} ({}): encrypt failed: {}", i, vector.comment, e));
        assert_eq!(
            hex::encode(&envelope),
            vector.envelope,
            "vector {} ({}): envelope mismatch",
            i,
            vector.comment
        );
        assert_eq!(
            varmor::wrap(&envelope),
            vector.armored,
            "vector {} ({}): armor mismatch",
            i,
            vector.comment
        );

        // And the stored envelope decrypts back
        let unwrapped = varmor::unwrap(&vector.armored).unwrap();
        assert_eq!(unwrapped, expected);
        let decrypted = decrypt_with(&unwrapped, &secret, &params)
            .unwrap_or_else(|e| panic!("vector {} ({}): decrypt failed: {}", i, vector.comment, e));
        assert_eq!(
            decrypted, plaintext,
            "vector {} ({}): plaintext mismatch",
            i, vector.comment
        );
    }
}

fn reference() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let vectors = load_golden_vectors();
    let v = &vectors[0];
    (unhex(&v.envelope), unhex(&v.secret), unhex(&v.plaintext))
}

#[test]
fn test_reference_envelope_needs_legacy_rounds() {
    let (envelope, secret, plaintext) = reference();

    assert_eq!(
        decrypt_with(&envelope, &secret, &KdfParams::legacy()).unwrap(),
        plaintext
    );

    let err = ecodec::decrypt(&envelope, &secret).expect_err("default rounds must not match");
    assert_eq!(err.kind, Some(ErrorKind::Authentication));
}

#[test]
fn test_reference_wrong_key() {
    let (envelope, mut secret, _) = reference();
    *secret.last_mut().unwrap() = 0x11;

    let err = decrypt_with(&envelope, &secret, &KdfParams::legacy())
        .expect_err("expected authentication failure");
    assert_eq!(err.kind, Some(ErrorKind::Authentication));
    assert_eq!(err.to_string(), "invalid key");
}

#[test]
fn test_reference_truncated() {
    let (envelope, secret, _) = reference();

    let err = decrypt_with(&envelope[..1], &secret, &KdfParams::legacy())
        .expect_err("expected format error");
    assert_eq!(err.kind, Some(ErrorKind::Format));
    assert_eq!(err.to_string(), "encrypted data must be at least 81 bytes");
}

#[test]
fn test_reference_version_corrupted() {
    let (mut envelope, secret, _) = reference();
    envelope[0] = 0x02;

    let err = decrypt_with(&envelope, &secret, &KdfParams::legacy())
        .expect_err("expected format error");
    assert_eq!(err.kind, Some(ErrorKind::Format));
    assert_eq!(err.to_string(), "unhandled version 0x02");
}

#[test]
fn test_reference_roundtrip_with_fresh_randomness() {
    let (_, reference_secret, plaintext) = reference();
    let secret = &reference_secret[..16];

    let e1 = ecodec::encrypt(&plaintext, secret).unwrap();
    let e2 = ecodec::encrypt(&plaintext, secret).unwrap();
    assert_ne!(e1, e2);

    assert_eq!(ecodec::decrypt(&e1, secret).unwrap(), plaintext);
    assert_eq!(ecodec::decrypt(&e2, secret).unwrap(), plaintext);
}
