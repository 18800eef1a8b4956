use super::*;
use ed25519_dalek::{Signer, SigningKey};

const MESSAGE: &str = "validator-proxy:12:10913";

fn issuer_key() -> SigningKey {
    SigningKey::from_bytes(&[7u8; 32])
}

fn verifier_for(key: &SigningKey) -> CredentialVerifier {
    let signature = key.sign(MESSAGE.as_bytes());
    let bundle = CredentialBundle::new(MESSAGE, &signature.to_bytes()).unwrap();
    CredentialVerifier::new(bundle)
}

fn header_for(key: &SigningKey) -> String {
    BASE64.encode(key.verifying_key().to_bytes())
}

#[test]
fn matching_key_is_accepted() {
    let key = issuer_key();
    let verifier = verifier_for(&key);
    assert!(verifier.is_ready());
    assert_eq!(verifier.verify(key.verifying_key().as_bytes()), Ok(()));
}

#[test]
fn verification_is_idempotent() {
    let key = issuer_key();
    let verifier = verifier_for(&key);
    let header = header_for(&key);
    let first = verifier.verify_header(Some(&header));
    let second = verifier.verify_header(Some(&header));
    assert_eq!(first, Ok(()));
    assert_eq!(first, second);

    let other = header_for(&SigningKey::from_bytes(&[9u8; 32]));
    assert_eq!(
        verifier.verify_header(Some(&other)),
        verifier.verify_header(Some(&other))
    );
}

#[test]
fn other_key_is_a_signature_mismatch() {
    let verifier = verifier_for(&issuer_key());
    let other = SigningKey::from_bytes(&[9u8; 32]);
    assert_eq!(
        verifier.verify(other.verifying_key().as_bytes()),
        Err(AuthError::SignatureMismatch)
    );
}

#[test]
fn wrong_length_token_is_an_invalid_key() {
    let verifier = verifier_for(&issuer_key());
    assert!(matches!(
        verifier.verify(&[1u8; 16]),
        Err(AuthError::InvalidKey(_))
    ));
}

#[test]
fn bearer_prefix_is_accepted() {
    let key = issuer_key();
    let verifier = verifier_for(&key);
    let header = format!("Bearer {}", header_for(&key));
    assert_eq!(verifier.verify_header(Some(&header)), Ok(()));
}

#[test]
fn bearer_scheme_is_case_insensitive() {
    let key = issuer_key();
    let verifier = verifier_for(&key);
    for scheme in ["BEARER", "bearer", "BeArEr"] {
        let header = format!("{}  {}", scheme, header_for(&key));
        assert_eq!(verifier.verify_header(Some(&header)), Ok(()), "{scheme}");
    }
    let other_scheme = format!("Basic {}", header_for(&key));
    assert!(matches!(
        verifier.verify_header(Some(&other_scheme)),
        Err(AuthError::MalformedToken(_))
    ));
}

#[test]
fn missing_and_malformed_headers_are_distinct() {
    let verifier = verifier_for(&issuer_key());
    assert_eq!(verifier.verify_header(None), Err(AuthError::MissingHeader));
    assert_eq!(verifier.verify_header(Some("  ")), Err(AuthError::MissingHeader));
    assert!(matches!(
        verifier.verify_header(Some("not base64 !!")),
        Err(AuthError::MalformedToken(_))
    ));
}

#[test]
fn unavailable_verifier_rejects_even_the_right_key() {
    let key = issuer_key();
    let verifier = CredentialVerifier::unavailable("issuer down");
    assert!(!verifier.is_ready());
    assert_eq!(
        verifier.verify(key.verifying_key().as_bytes()),
        Err(AuthError::Unavailable("issuer down".into()))
    );
}

#[test]
fn short_signature_is_a_malformed_bundle() {
    assert!(matches!(
        CredentialBundle::new(MESSAGE, &[0u8; 10]),
        Err(AuthError::MalformedBundle(_))
    ));
}
