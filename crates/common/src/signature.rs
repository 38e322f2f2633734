//! ADR-036 arbitrary-message signature verification
//!
//! Verifies a secp256k1 signature over a bech32 account address, as produced
//! by Cosmos wallets signing free-form data (`sign/MsgSignData`). The
//! verification is stateless and fails closed: malformed input of any kind
//! yields `ok: false` with a reason, never a panic or an error escaping the
//! boundary.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use k256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
use ripemd::Ripemd160;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

const SIGNATURE_LEN: usize = 64;
const COMPRESSED_PUBKEY_LEN: usize = 33;

/// Outcome of a signature check
#[derive(Debug, Clone, Serialize)]
pub struct SignatureCheck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SignatureCheck {
    fn pass() -> Self {
        Self {
            ok: true,
            error: None,
        }
    }

    fn fail(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(reason.into()),
        }
    }
}

/// Build the canonical ADR-036 sign doc for an arbitrary message
///
/// Keys are emitted in sorted order (serde_json's default map ordering),
/// matching the canonical JSON that wallets sign: empty chain id, zeroed
/// account number/sequence, empty fee, and a single `sign/MsgSignData` msg.
pub fn adr036_sign_doc(signer: &str, message: &str) -> String {
    let doc = serde_json::json!({
        "account_number": "0",
        "chain_id": "",
        "fee": { "amount": [], "gas": "0" },
        "memo": "",
        "msgs": [{
            "type": "sign/MsgSignData",
            "value": {
                "data": BASE64.encode(message.as_bytes()),
                "signer": signer,
            },
        }],
        "sequence": "0",
    });
    doc.to_string()
}

/// Derive the bech32 account address for a compressed secp256k1 public key
///
/// Standard Cosmos address derivation: `bech32(prefix, ripemd160(sha256(pk)))`.
pub fn derive_address(prefix: &str, pubkey_sec1: &[u8]) -> Result<String> {
    let sha = Sha256::digest(pubkey_sec1);
    let hash = Ripemd160::digest(sha);

    let hrp = bech32::Hrp::parse(prefix)
        .map_err(|e| Error::AddressFormat(format!("invalid bech32 prefix: {}", e)))?;

    bech32::encode::<bech32::Bech32>(hrp, &hash)
        .map_err(|e| Error::AddressFormat(format!("bech32 encoding failed: {}", e)))
}

/// Verify an ADR-036 signature over `message` for the given account address
///
/// # Arguments
/// * `address` - bech32 account address the signature claims to come from
/// * `signature_b64` - base64-encoded 64-byte (r || s) signature
/// * `pubkey_b64` - base64-encoded 33-byte compressed secp256k1 public key
/// * `message` - the message that was signed
pub fn verify_arbitrary(
    address: &str,
    signature_b64: &str,
    pubkey_b64: &str,
    message: &str,
) -> SignatureCheck {
    let sig_bytes = match BASE64.decode(signature_b64) {
        Ok(b) => b,
        Err(e) => return SignatureCheck::fail(format!("invalid base64 signature: {}", e)),
    };
    if sig_bytes.len() != SIGNATURE_LEN {
        return SignatureCheck::fail(format!(
            "signature length mismatch: expected {} bytes, got {}",
            SIGNATURE_LEN,
            sig_bytes.len()
        ));
    }

    let pubkey_bytes = match BASE64.decode(pubkey_b64) {
        Ok(b) => b,
        Err(e) => return SignatureCheck::fail(format!("invalid base64 public key: {}", e)),
    };
    if pubkey_bytes.len() != COMPRESSED_PUBKEY_LEN {
        return SignatureCheck::fail(format!(
            "public key length mismatch: expected {} bytes, got {}",
            COMPRESSED_PUBKEY_LEN,
            pubkey_bytes.len()
        ));
    }

    let verifying_key = match VerifyingKey::from_sec1_bytes(&pubkey_bytes) {
        Ok(k) => k,
        Err(e) => return SignatureCheck::fail(format!("invalid public key: {}", e)),
    };

    // The public key must hash to the claimed address
    let (hrp, decoded) = match bech32::decode(address) {
        Ok(parts) => parts,
        Err(e) => return SignatureCheck::fail(format!("invalid bech32 address: {}", e)),
    };
    let expected = match derive_address(&hrp.to_string(), &pubkey_bytes) {
        Ok(a) => a,
        Err(e) => return SignatureCheck::fail(e.to_string()),
    };
    let sha = Sha256::digest(&pubkey_bytes);
    if decoded.as_slice() != Ripemd160::digest(sha).as_slice() {
        return SignatureCheck::fail(format!(
            "public key does not match address: derived {}",
            expected
        ));
    }

    let signature = match Signature::from_slice(&sig_bytes) {
        Ok(s) => s,
        Err(e) => return SignatureCheck::fail(format!("malformed signature: {}", e)),
    };

    let sign_doc = adr036_sign_doc(address, message);
    match verifying_key.verify(sign_doc.as_bytes(), &signature) {
        Ok(()) => SignatureCheck::pass(),
        Err(_) => SignatureCheck::fail("signature verification failed"),
    }
}
