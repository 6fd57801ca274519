//! Symmetric signing for signals.
//!
//! The signable form is the canonical JSON of the wire form with
//! `safety.digital_signature` removed and `safety.signature_alg` kept, so
//! the algorithm name is covered by the MAC.

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;

use crate::canonical::canonical_json_bytes;
use crate::error::SignatureError;
use crate::signal::{keys, Signal};

type HmacSha256 = Hmac<Sha256>;

/// Registered signature algorithm names.
pub const SUPPORTED_SIGNATURE_ALGS: [&str; 1] = ["hmac-sha256"];

/// A registered signature algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlg {
    HmacSha256,
}

impl SignatureAlg {
    pub fn as_str(self) -> &'static str {
        match self {
            SignatureAlg::HmacSha256 => "hmac-sha256",
        }
    }

    /// Look up a registered algorithm by name.
    pub fn parse(name: &str) -> Result<Self, SignatureError> {
        match name {
            "hmac-sha256" => Ok(SignatureAlg::HmacSha256),
            other => Err(SignatureError::UnsupportedAlgorithm {
                alg: other.to_string(),
                supported: SUPPORTED_SIGNATURE_ALGS.join(", "),
            }),
        }
    }

    /// Compute the raw MAC over `message`.
    pub fn mac(self, key: &[u8], message: &[u8]) -> Result<Vec<u8>, SignatureError> {
        match self {
            SignatureAlg::HmacSha256 => {
                let mut mac =
                    HmacSha256::new_from_slice(key).map_err(|_| SignatureError::InvalidKey)?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

impl fmt::Display for SignatureAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Signal {
    /// The wire form without `safety.digital_signature`.
    pub fn signable_value(&self) -> Value {
        let mut value = self.to_value();
        if let Some(safety) = value
            .get_mut(keys::SAFETY)
            .and_then(Value::as_object_mut)
        {
            safety.remove(keys::DIGITAL_SIGNATURE);
        }
        value
    }

    /// Canonical bytes covered by the signature.
    pub fn signable_bytes(&self) -> Vec<u8> {
        canonical_json_bytes(&self.signable_value())
    }

    /// Sign the signal in place and return the encoded signature.
    ///
    /// Sets `safety.signature_alg` first so the algorithm is part of the
    /// signed bytes, then stores the base64 MAC in
    /// `safety.digital_signature`. On error the signal is unchanged.
    pub fn sign(&mut self, key: &[u8], alg: &str) -> Result<String, SignatureError> {
        let alg = SignatureAlg::parse(alg)?;

        let previous = self.safety.signature_alg.replace(alg.as_str().to_string());
        let mac = match alg.mac(key, &self.signable_bytes()) {
            Ok(mac) => mac,
            Err(e) => {
                self.safety.signature_alg = previous;
                return Err(e);
            }
        };

        let signature = STANDARD.encode(mac);
        self.safety.digital_signature = Some(signature.clone());
        tracing::debug!(tsr_id = %self.id, alg = %alg, "signal signed");
        Ok(signature)
    }

    /// Check the attached signature against `key`.
    ///
    /// Never fails: a missing signature or algorithm, an unregistered
    /// algorithm, or a mismatch all yield `false`.
    pub fn verify(&self, key: &[u8]) -> bool {
        self.check_signature(key).is_ok()
    }

    /// Like [`Signal::verify`], but says why verification failed.
    pub fn check_signature(&self, key: &[u8]) -> Result<(), SignatureError> {
        let signature = self
            .safety
            .digital_signature
            .as_deref()
            .ok_or(SignatureError::MissingSignature)?;
        let alg_name = self
            .safety
            .signature_alg
            .as_deref()
            .ok_or(SignatureError::MissingSignature)?;
        let alg = SignatureAlg::parse(alg_name)?;

        let expected = STANDARD.encode(alg.mac(key, &self.signable_bytes())?);
        if bool::from(expected.as_bytes().ct_eq(signature.as_bytes())) {
            Ok(())
        } else {
            Err(SignatureError::Mismatch)
        }
    }
}
