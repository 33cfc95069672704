// Credential verification strategies for directory records.

use std::str::FromStr;
use std::sync::Arc;

use bcrypt::verify;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Compares an operator-supplied password with the secret stored on a
/// shop record.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, supplied: &str, stored: &str) -> AuthResult<bool>;
}

/// Direct equality against a plaintext secret. This is what existing
/// shop directories hold today.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaintextVerifier;

impl CredentialVerifier for PlaintextVerifier {
    fn verify(&self, supplied: &str, stored: &str) -> AuthResult<bool> {
        Ok(supplied == stored)
    }
}

/// Verifies against a bcrypt hash stored in the directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct BcryptVerifier;

impl CredentialVerifier for BcryptVerifier {
    fn verify(&self, supplied: &str, stored: &str) -> AuthResult<bool> {
        verify(supplied, stored).map_err(|e| AuthError::Verifier {
            message: e.to_string(),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
    #[default]
    Plaintext,
    Bcrypt,
}

impl CredentialScheme {
    pub fn verifier(self) -> Arc<dyn CredentialVerifier> {
        match self {
            CredentialScheme::Plaintext => Arc::new(PlaintextVerifier),
            CredentialScheme::Bcrypt => Arc::new(BcryptVerifier),
        }
    }
}

impl FromStr for CredentialScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plaintext" | "plain" => Ok(Self::Plaintext),
            "bcrypt" => Ok(Self::Bcrypt),
            other => Err(format!("unknown credential scheme '{other}'")),
        }
    }
}
