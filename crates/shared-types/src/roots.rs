//! Storage roots.
//!
//! Results are partitioned by caller. A `PackageRoot` identifies a client app
//! (package name plus signing certificate hash); a `TokenRoot` additionally
//! includes the caller-chosen token. Parts are length-prefixed before hashing
//! so distinct triples never share a root.

use sha2::{Digest, Sha256};
use std::fmt;

fn encode_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u32).to_be_bytes());
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Root for results of one (package, signature, token) triple.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenRoot([u8; 32]);

impl TokenRoot {
    pub fn encode(package_name: &str, signature_hash: &[u8], token: &str) -> Self {
        Self(encode_parts(&[
            package_name.as_bytes(),
            signature_hash,
            token.as_bytes(),
        ]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for TokenRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenRoot({})", hex::encode(&self.0[..8]))
    }
}

/// Root for per-app data shared across tokens.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRoot([u8; 32]);

impl PackageRoot {
    pub fn encode(package_name: &str, signature_hash: &[u8]) -> Self {
        Self(encode_parts(&[package_name.as_bytes(), signature_hash]))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for PackageRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackageRoot({})", hex::encode(&self.0[..8]))
    }
}
