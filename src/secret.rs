//! Representation of key material, either a "raw" \[u8\] or a "base 32" encoded String
//!
//! A [Descriptor](crate::Descriptor) keeps its secret as the text found in the URI and
//! signs with those bytes as-is. Provisioning URIs in the wild almost always carry a
//! base32 secret, which is where this module comes in.
//!
//! # Examples
//!
//! ```
//! use otpauth_uri::Secret;
//!
//! let secret = Secret::Encoded("gezdgnbv gy3tqojq gezdgnbv gy3tqojq".to_string());
//! assert_eq!(secret.to_bytes().unwrap(), b"12345678901234567890".to_vec());
//! ```

use base32::{self, Alphabet};

use constant_time_eq::constant_time_eq;

/// Different ways secret parsing failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SecretParseError {
    /// Invalid base32 input.
    #[error("Could not decode base32 secret.")]
    ParseBase32,
}

/// Shared secret between client and server to generate tokens from.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop))]
pub enum Secret {
    /// Non-encoded "raw" secret.
    Raw(Vec<u8>),
    /// Base32 encoded secret.
    Encoded(String),
}

impl PartialEq for Secret {
    /// Will check that to_bytes() returns the same.
    /// One secret can be Raw, and the other Encoded.
    fn eq(&self, other: &Self) -> bool {
        match (self.to_bytes(), other.to_bytes()) {
            (Ok(left), Ok(right)) => constant_time_eq(&left, &right),
            _ => false,
        }
    }
}

/// Authenticator apps accept lowercase, grouped and padded secrets.
fn decode_base32(encoded: &str) -> Result<Vec<u8>, SecretParseError> {
    let normalized: String = encoded
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    base32::decode(
        Alphabet::Rfc4648 { padding: false },
        normalized.trim_end_matches('='),
    )
    .ok_or(SecretParseError::ParseBase32)
}

impl Secret {
    /// Get the inner String value as a Vec of bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SecretParseError> {
        match self {
            Secret::Raw(s) => Ok(s.to_vec()),
            Secret::Encoded(s) => decode_base32(s),
        }
    }

    /// Try to transform a `Secret::Encoded` into a `Secret::Raw`
    pub fn to_raw(&self) -> Result<Self, SecretParseError> {
        match self {
            Secret::Raw(_) => Ok(self.clone()),
            Secret::Encoded(s) => decode_base32(s).map(Secret::Raw),
        }
    }

    /// Transforms a `Secret::Raw` into a `Secret::Encoded`.
    pub fn to_encoded(&self) -> Self {
        match self {
            Secret::Raw(s) => {
                Secret::Encoded(base32::encode(Alphabet::Rfc4648 { padding: false }, s))
            }
            Secret::Encoded(_) => self.clone(),
        }
    }
}

impl std::fmt::Display for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Secret::Raw(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            Secret::Encoded(s) => write!(f, "{}", s),
        }
    }
}
