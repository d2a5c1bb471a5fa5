//! This library reads and writes the `otpauth://` URIs found in two-factor provisioning QR
//! codes, and computes the one-time passcodes they describe, per
//! [rfc-4226](https://tools.ietf.org/html/rfc4226) and [rfc-6238](https://tools.ietf.org/html/rfc6238).
//!
//! Parsing is deliberately forgiving. Labels are accepted as `Issuer:account`,
//! `account(Issuer)` or as a single token, and the issuer found in the label is
//! reconciled with the `issuer` parameter.
//!
//! # Examples
//!
//! ```rust
//! use otpauth_uri::Descriptor;
//!
//! let descriptor = Descriptor::from_uri(
//!     "otpauth://totp/Github:constantoine%40github.com?secret=KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ",
//! ).unwrap();
//! assert_eq!(descriptor.issuer(), "Github");
//! assert_eq!(descriptor.account_name(), "constantoine@github.com");
//!
//! let token = descriptor.generate_current().unwrap();
//! println!("{}", token);
//! ```
//!
//! ```rust
//! use otpauth_uri::{Algorithm, DescriptorBuilder};
//!
//! let mut builder = DescriptorBuilder::default();
//! builder.secret("KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ".to_string());
//! builder.issuer("Github".to_string());
//! builder.account_name("constantoine@github.com".to_string());
//! builder.algorithm(Algorithm::SHA256);
//! let descriptor = builder.build().unwrap();
//!
//! assert_eq!(
//!     descriptor.to_uri(),
//!     "otpauth://totp/Github:constantoine%40github.com?secret=KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ&issuer=Github&algorithm=SHA256&digits=6&period=30",
//! );
//! ```

mod builder;
mod error;
mod qr;
mod secret;
mod uri;

pub use builder::{Assume, DescriptorBuilder, UNKNOWN_USERNAME};
pub use error::DescriptorError;
pub use qr::QrDecoder;
pub use secret::{Secret, SecretParseError};

use constant_time_eq::constant_time_eq;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

use core::fmt;
use std::str::FromStr;

use hmac::Mac;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

type HmacSha1 = hmac::Hmac<sha1::Sha1>;
type HmacSha256 = hmac::Hmac<sha2::Sha256>;
type HmacSha512 = hmac::Hmac<sha2::Sha512>;

/// Algorithm enum holds the three standards algorithms for TOTP as per the [reference implementation](https://tools.ietf.org/html/rfc6238#appendix-A)
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Algorithm {
    #[default]
    SHA1,
    SHA256,
    SHA512,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::SHA1 => f.write_str("SHA1"),
            Algorithm::SHA256 => f.write_str("SHA256"),
            Algorithm::SHA512 => f.write_str("SHA512"),
        }
    }
}

impl FromStr for Algorithm {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SHA1" => Ok(Algorithm::SHA1),
            "SHA256" => Ok(Algorithm::SHA256),
            "SHA512" => Ok(Algorithm::SHA512),
            _ => Err(DescriptorError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl Algorithm {
    fn hash<D>(mut digest: D, data: &[u8]) -> Vec<u8>
    where
        D: Mac,
    {
        digest.update(data);
        digest.finalize().into_bytes().to_vec()
    }

    fn sign(&self, key: &[u8], data: &[u8]) -> Vec<u8> {
        // HMAC takes keys of any length, so new_from_slice never fails
        match self {
            Algorithm::SHA1 => match HmacSha1::new_from_slice(key) {
                Ok(mac) => Algorithm::hash(mac, data),
                Err(_) => unreachable!("HMAC accepts any key length"),
            },
            Algorithm::SHA256 => match HmacSha256::new_from_slice(key) {
                Ok(mac) => Algorithm::hash(mac, data),
                Err(_) => unreachable!("HMAC accepts any key length"),
            },
            Algorithm::SHA512 => match HmacSha512::new_from_slice(key) {
                Ok(mac) => Algorithm::hash(mac, data),
                Err(_) => unreachable!("HMAC accepts any key length"),
            },
        }
    }
}

fn system_time() -> Result<u64, SystemTimeError> {
    let t = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
    Ok(t)
}

/// Dynamic truncation from [rfc-4226](https://tools.ietf.org/html/rfc4226#section-5.3),
/// zero padded on the left to `digits`
fn truncate(mac: &[u8], digits: usize) -> String {
    let offset = match mac.last() {
        Some(last) => (last & 15) as usize,
        None => 0,
    };
    let mut code = [0u8; 4];
    code.copy_from_slice(&mac[offset..offset + 4]);
    let code = u32::from_be_bytes(code) & 0x7fff_ffff;
    format!("{1:00$}", digits, code % 10_u32.pow(digits as u32))
}

/// One otpauth provisioning record, immutable once built. Its [secret](Descriptor::secret) is sensitive data, treat it accordingly
///
/// Build it with a [DescriptorBuilder], or parse it with [Descriptor::from_uri]. To change
/// a value, go through [Descriptor::to_builder].
///
/// With `serde_support`, deserialization goes through [DescriptorBuilder] and fails
/// on the same values [build](DescriptorBuilder::build) would reject.
#[derive(Debug, Clone)]
#[cfg_attr(
    feature = "serde_support",
    derive(Serialize, Deserialize),
    serde(try_from = "DescriptorBuilder")
)]
#[cfg_attr(feature = "zeroize", derive(zeroize::Zeroize, zeroize::ZeroizeOnDrop))]
pub struct Descriptor {
    /// The "Github" part of "Github:constantoine@github.com"
    label_issuer: String,
    /// The "constantoine@github.com" part of "Github:constantoine@github.com"
    account_name: String,
    /// Signing key, kept as the text found in the URI
    secret: String,
    /// The `issuer=` query parameter
    param_issuer: String,
    /// SHA-1 is the most widespread algorithm used. Not all clients support other algorithms then SHA-1
    #[cfg_attr(feature = "zeroize", zeroize(skip))]
    algorithm: Algorithm,
    /// The number of digits composing the auth code. Per [rfc-4226](https://tools.ietf.org/html/rfc4226#section-5.3), this can oscilate between 6 and 8 digits
    digits: usize,
    /// Duration in seconds of a step, 15, 30 or 60. The recommended value per [rfc-6238](https://tools.ietf.org/html/rfc6238#section-5.2) is 30 seconds
    period: u64,
    db_id: Option<u32>,
    login_url: String,
    login_username: String,
    login_password: String,
    notes: String,
}

impl PartialEq for Descriptor {
    /// Will not check the login details and notes,
    /// as they aren't part of the URI
    fn eq(&self, other: &Self) -> bool {
        if self.algorithm != other.algorithm {
            return false;
        }
        if self.digits != other.digits {
            return false;
        }
        if self.period != other.period {
            return false;
        }
        if self.label_issuer != other.label_issuer
            || self.param_issuer != other.param_issuer
            || self.account_name != other.account_name
        {
            return false;
        }
        self.same_secret(other)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl FromStr for Descriptor {
    type Err = DescriptorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Descriptor::from_uri(s)
    }
}

impl Descriptor {
    /// Parse an otpauth URI, assuming a bare label token is the account name
    ///
    /// # Errors
    ///
    /// See [DescriptorError]. A URI without secret fails with
    /// [MissingSecret](DescriptorError::MissingSecret).
    pub fn from_uri<S: AsRef<str>>(uri: S) -> Result<Descriptor, DescriptorError> {
        Descriptor::from_uri_assuming(uri, Assume::Username)
    }

    /// Parse an otpauth URI, with the given policy for bare label tokens
    pub fn from_uri_assuming<S: AsRef<str>>(
        uri: S,
        assume: Assume,
    ) -> Result<Descriptor, DescriptorError> {
        let mut builder = DescriptorBuilder::default();
        builder.assume(assume);
        builder.parse_uri(uri.as_ref())?;
        builder.build()
    }

    /// A builder holding this descriptor's values, to derive a modified copy
    pub fn to_builder(&self) -> DescriptorBuilder {
        DescriptorBuilder::from(self)
    }

    pub fn label_issuer(&self) -> &str {
        &self.label_issuer
    }

    pub fn param_issuer(&self) -> &str {
        &self.param_issuer
    }

    /// The label issuer, or the parameter issuer when the label has none
    pub fn issuer(&self) -> &str {
        if self.label_issuer.is_empty() {
            &self.param_issuer
        } else {
            &self.label_issuer
        }
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn digits(&self) -> usize {
        self.digits
    }

    pub fn period(&self) -> u64 {
        self.period
    }

    pub fn db_id(&self) -> Option<u32> {
        self.db_id
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    pub fn login_username(&self) -> &str {
        &self.login_username
    }

    pub fn login_password(&self) -> &str {
        &self.login_password
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Whether both descriptors sign with the same secret, whatever their labels
    pub fn same_secret(&self, other: &Descriptor) -> bool {
        constant_time_eq(self.secret.as_bytes(), other.secret.as_bytes())
    }

    /// Will sign the given counter
    pub fn sign(&self, counter: u64) -> Vec<u8> {
        self.algorithm
            .sign(self.secret.as_bytes(), counter.to_be_bytes().as_ref())
    }

    /// Will generate a HOTP token for the given counter
    pub fn generate_counter(&self, counter: u64) -> String {
        truncate(&self.sign(counter), self.digits)
    }

    /// Will generate a token given the provided timestamp in seconds
    pub fn generate(&self, time: u64) -> String {
        self.generate_counter(time / self.period)
    }

    /// Generate a token from the current system time
    pub fn generate_current(&self) -> Result<String, SystemTimeError> {
        let t = system_time()?;
        Ok(self.generate(t))
    }

    /// Same as [generate](Self::generate), with a dash inserted at the mid-point, `123-456`
    pub fn generate_split(&self, time: u64) -> String {
        let token = self.generate(time);
        let (left, right) = token.split_at(self.digits / 2);
        format!("{}-{}", left, right)
    }

    /// Same as [generate_current](Self::generate_current), with a dash inserted at the mid-point
    pub fn generate_split_current(&self) -> Result<String, SystemTimeError> {
        let t = system_time()?;
        Ok(self.generate_split(t))
    }

    /// Will generate a token given the provided timestamp in seconds, after
    /// decoding the secret as base32, which is what authenticator apps do
    pub fn generate_decoded(&self, time: u64) -> Result<String, SecretParseError> {
        let key = Secret::Encoded(self.secret.clone()).to_bytes()?;
        let mac = self
            .algorithm
            .sign(&key, (time / self.period).to_be_bytes().as_ref());
        Ok(truncate(&mac, self.digits))
    }

    /// Returns the timestamp of the first second for the next step
    /// given the provided timestamp in seconds
    pub fn next_step(&self, time: u64) -> u64 {
        let step = time / self.period;

        (step + 1) * self.period
    }

    /// Returns the timestamp of the first second of the next step
    /// According to system time
    pub fn next_step_current(&self) -> Result<u64, SystemTimeError> {
        let t = system_time()?;
        Ok(self.next_step(t))
    }

    /// Give the ttl (in seconds) of the current token
    pub fn ttl(&self) -> Result<u64, SystemTimeError> {
        let t = system_time()?;
        Ok(self.period - (t % self.period))
    }

    /// Will check if token is the one of the step containing the provided timestamp
    pub fn check(&self, token: &str, time: u64) -> bool {
        constant_time_eq(self.generate(time).as_bytes(), token.as_bytes())
    }

    /// Will check if token is valid by current system time
    pub fn check_current(&self, token: &str) -> Result<bool, SystemTimeError> {
        let t = system_time()?;
        Ok(self.check(token, t))
    }

    /// Percent-encoded otpauth URI, the form to put in a QR code
    pub fn to_uri(&self) -> String {
        uri::to_uri(self)
    }

    /// Same URI as [to_uri](Self::to_uri) with the percent-encoding reversed, for display
    pub fn to_uri_decoded(&self) -> String {
        uri::to_uri_decoded(self)
    }
}
