use crate::uri::{self, ParsedUri};
use crate::{Algorithm, Descriptor, DescriptorError};

use rand::Rng;

#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

/// Account name used when neither the label nor the builder provided one
pub const UNKNOWN_USERNAME: &str = "UnknownUsername";

const UNKNOWN_COMPANY: &str = "Unknown Company";

pub(crate) fn assert_digits(digits: usize) -> Result<(), DescriptorError> {
    if (6..=8).contains(&digits) {
        Ok(())
    } else {
        Err(DescriptorError::InvalidDigits(digits))
    }
}

pub(crate) fn assert_period(period: u64) -> Result<(), DescriptorError> {
    match period {
        15 | 30 | 60 => Ok(()),
        _ => Err(DescriptorError::InvalidPeriod(period)),
    }
}

/// Where a label made of a single bare token should go, since nothing in
/// `otpauth://totp/github?secret=...` tells whether `github` is a service or a user
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Assume {
    #[default]
    Username,
    Issuer,
}

/// Mutable set of options consumed once into an immutable [Descriptor](crate::Descriptor)
///
/// # Example
/// ```
/// use otpauth_uri::{Algorithm, DescriptorBuilder};
///
/// let mut builder = DescriptorBuilder::default();
/// builder.secret("GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ".to_string());
/// builder.issuer("Acme".to_string());
/// builder.account_name("bob".to_string());
/// builder.algorithm(Algorithm::SHA256);
/// builder.digits(8).unwrap();
/// builder.period(60).unwrap();
///
/// let descriptor = builder.build().unwrap();
/// assert_eq!(descriptor.issuer(), "Acme");
/// ```
///
/// With `serde_support`, this is also the shape a [Descriptor](crate::Descriptor)
/// is deserialized through, so stored descriptors get the same checks.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde_support", derive(Deserialize), serde(default))]
pub struct DescriptorBuilder {
    label_issuer: String,
    account_name: String,
    secret: String,
    param_issuer: String,
    algorithm: Algorithm,
    digits: Option<usize>,
    period: Option<u64>,
    #[cfg_attr(feature = "serde_support", serde(skip))]
    assume: Assume,
    db_id: Option<u32>,
    login_url: String,
    login_username: String,
    login_password: String,
    notes: String,
    #[cfg_attr(feature = "serde_support", serde(skip))]
    from_uri: bool,
}

impl DescriptorBuilder {
    /// Set the policy applied to bare single-token labels by [parse_uri](Self::parse_uri)
    pub fn assume(&mut self, value: Assume) {
        self.assume = value;
    }

    /// Set the issuer of both the label and the `issuer` parameter
    pub fn issuer(&mut self, value: String) {
        self.label_issuer = value.clone();
        self.param_issuer = value;
    }

    /// Set the issuer of the label only
    pub fn label_issuer(&mut self, value: String) {
        self.label_issuer = value;
    }

    /// Set the `issuer` parameter only
    pub fn param_issuer(&mut self, value: String) {
        self.param_issuer = value;
    }

    pub fn account_name(&mut self, value: String) {
        self.account_name = value;
    }

    pub fn secret(&mut self, value: String) {
        self.secret = value;
    }

    pub fn algorithm(&mut self, value: Algorithm) {
        self.algorithm = value;
    }

    /// Set the `digits`, rejecting anything but 6, 7 or 8 without touching the current value
    pub fn digits(&mut self, value: usize) -> Result<(), DescriptorError> {
        assert_digits(value).map_err(|e| {
            log::warn!("rejected digits value {}", value);
            e
        })?;
        self.digits = Some(value);
        Ok(())
    }

    /// Set the `period`, rejecting anything but 15, 30 or 60 without touching the current value
    pub fn period(&mut self, value: u64) -> Result<(), DescriptorError> {
        assert_period(value).map_err(|e| {
            log::warn!("rejected period value {}", value);
            e
        })?;
        self.period = Some(value);
        Ok(())
    }

    /// Optional id for callers keeping descriptors in a table
    pub fn db_id(&mut self, value: u32) {
        self.db_id = Some(value);
    }

    pub fn login_url(&mut self, value: String) {
        self.login_url = value;
    }

    pub fn login_username(&mut self, value: String) {
        self.login_username = value;
    }

    pub fn login_password(&mut self, value: String) {
        self.login_password = value;
    }

    pub fn notes(&mut self, value: String) {
        self.notes = value;
    }

    /// Parse an otpauth URI, as scanned from a QR code, into this builder.
    ///
    /// Only the fields found in the URI are overwritten. Issuers are reconciled
    /// before being stored, and if the URI carried none at all, [build](Self::build)
    /// generates a placeholder shared by both issuer fields.
    ///
    /// # Errors
    ///
    /// Nothing is modified when this fails.
    pub fn parse_uri(&mut self, raw: &str) -> Result<(), DescriptorError> {
        let parsed = uri::parse(raw, self.assume)?;
        self.apply(parsed);
        Ok(())
    }

    fn apply(&mut self, parsed: ParsedUri) {
        if let Some(issuer) = parsed.label_issuer {
            self.label_issuer = issuer;
        }
        if let Some(account) = parsed.account_name {
            self.account_name = account;
        }
        if let Some(secret) = parsed.secret {
            self.secret = secret;
        }
        if let Some(issuer) = parsed.param_issuer {
            self.param_issuer = issuer;
        }
        if let Some(algorithm) = parsed.algorithm {
            self.algorithm = algorithm;
        }
        if parsed.digits.is_some() {
            self.digits = parsed.digits;
        }
        if parsed.period.is_some() {
            self.period = parsed.period;
        }
        self.from_uri = true;
    }

    /// Consume the builder into a [Descriptor](crate::Descriptor)
    ///
    /// # Errors
    ///
    /// will return [MissingSecret](crate::DescriptorError::MissingSecret) when no secret was set
    pub fn build(self) -> Result<Descriptor, DescriptorError> {
        Descriptor::try_from(self)
    }
}

impl From<&Descriptor> for DescriptorBuilder {
    /// Start a new builder from the values of an existing descriptor
    fn from(descriptor: &Descriptor) -> Self {
        DescriptorBuilder {
            label_issuer: descriptor.label_issuer.clone(),
            account_name: descriptor.account_name.clone(),
            secret: descriptor.secret.clone(),
            param_issuer: descriptor.param_issuer.clone(),
            algorithm: descriptor.algorithm,
            digits: Some(descriptor.digits),
            period: Some(descriptor.period),
            assume: Assume::default(),
            db_id: descriptor.db_id,
            login_url: descriptor.login_url.clone(),
            login_username: descriptor.login_username.clone(),
            login_password: descriptor.login_password.clone(),
            notes: descriptor.notes.clone(),
            from_uri: false,
        }
    }
}

fn placeholder_issuer() -> String {
    let number: u32 = rand::rng().random_range(1000..=9998);
    format!("{} {}", UNKNOWN_COMPANY, number)
}

impl TryFrom<DescriptorBuilder> for Descriptor {
    type Error = DescriptorError;

    /// Try to create a [Descriptor](crate::Descriptor) from a [DescriptorBuilder](crate::DescriptorBuilder)
    fn try_from(builder: DescriptorBuilder) -> Result<Self, Self::Error> {
        if builder.secret.is_empty() {
            return Err(DescriptorError::MissingSecret);
        }

        // Deserialized builders never went through the setters
        let digits = builder.digits.unwrap_or(6);
        assert_digits(digits)?;
        let period = builder.period.unwrap_or(30);
        assert_period(period)?;

        let mut label_issuer = builder.label_issuer;
        let mut param_issuer = builder.param_issuer;
        if builder.from_uri {
            if label_issuer.is_empty() {
                label_issuer = param_issuer.clone();
            } else if param_issuer.is_empty() {
                param_issuer = label_issuer.clone();
            }
            if label_issuer.is_empty() {
                let issuer = placeholder_issuer();
                log::warn!("no issuer found in URI, using \"{}\"", issuer);
                label_issuer = issuer.clone();
                param_issuer = issuer;
            }
        }

        let account_name = if builder.account_name.is_empty() {
            UNKNOWN_USERNAME.to_string()
        } else {
            builder.account_name
        };

        Ok(Descriptor {
            label_issuer,
            account_name,
            secret: builder.secret,
            param_issuer,
            algorithm: builder.algorithm,
            digits,
            period,
            db_id: builder.db_id,
            login_url: builder.login_url,
            login_username: builder.login_username,
            login_password: builder.login_password,
            notes: builder.notes,
        })
    }
}
