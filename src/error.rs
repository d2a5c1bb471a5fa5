/// Reasons a [Descriptor](crate::Descriptor) could not be parsed or built.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    /// The decoded text does not carry the `otpauth://totp` (or `hotp`) scheme
    #[error("Input is not an otpauth URI")]
    NotAnOtpUri,
    /// Secret is mandatory and was never set, or set to an empty string
    #[error("No secret was provided, yet it is mandatory")]
    MissingSecret,
    #[error("Digits can only be 6, 7 or 8, not {0}")]
    InvalidDigits(usize),
    #[error("Period can only be 15, 30 or 60 seconds, not {0}")]
    InvalidPeriod(u64),
    /// Query part missing, or a parameter without a `=` separator
    #[error("Malformed query: \"{0}\"")]
    MalformedQuery(String),
    #[error("Algorithm can only be SHA1, SHA256 or SHA512, not \"{0}\"")]
    UnsupportedAlgorithm(String),
    /// The image decoder did not find any text in the image
    #[error("No otpauth code could be found in the image")]
    NoCodeFound,
}
