use crate::{Assume, Descriptor, DescriptorError};

/// Turns an image into the text encoded in its QR code.
///
/// Scanning is left to whichever QR library the application already uses; this
/// crate only ever sees the decoded text.
///
/// ```
/// use otpauth_uri::{Assume, Descriptor};
///
/// let scanner = |_image: &[u8]| Some("otpauth://totp/Acme:bob?secret=JBSWY3DPEHPK3PXP".to_string());
/// let descriptor = Descriptor::from_image(&scanner, b"...png bytes...", Assume::Username).unwrap();
/// assert_eq!(descriptor.issuer(), "Acme");
/// ```
pub trait QrDecoder {
    /// Returns `None` when no code could be found in the image
    fn decode(&self, image: &[u8]) -> Option<String>;
}

impl<F> QrDecoder for F
where
    F: Fn(&[u8]) -> Option<String>,
{
    fn decode(&self, image: &[u8]) -> Option<String> {
        self(image)
    }
}

impl Descriptor {
    /// Decode the QR code in `image` with `decoder`, then parse the otpauth URI it holds
    ///
    /// # Errors
    ///
    /// [NoCodeFound](DescriptorError::NoCodeFound) when the decoder comes back empty,
    /// otherwise the same errors as [Descriptor::from_uri_assuming].
    pub fn from_image<D>(
        decoder: &D,
        image: &[u8],
        assume: Assume,
    ) -> Result<Descriptor, DescriptorError>
    where
        D: QrDecoder + ?Sized,
    {
        match decoder.decode(image) {
            Some(text) if !text.trim().is_empty() => Descriptor::from_uri_assuming(text, assume),
            _ => Err(DescriptorError::NoCodeFound),
        }
    }
}
