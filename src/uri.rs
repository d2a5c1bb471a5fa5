//! Reading and writing `otpauth://` URIs.
//!
//! There is no single grammar for these in the wild. Labels show up as
//! `Issuer:account`, `account(Issuer)` or a lone token, and the issuer may be
//! repeated, or contradicted, by the `issuer` query parameter.

use crate::builder::{assert_digits, assert_period, Assume};
use crate::{Algorithm, Descriptor, DescriptorError};

const SCHEME: &str = "otpauth";
const TOTP_HOST: &str = "totp";
const HOTP_HOST: &str = "hotp";

/// Values found in a URI, before defaults are applied.
/// `None` means the URI did not carry the value, or carried it empty.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct ParsedUri {
    pub label_issuer: Option<String>,
    pub account_name: Option<String>,
    pub secret: Option<String>,
    pub param_issuer: Option<String>,
    pub algorithm: Option<Algorithm>,
    pub digits: Option<usize>,
    pub period: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct LabelParts {
    issuer: Option<String>,
    account: Option<String>,
}

/// Label layouts, tried in the order of [LabelForm::ALL]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LabelForm {
    /// `account(Issuer)`
    Parenthesized,
    /// `Issuer:account`
    Colon,
    /// `token`, placed according to [Assume]
    Bare,
}

impl LabelForm {
    const ALL: [LabelForm; 3] = [LabelForm::Parenthesized, LabelForm::Colon, LabelForm::Bare];

    fn matches(self, label: &str, assume: Assume) -> Option<LabelParts> {
        match self {
            LabelForm::Parenthesized => {
                let inner = label.strip_suffix(')')?;
                // Longest account that still leaves an issuer inside the parentheses
                inner
                    .char_indices()
                    .rev()
                    .filter(|(_, c)| *c == '(')
                    .map(|(i, _)| i)
                    .find(|i| *i > 0 && i + 1 < inner.len())
                    .map(|i| LabelParts {
                        issuer: non_empty(&inner[i + 1..]),
                        account: non_empty(&inner[..i]),
                    })
            }
            LabelForm::Colon => label.split_once(':').map(|(issuer, account)| LabelParts {
                issuer: non_empty(issuer),
                account: non_empty(account),
            }),
            LabelForm::Bare => {
                if label.chars().count() <= 2 {
                    return None;
                }
                Some(match assume {
                    Assume::Username => LabelParts {
                        issuer: None,
                        account: non_empty(label),
                    },
                    Assume::Issuer => LabelParts {
                        issuer: non_empty(label),
                        account: None,
                    },
                })
            }
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_label(label: &str, assume: Assume) -> LabelParts {
    LabelForm::ALL
        .iter()
        .find_map(|form| {
            let parts = form.matches(label, assume)?;
            log::debug!("label matched the {:?} form", form);
            Some(parts)
        })
        .unwrap_or_default()
}

/// Percent-decode a run of ASCII text. Bytes that do not form valid UTF-8 are
/// read as Latin-1, so `Caf%E9` and `Caf%C3%A9` both come out as `Café`.
fn decode_ascii_run(run: &str) -> String {
    let bytes = urlencoding::decode_binary(run.as_bytes()).into_owned();
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

/// Characters outside ASCII can't be part of an escape and are kept as they are.
fn decode_lenient(raw: &str) -> String {
    let mut decoded = String::with_capacity(raw.len());
    let mut rest = raw;
    while !rest.is_empty() {
        let end = rest.find(|c: char| !c.is_ascii()).unwrap_or(rest.len());
        decoded.push_str(&decode_ascii_run(&rest[..end]));
        let mut tail = rest[end..].chars();
        if let Some(c) = tail.next() {
            decoded.push(c);
        }
        rest = tail.as_str();
    }
    decoded
}

/// Query keys and values also use `+` for spaces
fn decode_query_component(raw: &str) -> String {
    decode_lenient(&raw.replace('+', " "))
}

fn strip_scheme(decoded: &str) -> Option<&str> {
    let rest = decoded.strip_prefix(SCHEME)?.strip_prefix("://")?;
    let rest = match rest.strip_prefix(TOTP_HOST) {
        Some(rest) => rest,
        None => {
            let rest = rest.strip_prefix(HOTP_HOST)?;
            log::debug!("hotp URI accepted, codes will still be time based");
            rest
        }
    };
    Some(rest.strip_prefix('/').unwrap_or(rest))
}

fn malformed(text: &str) -> DescriptorError {
    DescriptorError::MalformedQuery(text.to_string())
}

fn parse_query(query: &str, parsed: &mut ParsedUri) -> Result<(), DescriptorError> {
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| malformed(pair))?;
        let key = decode_query_component(key);
        let value = decode_query_component(value);
        let value = value.as_str();
        match key.to_lowercase().as_str() {
            "secret" => parsed.secret = non_empty(value),
            "issuer" => parsed.param_issuer = non_empty(value),
            "algorithm" => parsed.algorithm = Some(value.to_uppercase().parse()?),
            "digits" => {
                let digits = value.parse::<usize>().map_err(|_| malformed(pair))?;
                assert_digits(digits)?;
                parsed.digits = Some(digits);
            }
            "period" => {
                let period = value.parse::<u64>().map_err(|_| malformed(pair))?;
                assert_period(period)?;
                parsed.period = Some(period);
            }
            _ => log::debug!("ignoring unknown parameter \"{}\"", key),
        }
    }
    Ok(())
}

/// The `issuer` parameter is authoritative, the label issuer only fills in
/// when the parameter is missing.
fn reconcile_issuers(parsed: &mut ParsedUri) {
    match (&parsed.label_issuer, &parsed.param_issuer) {
        (label, Some(param)) => {
            if label.as_ref().is_some_and(|label| label != param) {
                log::debug!("label issuer replaced by issuer parameter \"{}\"", param);
            }
            parsed.label_issuer = Some(param.clone());
        }
        (Some(label), None) => parsed.param_issuer = Some(label.clone()),
        (None, None) => {}
    }
}

/// Parse a raw otpauth URI into the values it carries.
///
/// The URI is split into label and query pairs before anything is decoded, so
/// escaped `?`, `&` and `=` stay part of the names. Only a URI escaped as a
/// whole, `otpauth%3A%2F%2Ftotp...`, is decoded up front.
pub(crate) fn parse(raw: &str, assume: Assume) -> Result<ParsedUri, DescriptorError> {
    let raw = raw.trim();
    let unescaped;
    let rest = match strip_scheme(raw) {
        Some(rest) => rest,
        None => {
            unescaped = decode_lenient(raw);
            strip_scheme(unescaped.trim()).ok_or(DescriptorError::NotAnOtpUri)?
        }
    };
    let (label, query) = rest.split_once('?').ok_or_else(|| malformed(rest))?;
    if query.is_empty() {
        return Err(malformed(rest));
    }

    let parts = parse_label(&decode_lenient(label), assume);
    let mut parsed = ParsedUri {
        label_issuer: parts.issuer,
        account_name: parts.account,
        ..Default::default()
    };
    parse_query(query, &mut parsed)?;
    reconcile_issuers(&mut parsed);
    Ok(parsed)
}

fn remove_first_whitespace_run(secret: &str) -> String {
    match secret.find(char::is_whitespace) {
        Some(start) => {
            let end = secret[start..]
                .find(|c: char| !c.is_whitespace())
                .map_or(secret.len(), |len| start + len);
            format!("{}{}", &secret[..start], &secret[end..])
        }
        None => secret.to_string(),
    }
}

/// Strip what copy-pasting tends to leave in a secret.
///
/// Only the first occurrence of each token is removed, `A-B-C` becomes `AB-C`.
pub(crate) fn clean_secret(secret: &str) -> String {
    let mut cleaned = remove_first_whitespace_run(secret);
    for token in [".", "_", "-", "//g", "/g"] {
        cleaned = cleaned.replacen(token, "", 1);
    }
    cleaned
}

/// ASCII, percent-encoded URI for the descriptor
pub(crate) fn to_uri(descriptor: &Descriptor) -> String {
    let label = format!(
        "/{}:{}",
        urlencoding::encode(descriptor.label_issuer()),
        urlencoding::encode(descriptor.account_name()),
    );

    let mut query = format!(
        "secret={}",
        urlencoding::encode(&clean_secret(descriptor.secret()))
    );
    if !descriptor.param_issuer().is_empty() {
        query.push_str("&issuer=");
        query.push_str(&urlencoding::encode(descriptor.param_issuer()));
    }
    query.push_str(&format!(
        "&algorithm={}&digits={}&period={}",
        descriptor.algorithm(),
        descriptor.digits(),
        descriptor.period(),
    ));

    format!("{}://{}{}?{}", SCHEME, TOTP_HOST, label, query)
}

/// Human readable variant of [to_uri]. Names holding `&`, `?`, `=`, `+` or `%`
/// do not survive a parse of this form, use [to_uri] for anything read back.
pub(crate) fn to_uri_decoded(descriptor: &Descriptor) -> String {
    let encoded = to_uri(descriptor);
    String::from_utf8_lossy(&urlencoding::decode_binary(encoded.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::{clean_secret, decode_lenient, parse, LabelForm, LabelParts, ParsedUri};
    use crate::{Algorithm, Assume, DescriptorError};

    fn parts(issuer: Option<&str>, account: Option<&str>) -> LabelParts {
        LabelParts {
            issuer: issuer.map(str::to_string),
            account: account.map(str::to_string),
        }
    }

    #[rstest]
    #[case("bob(Acme)", Some(parts(Some("Acme"), Some("bob"))))]
    #[case("bob(x)(Acme)", Some(parts(Some("Acme"), Some("bob(x)"))))]
    #[case("bob(Ac(me)", Some(parts(Some("me"), Some("bob(Ac"))))]
    #[case("bob()", None)]
    #[case("(Acme)", None)]
    #[case("bob(Acme", None)]
    #[case("Acme:bob", None)]
    fn parenthesized_form(#[case] label: &str, #[case] expected: Option<LabelParts>) {
        assert_eq!(
            LabelForm::Parenthesized.matches(label, Assume::Username),
            expected
        );
    }

    #[rstest]
    #[case("Acme:bob", Some(parts(Some("Acme"), Some("bob"))))]
    #[case("Acme:bob:extra", Some(parts(Some("Acme"), Some("bob:extra"))))]
    #[case(":bob", Some(parts(None, Some("bob"))))]
    #[case("Acme:", Some(parts(Some("Acme"), None)))]
    #[case("bob", None)]
    fn colon_form(#[case] label: &str, #[case] expected: Option<LabelParts>) {
        assert_eq!(LabelForm::Colon.matches(label, Assume::Username), expected);
    }

    #[rstest]
    #[case("bob", Assume::Username, Some(parts(None, Some("bob"))))]
    #[case("github", Assume::Issuer, Some(parts(Some("github"), None)))]
    #[case("ab", Assume::Username, None)]
    #[case("", Assume::Issuer, None)]
    fn bare_form(#[case] label: &str, #[case] assume: Assume, #[case] expected: Option<LabelParts>) {
        assert_eq!(LabelForm::Bare.matches(label, assume), expected);
    }

    #[test]
    fn issuer_in_both_places() {
        let parsed = parse("otpauth://totp/Acme:bob?secret=ABC&issuer=Acme", Assume::Username)
            .unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.account_name.as_deref(), Some("bob"));
        assert_eq!(parsed.secret.as_deref(), Some("ABC"));
    }

    #[test]
    fn parenthesized_label_issuer_is_copied() {
        let parsed = parse("otpauth://totp/bob(Acme)?secret=ABC", Assume::Username).unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.account_name.as_deref(), Some("bob"));
    }

    #[test]
    fn parenthesized_form_wins_over_colon() {
        let parsed = parse("otpauth://totp/Acme:bob(Corp)?secret=ABC", Assume::Username).unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Corp"));
        assert_eq!(parsed.account_name.as_deref(), Some("Acme:bob"));
    }

    #[test]
    fn issuer_parameter_wins() {
        let parsed = parse("otpauth://totp/Old:bob?secret=ABC&issuer=New", Assume::Username)
            .unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("New"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("New"));
    }

    #[test]
    fn issuer_parameter_without_label_issuer() {
        let parsed = parse("otpauth://totp/bob?issuer=Acme&secret=ABC", Assume::Username).unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.account_name.as_deref(), Some("bob"));
    }

    #[test]
    fn bare_label_without_issuer() {
        let parsed = parse("otpauth://totp/bob?secret=ABC", Assume::Username).unwrap();
        assert_eq!(parsed.label_issuer, None);
        assert_eq!(parsed.param_issuer, None);
        assert_eq!(parsed.account_name.as_deref(), Some("bob"));
    }

    #[test]
    fn empty_and_short_labels() {
        for raw in [
            "otpauth://totp?secret=ABC",
            "otpauth://totp/?secret=ABC",
            "otpauth://totp/ab?secret=ABC",
        ] {
            let parsed = parse(raw, Assume::Issuer).unwrap();
            assert_eq!(parsed.label_issuer, None);
            assert_eq!(parsed.account_name, None);
            assert_eq!(parsed.secret.as_deref(), Some("ABC"));
        }
    }

    #[test]
    fn query_values() {
        let parsed = parse(
            "otpauth://totp/GitHub:test?SECRET=KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ&Digits=8&period=60&algorithm=sha256&foo=bar",
            Assume::Username,
        )
        .unwrap();
        assert_eq!(
            parsed,
            ParsedUri {
                label_issuer: Some("GitHub".to_string()),
                account_name: Some("test".to_string()),
                secret: Some("KRSXG5CTMVRXEZLUKN2XAZLSKNSWG4TFOQ".to_string()),
                param_issuer: Some("GitHub".to_string()),
                algorithm: Some(Algorithm::SHA256),
                digits: Some(8),
                period: Some(60),
            }
        );
    }

    #[test]
    fn empty_pairs_are_skipped() {
        let parsed = parse("otpauth://totp/Acme:bob?secret=ABC&&digits=7&", Assume::Username)
            .unwrap();
        assert_eq!(parsed.digits, Some(7));
    }

    #[test]
    fn hotp_host_is_accepted() {
        let parsed = parse("otpauth://hotp/Acme:bob?secret=ABC&counter=3", Assume::Username)
            .unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.secret.as_deref(), Some("ABC"));
    }

    #[test]
    fn percent_encoded_uri() {
        let parsed = parse(
            "otpauth://totp/ACME%20Co:john.doe%40email.com?secret=HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ&issuer=ACME+Co",
            Assume::Username,
        )
        .unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("ACME Co"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("ACME Co"));
        assert_eq!(parsed.account_name.as_deref(), Some("john.doe@email.com"));
    }

    #[rstest]
    #[case("Caf%E9", "Café")]
    #[case("Caf%C3%A9", "Café")]
    #[case("Café", "Café")]
    #[case("Café%20%E9", "Café é")]
    #[case("100%", "100%")]
    #[case("100%zz", "100%zz")]
    #[case("a+b", "a+b")]
    fn lenient_decoding(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(decode_lenient(raw), expected);
    }

    #[test]
    fn plus_is_a_space_in_the_query_only() {
        let parsed = parse(
            "otpauth://totp/C++:bob?secret=ABC&issuer=ACME+Co",
            Assume::Username,
        )
        .unwrap();
        assert_eq!(parsed.account_name.as_deref(), Some("bob"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("ACME Co"));

        let parsed = parse("otpauth://totp/C++:bob?secret=ABC", Assume::Username).unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("C++"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("C++"));
    }

    #[test]
    fn escaped_separators_stay_in_names() {
        let parsed = parse(
            "otpauth://totp/AT%26T:bob%3Fx%3Dy?secret=ABC&issuer=AT%26T%3D1",
            Assume::Username,
        )
        .unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("AT&T=1"));
        assert_eq!(parsed.param_issuer.as_deref(), Some("AT&T=1"));
        assert_eq!(parsed.account_name.as_deref(), Some("bob?x=y"));
        assert_eq!(parsed.secret.as_deref(), Some("ABC"));
    }

    #[test]
    fn uri_escaped_as_a_whole() {
        let parsed = parse(
            "otpauth%3A%2F%2Ftotp%2FAcme%3Abob%3Fsecret%3DABC%26digits%3D8",
            Assume::Username,
        )
        .unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Acme"));
        assert_eq!(parsed.account_name.as_deref(), Some("bob"));
        assert_eq!(parsed.secret.as_deref(), Some("ABC"));
        assert_eq!(parsed.digits, Some(8));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let parsed = parse("  otpauth://totp/Acme:bob?secret=ABC\n", Assume::Username).unwrap();
        assert_eq!(parsed.secret.as_deref(), Some("ABC"));
    }

    #[test]
    fn latin1_issuer() {
        let parsed = parse("otpauth://totp/Caf%E9:bob?secret=ABC", Assume::Username).unwrap();
        assert_eq!(parsed.label_issuer.as_deref(), Some("Café"));
    }

    #[rstest]
    #[case("https://example.com/login", DescriptorError::NotAnOtpUri)]
    #[case("", DescriptorError::NotAnOtpUri)]
    #[case("otpauth://steam/Acme:bob?secret=ABC", DescriptorError::NotAnOtpUri)]
    #[case("otpauth://totp/Acme:bob", DescriptorError::MalformedQuery("Acme:bob".to_string()))]
    #[case("otpauth://totp/Acme:bob?", DescriptorError::MalformedQuery("Acme:bob?".to_string()))]
    #[case("otpauth://totp/Acme:bob?secret", DescriptorError::MalformedQuery("secret".to_string()))]
    #[case("otpauth://totp/Acme:bob?secret=ABC&digits=six", DescriptorError::MalformedQuery("digits=six".to_string()))]
    #[case("otpauth://totp/Acme:bob?secret=ABC&algorithm=MD5", DescriptorError::UnsupportedAlgorithm("MD5".to_string()))]
    #[case("otpauth://totp/Acme:bob?secret=ABC&digits=9", DescriptorError::InvalidDigits(9))]
    #[case("otpauth://totp/Acme:bob?secret=ABC&period=20", DescriptorError::InvalidPeriod(20))]
    fn parse_errors(#[case] raw: &str, #[case] expected: DescriptorError) {
        assert_eq!(parse(raw, Assume::Username).unwrap_err(), expected);
    }

    #[rstest]
    #[case("JBSWY3DPEHPK3PXP", "JBSWY3DPEHPK3PXP")]
    #[case("JBSW Y3DP EHPK", "JBSWY3DP EHPK")]
    #[case("JBSW \t Y3DP", "JBSWY3DP")]
    #[case("JB.SW.Y3", "JBSW.Y3")]
    #[case("JB_SW_Y3", "JBSW_Y3")]
    #[case("JB-SW-Y3", "JBSW-Y3")]
    #[case("JBSW//gY3DP", "JBSWY3DP")]
    #[case("JBSW/gY3DP/g", "JBSWY3DP/g")]
    #[case("JB SW.Y3_DP-EH//gPK/gXP", "JBSWY3DPEHPKXP")]
    fn secret_cleansing(#[case] secret: &str, #[case] expected: &str) {
        assert_eq!(clean_secret(secret), expected);
    }
}
