//! Identity-key normalisation for lead deduplication.
//!
//! Canonicalises the three fields that identify a business (company name,
//! URL, phone number) so that records from different providers that
//! describe the same company compare as equal.

use crate::types::LeadRecord;

/// Legal-form tokens removed from company names, after punctuation has been
/// stripped (so `e.K.` arrives here as `ek`).
const LEGAL_FORMS: &[&str] = &[
    "gmbh", "ag", "ug", "kg", "ohg", "ek", "mbh", "inc", "ltd", "llc",
];

/// Separator between the three normalised fields of an identity key.
const KEY_SEPARATOR: char = '|';

/// Normalise a company name for identity comparison.
///
/// 1. Lowercase.
/// 2. Drop every character that is not a letter, digit or whitespace.
/// 3. Collapse whitespace runs to a single space.
/// 4. Blank out legal-form tokens that stand as whole words.
/// 5. Trim.
///
/// Blanking a token in step 4 leaves its neighbouring spaces in place, so
/// `"acme gmbh co"` becomes `"acme  co"` rather than `"acme co"`.
///
/// # Examples
///
/// ```
/// use lead_search::orchestrator::normalize::normalize_name;
///
/// assert_eq!(normalize_name("ACME  GmbH"), "acme");
/// assert_eq!(normalize_name("Müller & Söhne e.K."), "müller söhne");
/// ```
pub fn normalize_name(raw: &str) -> String {
    let stripped: String = raw
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    let collapsed = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    collapsed
        .split(' ')
        .map(|word| if LEGAL_FORMS.contains(&word) { "" } else { word })
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_owned()
}

/// Normalise a URL for identity comparison.
///
/// Lowercases, strips a leading `http://` or `https://` together with an
/// immediately following `www.`, and strips a single trailing slash.
/// Missing URLs normalise to the empty string.
///
/// # Examples
///
/// ```
/// use lead_search::orchestrator::normalize::normalize_url;
///
/// assert_eq!(normalize_url(Some("https://www.Acme.de/")), "acme.de");
/// assert_eq!(normalize_url(None), "");
/// ```
pub fn normalize_url(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let lowered = raw.to_lowercase();

    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .map(|rest| rest.strip_prefix("www.").unwrap_or(rest))
        .unwrap_or(&lowered);

    without_scheme
        .strip_suffix('/')
        .unwrap_or(without_scheme)
        .to_owned()
}

/// Normalise a phone number for identity comparison.
///
/// Strips whitespace, hyphens, slashes and parentheses, then rewrites a
/// leading German country prefix `+49` as a trunk `0`. Missing numbers
/// normalise to the empty string.
///
/// # Examples
///
/// ```
/// use lead_search::orchestrator::normalize::normalize_phone;
///
/// assert_eq!(normalize_phone(Some("+49 (30) 123-45/67")), "0301234567");
/// ```
pub fn normalize_phone(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return String::new();
    };
    let digits: String = raw
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '/' | '(' | ')')))
        .collect();

    match digits.strip_prefix("+49") {
        Some(rest) => format!("0{rest}"),
        None => digits,
    }
}

/// Build the identity key for a record: `name|url|phone`.
///
/// Two records describe the same lead iff their identity keys are equal.
/// A record whose three fields all normalise to empty gets the key `"||"`
/// and collides with every other such record.
pub fn identity_key(record: &LeadRecord) -> String {
    let mut key = normalize_name(&record.company_name);
    key.push(KEY_SEPARATOR);
    key.push_str(&normalize_url(record.url.as_deref()));
    key.push(KEY_SEPARATOR);
    key.push_str(&normalize_phone(record.phone.as_deref()));
    key
}
