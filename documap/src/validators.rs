//! Stock value predicates usable directly as field validators.

use bson::Bson;
use email_address::EmailAddress;
use regex::Regex;
use url::Url;
use uuid::Uuid;

/// Returns `true` if the value is a syntactically valid email address.
pub fn is_valid_email(value: &Bson) -> bool {
    value.as_str().is_some_and(EmailAddress::is_valid)
}

/// Returns `true` if the value parses as a URL with a scheme.
pub fn is_valid_url(value: &Bson) -> bool {
    value.as_str().is_some_and(|s| Url::parse(s).is_ok())
}

/// Returns `true` if the value parses as a UUID.
pub fn is_valid_uuid(value: &Bson) -> bool {
    value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok())
}

/// Builds a validator that matches string values against a regex pattern.
pub fn matches_pattern(
    pattern: &str,
) -> Result<impl Fn(&Bson) -> bool + Send + Sync + use<>, regex::Error> {
    let re = Regex::new(pattern)?;
    Ok(move |value: &Bson| value.as_str().is_some_and(|s| re.is_match(s)))
}
