//! Name checks applied before objects are accepted over the API.

use anyhow::{Result, bail};
use pkg_constants::record::RECORD_PREFIX;

/// DNS label limit shared by every stored name.
pub const MAX_NAME_LEN: usize = 63;

/// Digits of the largest frontend port.
const MAX_PORT_DIGITS: usize = 5;

/// Longest Service name whose records `bigip-<service>-<port>` still fit in
/// [`MAX_NAME_LEN`] for every port.
pub const MAX_SERVICE_NAME_LEN: usize = MAX_NAME_LEN - RECORD_PREFIX.len() - 2 - MAX_PORT_DIGITS;

fn check_label(what: &str, name: &str, max_len: usize) -> Result<()> {
    if name.is_empty() {
        bail!("{} must not be empty", what);
    }
    if name.len() > max_len {
        bail!(
            "{} '{}' is {} characters long, at most {} are allowed",
            what,
            name,
            name.len(),
            max_len
        );
    }
    if let Some(bad) = name
        .chars()
        .find(|&c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'))
    {
        bail!("{} '{}' contains '{}', only [a-z0-9-] is allowed", what, name, bad);
    }
    if name.starts_with('-') || name.ends_with('-') {
        bail!("{} '{}' must not start or end with a hyphen", what, name);
    }
    Ok(())
}

/// Lowercase DNS label: `[a-z0-9-]`, no leading or trailing hyphen.
pub fn validate_name(name: &str) -> Result<()> {
    check_label("name", name, MAX_NAME_LEN)
}

/// DNS-1035 label short enough for every record name derived from it.
pub fn validate_service_name(name: &str) -> Result<()> {
    check_label("service name", name, MAX_SERVICE_NAME_LEN)?;
    if !name.starts_with(|c: char| c.is_ascii_lowercase()) {
        bail!("service name '{}' must start with a letter", name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_dns_labels() {
        for name in ["a", "web", "my-app", "app-123", "a-b-c"] {
            assert!(validate_name(name).is_ok(), "{name}");
        }
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn rejects_everything_else() {
        for name in ["", "My-App", "my_app", "-lead", "trail-", "a.b"] {
            assert!(validate_name(name).is_err(), "{name}");
        }
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn service_names_leave_room_for_the_record_name() {
        assert_eq!(MAX_SERVICE_NAME_LEN, 51);
        let longest = format!("s{}", "a".repeat(MAX_SERVICE_NAME_LEN - 1));
        assert!(validate_service_name(&longest).is_ok());
        assert!(validate_name(&format!("bigip-{}-65535", longest)).is_ok());

        assert!(validate_service_name(&format!("{}a", longest)).is_err());
        assert!(validate_service_name("8ball").is_err());
    }
}
