//! Record names: `bigip-<service>-<frontend port>`.
//!
//! Service names may contain the separator, so the port is always taken from
//! the last segment and everything between the prefix and it is the service
//! name. The port is printed without leading zeros and parsing rejects any
//! other spelling, which makes `parse(format(x)) == x` for every legal name.

use pkg_constants::record::{RECORD_PREFIX, RECORD_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordName {
    pub service: String,
    pub frontend_port: u16,
}

impl RecordName {
    pub fn new(service: &str, frontend_port: u16) -> Self {
        Self {
            service: service.to_string(),
            frontend_port,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix(RECORD_PREFIX)?;
        let rest = rest.strip_prefix(RECORD_SEPARATOR)?;
        let (service, port) = rest.rsplit_once(RECORD_SEPARATOR)?;
        if service.is_empty() || !is_canonical_port(port) {
            return None;
        }
        Some(Self {
            service: service.to_string(),
            frontend_port: port.parse().ok()?,
        })
    }
}

impl std::fmt::Display for RecordName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            RECORD_PREFIX, RECORD_SEPARATOR, self.service, RECORD_SEPARATOR, self.frontend_port
        )
    }
}

fn is_canonical_port(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| b.is_ascii_digit())
        && (s == "0" || !s.starts_with('0'))
}

/// Name of the record serving `service` on `frontend_port`.
pub fn record_name(service: &str, frontend_port: u16) -> String {
    RecordName::new(service, frontend_port).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn formats_prefix_service_and_port() {
        assert_eq!(record_name("myservice", 80), "bigip-myservice-80");
    }

    #[test]
    fn hyphenated_service_names_parse_back() {
        let parsed = RecordName::parse("bigip-my-web-app-443").unwrap();
        assert_eq!(parsed, RecordName::new("my-web-app", 443));

        // A service called `web-80` on port 443 is not `web` on anything.
        let parsed = RecordName::parse("bigip-web-80-443").unwrap();
        assert_eq!(parsed.service, "web-80");
        assert_eq!(parsed.frontend_port, 443);
    }

    #[test]
    fn rejects_foreign_and_malformed_names() {
        for name in [
            "kube-root-ca",
            "bigip",
            "bigip-",
            "bigip-web",
            "bigip--80",
            "bigip-web-",
            "bigip-web-http",
            "bigip-web-080",
            "bigip-web-+80",
            "bigip-web-70000",
            "bigipx-web-80",
        ] {
            assert!(RecordName::parse(name).is_none(), "{name} should not parse");
        }
    }

    proptest! {
        #[test]
        fn round_trips_for_legal_service_names(
            service in "[a-z]([a-z0-9-]{0,61}[a-z0-9])?",
            port in any::<u16>(),
        ) {
            let name = record_name(&service, port);
            prop_assert_eq!(RecordName::parse(&name), Some(RecordName::new(&service, port)));
        }

        #[test]
        fn distinct_inputs_never_share_a_name(
            a in "[a-z][a-z0-9-]{0,10}",
            b in "[a-z][a-z0-9-]{0,10}",
            pa in any::<u16>(),
            pb in any::<u16>(),
        ) {
            prop_assume!((a.as_str(), pa) != (b.as_str(), pb));
            prop_assert_ne!(record_name(&a, pa), record_name(&b, pb));
        }
    }
}
