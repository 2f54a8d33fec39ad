//! Literal extraction shared by deduplication and completeness checks.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use ros_config_core::statement::Statement;

static IPV4: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?:/(\d{1,2}))?\b")
        .expect("valid ipv4 regex")
});

/// An IPv4 literal with its explicit prefix length, if one was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ipv4Literal {
    pub host: Ipv4Addr,
    pub prefix: Option<u8>,
}

/// Scan `text` for IPv4 literals, skipping degenerate ones.
pub fn ipv4_literals(text: &str) -> Vec<Ipv4Literal> {
    IPV4.captures_iter(text)
        .filter_map(|caps| {
            let host: Ipv4Addr = caps[1].parse().ok()?;
            if is_degenerate(host) {
                return None;
            }
            let prefix = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<u8>().ok())
                .filter(|p| *p <= 32);
            Some(Ipv4Literal { host, prefix })
        })
        .collect()
}

/// Hosts only, prefix dropped.
pub fn ipv4_hosts(text: &str) -> BTreeSet<Ipv4Addr> {
    ipv4_literals(text).into_iter().map(|lit| lit.host).collect()
}

/// `0.0.x.x` and `255.255.255.x` carry no addressing information.
pub fn is_degenerate(host: Ipv4Addr) -> bool {
    let [a, b, c, _] = host.octets();
    (a == 0 && b == 0) || (a == 255 && b == 255 && c == 255)
}

pub fn is_secret_key(key: &str) -> bool {
    matches!(key, "secret" | "password" | "key") || key.ends_with("-key") || key.ends_with(".key")
}

/// Non-empty values of secret-bearing arguments.
pub fn secret_values(stmt: &Statement) -> Vec<String> {
    stmt.args
        .iter()
        .filter(|arg| is_secret_key(&arg.key))
        .filter_map(|arg| arg.value.as_deref())
        .map(|value| ros_config_core::unquote(value).to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ipv4_literals, is_secret_key, secret_values, Ipv4Literal};
    use ros_config_core::Statement;

    #[test]
    fn scans_ranges_and_prefixes() {
        let found = ipv4_literals("add ranges=192.168.10.100-192.168.10.200 address=10.0.0.1/30");
        assert_eq!(found.len(), 3);
        assert_eq!(
            found[2],
            Ipv4Literal {
                host: "10.0.0.1".parse().expect("ip"),
                prefix: Some(30)
            }
        );
    }

    #[test]
    fn ignores_degenerate_and_invalid_literals() {
        let found = ipv4_literals("add dst-address=0.0.0.0/0 netmask=255.255.255.0 x=300.1.1.1");
        assert!(found.is_empty());
    }

    #[test]
    fn secret_keys() {
        assert!(is_secret_key("tcp-md5-key"));
        assert!(is_secret_key("auth.key"));
        assert!(is_secret_key("password"));
        assert!(!is_secret_key("key-id"));
        let stmt = Statement::parse("add name=u password=\"p w\" comment=x").expect("parse");
        assert_eq!(secret_values(&stmt), vec!["p w".to_string()]);
    }
}
