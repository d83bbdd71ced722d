//! The record type every lookup produces.

use std::fmt;

/// Most aliases kept for one program; further names on the line are dropped.
pub const MAX_ALIASES: usize = 34;

/// One program from the RPC database: its official name, its number and the
/// alternate names it is also known by, in registry order.
///
/// Entries are owned values. Holding one across further lookups is fine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RpcEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub number: i32,
}

impl RpcEntry {
    /// True if `name` is the official name or one of the aliases.
    /// Comparison is exact and case-sensitive.
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }
}

/// Formats the entry as a registry line, e.g. `portmapper 100000 portmap sunrpc`.
impl fmt::Display for RpcEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.number)?;
        for alias in &self.aliases {
            write!(f, " {alias}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portmapper() -> RpcEntry {
        RpcEntry {
            name: "portmapper".to_string(),
            aliases: vec!["portmap".to_string(), "sunrpc".to_string()],
            number: 100000,
        }
    }

    #[test]
    fn display_matches_registry_format() {
        assert_eq!(portmapper().to_string(), "portmapper 100000 portmap sunrpc");
    }

    #[test]
    fn is_named_checks_name_and_aliases_exactly() {
        let entry = portmapper();
        assert!(entry.is_named("portmapper"));
        assert!(entry.is_named("sunrpc"));
        assert!(!entry.is_named("SunRPC"));
        assert!(!entry.is_named("port"));
    }
}
