//! Network directory backend: a key-value map mirroring the registry, walked
//! with first/next cursor calls and keyed by decimal program number.
//!
//! [`DirectoryClient`] is the seam between the enumeration state and the
//! network. [`YpClient`] implements it against a NIS (YP) server.

mod yp;

pub use yp::YpClient;

/// A map record as returned by the directory: raw key and raw value.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// How a directory query failed.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The server does not carry the map at all. Callers stop asking for the
    /// rest of the state's lifetime.
    #[error("no such map in the directory")]
    MapAbsent,

    /// The cursor ran past the last record (or the key is unknown).
    #[error("no more records in the map")]
    NoMore,

    /// Anything else; the next call may well succeed.
    #[error("directory query failed: {0}")]
    Failed(#[from] anyhow::Error),
}

/// Cursor-style access to one directory map.
pub trait DirectoryClient {
    /// Whether the directory is reachable and serves `domain`.
    fn probe(&mut self, domain: &str, map: &str) -> bool;

    /// First record of the map.
    fn first(&mut self, domain: &str, map: &str) -> Result<KeyValue, DirectoryError>;

    /// Record following `key`.
    fn next(&mut self, domain: &str, map: &str, key: &[u8]) -> Result<KeyValue, DirectoryError>;

    /// Value stored under `key`.
    fn lookup(&mut self, domain: &str, map: &str, key: &[u8]) -> Result<Vec<u8>, DirectoryError>;
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn transport_errors_convert_to_failed() {
        let err: DirectoryError = anyhow!("connection reset").into();
        assert!(matches!(err, DirectoryError::Failed(_)));
        assert_eq!(err.to_string(), "directory query failed: connection reset");
        assert_eq!(DirectoryError::MapAbsent.to_string(), "no such map in the directory");
    }
}
