//! Where lookups read from.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::registry::RPCDB;

/// Name of the directory map mirroring the registry, keyed by program number.
pub const DEFAULT_MAP: &str = "rpc.bynumber";

/// Settings for an [`RpcDb`](crate::RpcDb).
///
/// The default reads `/etc/rpc` and consults no directory.
#[derive(Clone, Debug)]
pub struct Config {
    /// Path of the local registry file
    pub registry_path: PathBuf,
    /// Directory map holding the same records
    pub map_name: String,
    /// Directory server to try before the registry file, if any
    pub directory: Option<DirectoryConfig>,
    /// Timeout applied to directory connects, reads and writes; `None` blocks
    pub io_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(RPCDB),
            map_name: DEFAULT_MAP.to_string(),
            directory: None,
            io_timeout: None,
        }
    }
}

impl Config {
    pub fn with_registry_path(mut self, path: impl AsRef<Path>) -> Self {
        self.registry_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_map_name(mut self, map_name: impl Into<String>) -> Self {
        self.map_name = map_name.into();
        self
    }

    pub fn with_directory(mut self, directory: DirectoryConfig) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }
}

/// A directory server and the domain it is asked about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryConfig {
    /// Server address of the form "host:port"; host names are resolved on connect
    pub server: String,
    pub domain: String,
}

impl DirectoryConfig {
    /// Validates the address shape; the address is not resolved here.
    ///
    /// # Arguments
    ///
    /// * `server` - Directory server address, e.g. "127.0.0.1:834"
    /// * `domain` - Domain whose maps should be read
    pub fn new(server: &str, domain: &str) -> io::Result<Self> {
        let (host, port) = server.rsplit_once(':').ok_or_else(|| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "Server address must be of form host:port")
        })?;
        if host.is_empty() {
            return Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "Server host is empty"));
        }
        port.parse::<u16>().map_err(|_| {
            io::Error::new(io::ErrorKind::AddrNotAvailable, "Port not in range 0..=65535")
        })?;
        if domain.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "Domain name is empty"));
        }
        Ok(Self { server: server.to_string(), domain: domain.to_string() })
    }
}
