//! Enumeration state shared by every lookup on one [`RpcDb`](crate::RpcDb).
//!
//! At most one backend is active at a time. The directory is preferred when a
//! client is configured and its probe succeeds when the enumeration is opened;
//! otherwise the registry file is used. Once the directory reports that the
//! map does not exist the state switches to the file for good.

use std::fmt;
use std::path::PathBuf;

use tracing::{debug, trace, warn};

use crate::config::{Config, DirectoryConfig};
use crate::directory::{DirectoryClient, DirectoryError};
use crate::registry::RegistryFile;

/// The active source of raw records.
#[derive(Debug)]
pub enum Backend {
    Unopened,
    File(RegistryFile),
    Directory {
        domain: String,
        /// Key of the record returned last; `None` until the first read
        cursor: Option<Vec<u8>>,
    },
}

/// Cursor, stay-open flag and backend selection for one enumeration.
pub struct IterationState {
    backend: Backend,
    stay_open: bool,
    map_absent: bool,
    registry_path: PathBuf,
    map_name: String,
    directory: Option<(DirectoryConfig, Box<dyn DirectoryClient>)>,
}

impl fmt::Debug for IterationState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("IterationState")
            .field("backend", &self.backend)
            .field("stay_open", &self.stay_open)
            .field("map_absent", &self.map_absent)
            .field("registry_path", &self.registry_path)
            .field("directory", &self.directory.as_ref().map(|(config, _)| config))
            .finish()
    }
}

impl IterationState {
    /// Builds the state for `config`; `client` serves `config.directory` if both are set.
    pub fn new(config: &Config, client: Option<Box<dyn DirectoryClient>>) -> Self {
        Self {
            backend: Backend::Unopened,
            stay_open: false,
            map_absent: false,
            registry_path: config.registry_path.clone(),
            map_name: config.map_name.clone(),
            directory: config.directory.clone().zip(client),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    pub fn stay_open(&self) -> bool {
        self.stay_open
    }

    /// True once the directory reported the map missing.
    pub fn map_absent(&self) -> bool {
        self.map_absent
    }

    /// Starts (or restarts) an enumeration from the first record.
    ///
    /// `stay_open` can only switch the flag on; it stays on for the lifetime
    /// of the state.
    pub fn open(&mut self, stay_open: bool) {
        self.stay_open |= stay_open;
        match &mut self.backend {
            Backend::File(file) => {
                if let Err(e) = file.rewind() {
                    warn!("Cannot rewind {}: {:?}", file.path().display(), e);
                    self.backend = Backend::Unopened;
                    self.select_backend();
                }
            }
            Backend::Directory { cursor, .. } => *cursor = None,
            Backend::Unopened => self.select_backend(),
        }
    }

    /// Releases the backend unless the stay-open flag is set. Idempotent.
    pub fn close(&mut self) {
        if self.stay_open {
            trace!("Keeping enumeration open");
            return;
        }
        self.backend = Backend::Unopened;
    }

    /// Next raw record from the active backend, opening one if needed.
    ///
    /// `None` means end of data, which also covers an unreadable registry and a
    /// failed directory query.
    pub fn next(&mut self) -> Option<Vec<u8>> {
        if let Backend::Unopened = self.backend {
            self.select_backend();
            if let Backend::Unopened = self.backend {
                // Neither backend could be opened.
                return None;
            }
        }

        if let Backend::Directory { domain, cursor } = &mut self.backend {
            let Some((_, client)) = self.directory.as_mut() else {
                return None;
            };
            let result = match cursor.as_deref() {
                None => client.first(domain, &self.map_name),
                Some(key) => client.next(domain, &self.map_name, key),
            };
            match result {
                Ok((key, value)) => {
                    *cursor = Some(key);
                    return Some(value);
                }
                Err(DirectoryError::MapAbsent) => self.downgrade(),
                Err(DirectoryError::NoMore) => {
                    trace!("End of map {}", self.map_name);
                    return None;
                }
                Err(e) => {
                    debug!("Directory read failed, reporting end of data: {}", e);
                    return None;
                }
            }
        }

        // Only reached unopened right after a downgrade.
        if let Backend::Unopened = self.backend {
            self.open_file();
        }
        match &mut self.backend {
            Backend::File(file) => match file.read_line() {
                Ok(line) => line,
                Err(e) => {
                    warn!("Cannot read {}: {:?}", file.path().display(), e);
                    None
                }
            },
            _ => None,
        }
    }

    /// Keyed directory lookup for the point queries.
    ///
    /// `None` if the directory is not in use for this state, in which case
    /// the caller enumerates instead. A missing map downgrades as in [`next`](Self::next).
    pub fn lookup(&mut self, key: &[u8]) -> Option<Result<Vec<u8>, DirectoryError>> {
        if !self.directory_in_use() {
            return None;
        }
        let (config, client) = self.directory.as_mut()?;
        match client.lookup(&config.domain, &self.map_name, key) {
            Err(DirectoryError::MapAbsent) => {
                self.downgrade();
                None
            }
            result => Some(result),
        }
    }

    /// Whether the directory would serve the next enumeration.
    fn directory_in_use(&mut self) -> bool {
        match &self.backend {
            Backend::Directory { .. } => true,
            Backend::File(_) => false,
            Backend::Unopened => self.probe_directory().is_some(),
        }
    }

    /// Domain to enumerate from if the directory is eligible and answers.
    fn probe_directory(&mut self) -> Option<String> {
        if self.map_absent {
            return None;
        }
        let (config, client) = self.directory.as_mut()?;
        if client.probe(&config.domain, &self.map_name) {
            Some(config.domain.clone())
        } else {
            debug!("Directory {} not serving {}, using registry", config.server, config.domain);
            None
        }
    }

    fn select_backend(&mut self) {
        match self.probe_directory() {
            Some(domain) => {
                debug!("Enumerating map {} in domain {}", self.map_name, domain);
                self.backend = Backend::Directory { domain, cursor: None };
            }
            None => self.open_file(),
        }
    }

    fn open_file(&mut self) {
        match RegistryFile::open(&self.registry_path) {
            Ok(file) => self.backend = Backend::File(file),
            Err(e) => {
                debug!("Cannot open {}: {:?}", self.registry_path.display(), e);
                self.backend = Backend::Unopened;
            }
        }
    }

    /// One-way switch from the directory to the registry file.
    fn downgrade(&mut self) {
        warn!("Map {} absent from directory, using {}", self.map_name, self.registry_path.display());
        self.map_absent = true;
        self.backend = Backend::Unopened;
    }
}
