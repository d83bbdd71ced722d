//! Lookup API: enumeration primitives and point queries.
//!
//! [`RpcDb`] is the explicit context; every operation takes it by `&mut`, and
//! independent contexts enumerate independently. The free functions at the
//! bottom of this module operate on a per-thread default context so that
//! callers who only want `getrpcbyname("nfs")` need not carry one around.

use std::cell::RefCell;

use tracing::debug;

use crate::config::Config;
use crate::directory::{DirectoryClient, DirectoryError, YpClient};
use crate::entry::RpcEntry;
use crate::parse;
use crate::state::IterationState;

/// Handle on the RPC program database.
#[derive(Debug)]
pub struct RpcDb {
    state: IterationState,
}

impl Default for RpcDb {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl RpcDb {
    /// Creates a database reading from `config`. When a directory is
    /// configured it is queried with the NIS (YP) protocol.
    pub fn new(config: Config) -> Self {
        let client = config.directory.as_ref().map(|directory| {
            Box::new(YpClient::from_config(directory, config.io_timeout)) as Box<dyn DirectoryClient>
        });
        Self { state: IterationState::new(&config, client) }
    }

    /// Creates a database that reaches the configured directory through `client`.
    pub fn with_directory_client(config: Config, client: Box<dyn DirectoryClient>) -> Self {
        Self { state: IterationState::new(&config, Some(client)) }
    }

    pub fn state(&self) -> &IterationState {
        &self.state
    }

    /// Opens the enumeration, or rewinds it if already open.
    ///
    /// A true `stay_open` keeps the backend open across [`endrpcent`](Self::endrpcent)
    /// and the point queries from then on; it cannot be switched back off.
    pub fn setrpcent(&mut self, stay_open: bool) {
        self.state.open(stay_open);
    }

    /// Closes the enumeration unless it was opened to stay open.
    pub fn endrpcent(&mut self) {
        self.state.close();
    }

    /// Next program in enumeration order, `None` once the records run out.
    ///
    /// Comments, blank lines and malformed lines are skipped.
    pub fn getrpcent(&mut self) -> Option<RpcEntry> {
        loop {
            let raw = self.state.next()?;
            if let Some(entry) = parse::interpret(&raw) {
                return Some(entry);
            }
        }
    }

    /// First program whose name or one of whose aliases equals `name`.
    pub fn getrpcbyname(&mut self, name: &str) -> Option<RpcEntry> {
        self.setrpcent(false);
        let mut found = None;
        while let Some(entry) = self.getrpcent() {
            if entry.is_named(name) {
                found = Some(entry);
                break;
            }
        }
        self.endrpcent();
        debug!("getrpcbyname({}) --> {:?}", name, found.as_ref().map(|e| e.number));
        found
    }

    /// First program numbered `number`.
    ///
    /// While the directory is in use the number is looked up there directly.
    pub fn getrpcbynumber(&mut self, number: i32) -> Option<RpcEntry> {
        let key = number.to_string();
        match self.state.lookup(key.as_bytes()) {
            Some(Ok(value)) => return parse::interpret(&value),
            Some(Err(DirectoryError::NoMore)) => return None,
            Some(Err(e)) => {
                debug!("getrpcbynumber({}) failed: {}", number, e);
                return None;
            }
            None => {}
        }

        self.setrpcent(false);
        let mut found = None;
        while let Some(entry) = self.getrpcent() {
            if entry.number == number {
                found = Some(entry);
                break;
            }
        }
        self.endrpcent();
        debug!("getrpcbynumber({}) --> {:?}", number, found.as_ref().map(|e| &e.name));
        found
    }
}

/// Iterates over the remaining entries of the enumeration.
impl Iterator for RpcDb {
    type Item = RpcEntry;

    fn next(&mut self) -> Option<RpcEntry> {
        self.getrpcent()
    }
}

thread_local! {
    static RPCDB: RefCell<RpcDb> = RefCell::new(RpcDb::default());
}

/// Runs `f` on this thread's default database.
///
/// # Panics
///
/// If called re-entrantly from within `f`.
pub fn with_rpcdb<R>(f: impl FnOnce(&mut RpcDb) -> R) -> R {
    RPCDB.with(|cell| f(&mut cell.borrow_mut()))
}

/// Replaces this thread's default database with one built from `config`.
/// Any open enumeration on the old one is dropped.
pub fn configure(config: Config) {
    with_rpcdb(|db| *db = RpcDb::new(config));
}

/// [`RpcDb::setrpcent`] on this thread's default database.
pub fn setrpcent(stay_open: bool) {
    with_rpcdb(|db| db.setrpcent(stay_open))
}

/// [`RpcDb::endrpcent`] on this thread's default database.
pub fn endrpcent() {
    with_rpcdb(|db| db.endrpcent())
}

/// [`RpcDb::getrpcent`] on this thread's default database.
pub fn getrpcent() -> Option<RpcEntry> {
    with_rpcdb(|db| db.getrpcent())
}

/// [`RpcDb::getrpcbyname`] on this thread's default database.
pub fn getrpcbyname(name: &str) -> Option<RpcEntry> {
    with_rpcdb(|db| db.getrpcbyname(name))
}

/// [`RpcDb::getrpcbynumber`] on this thread's default database.
pub fn getrpcbynumber(number: i32) -> Option<RpcEntry> {
    with_rpcdb(|db| db.getrpcbynumber(number))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::config::DirectoryConfig;
    use crate::directory::KeyValue;

    /// Answers every keyed lookup with the same value.
    struct FixedValue(Vec<u8>);

    impl DirectoryClient for FixedValue {
        fn probe(&mut self, _domain: &str, _map: &str) -> bool {
            true
        }

        fn first(&mut self, _domain: &str, _map: &str) -> Result<KeyValue, DirectoryError> {
            Err(DirectoryError::NoMore)
        }

        fn next(&mut self, _domain: &str, _map: &str, _key: &[u8]) -> Result<KeyValue, DirectoryError> {
            Err(DirectoryError::NoMore)
        }

        fn lookup(&mut self, _domain: &str, _map: &str, _key: &[u8]) -> Result<Vec<u8>, DirectoryError> {
            Ok(self.0.clone())
        }
    }

    fn db(value: &[u8]) -> (RpcDb, tempfile::NamedTempFile) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"fileonly 7\n").unwrap();
        let config = Config::default()
            .with_registry_path(file.path())
            .with_directory(DirectoryConfig::new("127.0.0.1:834", "example").unwrap());
        (RpcDb::with_directory_client(config, Box::new(FixedValue(value.to_vec()))), file)
    }

    #[test]
    fn directory_value_is_parsed_like_a_registry_line() {
        let (mut db, _file) = db(b"nfs 100003 nfsprog");
        let entry = db.getrpcbynumber(100003).unwrap();
        assert_eq!(entry.name, "nfs");
        assert_eq!(entry.aliases, ["nfsprog"]);
    }

    #[test]
    fn malformed_directory_value_finds_nothing() {
        let (mut db, _file) = db(b"# nothing here");
        assert_eq!(db.getrpcbynumber(7), None);
    }

    #[test]
    fn exhausted_directory_does_not_fall_back() {
        let (mut db, _file) = db(b"");
        assert_eq!(db.getrpcbyname("fileonly"), None);
        assert!(!db.state().map_absent());
    }
}
