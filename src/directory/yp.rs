//! NIS (YP) client for the directory backend.
//!
//! Only the read-side procedures are used: DOMAIN to probe the server,
//! FIRST/NEXT to walk a map and MATCH for keyed lookups.

use std::time::Duration;

use anyhow::anyhow;
use tracing::debug;

use super::{DirectoryClient, DirectoryError, KeyValue};
use crate::config::DirectoryConfig;
use crate::protocol::rpc::RpcClient;
use crate::protocol::xdr::yp::{self, ypreq_key, ypreq_nokey, ypresp_key_val, ypresp_val, ypstat};
use crate::protocol::xdr::{Deserialize, Serialize};

/// Talks to one YP server over TCP.
#[derive(Debug)]
pub struct YpClient {
    rpc: RpcClient,
}

impl YpClient {
    /// # Arguments
    ///
    /// * `server` - YP server address of the form "host:port"
    /// * `timeout` - Applied to connect, read and write; `None` blocks
    pub fn new(server: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self { rpc: RpcClient::new(server, timeout) }
    }

    pub fn from_config(config: &DirectoryConfig, timeout: Option<Duration>) -> Self {
        Self::new(config.server.clone(), timeout)
    }

    fn call<A, R>(&mut self, proc: yp::YpProgram, args: &A) -> Result<R, anyhow::Error>
    where
        A: Serialize + ?Sized,
        R: Deserialize + Default,
    {
        self.rpc.call(yp::PROGRAM, yp::VERSION, proc as u32, args)
    }
}

/// Rejects names the server would refuse anyway.
fn check_names(domain: &str, map: &str) -> Result<(), DirectoryError> {
    if domain.is_empty() || domain.len() > yp::YPMAXDOMAIN {
        return Err(DirectoryError::Failed(anyhow!("invalid domain name {:?}", domain)));
    }
    if map.is_empty() || map.len() > yp::YPMAXMAP {
        return Err(DirectoryError::Failed(anyhow!("invalid map name {:?}", map)));
    }
    Ok(())
}

/// Maps a response status onto the directory error taxonomy.
fn check_status(stat: ypstat) -> Result<(), DirectoryError> {
    match stat {
        ypstat::YP_TRUE => Ok(()),
        ypstat::YP_NOMAP => Err(DirectoryError::MapAbsent),
        ypstat::YP_NOMORE | ypstat::YP_NOKEY => Err(DirectoryError::NoMore),
        other => Err(DirectoryError::Failed(anyhow!("YP server returned {:?}", other))),
    }
}

impl DirectoryClient for YpClient {
    fn probe(&mut self, domain: &str, map: &str) -> bool {
        if check_names(domain, map).is_err() {
            return false;
        }
        match self.call::<str, bool>(yp::YpProgram::YPPROC_DOMAIN, domain) {
            Ok(served) => {
                debug!("ypproc_domain({}) on {} --> {}", domain, self.rpc.server(), served);
                served
            }
            Err(e) => {
                debug!("ypproc_domain({}) on {} failed: {:?}", domain, self.rpc.server(), e);
                false
            }
        }
    }

    fn first(&mut self, domain: &str, map: &str) -> Result<KeyValue, DirectoryError> {
        check_names(domain, map)?;
        let req = ypreq_nokey { domain: domain.to_string(), map: map.to_string() };
        let resp: ypresp_key_val = self.call(yp::YpProgram::YPPROC_FIRST, &req)?;
        debug!("ypproc_first({}, {}) --> {:?}", domain, map, resp.stat);
        check_status(resp.stat)?;
        Ok((resp.key, resp.val))
    }

    fn next(&mut self, domain: &str, map: &str, key: &[u8]) -> Result<KeyValue, DirectoryError> {
        check_names(domain, map)?;
        let req = ypreq_key { domain: domain.to_string(), map: map.to_string(), key: key.to_vec() };
        let resp: ypresp_key_val = self.call(yp::YpProgram::YPPROC_NEXT, &req)?;
        debug!("ypproc_next({}, {}, {:?}) --> {:?}", domain, map, key, resp.stat);
        check_status(resp.stat)?;
        Ok((resp.key, resp.val))
    }

    fn lookup(&mut self, domain: &str, map: &str, key: &[u8]) -> Result<Vec<u8>, DirectoryError> {
        check_names(domain, map)?;
        let req = ypreq_key { domain: domain.to_string(), map: map.to_string(), key: key.to_vec() };
        let resp: ypresp_val = self.call(yp::YpProgram::YPPROC_MATCH, &req)?;
        debug!("ypproc_match({}, {}, {:?}) --> {:?}", domain, map, key, resp.stat);
        check_status(resp.stat)?;
        Ok(resp.val)
    }
}
