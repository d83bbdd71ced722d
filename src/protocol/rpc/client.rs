//! Blocking ONC RPC client over a single TCP connection.
//!
//! One call is in flight at a time: the request is written as one record and
//! records are read back until one carries the matching xid. Replies for
//! other xids (left over from an earlier call that timed out) are dropped.

use std::io::Cursor;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use anyhow::{anyhow, bail};
use tracing::{debug, trace, warn};

use crate::protocol::rpc::wire;
use crate::protocol::xdr::{deserialize, rpc, Deserialize, Serialize};

/// Connection to one RPC server, (re)established lazily.
#[derive(Debug)]
pub struct RpcClient {
    server: String,
    timeout: Option<Duration>,
    stream: Option<TcpStream>,
    next_xid: u32,
}

impl RpcClient {
    /// Creates a client for `server`, an address of the form "host:port".
    ///
    /// No connection is made until the first call.
    pub fn new(server: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self { server: server.into(), timeout, stream: None, next_xid: initial_xid() }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    fn connect(&mut self) -> Result<&mut TcpStream, anyhow::Error> {
        if self.stream.is_none() {
            let stream = self.open_stream()?;
            stream.set_read_timeout(self.timeout)?;
            stream.set_write_timeout(self.timeout)?;
            let _ = stream.set_nodelay(true);
            debug!("Connected to RPC server {}", self.server);
            self.stream = Some(stream);
        }
        self.stream.as_mut().ok_or_else(|| anyhow!("connection to {} not established", self.server))
    }

    /// Tries each address `server` resolves to, in order.
    fn open_stream(&self) -> Result<TcpStream, anyhow::Error> {
        let mut last_error = None;
        for addr in self.server.to_socket_addrs()? {
            let attempt = match self.timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    trace!("Cannot connect to {}: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e.into()),
            None => Err(anyhow!("{} resolved to no addresses", self.server)),
        }
    }

    /// Performs one call and decodes its results as `R`.
    ///
    /// Any transport failure drops the connection so that the next call starts
    /// from a fresh one.
    pub fn call<A, R>(
        &mut self,
        prog: u32,
        vers: u32,
        proc: u32,
        args: &A,
    ) -> Result<R, anyhow::Error>
    where
        A: Serialize + ?Sized,
        R: Deserialize + Default,
    {
        let xid = self.next_xid;
        self.next_xid = self.next_xid.wrapping_add(1);

        let mut request = Vec::new();
        rpc::make_call(xid, prog, vers, proc).serialize(&mut request)?;
        args.serialize(&mut request)?;

        let result = self.exchange(xid, &request);
        if result.is_err() {
            self.stream = None;
        }
        let reply = result?;

        let mut input = Cursor::new(reply.as_slice());
        let header = deserialize::<rpc::rpc_msg>(&mut input)?;
        check_reply(prog, vers, proc, header)?;
        Ok(deserialize::<R>(&mut input)?)
    }

    fn exchange(&mut self, xid: u32, request: &[u8]) -> Result<Vec<u8>, anyhow::Error> {
        let stream = self.connect()?;
        wire::write_fragment(stream, request)?;
        loop {
            let record = wire::read_record(stream)?;
            let reply_xid = record
                .get(..4)
                .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
                .ok_or_else(|| anyhow!("RPC reply shorter than its xid"))?;
            if reply_xid == xid {
                return Ok(record);
            }
            trace!("Dropping stale reply xid {} while waiting for {}", reply_xid, xid);
        }
    }
}

/// Fails unless the header is an accepted, successful reply.
fn check_reply(prog: u32, vers: u32, proc: u32, header: rpc::rpc_msg) -> Result<(), anyhow::Error> {
    let reply = match header.body {
        rpc::rpc_body::REPLY(reply) => reply,
        rpc::rpc_body::CALL(_) => bail!("Unexpectedly received a Call instead of a Reply"),
    };
    match reply {
        rpc::reply_body::MSG_ACCEPTED(accepted) => match accepted.reply_data {
            rpc::accept_body::SUCCESS => Ok(()),
            rpc::accept_body::PROG_UNAVAIL => bail!("program {} unavailable", prog),
            rpc::accept_body::PROG_MISMATCH(info) => bail!(
                "program {} version {} unsupported (server has {}..={})",
                prog,
                vers,
                info.low,
                info.high
            ),
            rpc::accept_body::PROC_UNAVAIL => {
                bail!("procedure {} of program {} unavailable", proc, prog)
            }
            rpc::accept_body::GARBAGE_ARGS => bail!("server could not decode arguments"),
        },
        rpc::reply_body::MSG_DENIED(denied) => {
            warn!("RPC call to program {} denied: {:?}", prog, denied);
            bail!("call denied: {:?}", denied)
        }
    }
}

/// Seeds xids from the clock so that a restarted client does not reuse the
/// previous process's ids against the same server.
fn initial_xid() -> u32 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos() ^ (d.as_secs() as u32))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(msg: rpc::rpc_msg) -> rpc::rpc_msg {
        let mut buf = Vec::new();
        msg.serialize(&mut buf).unwrap();
        deserialize::<rpc::rpc_msg>(&mut Cursor::new(buf)).unwrap()
    }

    #[test]
    fn accepts_only_successful_replies() {
        assert!(check_reply(100004, 2, 4, reply(rpc::make_success_reply(1))).is_ok());

        let err = check_reply(100004, 2, 4, reply(rpc::prog_unavail_reply_message(1))).unwrap_err();
        assert!(err.to_string().contains("unavailable"), "unexpected error: {err:?}");

        let err =
            check_reply(100004, 3, 4, reply(rpc::prog_mismatch_reply_message(1, 2))).unwrap_err();
        assert!(err.to_string().contains("2..=2"), "unexpected error: {err:?}");

        assert!(check_reply(100004, 2, 9, reply(rpc::proc_unavail_reply_message(1))).is_err());
        assert!(check_reply(100004, 2, 4, reply(rpc::garbage_args_reply_message(1))).is_err());
    }

    #[test]
    fn call_is_not_a_reply() {
        let call = reply(rpc::make_call(5, 100004, 2, 0));
        assert!(check_reply(100004, 2, 0, call).is_err());
    }

    #[test]
    fn unreachable_server_fails_the_call() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().to_string()
        };
        let mut client = RpcClient::new(addr, Some(Duration::from_secs(1)));
        assert!(client.call::<u32, bool>(100004, 2, 0, &0).is_err());
        assert!(client.stream.is_none());
    }

    #[test]
    fn host_names_are_resolved_with_a_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut client = RpcClient::new(format!("localhost:{port}"), Some(Duration::from_secs(1)));
        assert!(client.connect().is_ok());

        let mut client = RpcClient::new(format!("localhost:{port}"), None);
        assert!(client.connect().is_ok());
    }
}
