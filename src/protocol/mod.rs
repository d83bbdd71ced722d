//! Wire protocols spoken by the directory backend.
//!
//! - `xdr`: External Data Representation (RFC 4506) plus the ONC RPC and
//!   NIS (YP) message types built on it.
//!
//! - `rpc`: record marking and a blocking call/reply client.

pub mod rpc;
pub mod xdr;
