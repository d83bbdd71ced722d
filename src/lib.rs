//! rpcent - lookups in the ONC RPC program number database
//!
//! This library resolves RPC program names to program numbers and back, and
//! enumerates every known program. Records come from the local registry file
//! (`/etc/rpc` format, see rpc(5)) or, when one is configured, from the
//! `rpc.bynumber` map of a NIS (YP) directory server.
//!
//! ## Main Components
//!
//! - `parse`: Turns one registry line into an [`RpcEntry`].
//!
//! - `registry`: Line reader over the local registry file.
//!
//! - `directory`: The [`DirectoryClient`] seam and its YP implementation, [`YpClient`].
//!
//! - `state`: Backend selection and the enumeration cursor, including the
//!   one-way fallback from the directory to the registry file.
//!
//! - `protocol`: ONC RPC record marking, the RPC call/reply messages and the YP
//!   request/response types, with their XDR encoding.
//!
//! ## Standards Compliance
//!
//! - RFC 5531: RPC: Remote Procedure Call Protocol Specification Version 2
//! - RFC 4506: XDR: External Data Representation Standard
//!
//! ## Usage
//!
//! The free functions work on a per-thread database reading `/etc/rpc`.
//! Call [`configure`] to point it elsewhere, or build an [`RpcDb`] and use
//! its methods directly.

pub mod config;
pub mod directory;
pub mod entry;
mod lookup;
pub mod parse;
pub mod protocol;
pub mod registry;
pub mod state;

pub use config::{Config, DirectoryConfig};
pub use directory::{DirectoryClient, DirectoryError, YpClient};
pub use entry::RpcEntry;
pub use lookup::{
    configure, endrpcent, getrpcbyname, getrpcbynumber, getrpcent, setrpcent, with_rpcdb, RpcDb,
};
pub use protocol::xdr;
