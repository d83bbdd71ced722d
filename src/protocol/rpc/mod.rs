//! Client side of ONC RPC version 2 (RFC 5531) as used by the directory
//! backend: record marking over TCP and a synchronous call/reply exchange.

mod client;
mod wire;

pub use client::RpcClient;
pub use wire::{read_fragment, read_record, write_fragment};

/// Largest reassembled record accepted from a peer.
pub const MAX_RPC_RECORD_LENGTH: usize = 256 * 1024;
