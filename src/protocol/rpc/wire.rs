//! RPC record marking over stream transports (RFC 5531 section 11).
//!
//! Each record is sent as one or more fragments. A fragment starts with a
//! 4-byte big endian header whose top bit flags the last fragment of the
//! record and whose lower 31 bits carry the fragment length.
//!
//! The directory client is synchronous, so these helpers work on blocking
//! `std::io` streams.

use std::io::{Read, Write};

use anyhow::anyhow;
use tracing::trace;

use crate::protocol::rpc;

/// Bit marking the last fragment of a record.
const LAST_FRAGMENT: u32 = 1 << 31;

/// Reads one fragment and appends its payload to `append_to`.
///
/// Returns true if this was the last fragment of the record. Refuses to grow
/// the record past [`rpc::MAX_RPC_RECORD_LENGTH`].
pub fn read_fragment(
    socket: &mut impl Read,
    append_to: &mut Vec<u8>,
) -> Result<bool, anyhow::Error> {
    let mut header_buf = [0_u8; 4];
    socket.read_exact(&mut header_buf)?;
    let fragment_header = u32::from_be_bytes(header_buf);
    let is_last = (fragment_header & LAST_FRAGMENT) > 0;
    let length = (fragment_header & !LAST_FRAGMENT) as usize;
    trace!("Reading fragment length:{}, last:{}", length, is_last);
    if append_to.len().saturating_add(length) > rpc::MAX_RPC_RECORD_LENGTH {
        return Err(anyhow!(
            "RPC record length {} exceeds max {}",
            append_to.len().saturating_add(length),
            rpc::MAX_RPC_RECORD_LENGTH
        ));
    }
    let start_offset = append_to.len();
    append_to.resize(start_offset + length, 0);
    socket.read_exact(&mut append_to[start_offset..])?;
    Ok(is_last)
}

/// Reads fragments until a complete record has been reassembled.
pub fn read_record(socket: &mut impl Read) -> Result<Vec<u8>, anyhow::Error> {
    let mut record = Vec::new();
    while !read_fragment(socket, &mut record)? {}
    Ok(record)
}

/// Writes `buf` as a single record, split into as many fragments as needed.
pub fn write_fragment(socket: &mut impl Write, buf: &[u8]) -> Result<(), anyhow::Error> {
    const MAX_FRAGMENT_SIZE: usize = (1 << 31) - 1;

    // An empty record still needs its terminating header.
    if buf.is_empty() {
        socket.write_all(&LAST_FRAGMENT.to_be_bytes())?;
        return Ok(socket.flush()?);
    }

    let mut offset = 0;
    while offset < buf.len() {
        let fragment_size = std::cmp::min(buf.len() - offset, MAX_FRAGMENT_SIZE);
        let is_last = offset + fragment_size >= buf.len();
        let fragment_header =
            if is_last { fragment_size as u32 | LAST_FRAGMENT } else { fragment_size as u32 };

        socket.write_all(&fragment_header.to_be_bytes())?;
        trace!("Writing fragment length:{}, last:{}", fragment_size, is_last);
        socket.write_all(&buf[offset..offset + fragment_size])?;

        offset += fragment_size;
    }

    Ok(socket.flush()?)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn reassembles_multi_fragment_record() {
        let mut stream = Vec::new();
        stream.extend_from_slice(&3_u32.to_be_bytes());
        stream.extend_from_slice(b"abc");
        stream.extend_from_slice(&(2_u32 | LAST_FRAGMENT).to_be_bytes());
        stream.extend_from_slice(b"de");

        let record = read_record(&mut Cursor::new(stream)).unwrap();
        assert_eq!(record, b"abcde");
    }

    #[test]
    fn written_record_reads_back() {
        let mut stream = Vec::new();
        write_fragment(&mut stream, b"rpc.bynumber").unwrap();
        assert_eq!(&stream[..4], &(12_u32 | LAST_FRAGMENT).to_be_bytes());
        assert_eq!(read_record(&mut Cursor::new(stream)).unwrap(), b"rpc.bynumber");
    }

    #[test]
    fn rejects_oversized_fragment() {
        let oversized = rpc::MAX_RPC_RECORD_LENGTH as u32 + 1;
        let stream = (oversized | LAST_FRAGMENT).to_be_bytes();
        let err = read_record(&mut Cursor::new(stream)).unwrap_err();
        assert!(err.to_string().contains("exceeds max"), "unexpected error: {err:?}");
    }

    #[test]
    fn truncated_fragment_is_an_error() {
        let mut stream = (8_u32 | LAST_FRAGMENT).to_be_bytes().to_vec();
        stream.extend_from_slice(b"abc");
        assert!(read_record(&mut Cursor::new(stream)).is_err());
    }
}
