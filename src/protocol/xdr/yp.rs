//! NIS (YP) version 2 protocol types for the procedures a read-only map
//! consumer needs: DOMAIN, MATCH, FIRST and NEXT.
//!
//! Keys and values are opaque on the wire. For the `rpc.bynumber` map the key
//! is the decimal program number and the value is a registry line.

#![allow(non_camel_case_types)]

use std::io::{Read, Write};

use num_derive::{FromPrimitive, ToPrimitive};

use super::*;

/// YP server RPC program number
pub const PROGRAM: u32 = 100004;
/// YP server RPC version number
pub const VERSION: u32 = 2;

/// Longest domain or map name the protocol allows.
pub const YPMAXDOMAIN: usize = 64;
pub const YPMAXMAP: usize = 64;

/// Procedures of the YP program.
#[allow(clippy::upper_case_acronyms)]
#[derive(Copy, Clone, Debug)]
pub enum YpProgram {
    YPPROC_NULL = 0,
    YPPROC_DOMAIN = 1,
    YPPROC_DOMAIN_NONACK = 2,
    YPPROC_MATCH = 3,
    YPPROC_FIRST = 4,
    YPPROC_NEXT = 5,
}

/// Status carried in every YP response.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ypstat {
    YP_TRUE = 1,
    YP_NOMORE = 2,
    #[default]
    YP_FALSE = 0,
    YP_NOMAP = -1,
    YP_NODOM = -2,
    YP_NOKEY = -3,
    YP_BADOP = -4,
    YP_BADDB = -5,
    YP_YPERR = -6,
    YP_BADARGS = -7,
    YP_VERS = -8,
}
impl SerializeEnum for ypstat {}
impl DeserializeEnum for ypstat {}

/// Argument of FIRST: which map of which domain.
#[derive(Clone, Debug, Default)]
pub struct ypreq_nokey {
    pub domain: String,
    pub map: String,
}
DeserializeStruct!(ypreq_nokey, domain, map);
SerializeStruct!(ypreq_nokey, domain, map);

/// Argument of MATCH and NEXT.
#[derive(Clone, Debug, Default)]
pub struct ypreq_key {
    pub domain: String,
    pub map: String,
    pub key: Vec<u8>,
}
DeserializeStruct!(ypreq_key, domain, map, key);
SerializeStruct!(ypreq_key, domain, map, key);

/// Result of MATCH.
#[derive(Clone, Debug, Default)]
pub struct ypresp_val {
    pub stat: ypstat,
    pub val: Vec<u8>,
}
DeserializeStruct!(ypresp_val, stat, val);
SerializeStruct!(ypresp_val, stat, val);

/// Result of FIRST and NEXT. Note the value precedes the key.
#[derive(Clone, Debug, Default)]
pub struct ypresp_key_val {
    pub stat: ypstat,
    pub val: Vec<u8>,
    pub key: Vec<u8>,
}
DeserializeStruct!(ypresp_key_val, stat, val, key);
SerializeStruct!(ypresp_key_val, stat, val, key);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn negative_status_travels_as_signed_int() {
        let mut buf = Vec::new();
        ypstat::YP_NOMAP.serialize(&mut buf).unwrap();
        assert_eq!(buf, (-1_i32).to_be_bytes());
        assert_eq!(deserialize::<ypstat>(&mut Cursor::new(buf)).unwrap(), ypstat::YP_NOMAP);
    }

    #[test]
    fn procedure_numbers() {
        assert_eq!(YpProgram::YPPROC_DOMAIN as u32, 1);
        assert_eq!(YpProgram::YPPROC_MATCH as u32, 3);
        assert_eq!(YpProgram::YPPROC_FIRST as u32, 4);
        assert_eq!(YpProgram::YPPROC_NEXT as u32, 5);
    }

    #[test]
    fn key_val_layout_puts_value_first() {
        let resp = ypresp_key_val { stat: ypstat::YP_TRUE, val: b"x 1".to_vec(), key: b"1".to_vec() };
        let mut buf = Vec::new();
        resp.serialize(&mut buf).unwrap();
        assert_eq!(&buf[..4], &1_i32.to_be_bytes());
        assert_eq!(&buf[4..8], &3_u32.to_be_bytes());
        assert_eq!(&buf[8..11], b"x 1");
    }
}
