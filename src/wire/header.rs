// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Fixed-layout request/response headers, built the same way the teacher
//! builds its Basic-Header-Segment structs: `#[repr(C)]` plus `zerocopy`
//! traits so the wire bytes and the in-memory struct are the same bytes.

use anyhow::{Result, anyhow, bail};
use zerocopy::{BigEndian, FromBytes, Immutable, IntoBytes, KnownLayout, U16, U32, U64};

/// Size in bytes of a `RequestHeader` on the wire.
pub const REQUEST_HEADER_LEN: usize = 32;
/// Size in bytes of a `ResponseHeader` on the wire.
pub const RESPONSE_HEADER_LEN: usize = 24;

/// Object sub-header: which object, and at what byte offset within it.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ObjSubHeader {
    pub oid: U64<BigEndian>,
    pub offset: U64<BigEndian>,
}

/// Request header, carried by every client request and rebuilt (with a
/// translated opcode) for every forwarded leg.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RequestHeader {
    pub opcode: u8,
    _reserved: [u8; 3],
    pub proto_ver: U16<BigEndian>,
    _reserved2: [u8; 2],
    pub epoch: U64<BigEndian>,
    pub data_length: U32<BigEndian>,
    pub obj: ObjSubHeader,
}

impl RequestHeader {
    pub fn to_bytes(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() != REQUEST_HEADER_LEN {
            bail!("buffer length must be {REQUEST_HEADER_LEN}, got {}", buf.len());
        }
        buf.copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Self::read_from_bytes(buf).map_err(|e| anyhow!("failed to parse request header: {e}"))
    }
}

/// Response header, written back by the local engine or a peer gateway.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ResponseHeader {
    pub status: U32<BigEndian>,
    pub data_length: U32<BigEndian>,
    pub obj: ObjSubHeader,
}

impl ResponseHeader {
    pub fn to_bytes(&self, buf: &mut [u8]) -> Result<()> {
        if buf.len() != RESPONSE_HEADER_LEN {
            bail!(
                "buffer length must be {RESPONSE_HEADER_LEN}, got {}",
                buf.len()
            );
        }
        buf.copy_from_slice(self.as_bytes());
        Ok(())
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        Self::read_from_bytes(buf).map_err(|e| anyhow!("failed to parse response header: {e}"))
    }
}
