// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Client-facing opcodes and their translation to the peer-gateway wire
//! protocol (spec §6 "Produced opcodes", §9 "Opcode translation").

use thiserror::Error;

/// Protocol version stamped on forwarded (gateway-to-peer) headers.
pub const PEER_PROTO_VER: u16 = 1;

/// Clients below this protocol version don't understand trimmed zero
/// regions; the read path must re-inflate them before replying.
pub const PROTO_VER_TRIM_ZERO_SECTORS: u16 = 2;

/// Opcode as presented by a client connection.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientOpcode {
    Read = 0x01,
    Write = 0x02,
    CreateAndWrite = 0x03,
    Remove = 0x04,
    Decref = 0x05,
}

/// Returned when the wire byte does not name a known client opcode.
#[derive(Debug, Error)]
#[error("unknown client opcode: 0x{0:02x}")]
pub struct UnknownOpcode(pub u8);

impl TryFrom<u8> for ClientOpcode {
    type Error = UnknownOpcode;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Ok(match byte {
            0x01 => ClientOpcode::Read,
            0x02 => ClientOpcode::Write,
            0x03 => ClientOpcode::CreateAndWrite,
            0x04 => ClientOpcode::Remove,
            0x05 => ClientOpcode::Decref,
            other => return Err(UnknownOpcode(other)),
        })
    }
}

/// Opcode as forwarded between gateways.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerOpcode {
    PeerRead = 0x81,
    PeerWrite = 0x82,
    PeerCreateAndWrite = 0x83,
    PeerRemove = 0x84,
    PeerDecref = 0x85,
}

/// Total mapping from client opcode to its peer-gateway counterpart.
///
/// A `match` with no wildcard arm, so adding a client opcode without adding
/// its peer translation fails to compile.
pub const fn gateway_to_peer_opcode(op: ClientOpcode) -> PeerOpcode {
    match op {
        ClientOpcode::Read => PeerOpcode::PeerRead,
        ClientOpcode::Write => PeerOpcode::PeerWrite,
        ClientOpcode::CreateAndWrite => PeerOpcode::PeerCreateAndWrite,
        ClientOpcode::Remove => PeerOpcode::PeerRemove,
        ClientOpcode::Decref => PeerOpcode::PeerDecref,
    }
}
