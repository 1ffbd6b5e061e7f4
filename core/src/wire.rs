// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wire-format byte views.
//!
//! We never rely on native struct layout to parse the patch: every
//! multi-byte field is read through an explicit little-endian accessor
//! against a length-checked buffer view, using `zerocopy`'s packed,
//! unaligned wire types. This sidesteps alignment concerns entirely,
//! matching the packed-binary-struct design note.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::TmdError;

pub const HEADER_LEN: usize = 80;
pub const CHUNK_HEADER_LEN: usize = 8;
pub const CHUNK_CRC_LEN: usize = 4;
pub const DIGEST_LEN: usize = 32;

/// The fixed 80-byte patch header, byte-for-byte as it appears on the wire.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy)]
#[repr(C, packed)]
pub struct RawHeader {
    v: u8,
    algo: u8,
    chunks_n: U16,
    base_len: U32,
    target_len: U32,
    base_chk: [u8; DIGEST_LEN],
    target_chk: [u8; DIGEST_LEN],
    meta_len: U16,
    flags: U16,
}

const _: () = assert!(core::mem::size_of::<RawHeader>() == HEADER_LEN);

impl RawHeader {
    pub fn v(&self) -> u8 {
        self.v
    }

    pub fn algo(&self) -> u8 {
        self.algo
    }

    pub fn chunks_n(&self) -> u16 {
        self.chunks_n.get()
    }

    pub fn meta_len(&self) -> u16 {
        self.meta_len.get()
    }

    pub fn base_len(&self) -> u32 {
        self.base_len.get()
    }

    pub fn target_len(&self) -> u32 {
        self.target_len.get()
    }

    pub fn base_chk(&self) -> &[u8; DIGEST_LEN] {
        &self.base_chk
    }

    pub fn target_chk(&self) -> &[u8; DIGEST_LEN] {
        &self.target_chk
    }

    /// Reserved bits, preserved but never interpreted by the core.
    pub fn flags(&self) -> u16 {
        self.flags.get()
    }
}

/// Reads and length-checks the fixed header out of the front of `patch`.
pub fn read_header(patch: &[u8]) -> Result<RawHeader, TmdError> {
    if patch.len() < HEADER_LEN {
        return Err(TmdError::Param);
    }
    RawHeader::read_from_bytes(&patch[..HEADER_LEN]).map_err(|_| TmdError::Internal)
}

/// A chunk record's fixed 8-byte header.
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned, Clone, Copy)]
#[repr(C, packed)]
pub struct RawChunkHeader {
    off: U32,
    len: U16,
    enc: u8,
    has_crc: u8,
}

const _: () = assert!(core::mem::size_of::<RawChunkHeader>() == CHUNK_HEADER_LEN);

impl RawChunkHeader {
    pub fn off(&self) -> u32 {
        self.off.get()
    }

    pub fn len(&self) -> u16 {
        self.len.get()
    }

    pub fn enc(&self) -> u8 {
        self.enc
    }

    pub fn has_crc(&self) -> bool {
        self.has_crc != 0
    }
}

pub fn read_chunk_header(buf: &[u8]) -> Result<RawChunkHeader, TmdError> {
    if buf.len() < CHUNK_HEADER_LEN {
        return Err(TmdError::Header);
    }
    RawChunkHeader::read_from_bytes(&buf[..CHUNK_HEADER_LEN]).map_err(|_| TmdError::Internal)
}

pub fn read_u32_le(buf: &[u8]) -> Result<u32, TmdError> {
    if buf.len() < 4 {
        return Err(TmdError::Header);
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[..4]);
    Ok(u32::from_le_bytes(bytes))
}

/// Chunk encodings recognized by the applier.
///
/// `Lz4Tiny` is a reserved wire value with no decoder: no build ever enables
/// it, the same posture as `TMD_FEAT_LZ4TINY` in the original firmware
/// configuration, which is always compiled out. It exists here only so the
/// wire format has a defined, named place for it; `apply` always rejects it
/// with `ERR_UNSUPPORTED`, identically to an unrecognized `enc` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkEncoding {
    Raw,
    Rle,
    Lz4Tiny,
}

impl ChunkEncoding {
    pub const fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(ChunkEncoding::Raw),
            1 => Some(ChunkEncoding::Rle),
            2 => Some(ChunkEncoding::Lz4Tiny),
            _ => None,
        }
    }
}
