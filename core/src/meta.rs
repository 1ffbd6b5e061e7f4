// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metadata TLV parser.
//!
//! Walks a `{tag:u8, len:u8, value[len]}` sequence, extracting the four
//! guardrail-relevant facts the device cares about. Unknown and vendor
//! (`>= 0x80`) tags are tolerated silently; a tag whose declared `len`
//! disagrees with the expected field width is also tolerated (the field
//! keeps its zero default) — only a `len` that overruns the remaining TLV
//! bytes is a hard error.

use crate::error::TmdError;

pub const TAG_REQ_ARENA_BYTES: u8 = 0x01;
pub const TAG_TFLM_ABI: u8 = 0x02;
pub const TAG_OPSET_HASH: u8 = 0x03;
pub const TAG_IO_HASH: u8 = 0x04;
pub const TAG_VENDOR_BEGIN: u8 = 0x80;

/// Guardrail-relevant facts extracted from a patch's metadata TLV block.
///
/// A zero field means "not asserted by the patch" and disables the
/// corresponding guardrail check.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetaState {
    pub req_arena_bytes: u32,
    pub tflm_abi: u16,
    pub opset_hash: u32,
    pub io_hash: u32,
}

/// Parses `buf` (the `meta_len`-byte TLV block) into a [`MetaState`].
///
/// Stops when fewer than 2 bytes (one full tag+len) remain.
pub fn parse(buf: &[u8]) -> Result<MetaState, TmdError> {
    let mut meta = MetaState::default();
    let mut off = 0usize;

    while off + 2 <= buf.len() {
        let tag = buf[off];
        let len = buf[off + 1] as usize;
        let val_off = off + 2;
        let avail = buf.len() - val_off;
        if len > avail {
            return Err(TmdError::Header);
        }
        let val = &buf[val_off..val_off + len];

        match tag {
            TAG_REQ_ARENA_BYTES if len == 4 => {
                meta.req_arena_bytes = le_u32(val);
            }
            TAG_TFLM_ABI if len == 2 => {
                meta.tflm_abi = le_u16(val);
            }
            TAG_OPSET_HASH if len == 4 => {
                meta.opset_hash = le_u32(val);
            }
            TAG_IO_HASH if len == 4 => {
                meta.io_hash = le_u32(val);
            }
            // Wrong-width known tags, and any vendor/unknown tag, are
            // tolerated without effect; we still advance past it below.
            _ => {}
        }

        off = val_off + len;
    }

    Ok(meta)
}

fn le_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn le_u16(b: &[u8]) -> u16 {
    u16::from_le_bytes([b[0], b[1]])
}
