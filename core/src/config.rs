// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Build-time configuration.
//!
//! The original firmware picked its integrity algorithm, scratch size, and
//! device guardrail constants with preprocessor knobs (`TMD_USE_CRC32`,
//! `TMD_FIRMWARE_ARENA_BYTES`, ...). A single binary still commits to exactly
//! one algorithm and one set of guardrails, but here that's a `const` value
//! the caller builds and passes in, rather than a compile-time `#define`.

/// The integrity algorithm a build has committed to. The core verifies that
/// a patch's `algo` field matches this choice at header-parse time and calls
/// only the digest capability that choice demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityAlgo {
    None,
    Crc32,
    Sha256,
    CmacCrc,
}

impl IntegrityAlgo {
    /// The wire value of `tmd_hdr_t.algo` this algorithm corresponds to.
    pub const fn wire_value(self) -> u8 {
        match self {
            IntegrityAlgo::None => 0,
            IntegrityAlgo::Crc32 => 1,
            IntegrityAlgo::Sha256 => 2,
            IntegrityAlgo::CmacCrc => 3,
        }
    }

    pub const fn from_wire(v: u8) -> Option<Self> {
        match v {
            0 => Some(IntegrityAlgo::None),
            1 => Some(IntegrityAlgo::Crc32),
            2 => Some(IntegrityAlgo::Sha256),
            3 => Some(IntegrityAlgo::CmacCrc),
            _ => None,
        }
    }
}

/// Default scratch-buffer capacity in bytes, matching `TMD_SCRATCH_SZ` in the
/// original firmware configuration.
pub const DEFAULT_SCRATCH_SZ: usize = 1024;

/// Device- and build-specific constants the guardrail enforcer checks
/// metadata against, plus the scratch/erase geometry the slot cloner and
/// chunk applier use.
#[derive(Debug, Clone, Copy)]
pub struct BuildProfile {
    /// Integrity algorithm this build accepts; patches declaring any other
    /// `algo` are rejected with `ERR_UNSUPPORTED` at header-parse time.
    pub algo: IntegrityAlgo,
    /// Capacity, in bytes, of the two fixed scratch buffers (slot-clone and
    /// RLE-decode). Must not exceed the `SCRATCH` const generic parameter
    /// `apply_patch_from_memory` is instantiated with.
    pub scratch_sz: usize,
    /// Write alignment granularity the port's flash requires. Advisory: the
    /// core does not currently round writes to this boundary itself, but a
    /// flash port needs it to choose how it buffers partial writes.
    pub align_write: u32,
    /// Erase-sector granularity of the port's flash. Advisory for the same
    /// reason as `align_write`.
    pub sector_sz: u32,
    /// Minimum tensor arena the device provides. A patch whose
    /// `REQ_ARENA_BYTES` metadata exceeds this is rejected. Zero disables the
    /// check.
    pub firmware_arena_bytes: u32,
    /// Runtime ABI major version the device provides. Zero disables the
    /// check.
    pub firmware_tflm_abi: u16,
    /// Expected operator-set fingerprint. Zero disables the check.
    pub firmware_opset_hash: u32,
    /// Whether the I/O schema fingerprint guardrail is enabled at all.
    pub enforce_io_hash: bool,
    /// Expected tensor I/O schema fingerprint, checked only when
    /// `enforce_io_hash` is set. Zero disables the check even when enabled.
    pub firmware_io_hash: u32,
    /// Whether the journal manager is consulted at all. A device with no
    /// durable journal region should set this to `false`; the core then
    /// restarts from chunk 0 on every call without trying to read or
    /// persist progress.
    pub journal_enabled: bool,
}

impl BuildProfile {
    /// A profile with every guardrail disabled, CRC32 integrity, the default
    /// scratch size, and journaling on. A reasonable starting point for
    /// tests and demos; production builds should override the guardrail
    /// fields with real device capabilities.
    pub const fn crc32_defaults() -> Self {
        BuildProfile {
            algo: IntegrityAlgo::Crc32,
            scratch_sz: DEFAULT_SCRATCH_SZ,
            align_write: 4,
            sector_sz: 4096,
            firmware_arena_bytes: 0,
            firmware_tflm_abi: 0,
            firmware_opset_hash: 0,
            enforce_io_hash: false,
            firmware_io_hash: 0,
            journal_enabled: true,
        }
    }
}
