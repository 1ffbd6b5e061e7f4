// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The platform port: the capability set the core consumes.
//!
//! Rather than a C-style function-pointer table gated by preprocessor
//! feature flags, each capability is its own trait. Two are required
//! (`FlashIo`, `SlotCommit`); digest, journal, and log are optional and
//! carried as `Option<&mut dyn _>` in [`PortSet`], so the core dispatches on
//! their presence at runtime instead of at compile time.

use crate::journal::JournalRecord;

/// Raw flash read/erase/write primitives over the two slots and the journal
/// region. Implementations are expected to serialize their own accesses;
/// the core never calls these concurrently with itself.
pub trait FlashIo {
    /// Sets `[addr, addr+len)` to the erased pattern (`0xFF`).
    fn erase(&mut self, addr: u32, len: u32) -> bool;
    fn write(&mut self, addr: u32, src: &[u8]) -> bool;
    fn read(&mut self, addr: u32, dst: &mut [u8]) -> bool;
}

/// The atomic active-slot indicator.
pub trait SlotCommit {
    /// Index (0 or 1) of the slot currently booted.
    fn active_slot(&mut self) -> u8;
    /// Atomically makes `idx` the active slot.
    fn commit(&mut self, idx: u8) -> bool;
}

/// CRC32 over an arbitrary buffer, demanded when the build's
/// [`crate::config::IntegrityAlgo`] is `Crc32` or `CmacCrc` and a chunk
/// carries `has_crc`.
pub trait Crc32 {
    fn crc32(&mut self, buf: &[u8]) -> u32;
}

/// A streaming SHA-256 digest, demanded when the build's
/// [`crate::config::IntegrityAlgo`] is `Sha256`.
///
/// Declared for interface completeness with the port capability table a
/// `Sha256`-configured build must supply; the current chunk applier only
/// ever exercises [`Crc32`] for its `has_crc` check (see the open-question
/// ledger in DESIGN.md), so no `PortSet` field carries this yet.
pub trait Sha256Stream {
    fn init(&mut self);
    fn update(&mut self, buf: &[u8]);
    fn finish(&mut self, out: &mut [u8; 32]);
}

/// A CMAC-over-CRC verification primitive, demanded when the build's
/// [`crate::config::IntegrityAlgo`] is `CmacCrc`. Unused by the current
/// chunk applier for the same reason as [`Sha256Stream`].
pub trait CmacVerify {
    fn cmac_verify(&mut self, key: &[u8], msg: &[u8], tag: &[u8]) -> bool;
}

/// Durable journal storage. A short or absent read is expected to behave as
/// a zeroed record and still report success, so an uninitialized journal
/// region is indistinguishable from "no prior state".
pub trait Journal {
    fn read(&mut self) -> JournalRecord;
    fn write(&mut self, rec: &JournalRecord) -> bool;
    fn clear(&mut self) -> bool;
}

/// A single trace event the core may emit. Carried as data rather than a
/// formatted string so a `no_std` sink (a ring buffer) can store it cheaply;
/// a host sink can format it however it likes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    CloneStart { src_addr: u32, dst_addr: u32, len: u32 },
    CloneEnd,
    ChunkApplied { idx: u16, off: u32, decoded_len: u32 },
    GuardrailReject,
    IntegrityMismatch { idx: u16 },
    Committed { active_slot: u8 },
}

pub trait LogSink {
    fn log(&mut self, event: Event);
}

/// The full capability set for one `apply_patch_from_memory` call.
///
/// `flash` and `slot` are required; `digest`, `journal`, and `log` are
/// optional capabilities the core only calls when present (and, for
/// `digest`, only when the build profile's algorithm demands it).
pub struct PortSet<'a> {
    pub flash: &'a mut dyn FlashIo,
    pub slot: &'a mut dyn SlotCommit,
    pub digest: Option<&'a mut dyn Crc32>,
    pub journal: Option<&'a mut dyn Journal>,
    pub log: Option<&'a mut dyn LogSink>,
}

impl<'a> PortSet<'a> {
    pub(crate) fn trace(&mut self, event: Event) {
        if let Some(log) = self.log.as_deref_mut() {
            log.log(event);
        }
    }
}
