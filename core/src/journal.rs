// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The crash-safe journal: an idempotent progress marker, not a
//! write-ahead log of payload contents.
//!
//! The journal's job is to let the device *detect*, after a reset, that an
//! apply was interrupted. The specified behavior on the next call is a full
//! restart (re-clone, re-apply every chunk from scratch) rather than
//! resuming from `next_chunk_idx` — see the open-question ledger in
//! DESIGN.md for why resume-from-cursor is out of scope here.

pub const JOURNAL_MAGIC: u32 = 0x544D_4450; // 'TMDP'

/// The persisted progress record: `{magic, patch_id, next_chunk_idx,
/// target_slot}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JournalRecord {
    pub magic: u32,
    pub patch_id: u32,
    pub next_chunk_idx: u32,
    pub target_slot: u8,
}

impl JournalRecord {
    pub fn is_valid(&self) -> bool {
        self.magic == JOURNAL_MAGIC
    }
}

/// Derives a `patch_id` from a patch's `target_chk` digest, so a journal
/// entry can later tell whether the patch being applied now is the same one
/// that was in flight before a reset, or a substitution.
///
/// This is additive: the original firmware always stored `0` here. Using
/// the leading 4 bytes of `target_chk` costs nothing and turns a dead field
/// into a (coarse) mid-apply substitution detector.
pub fn derive_patch_id(target_chk: &[u8; 32]) -> u32 {
    u32::from_le_bytes([target_chk[0], target_chk[1], target_chk[2], target_chk[3]])
}

/// Establishes the journal record to use for this apply.
///
/// If the on-disk record is valid *and* already targets `target_slot`, it is
/// reused as-is (its `next_chunk_idx` is not acted on by the applier, which
/// always restarts from chunk 0 — only the final `clear()` observes it).
/// Otherwise the record is re-initialized.
pub fn establish(existing: JournalRecord, target_slot: u8, patch_id: u32) -> JournalRecord {
    if existing.is_valid() && existing.target_slot == target_slot {
        existing
    } else {
        JournalRecord {
            magic: JOURNAL_MAGIC,
            patch_id,
            next_chunk_idx: 0,
            target_slot,
        }
    }
}
