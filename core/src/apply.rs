// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The chunk applier and the top-level driver that composes every stage:
//! header parse, TLV/guardrail check, slot clone, per-chunk apply, journal,
//! and commit.

use crate::config::BuildProfile;
use crate::error::TmdError;
use crate::journal;
use crate::meta;
use crate::port::{Event, PortSet};
use crate::wire::{self, ChunkEncoding};
use crate::{clone, guardrail, rle, Layout, Slot};

/// Applies `patch` to the inactive slot described by `layout`, then flips
/// the active-slot indicator.
///
/// `SCRATCH` sizes both fixed stack buffers this function uses (one for
/// slot-cloning, one for RLE-decode output); it must be at least
/// `profile.scratch_sz`, and the largest single decoded chunk must fit in
/// it. The patch buffer is borrowed for the duration of the call and never
/// retained past return.
///
/// On success, returns the header's reserved `flags` value unexamined, so a
/// caller can inspect bits this crate does not itself interpret.
pub fn apply_patch_from_memory<const SCRATCH: usize>(
    patch: &[u8],
    layout: &Layout,
    profile: &BuildProfile,
    ports: &mut PortSet<'_>,
) -> Result<u16, TmdError> {
    if profile.scratch_sz > SCRATCH {
        return Err(TmdError::Param);
    }

    let hdr = wire::read_header(patch)?;
    if hdr.v() != 1 {
        return Err(TmdError::Header);
    }
    if hdr.algo() != profile.algo.wire_value() {
        return Err(TmdError::Unsupported);
    }

    let meta_len = hdr.meta_len() as usize;
    if wire::HEADER_LEN.checked_add(meta_len).ok_or(TmdError::Header)? > patch.len() {
        return Err(TmdError::Header);
    }
    let meta_buf = &patch[wire::HEADER_LEN..wire::HEADER_LEN + meta_len];
    let state = meta::parse(meta_buf)?;

    if guardrail::check(&state, profile).is_err() {
        ports.trace(Event::GuardrailReject);
        return Err(TmdError::Guardrail);
    }

    let active = ports.slot.active_slot();
    let inactive = if active == 0 { 1 } else { 0 };
    let (slot_src, slot_dst) = if active == 0 {
        (&layout.slot_a, &layout.slot_b)
    } else {
        (&layout.slot_b, &layout.slot_a)
    };

    if layout.slot_a.size != layout.slot_b.size {
        return Err(TmdError::Param);
    }

    ports.trace(Event::CloneStart {
        src_addr: slot_src.addr,
        dst_addr: slot_dst.addr,
        len: slot_src.size,
    });
    let mut clone_scratch = [0u8; SCRATCH];
    clone::clone_slot(
        ports.flash,
        slot_src,
        slot_dst,
        &mut clone_scratch[..profile.scratch_sz],
    )?;
    ports.trace(Event::CloneEnd);

    let patch_id = journal::derive_patch_id(hdr.target_chk());
    let mut active_journal = if profile.journal_enabled {
        ports
            .journal
            .as_deref_mut()
            .map(|j| journal::establish(j.read(), inactive, patch_id))
    } else {
        None
    };

    let mut rle_scratch = [0u8; SCRATCH];
    let mut off = wire::HEADER_LEN + meta_len;

    for idx in 0..hdr.chunks_n() {
        let ch = wire::read_chunk_header(patch.get(off..).ok_or(TmdError::Header)?)?;
        off += wire::CHUNK_HEADER_LEN;

        let mut stored_crc = 0u32;
        if ch.has_crc() {
            stored_crc = wire::read_u32_le(patch.get(off..).ok_or(TmdError::Header)?)?;
            off += wire::CHUNK_CRC_LEN;
        }

        let payload_len = ch.len() as usize;
        let encoded = patch
            .get(off..off + payload_len)
            .ok_or(TmdError::Header)?;
        off += payload_len;

        if ch.has_crc() {
            if let Some(digest) = ports.digest.as_deref_mut() {
                if digest.crc32(encoded) != stored_crc {
                    ports.trace(Event::IntegrityMismatch { idx });
                    return Err(TmdError::Integrity);
                }
            }
        }

        let encoding = ChunkEncoding::from_wire(ch.enc()).ok_or(TmdError::Unsupported)?;
        let decoded: &[u8] = match encoding {
            ChunkEncoding::Raw => encoded,
            ChunkEncoding::Rle => {
                let cap = profile.scratch_sz.min(rle_scratch.len());
                let n = rle::decode(encoded, &mut rle_scratch[..cap])?;
                &rle_scratch[..n]
            }
            ChunkEncoding::Lz4Tiny => return Err(TmdError::Unsupported),
        };

        let end = ch
            .off()
            .checked_add(decoded.len() as u32)
            .ok_or(TmdError::Param)?;
        if end > slot_dst.size {
            return Err(TmdError::Param);
        }

        if !ports.flash.write(slot_dst.addr + ch.off(), decoded) {
            return Err(TmdError::Flash);
        }
        ports.trace(Event::ChunkApplied {
            idx,
            off: ch.off(),
            decoded_len: decoded.len() as u32,
        });

        if let Some(rec) = active_journal.as_mut() {
            rec.next_chunk_idx = idx as u32 + 1;
            if let Some(j) = ports.journal.as_deref_mut() {
                j.write(rec);
            }
        }
    }

    if profile.journal_enabled {
        if let Some(j) = ports.journal.as_deref_mut() {
            j.clear();
        }
    }

    if !ports.slot.commit(inactive) {
        return Err(TmdError::Flash);
    }
    ports.trace(Event::Committed {
        active_slot: inactive,
    });

    Ok(hdr.flags())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{Crc32, FlashIo, Journal, SlotCommit};
    use std::vec;
    use std::vec::Vec;

    const SCRATCH: usize = 64;

    struct FakeFlash {
        mem: Vec<u8>,
    }

    impl FlashIo for FakeFlash {
        fn erase(&mut self, addr: u32, len: u32) -> bool {
            let (addr, len) = (addr as usize, len as usize);
            if addr + len > self.mem.len() {
                return false;
            }
            self.mem[addr..addr + len].fill(0xFF);
            true
        }
        fn write(&mut self, addr: u32, src: &[u8]) -> bool {
            let addr = addr as usize;
            if addr + src.len() > self.mem.len() {
                return false;
            }
            self.mem[addr..addr + src.len()].copy_from_slice(src);
            true
        }
        fn read(&mut self, addr: u32, dst: &mut [u8]) -> bool {
            let addr = addr as usize;
            if addr + dst.len() > self.mem.len() {
                return false;
            }
            dst.copy_from_slice(&self.mem[addr..addr + dst.len()]);
            true
        }
    }

    struct FakeSlot {
        active: u8,
    }

    impl SlotCommit for FakeSlot {
        fn active_slot(&mut self) -> u8 {
            self.active
        }
        fn commit(&mut self, idx: u8) -> bool {
            self.active = idx;
            true
        }
    }

    struct FakeCrc;
    impl Crc32 for FakeCrc {
        fn crc32(&mut self, buf: &[u8]) -> u32 {
            crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(buf)
        }
    }

    struct FakeJournal {
        rec: crate::journal::JournalRecord,
    }
    impl Journal for FakeJournal {
        fn read(&mut self) -> crate::journal::JournalRecord {
            self.rec
        }
        fn write(&mut self, rec: &crate::journal::JournalRecord) -> bool {
            self.rec = *rec;
            true
        }
        fn clear(&mut self) -> bool {
            self.rec = Default::default();
            true
        }
    }

    fn header_bytes(
        algo: u8,
        chunks_n: u16,
        meta_len: u16,
        target_chk: [u8; 32],
    ) -> Vec<u8> {
        let mut h = vec![0u8; wire::HEADER_LEN];
        h[0] = 1; // v
        h[1] = algo;
        h[2..4].copy_from_slice(&chunks_n.to_le_bytes());
        h[4..8].copy_from_slice(&256u32.to_le_bytes()); // base_len
        h[8..12].copy_from_slice(&256u32.to_le_bytes()); // target_len
        h[44..76].copy_from_slice(&target_chk);
        h[76..78].copy_from_slice(&meta_len.to_le_bytes());
        h
    }

    fn layout() -> Layout {
        Layout {
            slot_a: Slot { addr: 0, size: 256 },
            slot_b: Slot {
                addr: 256,
                size: 256,
            },
            meta_addr: 512,
            meta_size: 16,
        }
    }

    fn profile() -> BuildProfile {
        BuildProfile::crc32_defaults()
    }

    fn fresh_flash() -> FakeFlash {
        FakeFlash {
            mem: vec![0u8; 1024],
        }
    }

    // S1 — minimal RAW patch.
    #[test]
    fn s1_minimal_raw_patch() {
        let mut patch = header_bytes(1, 1, 0, [0u8; 32]);
        patch.extend_from_slice(&0u32.to_le_bytes()); // off
        patch.extend_from_slice(&4u16.to_le_bytes()); // len
        patch.push(0); // enc raw
        patch.push(0); // has_crc
        patch.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);

        let mut flash = fresh_flash();
        let mut slot = FakeSlot { active: 0 };
        let mut digest = FakeCrc;
        let mut journalp = FakeJournal {
            rec: Default::default(),
        };
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: Some(&mut digest),
            journal: Some(&mut journalp),
            log: None,
        };
        let layout = layout();
        let res = apply_patch_from_memory::<SCRATCH>(&patch, &layout, &profile(), &mut ports);
        assert_eq!(res, Ok(0));
        assert_eq!(&flash.mem[256..260], &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(flash.mem[260..512].iter().all(|&b| b == 0x00));
        assert_eq!(slot.active, 1);
    }

    // S2 — RLE chunk.
    #[test]
    fn s2_rle_chunk() {
        let mut patch = header_bytes(1, 1, 0, [0u8; 32]);
        patch.extend_from_slice(&10u32.to_le_bytes());
        patch.extend_from_slice(&2u16.to_le_bytes());
        patch.push(1); // enc RLE
        patch.push(0);
        patch.extend_from_slice(&[0x05, 0xAA]);

        let mut flash = fresh_flash();
        let mut slot = FakeSlot { active: 0 };
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: None,
            journal: None,
            log: None,
        };
        let res =
            apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports);
        assert_eq!(res, Ok(0));
        assert_eq!(&flash.mem[256 + 10..256 + 15], &[0xAA; 5]);
    }

    // S3 — CRC mismatch.
    #[test]
    fn s3_crc_mismatch_rejected() {
        let mut patch = header_bytes(1, 1, 0, [0u8; 32]);
        patch.extend_from_slice(&0u32.to_le_bytes());
        patch.extend_from_slice(&4u16.to_le_bytes());
        patch.push(0);
        patch.push(1); // has_crc
        patch.extend_from_slice(&0xDEADBEEFu32.to_le_bytes()); // wrong crc
        patch.extend_from_slice(&[1, 2, 3, 4]);

        let mut flash = fresh_flash();
        let mut slot = FakeSlot { active: 0 };
        let mut digest = FakeCrc;
        let mut journalp = FakeJournal {
            rec: Default::default(),
        };
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: Some(&mut digest),
            journal: Some(&mut journalp),
            log: None,
        };
        let res =
            apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports);
        assert_eq!(res, Err(TmdError::Integrity));
        assert_eq!(slot.active, 0);
        assert!(!journalp.rec.is_valid() || journalp.rec.next_chunk_idx == 0);
    }

    // S4 — guardrail reject.
    #[test]
    fn s4_guardrail_rejects_before_flash_write() {
        let mut patch = header_bytes(1, 0, 6, [0u8; 32]);
        // TLV: REQ_ARENA_BYTES tag=0x01 len=4 value=128KiB
        patch.push(0x01);
        patch.push(0x04);
        patch.extend_from_slice(&(128u32 * 1024).to_le_bytes());

        let mut flash = fresh_flash();
        let before = flash.mem.clone();
        let mut slot = FakeSlot { active: 0 };
        let mut profile = profile();
        profile.firmware_arena_bytes = 64 * 1024;
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: None,
            journal: None,
            log: None,
        };
        let res = apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile, &mut ports);
        assert_eq!(res, Err(TmdError::Guardrail));
        assert_eq!(flash.mem, before);
        assert_eq!(slot.active, 0);
    }

    // S5 — out-of-slot chunk.
    #[test]
    fn s5_out_of_slot_chunk_rejected() {
        let mut patch = header_bytes(1, 1, 0, [0u8; 32]);
        patch.extend_from_slice(&250u32.to_le_bytes());
        patch.extend_from_slice(&16u16.to_le_bytes());
        patch.push(0);
        patch.push(0);
        patch.extend_from_slice(&[0xFFu8; 16]);

        let mut flash = fresh_flash();
        let mut slot = FakeSlot { active: 0 };
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: None,
            journal: None,
            log: None,
        };
        let res =
            apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports);
        assert_eq!(res, Err(TmdError::Param));
        assert_eq!(slot.active, 0);
    }

    // S6 — version rejection.
    #[test]
    fn s6_unsupported_version_rejected() {
        let mut patch = header_bytes(1, 0, 0, [0u8; 32]);
        patch[0] = 2; // v=2

        let mut flash = fresh_flash();
        let before = flash.mem.clone();
        let mut slot = FakeSlot { active: 0 };
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: None,
            journal: None,
            log: None,
        };
        let res =
            apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports);
        assert_eq!(res, Err(TmdError::Header));
        assert_eq!(flash.mem, before);
        assert_eq!(slot.active, 0);
    }

    // A bad header must fail with ERR_HDR even when the layout itself is
    // invalid (mismatched slot sizes) — header parsing is stage 1 and must
    // be the first condition detected, regardless of what later stages would
    // also reject.
    #[test]
    fn header_error_precedes_mismatched_slot_size_check() {
        let mut patch = header_bytes(1, 0, 0, [0u8; 32]);
        patch[0] = 2; // v=2

        let mut flash = fresh_flash();
        let mut slot = FakeSlot { active: 0 };
        let mut ports = PortSet {
            flash: &mut flash,
            slot: &mut slot,
            digest: None,
            journal: None,
            log: None,
        };
        let mut bad_layout = layout();
        bad_layout.slot_b.size = bad_layout.slot_a.size + 1;
        let res =
            apply_patch_from_memory::<SCRATCH>(&patch, &bad_layout, &profile(), &mut ports);
        assert_eq!(res, Err(TmdError::Header));
    }

    // Property 7 — idempotent apply.
    #[test]
    fn repeated_apply_of_same_patch_is_idempotent_in_effect() {
        let mut patch = header_bytes(1, 1, 0, [0u8; 32]);
        patch.extend_from_slice(&0u32.to_le_bytes());
        patch.extend_from_slice(&4u16.to_le_bytes());
        patch.push(0);
        patch.push(0);
        patch.extend_from_slice(&[1, 2, 3, 4]);

        let mut flash = fresh_flash();
        let mut slot = FakeSlot { active: 0 };
        {
            let mut ports = PortSet {
                flash: &mut flash,
                slot: &mut slot,
                digest: None,
                journal: None,
                log: None,
            };
            apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports)
                .unwrap();
        }
        assert_eq!(slot.active, 1);
        let after_first = flash.mem.clone();

        {
            let mut ports = PortSet {
                flash: &mut flash,
                slot: &mut slot,
                digest: None,
                journal: None,
                log: None,
            };
            apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports)
                .unwrap();
        }
        assert_eq!(slot.active, 0);
        assert_eq!(&flash.mem[0..4], &after_first[256..260]);
    }
}
