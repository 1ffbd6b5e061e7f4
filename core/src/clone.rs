// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Slot cloner: copies the active slot into the inactive slot via a
//! scratch-buffered read/write loop, before any chunk is applied.
//!
//! No journal write happens here — the clone must be complete before the
//! chunk phase begins.

use crate::error::TmdError;
use crate::port::FlashIo;
use crate::Slot;

/// Erases `dst` and copies `src`'s contents into it, `scratch.len()` bytes
/// at a time.
pub fn clone_slot(
    flash: &mut dyn FlashIo,
    src: &Slot,
    dst: &Slot,
    scratch: &mut [u8],
) -> Result<(), TmdError> {
    if !flash.erase(dst.addr, dst.size) {
        return Err(TmdError::Flash);
    }

    let mut remaining = dst.size;
    let mut src_off = 0u32;
    let mut dst_off = 0u32;

    while remaining > 0 {
        let step = remaining.min(scratch.len() as u32);
        let buf = &mut scratch[..step as usize];
        if !flash.read(src.addr + src_off, buf) {
            return Err(TmdError::Flash);
        }
        if !flash.write(dst.addr + dst_off, buf) {
            return Err(TmdError::Flash);
        }
        remaining -= step;
        src_off += step;
        dst_off += step;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec;
    use std::vec::Vec;

    struct FakeFlash {
        mem: Vec<u8>,
    }

    impl FlashIo for FakeFlash {
        fn erase(&mut self, addr: u32, len: u32) -> bool {
            let addr = addr as usize;
            let len = len as usize;
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

    #[test]
    fn clone_matches_source_byte_for_byte() {
        let mut flash = FakeFlash {
            mem: vec![0u8; 1024],
        };
        for (i, b) in flash.mem[0..256].iter_mut().enumerate() {
            *b = i as u8;
        }
        let src = Slot { addr: 0, size: 256 };
        let dst = Slot {
            addr: 512,
            size: 256,
        };
        let mut scratch = [0u8; 37]; // deliberately not a divisor of 256
        clone_slot(&mut flash, &src, &dst, &mut scratch).unwrap();
        assert_eq!(&flash.mem[0..256], &flash.mem[512..768]);
    }

    #[test]
    fn erase_failure_propagates() {
        let mut flash = FakeFlash { mem: vec![0u8; 4] };
        let src = Slot { addr: 0, size: 8 };
        let dst = Slot { addr: 0, size: 8 };
        let mut scratch = [0u8; 4];
        assert_eq!(
            clone_slot(&mut flash, &src, &dst, &mut scratch),
            Err(TmdError::Flash)
        );
    }
}
