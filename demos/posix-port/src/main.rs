// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A file-backed port for `tinymldelta-core`, plus a small CLI that applies
//! one patch to a simulated `flash.bin`.
//!
//! Mirrors the POSIX demo port: flash is a plain file, the active-slot index
//! is a one-byte companion file, and the 256 KiB flash is split into two
//! 128 KiB slots at offset 0 and 0x20000. No journal region is wired up here,
//! matching the upstream POSIX demo's flash map, which carries no
//! metadata/manifest region.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use tinymldelta_core::config::BuildProfile;
use tinymldelta_core::error::Status;
use tinymldelta_core::port::{Crc32, Event, FlashIo, LogSink, PortSet, SlotCommit};
use tinymldelta_core::{apply_patch_from_memory, Layout, Slot};

const FLASH_BYTES: u32 = 256 * 1024;
const SLOT_BYTES: u32 = 128 * 1024;
const SCRATCH: usize = 4096;

/// Apply a TinyMLDelta patch to a simulated dual-slot flash image.
#[derive(Parser, Debug)]
#[clap(about, version)]
struct Args {
    /// Path to the simulated flash image (created if it does not exist).
    flash: PathBuf,
    /// Path to the `.tmd` patch file to apply.
    patch: PathBuf,
    /// Path to the one-byte active-slot indicator file.
    #[clap(long, default_value = "active_slot.txt")]
    active_slot_path: PathBuf,
}

struct FileFlash {
    file: File,
}

impl FileFlash {
    fn open(path: &PathBuf) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let len = file.metadata()?.len();
        if len < FLASH_BYTES as u64 {
            file.set_len(FLASH_BYTES as u64)?;
        }
        Ok(FileFlash { file })
    }
}

impl FlashIo for FileFlash {
    fn erase(&mut self, addr: u32, len: u32) -> bool {
        let fill = vec![0xFFu8; len as usize];
        self.write(addr, &fill)
    }

    fn write(&mut self, addr: u32, src: &[u8]) -> bool {
        self.file.seek(SeekFrom::Start(addr as u64)).is_ok()
            && self.file.write_all(src).is_ok()
            && self.file.flush().is_ok()
    }

    fn read(&mut self, addr: u32, dst: &mut [u8]) -> bool {
        self.file.seek(SeekFrom::Start(addr as u64)).is_ok() && self.file.read_exact(dst).is_ok()
    }
}

struct FileSlot {
    path: PathBuf,
}

impl SlotCommit for FileSlot {
    fn active_slot(&mut self) -> u8 {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.first() == Some(&b'1') => 1,
            _ => 0,
        }
    }

    fn commit(&mut self, idx: u8) -> bool {
        std::fs::write(&self.path, [if idx != 0 { b'1' } else { b'0' }]).is_ok()
    }
}

struct SoftwareCrc32;

impl Crc32 for SoftwareCrc32 {
    fn crc32(&mut self, buf: &[u8]) -> u32 {
        crc::Crc::<u32>::new(&crc::CRC_32_ISO_HDLC).checksum(buf)
    }
}

struct EnvLogSink;

impl LogSink for EnvLogSink {
    fn log(&mut self, event: Event) {
        match event {
            Event::CloneStart {
                src_addr,
                dst_addr,
                len,
            } => info!("clone: 0x{src_addr:x} -> 0x{dst_addr:x}, {len} bytes"),
            Event::CloneEnd => info!("clone: done"),
            Event::ChunkApplied {
                idx,
                off,
                decoded_len,
            } => info!("chunk {idx}: wrote {decoded_len} bytes at 0x{off:x}"),
            Event::GuardrailReject => error!("guardrail rejected patch metadata"),
            Event::IntegrityMismatch { idx } => error!("chunk {idx}: CRC mismatch"),
            Event::Committed { active_slot } => info!("committed: active slot is now {active_slot}"),
        }
    }
}

fn layout() -> Layout {
    Layout {
        slot_a: Slot {
            addr: 0,
            size: SLOT_BYTES,
        },
        slot_b: Slot {
            addr: SLOT_BYTES,
            size: SLOT_BYTES,
        },
        meta_addr: FLASH_BYTES,
        meta_size: 0,
    }
}

fn profile() -> BuildProfile {
    let mut p = BuildProfile::crc32_defaults();
    p.scratch_sz = SCRATCH;
    p.journal_enabled = false;
    p
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let patch = match std::fs::read(&args.patch) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("failed to read patch file {}: {e}", args.patch.display());
            return ExitCode::from(1);
        }
    };

    let mut flash = match FileFlash::open(&args.flash) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("failed to open flash image {}: {e}", args.flash.display());
            return ExitCode::from(1);
        }
    };
    let mut slot = FileSlot {
        path: args.active_slot_path,
    };
    let mut digest = SoftwareCrc32;
    let mut log = EnvLogSink;

    let mut ports = PortSet {
        flash: &mut flash,
        slot: &mut slot,
        digest: Some(&mut digest),
        journal: None,
        log: Some(&mut log),
    };

    let result = apply_patch_from_memory::<SCRATCH>(&patch, &layout(), &profile(), &mut ports);
    let flags = result.as_ref().ok().copied();
    let status: Status = result.map(|_flags| ()).into();
    if status == Status::Ok {
        if let Some(flags) = flags.filter(|f| *f != 0) {
            info!("patch header carried reserved flags: 0x{flags:x}");
        }
        println!("Patch applied successfully.");
        ExitCode::SUCCESS
    } else {
        eprintln!("Patch apply failed with status {status:?}");
        ExitCode::from(2)
    }
}
