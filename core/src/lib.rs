// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `tinymldelta-core`: the patch-application state machine for a dual-slot
//! OTA update of an embedded ML model/firmware image.
//!
//! This crate owns the parsing, guardrail enforcement, slot cloning,
//! chunk-apply, journaling, and commit logic. It never touches flash,
//! storage, or a clock directly — those are the caller's [`port::PortSet`].
#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod error;
pub mod journal;
pub mod port;
pub mod wire;

mod apply;
mod clone;
mod guardrail;
mod meta;
mod rle;

pub use apply::apply_patch_from_memory;

/// A flash region: base address and length, in the port's own address space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub addr: u32,
    pub size: u32,
}

/// The two update slots plus the metadata region, as supplied by the port.
///
/// `slot_a` and `slot_b` must be the same size; which one is currently active
/// is reported by [`port::SlotCommit::active_slot`], not stored here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub slot_a: Slot,
    pub slot_b: Slot,
    pub meta_addr: u32,
    pub meta_size: u32,
}
