// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error taxonomy for the patch-application state machine.
//!
//! [`TmdError`] is the idiomatic Rust error type threaded through `?` inside
//! this crate. [`Status`] is the flat, `OK`-inclusive wire/FFI-facing code a
//! caller ultimately observes, mirroring the status enums the platform port
//! and any host tooling exchange with the core.

/// Reasons the patch-application pipeline can fail.
///
/// Each variant corresponds to one of the conditions enumerated in the
/// error-handling design: the first one detected is returned immediately, no
/// error is recovered locally, and no retries are attempted by the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TmdError {
    /// Caller misuse or structural impossibility: truncated patch, mismatched
    /// slot sizes, a chunk target outside slot bounds.
    Param,
    /// Malformed wire data: bad version, truncated TLV/chunk, RLE overflow.
    Header,
    /// A chunk's stored CRC did not match its encoded payload.
    Integrity,
    /// Metadata guardrails rejected the device's capabilities.
    Guardrail,
    /// A port-level flash operation returned failure.
    Flash,
    /// `algo` did not match the build, or an unknown chunk encoding was seen.
    Unsupported,
    /// Reserved; should not occur on a correct code path.
    Internal,
}

/// Flat status code returned to callers outside this crate (FFI, host CLI,
/// logs). `Ok` is first so a C-style caller can treat `0` as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0,
    ErrParam,
    ErrHdr,
    ErrIntegrity,
    ErrGuardrail,
    ErrFlash,
    ErrUnsupported,
    ErrInternal,
}

impl From<TmdError> for Status {
    fn from(e: TmdError) -> Self {
        match e {
            TmdError::Param => Status::ErrParam,
            TmdError::Header => Status::ErrHdr,
            TmdError::Integrity => Status::ErrIntegrity,
            TmdError::Guardrail => Status::ErrGuardrail,
            TmdError::Flash => Status::ErrFlash,
            TmdError::Unsupported => Status::ErrUnsupported,
            TmdError::Internal => Status::ErrInternal,
        }
    }
}

impl From<Result<(), TmdError>> for Status {
    fn from(r: Result<(), TmdError>) -> Self {
        match r {
            Ok(()) => Status::Ok,
            Err(e) => e.into(),
        }
    }
}
