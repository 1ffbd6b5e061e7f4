// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Guardrail enforcement: rejects patches whose metadata is incompatible
//! with this device's declared capabilities, before any flash is touched.

use crate::config::BuildProfile;
use crate::error::TmdError;
use crate::meta::MetaState;

/// Checks `meta` against `profile`'s device capability constants.
///
/// A zero in a metadata field means "not asserted by the patch"; a zero in a
/// firmware constant means "not asserted by the device". Either disables the
/// corresponding check.
pub fn check(meta: &MetaState, profile: &BuildProfile) -> Result<(), TmdError> {
    if meta.req_arena_bytes > 0 && meta.req_arena_bytes > profile.firmware_arena_bytes {
        return Err(TmdError::Guardrail);
    }
    if meta.tflm_abi > 0 && meta.tflm_abi > profile.firmware_tflm_abi {
        return Err(TmdError::Guardrail);
    }
    if profile.firmware_opset_hash != 0
        && meta.opset_hash != 0
        && meta.opset_hash != profile.firmware_opset_hash
    {
        return Err(TmdError::Guardrail);
    }
    if profile.enforce_io_hash
        && profile.firmware_io_hash != 0
        && meta.io_hash != 0
        && meta.io_hash != profile.firmware_io_hash
    {
        return Err(TmdError::Guardrail);
    }
    Ok(())
}
