// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Run-length decoder for `enc == 1` chunk payloads.
//!
//! Wire format: pairs `(count: u8, value: u8)`, with `count == 0` meaning a
//! run of 256. This is unrelated to the escape-byte RLE scheme used
//! elsewhere in the corpus for bitstream compression; the wire format here
//! is dictated by the patch format, not chosen by us.

use crate::error::TmdError;

/// Decodes `input` into the front of `out`, returning the number of bytes
/// written.
///
/// A trailing single byte (odd-length input) is dropped rather than read
/// out of bounds. A run that would overflow `out` is a decode failure.
pub fn decode(input: &[u8], out: &mut [u8]) -> Result<usize, TmdError> {
    let mut o = 0usize;
    let mut i = 0usize;

    while i + 2 <= input.len() {
        let count = input[i];
        let value = input[i + 1];
        i += 2;

        let run = if count == 0 { 256usize } else { count as usize };
        if o + run > out.len() {
            return Err(TmdError::Header);
        }
        out[o..o + run].fill(value);
        o += run;
    }

    Ok(o)
}
