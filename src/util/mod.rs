/*
    libmirage
    https://github.com/dbalsom/fluxfox

    Copyright 2024-2025 Daniel Balsom

    Permission is hereby granted, free of charge, to any person obtaining a
    copy of this software and associated documentation files (the “Software”),
    to deal in the Software without restriction, including without limitation
    the rights to use, copy, modify, merge, publish, distribute, sublicense,
    and/or sell copies of the Software, and to permit persons to whom the
    Software is furnished to do so, subject to the following conditions:

    The above copyright notice and this permission notice shall be included in
    all copies or substantial portions of the Software.

    THE SOFTWARE IS PROVIDED “AS IS”, WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
    IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
    FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
    AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
    LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
    FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
    DEALINGS IN THE SOFTWARE.

    --------------------------------------------------------------------------

    src/util/mod.rs

    Pure functions and precomputed tables used by every layer above (C1).
*/
pub mod crc;
pub mod ecc;
pub mod isrc;
pub mod msf;
pub mod scrambler;
pub mod subchannel;

pub use crc::{crc16_ccitt, crc16_wire, crc32_edc, crc32_zlib};
pub use ecc::{ecc_p, ecc_q};
pub use isrc::{isrc_pack, isrc_unpack};
pub use msf::{bcd_to_hex, bcd_to_msf, hex_to_bcd, lba_to_msf, msf_to_bcd, msf_to_lba, Msf};
pub use scrambler::scramble;
pub use subchannel::{deinterleave_channel, deinterleave_q, interleave_pw, mcn_pack, mcn_unpack};
