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

    src/sector/mod.rs

    Reconstruction and verification of the 2352-byte raw sector (C6): the
    hardest single file in the crate. See spec.md §4.1.
*/
use crate::error::{MirageError, MirageResult};
use crate::util::{bcd_to_msf, crc32_edc, ecc_p, ecc_q, interleave_pw, isrc_pack, lba_to_msf, mcn_pack, msf_to_bcd, scramble};
use bitflags::bitflags;

const SYNC_PATTERN: [u8; 12] = [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x00];

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SectorKind {
    Audio,
    Mode0,
    Mode1,
    Mode2Formless,
    Mode2Form1,
    Mode2Form2,
    /// Input-only hint: Mode-2 sector whose Form is not yet known; resolved
    /// to `Mode2Form1`/`Mode2Form2` during `feed_data`.
    Mode2Mixed,
    /// Input-only hint: a full raw sector whose kind is not yet known;
    /// resolved by inspecting the sync pattern and header mode byte.
    Raw,
    /// Like `Raw`, but the data is ECMA-130 scrambled and must be
    /// unscrambled before classification.
    RawScrambled,
}

bitflags! {
    /// Which of a sector's six logical fields are present. `real` tracks
    /// what the image actually supplied; `valid` additionally includes
    /// whatever has since been synthesized. Invariant: `real ⊆ valid`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectorFields: u8 {
        const SYNC = 0b0000_0001;
        const HEADER = 0b0000_0010;
        const SUBHEADER = 0b0000_0100;
        const USER_DATA = 0b0000_1000;
        const EDC_ECC = 0b0001_0000;
        const SUBCHANNEL = 0b0010_0000;
    }
}

/// One contiguous field range within the 2352-byte main-channel buffer.
type FieldRange = (SectorFields, usize, usize);

fn field_layout(kind: SectorKind) -> &'static [FieldRange] {
    use SectorFields as F;
    match kind {
        SectorKind::Audio => &[(F::USER_DATA, 0, 2352)],
        SectorKind::Mode0 | SectorKind::Mode2Formless => {
            &[(F::SYNC, 0, 12), (F::HEADER, 12, 16), (F::USER_DATA, 16, 2352)]
        }
        SectorKind::Mode1 => &[
            (F::SYNC, 0, 12),
            (F::HEADER, 12, 16),
            (F::USER_DATA, 16, 2064),
            (F::EDC_ECC, 2064, 2352),
        ],
        SectorKind::Mode2Form1 => &[
            (F::SYNC, 0, 12),
            (F::HEADER, 12, 16),
            (F::SUBHEADER, 16, 24),
            (F::USER_DATA, 24, 2072),
            (F::EDC_ECC, 2072, 2352),
        ],
        SectorKind::Mode2Form2 => &[
            (F::SYNC, 0, 12),
            (F::HEADER, 12, 16),
            (F::SUBHEADER, 16, 24),
            (F::USER_DATA, 24, 2348),
            (F::EDC_ECC, 2348, 2352),
        ],
        // Resolved away during feed_data; kept here only so full-sector (L=2352)
        // ingestion/extraction has a layout to match against before resolution.
        SectorKind::Mode2Mixed | SectorKind::Raw | SectorKind::RawScrambled => &[
            (F::SYNC, 0, 12),
            (F::HEADER, 12, 16),
            (F::SUBHEADER, 16, 24),
            (F::USER_DATA, 24, 2072),
            (F::EDC_ECC, 2072, 2352),
        ],
    }
}

/// All `(length, offset, real fields)` combinations a structured `kind` may
/// be fed or extracted as: the user-data field is always present, the
/// fields immediately preceding it (Sync, Header, Subheader as applicable)
/// may be included as a growing prefix counted backward from data, and the
/// trailing EDC/ECC field, if this kind has one, may independently be
/// included or omitted. Mirrors the length table in mirage-sector.c.
fn structured_feed_table(kind: SectorKind) -> Vec<(usize, usize, SectorFields)> {
    let layout = field_layout(kind);
    let data_idx = layout
        .iter()
        .position(|(f, _, _)| *f == SectorFields::USER_DATA)
        .expect("every kind's layout has a USER_DATA field");
    let prefix = &layout[..data_idx];
    let suffix = &layout[data_idx + 1..];
    let (data_field, data_start, data_end) = layout[data_idx];

    let mut table = Vec::new();
    for p in 0..=prefix.len() {
        let (offset, prefix_fields) = if p == 0 {
            (data_start, SectorFields::empty())
        } else {
            let included = &prefix[prefix.len() - p..];
            let fields = included.iter().fold(SectorFields::empty(), |acc, (f, _, _)| acc | *f);
            (included[0].1, fields)
        };
        for include_suffix in [false, true] {
            if include_suffix && suffix.is_empty() {
                continue;
            }
            let (end, suffix_fields) = if include_suffix {
                let (f, _, e) = suffix[suffix.len() - 1];
                (e, f)
            } else {
                (data_end, SectorFields::empty())
            };
            table.push((end - offset, offset, prefix_fields | data_field | suffix_fields));
        }
    }
    table
}

fn mode_byte(kind: SectorKind) -> u8 {
    match kind {
        SectorKind::Mode0 => 0,
        SectorKind::Mode1 => 1,
        _ => 2,
    }
}

/// A single 2352-byte logical sector at an absolute LBA (spec.md §3.1).
#[derive(Debug, Clone)]
pub struct Sector {
    kind: SectorKind,
    lba: i32,
    main: [u8; 2352],
    subchannel: [u8; 96],
    real: SectorFields,
    valid: SectorFields,
}

/// Context needed to synthesize Q subchannel data, supplied by whichever
/// Track constructed this sector (Sector itself is not retained by the
/// layout and knows nothing about its parent).
#[derive(Debug, Clone)]
pub struct SubchannelContext {
    pub ctl: u8,
    pub track_number: u8,
    /// Track-relative LBA at which index 01 begins.
    pub track_start: i32,
    pub mcn: Option<[u8; 13]>,
    pub isrc: Option<[u8; 12]>,
    pub is_audio_track: bool,
    /// Ascending track-relative addresses at which index numbers 2, 3, 4...
    /// begin (parallel to `Track`'s index list).
    pub index_starts: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubchannelReadFormat {
    Pw,
    Rw,
    Q,
}

impl Sector {
    /// Feed a main-channel buffer of length `main_data.len()` for sector
    /// `kind` at absolute `lba`. `ignore` marks fields that should be
    /// treated as absent even though the buffer length would normally imply
    /// them (rarely needed; defaults to empty).
    pub fn feed_data(lba: i32, kind: SectorKind, main_data: &[u8], ignore: SectorFields) -> MirageResult<Sector> {
        match kind {
            SectorKind::Raw | SectorKind::RawScrambled | SectorKind::Mode2Mixed => {
                Self::feed_raw(lba, kind, main_data, ignore)
            }
            _ => Self::feed_structured(lba, kind, main_data, ignore),
        }
    }

    fn feed_structured(lba: i32, kind: SectorKind, main_data: &[u8], ignore: SectorFields) -> MirageResult<Sector> {
        let (offset, fields) = structured_feed_table(kind)
            .into_iter()
            .find(|(len, _, _)| *len == main_data.len())
            .map(|(_, offset, fields)| (offset, fields))
            .ok_or_else(|| {
                MirageError::sector(format!(
                    "{kind}: length {} does not correspond to any field combination for this kind",
                    main_data.len()
                ))
            })?;
        let real = fields & !ignore;

        let mut main = [0u8; 2352];
        main[offset..offset + main_data.len()].copy_from_slice(main_data);

        Ok(Sector {
            kind,
            lba,
            main,
            subchannel: [0u8; 96],
            real,
            valid: real,
        })
    }

    fn feed_raw(lba: i32, kind: SectorKind, main_data: &[u8], ignore: SectorFields) -> MirageResult<Sector> {
        if main_data.len() != 2352 {
            return Err(MirageError::sector(format!(
                "{kind}: raw feed requires exactly 2352 bytes, got {}",
                main_data.len()
            )));
        }
        let mut main = [0u8; 2352];
        main.copy_from_slice(main_data);
        if kind == SectorKind::RawScrambled {
            scramble(&mut main);
        }

        let resolved_kind = if kind == SectorKind::Mode2Mixed {
            resolve_mode2_form(&main)
        } else if main[0..12] == SYNC_PATTERN {
            match main[15] {
                0 => SectorKind::Mode0,
                1 => SectorKind::Mode1,
                2 => resolve_mode2_form(&main),
                _ => SectorKind::Audio,
            }
        } else {
            SectorKind::Audio
        };

        let full = SectorFields::all() & !SectorFields::SUBCHANNEL;
        let real = match resolved_kind {
            SectorKind::Audio => SectorFields::USER_DATA,
            _ => full,
        } & !ignore;

        Ok(Sector {
            kind: resolved_kind,
            lba,
            main,
            subchannel: [0u8; 96],
            real,
            valid: real,
        })
    }

    pub fn kind(&self) -> SectorKind {
        self.kind
    }

    pub fn lba(&self) -> i32 {
        self.lba
    }

    pub fn real_fields(&self) -> SectorFields {
        self.real
    }

    pub fn valid_fields(&self) -> SectorFields {
        self.valid
    }

    fn ensure(&mut self, field: SectorFields) {
        if self.valid.contains(field) {
            return;
        }
        match field {
            SectorFields::SYNC => self.generate_sync(),
            SectorFields::HEADER => self.generate_header(),
            SectorFields::SUBHEADER => self.generate_subheader(),
            SectorFields::USER_DATA => self.generate_data(),
            SectorFields::EDC_ECC => self.generate_edc_ecc(),
            _ => {}
        }
    }

    pub fn generate_sync(&mut self) {
        if self.kind != SectorKind::Audio {
            self.main[0..12].copy_from_slice(&SYNC_PATTERN);
        }
        self.valid |= SectorFields::SYNC;
    }

    pub fn generate_header(&mut self) {
        let msf = lba_to_msf(self.lba, true);
        let bcd = msf_to_bcd(msf);
        self.main[12..15].copy_from_slice(&bcd);
        self.main[15] = mode_byte(self.kind);
        self.valid |= SectorFields::HEADER;
    }

    pub fn generate_subheader(&mut self) {
        match self.kind {
            SectorKind::Mode2Form1 => {
                self.main[16 + 2] &= !0x20;
                self.main[16 + 5] = self.main[16 + 2];
            }
            SectorKind::Mode2Form2 => {
                self.main[16 + 2] |= 0x20;
                self.main[16 + 5] = self.main[16 + 2];
            }
            _ => {}
        }
        self.valid |= SectorFields::SUBHEADER;
    }

    pub fn generate_data(&mut self) {
        if let Some((_, start, end)) = field_layout(self.kind)
            .iter()
            .find(|(f, _, _)| *f == SectorFields::USER_DATA)
        {
            for b in &mut self.main[*start..*end] {
                *b = 0;
            }
        }
        self.valid |= SectorFields::USER_DATA;
    }

    pub fn generate_edc_ecc(&mut self) {
        match self.kind {
            SectorKind::Mode1 => {
                self.ensure(SectorFields::SYNC);
                self.ensure(SectorFields::HEADER);
                let edc = crc32_edc(0, &self.main[0..0x810]);
                self.main[0x810..0x814].copy_from_slice(&edc.to_le_bytes());
                let p = ecc_p(&self.main[0x0C..0x81C]);
                self.main[0x81C..0x81C + 172].copy_from_slice(&p);
                let q = ecc_q(&self.main[0x0C..0x8C8]);
                self.main[0x8C8..0x8C8 + 104].copy_from_slice(&q);
            }
            SectorKind::Mode2Form1 => {
                self.ensure(SectorFields::SYNC);
                self.ensure(SectorFields::HEADER);
                self.ensure(SectorFields::SUBHEADER);
                let saved_header: [u8; 4] = self.main[12..16].try_into().unwrap();
                self.main[12..16].fill(0);
                let edc = crc32_edc(0, &self.main[0x10..0x818]);
                self.main[0x818..0x81C].copy_from_slice(&edc.to_le_bytes());
                let p = ecc_p(&self.main[0x0C..0x81C]);
                self.main[0x81C..0x81C + 172].copy_from_slice(&p);
                let q = ecc_q(&self.main[0x0C..0x8C8]);
                self.main[0x8C8..0x8C8 + 104].copy_from_slice(&q);
                self.main[12..16].copy_from_slice(&saved_header);
            }
            SectorKind::Mode2Form2 => {
                self.ensure(SectorFields::SYNC);
                self.ensure(SectorFields::HEADER);
                self.ensure(SectorFields::SUBHEADER);
                let edc = crc32_edc(0, &self.main[0x10..0x92C]);
                self.main[0x92C..0x930].copy_from_slice(&edc.to_le_bytes());
            }
            _ => {}
        }
        self.valid |= SectorFields::EDC_ECC;
    }

    /// `true` iff the sector's stored EDC equals the recomputed value.
    /// Kinds without an EDC/ECC field trivially succeed. ECC itself is not
    /// reverified: the contract is detection, not correction.
    pub fn verify_lec(&mut self) -> bool {
        match self.kind {
            SectorKind::Mode1 => {
                self.ensure(SectorFields::SYNC);
                self.ensure(SectorFields::HEADER);
                let computed = crc32_edc(0, &self.main[0..0x810]);
                let stored = u32::from_le_bytes(self.main[0x810..0x814].try_into().unwrap());
                computed == stored
            }
            SectorKind::Mode2Form1 => {
                self.ensure(SectorFields::SYNC);
                self.ensure(SectorFields::HEADER);
                self.ensure(SectorFields::SUBHEADER);
                let computed = crc32_edc(0, &self.main[0x10..0x818]);
                let stored = u32::from_le_bytes(self.main[0x818..0x81C].try_into().unwrap());
                computed == stored
            }
            SectorKind::Mode2Form2 => {
                self.ensure(SectorFields::SYNC);
                self.ensure(SectorFields::HEADER);
                self.ensure(SectorFields::SUBHEADER);
                let computed = crc32_edc(0, &self.main[0x10..0x92C]);
                let stored = u32::from_le_bytes(self.main[0x92C..0x930].try_into().unwrap());
                computed == stored
            }
            _ => true,
        }
    }

    /// Extract a prefix-aligned slice of the raw sector of the requested
    /// length, synthesizing any missing required field along the way.
    pub fn extract_data(&mut self, length: usize) -> MirageResult<Vec<u8>> {
        let (offset, required) = structured_feed_table(self.kind)
            .into_iter()
            .find(|(len, _, _)| *len == length)
            .map(|(_, offset, fields)| (offset, fields))
            .ok_or_else(|| MirageError::sector(format!("{}: field not available for this kind", self.kind)))?;

        for field in [
            SectorFields::SYNC,
            SectorFields::HEADER,
            SectorFields::SUBHEADER,
            SectorFields::USER_DATA,
            SectorFields::EDC_ECC,
        ] {
            if required.contains(field) {
                self.ensure(field);
            }
        }
        Ok(self.main[offset..offset + length].to_vec())
    }

    /// Synthesize the 96-byte PW subchannel if it was not fed, using
    /// `ctx` for track/session-dependent fields (MCN, ISRC, index numbers).
    pub fn synthesize_subchannel(&mut self, track_relative: i32, ctx: &SubchannelContext) {
        if self.valid.contains(SectorFields::SUBCHANNEL) {
            return;
        }
        self.subchannel = synthesize_pw(self.lba, track_relative, ctx);
        self.valid |= SectorFields::SUBCHANNEL;
    }

    /// Feed subchannel data directly (as opposed to synthesizing it).
    pub fn feed_subchannel(&mut self, pw: [u8; 96]) {
        self.subchannel = pw;
        self.real |= SectorFields::SUBCHANNEL;
        self.valid |= SectorFields::SUBCHANNEL;
    }

    pub fn extract_subchannel(&self, format: SubchannelReadFormat) -> MirageResult<Vec<u8>> {
        if !self.valid.contains(SectorFields::SUBCHANNEL) {
            return Err(MirageError::sector("subchannel not available: not fed or synthesized"));
        }
        match format {
            SubchannelReadFormat::Pw | SubchannelReadFormat::Rw => Ok(self.subchannel.to_vec()),
            SubchannelReadFormat::Q => {
                let q = crate::util::deinterleave_q(&self.subchannel);
                let mut out = vec![0u8; 16];
                out[0..12].copy_from_slice(&q);
                Ok(out)
            }
        }
    }
}

fn resolve_mode2_form(main: &[u8; 2352]) -> SectorKind {
    if main[16 + 2] & 0x20 != 0 {
        SectorKind::Mode2Form2
    } else {
        SectorKind::Mode2Form1
    }
}

fn synthesize_pw(lba: i32, track_relative: i32, ctx: &SubchannelContext) -> [u8; 96] {
    let p = if track_relative < ctx.track_start { [0xFFu8; 12] } else { [0u8; 12] };

    let rel_mod = track_relative.rem_euclid(100);
    let mut q = [0u8; 12];

    if rel_mod == 25 && ctx.mcn.is_some() {
        q[0] = (ctx.ctl << 4) | 2;
        let packed = mcn_pack(ctx.mcn.as_ref().unwrap());
        q[1..8].copy_from_slice(&packed);
        q[8] = 0;
        q[9] = crate::util::hex_to_bcd(lba_to_msf(lba, true).f);
    } else if rel_mod == 50 && ctx.is_audio_track && ctx.isrc.is_some() {
        q[0] = (ctx.ctl << 4) | 3;
        let packed = isrc_pack(ctx.isrc.as_ref().unwrap());
        q[1..9].copy_from_slice(&packed);
        q[9] = crate::util::hex_to_bcd(lba_to_msf(lba, true).f);
    } else {
        q[0] = (ctx.ctl << 4) | 1;
        q[1] = crate::util::hex_to_bcd(ctx.track_number);
        q[2] = crate::util::hex_to_bcd(q_index_number(track_relative, ctx.track_start, &ctx.index_starts));
        let rel_msf = lba_to_msf(track_relative, false);
        q[3..6].copy_from_slice(&msf_to_bcd(rel_msf));
        q[6] = 0;
        let abs_msf = lba_to_msf(lba, true);
        q[7..10].copy_from_slice(&msf_to_bcd(abs_msf));
    }

    let crc = crate::util::crc16_wire(&q[0..10]);
    q[10] = crc[0];
    q[11] = crc[1];

    let mut channels = [[0u8; 12]; 8];
    channels[0] = p;
    channels[1] = q;
    interleave_pw(&channels)
}

fn q_index_number(track_relative: i32, track_start: i32, index_starts: &[u32]) -> u8 {
    if track_relative < track_start {
        return 0;
    }
    let mut number = 1u8;
    for &start in index_starts {
        if track_relative as u32 >= start {
            number += 1;
        } else {
            break;
        }
    }
    number
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_ctx() -> SubchannelContext {
        SubchannelContext {
            ctl: 0,
            track_number: 1,
            track_start: 0,
            mcn: None,
            isrc: None,
            is_audio_track: true,
            index_starts: vec![],
        }
    }

    #[test]
    fn structured_feed_table_mode1_matches_source_length_table() {
        let mut table: Vec<(usize, usize)> = structured_feed_table(SectorKind::Mode1)
            .into_iter()
            .map(|(len, offset, _)| (len, offset))
            .collect();
        table.sort_unstable();
        let mut expected = vec![(2048, 16), (2052, 12), (2064, 0), (2336, 16), (2340, 12), (2352, 0)];
        expected.sort_unstable();
        assert_eq!(table, expected);
    }

    #[test]
    fn s1_audio_sector_synth() {
        let data = vec![0xABu8; 2352];
        let mut sector = Sector::feed_data(150, SectorKind::Audio, &data, SectorFields::empty()).unwrap();
        let out = sector.extract_data(2352).unwrap();
        assert!(out.iter().all(|&b| b == 0xAB));

        let ctx = default_ctx();
        sector.synthesize_subchannel(150, &ctx);
        let pw = sector.extract_subchannel(SubchannelReadFormat::Pw).unwrap();
        let p = crate::util::deinterleave_channel(pw.as_slice().try_into().unwrap(), 0);
        assert_eq!(p, [0u8; 12]);
    }

    #[test]
    fn s2_mode1_edc_header() {
        let data = vec![0u8; 2048];
        let mut sector = Sector::feed_data(16, SectorKind::Mode1, &data, SectorFields::empty()).unwrap();
        let raw = sector.extract_data(2352).unwrap();
        assert_eq!(&raw[0..12], &SYNC_PATTERN);
        assert_eq!(&raw[12..16], &[0x00, 0x02, 0x16, 0x01]);
        let edc_expected = crc32_edc(0, &raw[0..0x810]).to_le_bytes();
        assert_eq!(&raw[0x810..0x814], &edc_expected);
    }

    #[test]
    fn invariant_2_mode1_edc_synthesized_verifies() {
        let data: Vec<u8> = (0..2048u32).map(|i| (i * 7 % 251) as u8).collect();
        let mut sector = Sector::feed_data(0, SectorKind::Mode1, &data, SectorFields::empty()).unwrap();
        assert!(sector.verify_lec());
    }

    #[test]
    fn invariant_3_mode1_form1_form2_full_sector_edc_matches() {
        for kind in [SectorKind::Mode1, SectorKind::Mode2Form1, SectorKind::Mode2Form2] {
            let user_len = field_layout(kind)
                .iter()
                .find(|(f, _, _)| *f == SectorFields::USER_DATA)
                .map(|(_, s, e)| e - s)
                .unwrap();
            let mut sector = Sector::feed_data(0, kind, &vec![0x5Au8; user_len], SectorFields::empty()).unwrap();
            let full = sector.extract_data(2352).unwrap();
            let mut reread = Sector::feed_data(0, kind, &full, SectorFields::empty()).unwrap();
            assert!(reread.verify_lec(), "{kind} EDC must match after full round trip");
        }
    }

    #[test]
    fn invariant_7_and_s1_q_subchannel_crc_relationship() {
        let ctx = default_ctx();
        let pw = synthesize_pw(0, 0, &ctx);
        let q = crate::util::deinterleave_q(&pw);
        let crc_field = u16::from_be_bytes([q[10], q[11]]);
        let computed = crate::util::crc16_ccitt(&q[0..10]) ^ 0xFFFF;
        assert_eq!(crc_field, computed);
    }

    #[test]
    fn mode2_mixed_resolves_form1_vs_form2() {
        let mut form1 = vec![0u8; 2352];
        form1[0..12].copy_from_slice(&SYNC_PATTERN);
        form1[15] = 2;
        // subheader bit5 clear => Form1
        let sector = Sector::feed_data(0, SectorKind::Mode2Mixed, &form1, SectorFields::empty()).unwrap();
        assert_eq!(sector.kind(), SectorKind::Mode2Form1);

        let mut form2 = form1.clone();
        form2[16 + 2] |= 0x20;
        let sector = Sector::feed_data(0, SectorKind::Mode2Mixed, &form2, SectorFields::empty()).unwrap();
        assert_eq!(sector.kind(), SectorKind::Mode2Form2);
    }

    #[test]
    fn extract_data_rejects_field_not_present_for_kind() {
        let data = vec![0u8; 2352];
        let mut sector = Sector::feed_data(0, SectorKind::Audio, &data, SectorFields::empty()).unwrap();
        // Audio sectors have no sync field, so a request for a length that
        // would expose it (e.g. an offset not matching Audio's single range)
        // must fail rather than synthesize garbage.
        assert!(sector.extract_data(2064).is_err());
    }

    #[test]
    fn invariant_1_raw_roundtrip() {
        let mut data = vec![0u8; 2352];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i % 256) as u8;
        }
        let mut sector = Sector::feed_data(0, SectorKind::Raw, &data, SectorFields::empty()).unwrap();
        let out = sector.extract_data(2352).unwrap();
        assert_eq!(out, data);
    }
}
