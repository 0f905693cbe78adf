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

    src/disc/track.rs

    Track (C8). See spec.md §3.1 "Track" and §4.5.
*/
use crate::disc::index::Index;
use crate::disc::language::Language;
use crate::error::{MirageError, MirageResult};
use crate::fragment::Fragment;
use crate::sector::{Sector, SectorFields, SectorKind, SubchannelContext};
use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TrackMode {
    Audio,
    Mode1,
    Mode2,
    Mode2Form1,
    Mode2Form2,
    Mode2Mixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackNumber {
    Track(u8),
    LeadIn,
    LeadOut,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TrackFlags: u8 {
        const FOUR_CHANNEL = 0b0000_1000;
        const DATA_TRACK = 0b0000_0100;
        const COPY_PERMITTED = 0b0000_0010;
        const PRE_EMPHASIS = 0b0000_0001;
    }
}

/// A single track within a Session: an ordered list of Fragments, Indices,
/// and CD-TEXT Languages, plus session-relative placement.
#[derive(Debug)]
pub struct Track {
    number: TrackNumber,
    mode: TrackMode,
    flags: TrackFlags,
    isrc: Option<[u8; 12]>,
    fragments: Vec<Fragment>,
    indices: Vec<Index>,
    languages: Vec<Language>,
    start_sector: i32,
    track_start: i32,
    length: i32,
}

impl Track {
    pub fn new(mode: TrackMode) -> Self {
        Track {
            number: TrackNumber::Track(1),
            mode,
            flags: TrackFlags::empty(),
            isrc: None,
            fragments: Vec::new(),
            indices: Vec::new(),
            languages: Vec::new(),
            start_sector: 0,
            track_start: 0,
            length: 0,
        }
    }

    pub fn number(&self) -> TrackNumber {
        self.number
    }

    pub(crate) fn set_number_value(&mut self, number: u8) {
        self.number = TrackNumber::Track(number);
    }

    pub fn mode(&self) -> TrackMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TrackMode) {
        self.mode = mode;
    }

    pub fn flags(&self) -> TrackFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: TrackFlags) {
        self.flags = flags;
    }

    /// 4-bit Q subchannel CTL field: four-channel | data-track | copy-permitted | pre-emphasis.
    pub fn ctl(&self) -> u8 {
        self.flags.bits()
    }

    /// Nominal Q subchannel ADR (position data); synthesis overrides this to
    /// 2 (MCN) or 3 (ISRC) on the sectors that carry those payloads.
    pub fn adr(&self) -> u8 {
        1
    }

    /// True if any Fragment carries subchannel data, making ISRC a
    /// read-only value extracted from the Mode-3 Q subchannel rather than a
    /// user-settable attribute.
    pub fn has_subchannel(&self) -> bool {
        self.fragments.iter().any(Fragment::has_subchannel)
    }

    pub fn isrc(&self) -> Option<&[u8; 12]> {
        self.isrc.as_ref()
    }

    /// No-ops silently if any Fragment carries subchannel data.
    pub fn set_isrc(&mut self, isrc: Option<[u8; 12]>) {
        if self.has_subchannel() {
            return;
        }
        self.isrc = isrc;
    }

    pub fn start_sector(&self) -> i32 {
        self.start_sector
    }

    pub(crate) fn set_start_sector(&mut self, start: i32) {
        self.start_sector = start;
    }

    pub fn length(&self) -> i32 {
        self.length
    }

    pub fn track_start(&self) -> i32 {
        self.track_start
    }

    /// Set the track-relative address at which index 01 begins, and apply
    /// the index renumbering rule (§4.5): drop indices at or before the new
    /// `track_start`, then renumber the remainder consecutively from 2 by
    /// ascending address.
    pub fn set_track_start(&mut self, track_start: i32) {
        self.track_start = track_start;
        self.indices.retain(|idx| idx.address as i32 > track_start);
        self.renumber_indices();
    }

    fn renumber_indices(&mut self) {
        self.indices.sort_by_key(|idx| idx.address);
        for (i, idx) in self.indices.iter_mut().enumerate() {
            idx.number = 2 + i as u8;
        }
    }

    pub fn add_index(&mut self, address: u32) -> MirageResult<()> {
        if (address as i32) <= self.track_start {
            return Err(MirageError::track(format!(
                "index address {address} must be greater than track_start {}",
                self.track_start
            )));
        }
        self.indices.push(Index::new(0, address));
        self.renumber_indices();
        Ok(())
    }

    pub fn indices(&self) -> &[Index] {
        &self.indices
    }

    /// Index number in effect at track-relative address `a`: 0 before
    /// `track_start`, 1 from `track_start` up to the first recorded index,
    /// then that index's number onward.
    pub fn index_at(&self, a: i32) -> u8 {
        if a < self.track_start {
            return 0;
        }
        let mut number = 1u8;
        for idx in &self.indices {
            if a >= idx.address as i32 {
                number = idx.number;
            } else {
                break;
            }
        }
        number
    }

    /// Ascending index start addresses, as consumed by subchannel synthesis.
    pub fn index_starts(&self) -> Vec<u32> {
        self.indices.iter().map(|idx| idx.address).collect()
    }

    pub fn add_fragment(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
        self.recalculate_length();
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn fragments_mut(&mut self) -> &mut [Fragment] {
        &mut self.fragments
    }

    fn recalculate_length(&mut self) {
        self.length = self.fragments.iter().map(|f| f.length() as i32).sum();
    }

    /// Recompute `length` after external fragment mutation (e.g. a caller
    /// changed a Fragment's own length via `set_length`); part of the
    /// bottom-up convergence pass (§3.3 rule 1).
    pub fn on_fragment_changed(&mut self) {
        self.recalculate_length();
    }

    /// Find the Fragment covering track-relative address `a` and the
    /// address translated into that fragment's own coordinate space
    /// (spec.md §3.3 rule 4: "the Track's sector lookup rejects `a` outside
    /// `[0, length)`"; a gap between fragments that still falls inside
    /// `[0, length)` is likewise rejected, since no Fragment answers for it).
    pub fn locate_fragment(&self, a: i32) -> MirageResult<(&Fragment, u32)> {
        if a < 0 || a >= self.length {
            return Err(MirageError::track(format!("sector address {a} out of range [0, {})", self.length)));
        }
        let mut cursor = 0u32;
        for fragment in &self.fragments {
            let len = fragment.length();
            if (a as u32) < cursor + len {
                return Ok((fragment, a as u32 - cursor));
            }
            cursor += len;
        }
        Err(MirageError::track(format!("no fragment covers sector address {a}")))
    }

    /// The [`SectorKind`] a freshly-fed `Sector` should declare for this
    /// track's mode; `Mode2` (formless) and `Mode2Mixed` pass the Form
    /// ambiguity through to `Sector::feed_data` itself (spec.md §4.1).
    pub fn sector_kind(&self) -> SectorKind {
        match self.mode {
            TrackMode::Audio => SectorKind::Audio,
            TrackMode::Mode1 => SectorKind::Mode1,
            TrackMode::Mode2 => SectorKind::Mode2Formless,
            TrackMode::Mode2Form1 => SectorKind::Mode2Form1,
            TrackMode::Mode2Form2 => SectorKind::Mode2Form2,
            TrackMode::Mode2Mixed => SectorKind::Mode2Mixed,
        }
    }

    /// Build the [`Sector`] at track-relative address `a` (whose absolute
    /// LBA is `absolute_lba`, supplied by the caller since only Disc knows
    /// the session's placement): locate the covering Fragment, read its
    /// main-channel bytes, feed them to a fresh `Sector`, and either copy in
    /// the Fragment's own subchannel data or synthesize it. This is the
    /// "Disc -> Session -> Track -> Fragment -> Stream" traversal spec.md §2
    /// describes for sector reads. `session_mcn` is the parent Session's MCN
    /// (Track itself holds only a weak, non-owning back-reference to its
    /// Session per spec.md §3.2, so the caller supplies it explicitly).
    pub fn read_sector(&self, a: i32, absolute_lba: i32, session_mcn: Option<&[u8; 13]>) -> MirageResult<Sector> {
        let (fragment, offset) = self.locate_fragment(a)?;
        let kind = self.sector_kind();
        let main_size = fragment.main_sector_size();
        let data = if main_size == 0 {
            vec![0u8; crate::RAW_SECTOR_SIZE]
        } else {
            fragment.read_main(offset)?
        };
        let mut sector = Sector::feed_data(absolute_lba, kind, &data, SectorFields::empty())?;

        if let Some(pw) = fragment.read_subchannel(offset)? {
            sector.feed_subchannel(pw);
        } else {
            let track_number = match self.number {
                TrackNumber::Track(n) => n,
                TrackNumber::LeadIn | TrackNumber::LeadOut => 0,
            };
            let ctx = SubchannelContext {
                ctl: self.ctl(),
                track_number,
                track_start: self.track_start,
                mcn: session_mcn.copied(),
                isrc: self.isrc,
                is_audio_track: self.mode == TrackMode::Audio,
                index_starts: self.index_starts(),
            };
            sector.synthesize_subchannel(a, &ctx);
        }
        Ok(sector)
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    pub fn language(&self, code: u8) -> Option<&Language> {
        self.languages.iter().find(|l| l.code() == code)
    }

    pub fn language_mut(&mut self, code: u8) -> Option<&mut Language> {
        self.languages.iter_mut().find(|l| l.code() == code)
    }

    pub fn add_language(&mut self, code: u8) -> MirageResult<()> {
        if self.languages.iter().any(|l| l.code() == code) {
            return Err(MirageError::track(format!("language code {code} already present on this track")));
        }
        self.languages.push(Language::new(code));
        Ok(())
    }

    /// SHA-1 over the concatenated main-channel bytes of every Fragment, in
    /// order. Supplemental feature grounded on the teacher's `Track::get_hash`
    /// (src/track/mod.rs), used by higher-level tooling to detect duplicate
    /// tracks/sessions; not part of the on-disk layout model itself.
    pub fn content_hash(&self) -> MirageResult<String> {
        let mut hasher = sha1_smol::Sha1::new();
        for fragment in &self.fragments {
            hasher.update(&fragment.read_all_main()?);
        }
        Ok(hasher.digest().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Fragment;
    use crate::stream::{SeekFrom, Stream};

    #[derive(Debug)]
    struct MemStream {
        data: Vec<u8>,
        pos: u64,
        writable: bool,
    }

    impl Stream for MemStream {
        fn read(&mut self, buf: &mut [u8]) -> MirageResult<usize> {
            let pos = self.pos as usize;
            if pos >= self.data.len() {
                return Ok(0);
            }
            let n = buf.len().min(self.data.len() - pos);
            buf[..n].copy_from_slice(&self.data[pos..pos + n]);
            self.pos += n as u64;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> MirageResult<usize> {
            if !self.writable {
                return Err(MirageError::stream("read-only"));
            }
            let pos = self.pos as usize;
            if pos + buf.len() > self.data.len() {
                self.data.resize(pos + buf.len(), 0);
            }
            self.data[pos..pos + buf.len()].copy_from_slice(buf);
            self.pos += buf.len() as u64;
            Ok(buf.len())
        }

        fn seek(&mut self, pos: SeekFrom) -> MirageResult<u64> {
            self.pos = match pos {
                SeekFrom::Start(p) => p,
                SeekFrom::End(p) => (self.data.len() as i64 + p) as u64,
                SeekFrom::Current(p) => (self.pos as i64 + p) as u64,
            };
            Ok(self.pos)
        }

        fn is_writable(&self) -> bool {
            self.writable
        }

        fn filename(&self) -> &str {
            "<mem>"
        }
    }

    #[test]
    fn s7_index_renumber_after_track_start_change() {
        let mut track = Track::new(TrackMode::Mode1);
        track.add_index(50).unwrap();
        track.add_index(100).unwrap();
        track.add_index(200).unwrap();
        assert_eq!(
            track.indices().iter().map(|i| (i.number, i.address)).collect::<Vec<_>>(),
            vec![(2, 50), (3, 100), (4, 200)]
        );

        track.set_track_start(75);
        assert_eq!(
            track.indices().iter().map(|i| (i.number, i.address)).collect::<Vec<_>>(),
            vec![(2, 100), (3, 200)]
        );
    }

    #[test]
    fn add_index_rejects_address_not_past_track_start() {
        let mut track = Track::new(TrackMode::Audio);
        track.set_track_start(10);
        assert!(track.add_index(10).is_err());
        assert!(track.add_index(5).is_err());
        assert!(track.add_index(11).is_ok());
    }

    #[test]
    fn set_isrc_noop_once_subchannel_present() {
        use crate::fragment::{SubchannelFormat, SubchannelLocation, SubchannelStreamDescriptor};
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut track = Track::new(TrackMode::Audio);
        track.set_isrc(Some(*b"US1234567890"));
        assert_eq!(track.isrc(), Some(&*b"US1234567890"));

        let mut fragment = Fragment::new(0, 1);
        let sub_stream: crate::fragment::SharedStream = Rc::new(RefCell::new(Box::new(MemStream {
            data: vec![0u8; 16],
            pos: 0,
            writable: true,
        })));
        fragment.set_subchannel_stream(SubchannelStreamDescriptor {
            stream: sub_stream,
            location: SubchannelLocation::External,
            format: SubchannelFormat::Q16,
            file_offset: 0,
        });
        track.add_fragment(fragment);

        track.set_isrc(Some(*b"CA0000000000"));
        assert_eq!(track.isrc(), Some(&*b"US1234567890"));
    }

    #[test]
    fn adding_fragment_recomputes_length() {
        let mut track = Track::new(TrackMode::Audio);
        assert_eq!(track.length(), 0);
        track.add_fragment(Fragment::new(0, 75));
        track.add_fragment(Fragment::new(75, 25));
        assert_eq!(track.length(), 100);
    }
}
