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

    src/disc/mod.rs

    Disc layout (C8): the top of the Disc/Session/Track/Fragment tree. See
    spec.md §3.1 "Disc" and §4.5, and SPEC_FULL.md §F.3 for the DPM data and
    Disc Structure synthesis supplements.
*/
pub mod index;
pub mod language;
pub mod session;
pub mod track;

use crate::context::OptionValue;
use crate::error::{MirageError, MirageResult};
use session::Session;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, Default)]
pub enum MediumType {
    #[default]
    Cd,
    Dvd,
    Bd,
}

/// One DPM (disc performance measurement) entry: an angular position, in
/// units of 1/256 of a rotation, at some sector. See `mirage-disc.c`
/// `mirage_disc_set_dpm_data` / SPEC_FULL.md §F.3.
#[derive(Debug, Clone)]
pub struct DpmData {
    pub start: u32,
    pub resolution: u32,
    pub entries: Vec<u32>,
}

impl DpmData {
    /// Nearest-entry lookup for `sector`, per `mirage-disc.c`'s
    /// `mirage_disc_get_dpm_data_for_sector`: index by
    /// `(sector - start) / resolution`, clamped to the entry range.
    pub fn entry_for_sector(&self, sector: u32) -> Option<u32> {
        if self.entries.is_empty() || sector < self.start {
            return None;
        }
        let index = ((sector - self.start) / self.resolution.max(1)) as usize;
        self.entries.get(index).copied()
    }
}

/// A byte blob describing one Disc Structure (DVD/BD layer + structure-type
/// pair). Keyed `(layer, structure_type)` in `Disc::structures`.
pub type DiscStructureKey = (u8, u8);

#[derive(Debug)]
pub struct Disc {
    medium_type: MediumType,
    sessions: Vec<Session>,
    first_session: u8,
    structures: HashMap<DiscStructureKey, Vec<u8>>,
    dpm: Option<DpmData>,
}

impl Default for Disc {
    fn default() -> Self {
        Disc {
            medium_type: MediumType::default(),
            sessions: Vec::new(),
            first_session: 1,
            structures: HashMap::new(),
            dpm: None,
        }
    }
}

impl Disc {
    pub fn new(medium_type: MediumType) -> Self {
        Disc {
            medium_type,
            ..Default::default()
        }
    }

    pub fn medium_type(&self) -> MediumType {
        self.medium_type
    }

    pub fn set_medium_type(&mut self, medium_type: MediumType) {
        self.medium_type = medium_type;
    }

    pub fn first_session(&self) -> u8 {
        self.first_session
    }

    pub fn first_track(&self) -> u8 {
        self.sessions.first().map(Session::first_track).unwrap_or(1)
    }

    pub fn start_sector(&self) -> i32 {
        self.sessions.first().map(Session::start_sector).unwrap_or(0)
    }

    pub fn length(&self) -> i32 {
        self.sessions.iter().map(Session::length).sum()
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn sessions_mut(&mut self) -> &mut [Session] {
        &mut self.sessions
    }

    pub fn session(&self, number: u8) -> Option<&Session> {
        self.sessions.iter().find(|s| s.number() == number)
    }

    pub fn session_mut(&mut self, number: u8) -> Option<&mut Session> {
        self.sessions.iter_mut().find(|s| s.number() == number)
    }

    /// Append `session` at the end of the session list and run the
    /// bottom-up/top-down convergence pass (spec.md §4.5).
    pub fn add_session(&mut self, session: Session) {
        self.sessions.push(session);
        self.commit();
    }

    /// Append `track` to the last session in the Disc, auto-creating one if
    /// the Disc is currently empty (spec.md S4: "Session is auto-created").
    pub fn add_track_to_last_session(&mut self, track: track::Track) {
        if self.sessions.is_empty() {
            self.sessions.push(Session::new(session::SessionType::CdRom));
        }
        self.sessions.last_mut().unwrap().add_track(track);
        self.commit();
    }

    /// §3.3 rule 3: if removing a track leaves its session empty, the
    /// session is itself removed from the Disc, cascading the bottom-up
    /// commit.
    pub fn remove_track(&mut self, session_number: u8, track_number: u8) {
        if let Some(session) = self.session_mut(session_number) {
            session.remove_track(track_number);
        }
        self.sessions.retain(|s| !s.is_empty());
        self.commit();
    }

    /// Linear scan over sessions, each doing its own linear scan over
    /// tracks (spec.md §4.5: "keep them linear").
    pub fn get_track_by_address(&self, address: i32) -> Option<&track::Track> {
        self.get_session_by_address(address)
            .and_then(|s| s.get_track_by_address(address - s.start_sector()))
    }

    pub fn get_session_by_address(&self, address: i32) -> Option<&Session> {
        self.sessions
            .iter()
            .find(|s| address >= s.start_sector() && address < s.start_sector() + s.length())
    }

    /// Resolve absolute `lba` to the covering Session and read its Sector,
    /// the top of the "Disc -> Session -> Track -> Fragment -> Stream"
    /// traversal spec.md §2 describes for sector reads.
    pub fn read_sector(&self, lba: i32) -> MirageResult<crate::sector::Sector> {
        let session = self
            .get_session_by_address(lba)
            .ok_or_else(|| MirageError::disc(format!("no session covers absolute address {lba}")))?;
        session.read_sector(lba - session.start_sector(), lba)
    }

    /// Bottom-up commit: recompute `length` from sessions (implicitly, via
    /// its accessor), then immediately run the top-down commit to assign
    /// consecutive session numbers, first-track counters, and start
    /// sectors, closing the convergence loop in one pass (spec.md §4.5).
    pub fn commit(&mut self) {
        let mut track_cursor = self.first_session_base_track();
        let mut sector_cursor = 0i32;
        for (i, session) in self.sessions.iter_mut().enumerate() {
            session.set_number(self.first_session + i as u8);
            session.set_first_track(track_cursor);
            session.set_start_sector(sector_cursor);
            // re-run the session's own top-down commit so its tracks pick
            // up the (possibly new) first_track base before we read its
            // length back out
            session.commit();
            track_cursor += session.tracks().len() as u8;
            sector_cursor += session.length();
        }
    }

    fn first_session_base_track(&self) -> u8 {
        1
    }

    pub fn set_dpm_data(&mut self, start: u32, resolution: u32, entries: Vec<u32>) {
        self.dpm = Some(DpmData { start, resolution, entries });
    }

    pub fn get_dpm_data(&self) -> Option<&DpmData> {
        self.dpm.as_ref()
    }

    pub fn get_dpm_entry(&self, sector: u32) -> Option<u32> {
        self.dpm.as_ref().and_then(|d| d.entry_for_sector(sector))
    }

    pub fn set_disc_structure(&mut self, layer: u8, structure_type: u8, blob: Vec<u8>) {
        self.structures.insert((layer, structure_type), blob);
    }

    /// Returns the Disc Structure blob for `(layer, structure_type)`. For
    /// DVD media, falls back to a synthesized 18-byte "Physical Format
    /// Information" buffer for `(0, 0x01)` when no explicit blob was set,
    /// mirroring `mirage-disc.c`'s `mirage_disc_synth_structure`. `context`
    /// supplies the `dvd-report-css` option that governs byte 4 bit 7 of the
    /// synthesized structure (spec.md §6.5).
    pub fn get_disc_structure(&self, layer: u8, structure_type: u8, context: &crate::context::Context) -> MirageResult<Vec<u8>> {
        if let Some(blob) = self.structures.get(&(layer, structure_type)) {
            return Ok(blob.clone());
        }
        if self.medium_type == MediumType::Dvd && layer == 0 && structure_type == 0x01 {
            return Ok(synth_dvd_physical_format_information(context));
        }
        Err(MirageError::disc(format!(
            "no Disc Structure for (layer={layer}, type={structure_type:#04x}) and nothing to synthesize"
        )))
    }
}

/// DVD Disc Structure 0x01 ("Physical Format Information"), synthesized to
/// 18 bytes. Only byte 4 bit 7 (copy protection system type) is populated,
/// from the `dvd-report-css` option; every other byte is left at its
/// nominal zero, since this crate does not model concrete DVD layer
/// geometry (spec.md's Non-goals exclude DVD/BD video decode and CSS
/// decryption; the *option* for reporting CSS in the synthesized structure
/// is the one piece SPEC_FULL.md §F.3 calls out as in-scope).
fn synth_dvd_physical_format_information(context: &crate::context::Context) -> Vec<u8> {
    let mut buf = vec![0u8; 18];
    let report_css = matches!(context.option("dvd-report-css"), Some(OptionValue::Bool(true)));
    if report_css {
        buf[4] |= 0x80;
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::track::{Track, TrackMode, TrackNumber};
    use crate::fragment::Fragment;

    #[test]
    fn s4_layout_bottom_up_auto_creates_session() {
        let mut disc = Disc::new(MediumType::Cd);
        let mut track = Track::new(TrackMode::Mode1);
        track.add_fragment(Fragment::new(0, 100));
        disc.add_track_to_last_session(track);

        assert_eq!(disc.length(), 100);
        assert_eq!(disc.sessions()[0].length(), 100);
        assert_eq!(disc.sessions()[0].start_sector(), 0);
        assert_eq!(disc.sessions()[0].tracks()[0].number(), TrackNumber::Track(1));
        assert_eq!(disc.sessions()[0].first_track(), 1);
    }

    #[test]
    fn invariant_8_sessions_place_consecutively() {
        let mut disc = Disc::new(MediumType::Cd);
        for len in [100u32, 50, 75] {
            let mut track = Track::new(TrackMode::Mode1);
            track.add_fragment(Fragment::new(0, len));
            let mut session = crate::disc::session::Session::new(crate::disc::session::SessionType::CdRom);
            session.add_track(track);
            disc.add_session(session);
        }

        let sessions = disc.sessions();
        assert_eq!(sessions[0].start_sector(), 0);
        assert_eq!(sessions[1].start_sector(), sessions[0].start_sector() + sessions[0].length());
        assert_eq!(sessions[2].start_sector(), sessions[1].start_sector() + sessions[1].length());
        assert_eq!(disc.length(), 225);
    }

    #[test]
    fn removing_last_track_cascades_session_removal() {
        let mut disc = Disc::new(MediumType::Cd);
        let mut track = Track::new(TrackMode::Mode1);
        track.add_fragment(Fragment::new(0, 10));
        disc.add_track_to_last_session(track);
        assert_eq!(disc.sessions().len(), 1);

        disc.remove_track(1, 1);
        assert!(disc.sessions().is_empty());
        assert_eq!(disc.length(), 0);
    }

    #[test]
    fn dpm_entry_lookup_is_nearest_by_resolution() {
        let mut disc = Disc::new(MediumType::Cd);
        disc.set_dpm_data(0, 100, vec![10, 20, 30]);
        assert_eq!(disc.get_dpm_entry(0), Some(10));
        assert_eq!(disc.get_dpm_entry(150), Some(20));
        assert_eq!(disc.get_dpm_entry(250), Some(30));
    }

    #[test]
    fn dvd_structure_synthesizes_when_absent() {
        let disc = Disc::new(MediumType::Dvd);
        let mut ctx = crate::context::Context::new("test");
        ctx.set_option("dvd-report-css", OptionValue::Bool(true));
        let blob = disc.get_disc_structure(0, 0x01, &ctx).unwrap();
        assert_eq!(blob.len(), 18);
        assert_eq!(blob[4] & 0x80, 0x80);
    }

    #[test]
    fn cd_structure_lookup_fails_without_explicit_blob() {
        let disc = Disc::new(MediumType::Cd);
        let ctx = crate::context::Context::new("test");
        assert!(disc.get_disc_structure(0, 0x01, &ctx).is_err());
    }

    #[test]
    fn read_sector_traverses_disc_session_track_fragment() {
        use crate::fragment::{MainFormat, MainStreamDescriptor};
        use crate::sector::{SectorFields, SectorKind};
        use std::cell::RefCell;
        use std::rc::Rc;

        let stream: crate::fragment::SharedStream = Rc::new(RefCell::new(Box::new(AllBytesStream { byte: 0x42 })));
        let mut fragment = Fragment::new(0, 4);
        fragment.set_main_stream(MainStreamDescriptor {
            stream,
            sector_size: 2352,
            format: MainFormat::Data,
            file_offset: 0,
        });
        let mut track = Track::new(TrackMode::Audio);
        track.add_fragment(fragment);

        let mut disc = Disc::new(MediumType::Cd);
        disc.add_track_to_last_session(track);

        let mut sector = disc.read_sector(2).unwrap();
        assert_eq!(sector.kind(), SectorKind::Audio);
        let data = sector.extract_data(2352).unwrap();
        assert!(data.iter().all(|&b| b == 0x42));

        let pw = sector.extract_subchannel(crate::sector::SubchannelReadFormat::Pw).unwrap();
        let p = crate::util::deinterleave_channel(pw.as_slice().try_into().unwrap(), 0);
        assert_eq!(p, [0u8; 12]);
        assert!(sector.valid_fields().contains(SectorFields::SUBCHANNEL));
    }

    #[test]
    fn read_sector_out_of_range_is_an_error() {
        let disc = Disc::new(MediumType::Cd);
        assert!(disc.read_sector(0).is_err());
    }

    #[derive(Debug)]
    struct AllBytesStream {
        byte: u8,
    }

    impl crate::stream::Stream for AllBytesStream {
        fn read(&mut self, buf: &mut [u8]) -> crate::error::MirageResult<usize> {
            buf.fill(self.byte);
            Ok(buf.len())
        }
        fn write(&mut self, _buf: &[u8]) -> crate::error::MirageResult<usize> {
            Err(MirageError::stream("read-only"))
        }
        fn seek(&mut self, _pos: crate::stream::SeekFrom) -> crate::error::MirageResult<u64> {
            Ok(0)
        }
        fn is_writable(&self) -> bool {
            false
        }
        fn filename(&self) -> &str {
            "<allbytes>"
        }
    }
}
