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

    src/disc/session.rs

    Session (C8). See spec.md §3.1 "Session" and §4.5.
*/
use crate::disc::language::Language;
use crate::disc::track::{Track, TrackNumber};
use crate::error::{MirageError, MirageResult};
use crate::sector::Sector;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionType {
    CdRom,
    CdI,
    CdRomXa,
}

/// An ordered group of Tracks within a Disc, plus session-wide CD-TEXT
/// Languages. Lead-in/Lead-out are addressed through `TrackNumber` rather
/// than stored as separate `Track` entries, since this crate does not
/// synthesize their sector content (spec.md's Non-goals exclude concrete
/// image formats, and lead-in/lead-out sector bytes are format-specific).
#[derive(Debug)]
pub struct Session {
    number: u8,
    session_type: SessionType,
    mcn: Option<[u8; 13]>,
    tracks: Vec<Track>,
    languages: Vec<Language>,
    first_track: u8,
    start_sector: i32,
    length: i32,
}

impl Session {
    pub fn new(session_type: SessionType) -> Self {
        Session {
            number: 1,
            session_type,
            mcn: None,
            tracks: Vec::new(),
            languages: Vec::new(),
            first_track: 1,
            start_sector: 0,
            length: 0,
        }
    }

    pub fn number(&self) -> u8 {
        self.number
    }

    pub(crate) fn set_number(&mut self, number: u8) {
        self.number = number;
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn set_session_type(&mut self, session_type: SessionType) {
        self.session_type = session_type;
    }

    /// True if any Track in this session carries subchannel data, making
    /// MCN a read-only value extracted from the Mode-2 Q subchannel.
    pub fn has_subchannel(&self) -> bool {
        self.tracks.iter().any(Track::has_subchannel)
    }

    pub fn mcn(&self) -> Option<&[u8; 13]> {
        self.mcn.as_ref()
    }

    /// No-ops silently if any Track in this session carries subchannel data
    /// (spec.md §3.1 Session: "MCN ... read-only-derived when any Track
    /// carries subchannel"), mirroring `Track::set_isrc`'s rule.
    pub fn set_mcn(&mut self, mcn: Option<[u8; 13]>) {
        if self.has_subchannel() {
            return;
        }
        self.mcn = mcn;
    }

    pub fn first_track(&self) -> u8 {
        self.first_track
    }

    pub(crate) fn set_first_track(&mut self, first_track: u8) {
        self.first_track = first_track;
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

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Append `track` at the end of the track list and run the bottom-up /
    /// top-down convergence pass (spec.md §4.5).
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
        self.commit();
    }

    pub fn remove_track(&mut self, number: u8) -> bool {
        let before = self.tracks.len();
        self.tracks.retain(|t| t.number() != TrackNumber::Track(number));
        let removed = self.tracks.len() != before;
        if removed {
            self.commit();
        }
        removed
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    pub fn track(&self, number: u8) -> Option<&Track> {
        self.tracks.iter().find(|t| t.number() == TrackNumber::Track(number))
    }

    pub fn track_mut(&mut self, number: u8) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.number() == TrackNumber::Track(number))
    }

    /// Linear scan for the Track whose `[start_sector, start_sector+length)`
    /// range contains session-relative `address` (spec.md §4.5: "keep them
    /// linear, the total number of tracks is ≤ 99 in practice").
    pub fn get_track_by_address(&self, address: i32) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| address >= t.start_sector() && address < t.start_sector() + t.length())
    }

    /// Resolve `address` (session-relative) to the covering Track and read
    /// its Sector at `absolute_lba`, supplying this Session's own MCN (the
    /// continuation of the Disc -> Session -> Track -> Fragment traversal
    /// spec.md §2 describes).
    pub fn read_sector(&self, address: i32, absolute_lba: i32) -> MirageResult<Sector> {
        let track = self
            .get_track_by_address(address)
            .ok_or_else(|| MirageError::session(format!("no track covers session-relative address {address}")))?;
        track.read_sector(address - track.start_sector(), absolute_lba, self.mcn())
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

    pub fn add_language(&mut self, code: u8) -> Result<(), MirageError> {
        if self.languages.iter().any(|l| l.code() == code) {
            return Err(MirageError::session(format!("language code {code} already present on this session")));
        }
        self.languages.push(Language::new(code));
        Ok(())
    }

    /// Recompute `length` from the track list, then reassign consecutive
    /// track numbers and consecutive session-relative start sectors in list
    /// order (spec.md §3.3 rules 1-2, §4.5's top-down commit, scoped to one
    /// session's children).
    pub fn commit(&mut self) {
        self.length = self.tracks.iter().map(Track::length).sum();
        let mut cursor = 0i32;
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.set_number_value(self.first_track + i as u8);
            track.set_start_sector(cursor);
            cursor += track.length();
        }
    }
}
