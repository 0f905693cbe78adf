/*
    src/disc/index.rs

    A single track index point (C8). See spec.md §3.1 "Index".
*/

/// A track-relative address at which index number ≥ 2 begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Index {
    pub number: u8,
    pub address: u32,
}

impl Index {
    pub fn new(number: u8, address: u32) -> Self {
        Index { number, address }
    }
}
