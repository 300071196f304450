/*
    efmfox

    Copyright 2024 Daniel Balsom

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
*/

//! A [TrackTime] is a Minutes:Seconds:Frames address, as used by sector headers and the
//! subcode Q channel.

use crate::util::{bcd_to_u8, u8_to_bcd};
use std::fmt::{self, Display, Formatter};

pub const FRAMES_PER_SECOND: u32 = 75;
pub const SECONDS_PER_MINUTE: u32 = 60;
pub const FRAMES_PER_MINUTE: u32 = FRAMES_PER_SECOND * SECONDS_PER_MINUTE;
/// Minutes are stored as two BCD digits, so addresses wrap after 99:59:74.
pub const MAX_SECTOR_INDEX: u32 = 100 * FRAMES_PER_MINUTE;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackTime {
    m: u8,
    s: u8,
    f: u8,
}

impl TrackTime {
    /// Create a new [TrackTime]. Returns `None` if seconds or frames are out of range.
    pub fn new(m: u8, s: u8, f: u8) -> Option<Self> {
        if m > 99 || s as u32 >= SECONDS_PER_MINUTE || f as u32 >= FRAMES_PER_SECOND {
            return None;
        }
        Some(Self { m, s, f })
    }

    /// Decode a [TrackTime] from three packed BCD bytes.
    pub fn from_bcd(bytes: [u8; 3]) -> Option<Self> {
        Self::new(bcd_to_u8(bytes[0])?, bcd_to_u8(bytes[1])?, bcd_to_u8(bytes[2])?)
    }

    /// Encode this [TrackTime] as three packed BCD bytes.
    pub fn to_bcd(&self) -> [u8; 3] {
        [u8_to_bcd(self.m), u8_to_bcd(self.s), u8_to_bcd(self.f)]
    }

    /// Create a [TrackTime] from a linear sector index. The index wraps at 100 minutes.
    pub fn from_index(index: u32) -> Self {
        let index = index % MAX_SECTOR_INDEX;
        Self {
            m: (index / FRAMES_PER_MINUTE) as u8,
            s: ((index / FRAMES_PER_SECOND) % SECONDS_PER_MINUTE) as u8,
            f: (index % FRAMES_PER_SECOND) as u8,
        }
    }

    /// Return the linear sector index, `((m * 60) + s) * 75 + f`.
    pub fn index(&self) -> u32 {
        (self.m as u32 * SECONDS_PER_MINUTE + self.s as u32) * FRAMES_PER_SECOND + self.f as u32
    }

    /// Return the address immediately following this one.
    pub fn next(&self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// Return the signed distance in sectors from `self` to `other`.
    pub fn distance_to(&self, other: &TrackTime) -> i64 {
        other.index() as i64 - self.index() as i64
    }

    #[inline]
    pub fn m(&self) -> u8 {
        self.m
    }
    #[inline]
    pub fn s(&self) -> u8 {
        self.s
    }
    #[inline]
    pub fn f(&self) -> u8 {
        self.f
    }
}

impl Display for TrackTime {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.m, self.s, self.f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index() {
        let t = TrackTime::new(0, 2, 0).unwrap();
        assert_eq!(t.index(), 150);
        assert_eq!(TrackTime::from_index(150), t);

        let t = TrackTime::new(12, 34, 56).unwrap();
        assert_eq!(TrackTime::from_index(t.index()), t);
    }

    #[test]
    fn test_next_carries() {
        let t = TrackTime::new(0, 59, 74).unwrap();
        assert_eq!(t.next(), TrackTime::new(1, 0, 0).unwrap());
        let t = TrackTime::new(99, 59, 74).unwrap();
        assert_eq!(t.next(), TrackTime::default());
    }

    #[test]
    fn test_bcd() {
        let t = TrackTime::from_bcd([0x00, 0x02, 0x14]).unwrap();
        assert_eq!(t, TrackTime::new(0, 2, 14).unwrap());
        assert_eq!(t.to_bcd(), [0x00, 0x02, 0x14]);
        assert!(TrackTime::from_bcd([0x00, 0x60, 0x00]).is_none());
        assert!(TrackTime::from_bcd([0x00, 0x00, 0x75]).is_none());
        assert!(TrackTime::from_bcd([0x0A, 0x00, 0x00]).is_none());
    }

    #[test]
    fn test_display() {
        let t = TrackTime::new(1, 2, 3).unwrap();
        assert_eq!(t.to_string(), "01:02:03");
    }
}
