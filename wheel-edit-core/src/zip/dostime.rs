//! MS-DOS timestamps, as stored in zip local/central headers.

use chrono::{offset::LocalResult, offset::TimeZone, offset::Utc, DateTime, Timelike};
use std::fmt;
use winnow::{binary::le_u16, seq, PResult, Parser, Partial};

/// A timestamp in MS-DOS format: dates from 1980 to 2107, 2-second precision.
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct MsdosTimestamp {
    /// Time in 2-second intervals.
    pub time: u16,
    /// Date, MS-DOS bit-packed.
    pub date: u16,
}

impl fmt::Debug for MsdosTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "MsdosTimestamp({dt})"),
            None => write!(f, "MsdosTimestamp(?)"),
        }
    }
}

impl MsdosTimestamp {
    /// The epoch used for freshly rewritten entries, so that repeated
    /// saves of an unmodified wheel are byte-identical.
    pub const EPOCH: MsdosTimestamp = MsdosTimestamp { time: 0, date: 0b0000_0000_0010_0001 };

    pub(crate) fn parser(i: &mut Partial<&'_ [u8]>) -> PResult<Self> {
        seq! {Self {
            time: le_u16,
            date: le_u16,
        }}
        .parse_next(i)
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        let date = match {
            let d = (self.date & 0b1_1111) as u32;
            let m = ((self.date >> 5) & 0b1111) as u32;
            let y = ((self.date >> 9) + 1980) as i32;
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        } {
            LocalResult::Single(date) => date,
            _ => return None,
        };

        let s = (self.time & 0b1_1111) as u32 * 2;
        let m = (self.time >> 5 & 0b11_1111) as u32;
        let h = (self.time >> 11) as u32;
        date.with_hour(h)?.with_minute(m)?.with_second(s)
    }
}

impl Default for MsdosTimestamp {
    fn default() -> Self {
        Self::EPOCH
    }
}
