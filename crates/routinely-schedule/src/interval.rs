use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// A wall-clock time of day in minutes since midnight (00:00–23:59).
///
/// Parsed from and rendered as zero-padded `HH:MM`. No zone attached — the
/// owning user's timezone is applied only by the midnight reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallClock(u16);

impl WallClock {
    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }
}

impl std::str::FromStr for WallClock {
    type Err = ScheduleError;

    /// Strict `HH:MM` — exactly five chars, both parts zero-padded,
    /// hours 00–23, minutes 00–59.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let invalid = || ScheduleError::InvalidTime(s.to_string());

        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(invalid());
        }
        if !bytes[..2].iter().all(u8::is_ascii_digit)
            || !bytes[3..].iter().all(u8::is_ascii_digit)
        {
            return Err(invalid());
        }

        let hours: u16 = s[..2].parse().map_err(|_| invalid())?;
        let minutes: u16 = s[3..].parse().map_err(|_| invalid())?;
        if hours > 23 || minutes > 59 {
            return Err(invalid());
        }

        Ok(WallClock(hours * 60 + minutes))
    }
}

impl std::fmt::Display for WallClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for WallClock {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallClock {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A half-open `[start, end)` window within one day.
///
/// Construction enforces `end` strictly after `start`, so a stored interval
/// always has a positive duration and never spans midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct TimeInterval {
    start: WallClock,
    end: WallClock,
}

#[derive(Deserialize)]
struct RawInterval {
    start: WallClock,
    end: WallClock,
}

impl TryFrom<RawInterval> for TimeInterval {
    type Error = ScheduleError;

    fn try_from(raw: RawInterval) -> Result<Self> {
        TimeInterval::new(raw.start, raw.end)
    }
}

impl TimeInterval {
    pub fn new(start: WallClock, end: WallClock) -> Result<Self> {
        if end <= start {
            return Err(ScheduleError::InvalidInterval {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse a `("HH:MM", "HH:MM")` pair in one step.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> WallClock {
        self.start
    }

    pub fn end(&self) -> WallClock {
        self.end
    }

    /// Half-open overlap test: `[s1,e1)` and `[s2,e2)` conflict iff
    /// `s1 < e2 && s2 < e1`. Symmetric; an interval always overlaps itself.
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whole minutes between start and end; always > 0 by construction.
    pub fn duration_minutes(&self) -> u32 {
        (self.end.minutes() - self.start.minutes()) as u32
    }
}

impl std::fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
