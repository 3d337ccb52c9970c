//! Wall-clock access for "now" and local civil hours.

use time::UtcOffset;

use crate::UtcDateTime;

/// Source of the current instant and of the local UTC offset.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;

    /// Offset of local civil time at `at`.
    fn local_offset_at(&self, at: UtcDateTime) -> UtcOffset;

    fn local_hour(&self, at: UtcDateTime) -> u8 {
        at.hour_at(self.local_offset_at(at))
    }
}

/// System clock using the host timezone.
///
/// The host offset cannot always be determined (for example on some
/// platforms once several threads are running); `fallback_offset` is used
/// then.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    fallback_offset: UtcOffset,
}

impl SystemClock {
    pub fn new(fallback_offset: UtcOffset) -> Self {
        Self { fallback_offset }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
    }
}

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }

    fn local_offset_at(&self, at: UtcDateTime) -> UtcOffset {
        UtcOffset::local_offset_at(at.into_inner()).unwrap_or(self.fallback_offset)
    }
}

/// Frozen clock with a fixed offset.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    now: UtcDateTime,
    offset: UtcOffset,
}

impl FixedClock {
    pub fn new(now: UtcDateTime, offset: UtcOffset) -> Self {
        Self { now, offset }
    }

    pub fn utc(now: UtcDateTime) -> Self {
        Self::new(now, UtcOffset::UTC)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> UtcDateTime {
        self.now
    }

    fn local_offset_at(&self, _at: UtcDateTime) -> UtcOffset {
        self.offset
    }
}
