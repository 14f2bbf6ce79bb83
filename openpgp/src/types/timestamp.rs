use std::convert::TryFrom;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

use crate::{
    Error,
    Result,
};

/// Seconds since the Unix epoch, as stored in signature subpackets
/// and key packets.
///
/// The wire format is an unsigned 32-bit number, so the range ends
/// in 2106.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u32);
assert_send_and_sync!(Timestamp);

impl Timestamp {
    /// Returns the current time.
    ///
    /// Fails if the clock is set before 1970 or after 2106.
    pub fn now() -> Result<Timestamp> {
        Timestamp::try_from(SystemTime::now())
    }

    /// Returns the time `secs` seconds later, or `None` past 2106.
    pub fn checked_add(&self, secs: u32) -> Option<Timestamp> {
        self.0.checked_add(secs).map(Timestamp)
    }
}

impl From<u32> for Timestamp {
    fn from(secs: u32) -> Self {
        Timestamp(secs)
    }
}

impl From<Timestamp> for u32 {
    fn from(t: Timestamp) -> Self {
        t.0
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = anyhow::Error;

    fn try_from(t: SystemTime) -> Result<Self> {
        t.duration_since(UNIX_EPOCH).ok()
            .and_then(|d| u32::try_from(d.as_secs()).ok())
            .map(Timestamp)
            .ok_or_else(|| Error::InvalidArgument(
                format!("{:?} is not representable", t)).into())
    }
}

impl From<Timestamp> for SystemTime {
    fn from(t: Timestamp) -> Self {
        UNIX_EPOCH + Duration::from_secs(t.0.into())
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

#[cfg(test)]
impl Arbitrary for Timestamp {
    fn arbitrary(g: &mut Gen) -> Self {
        Timestamp(u32::arbitrary(g))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    quickcheck::quickcheck! {
        fn through_system_time(t: Timestamp) -> bool {
            Timestamp::try_from(SystemTime::from(t)).unwrap() == t
        }
    }

    #[test]
    fn limits() {
        let t = UNIX_EPOCH + Duration::from_secs(u64::from(u32::MAX) + 1);
        assert!(Timestamp::try_from(t).is_err());
        assert!(Timestamp::try_from(UNIX_EPOCH - Duration::from_secs(1))
                .is_err());
        assert_eq!(Timestamp::from(u32::MAX).checked_add(1), None);
        assert_eq!(Timestamp::from(1).checked_add(2), Some(Timestamp::from(3)));
        assert!(Timestamp::now().is_ok());
    }
}
