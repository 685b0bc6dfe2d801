//! Bucketing of the activity log by calendar day.

use crate::domain::{EventTimestampError, SponsorshipEvent};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Events bucketed by the calendar day of their timestamp.
///
/// Within a bucket, events keep the order in which they were received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayBuckets<'a> {
    buckets: BTreeMap<NaiveDate, Vec<&'a SponsorshipEvent>>,
}

impl<'a> DayBuckets<'a> {
    /// Events on `day`; empty when nothing happened that day.
    pub fn events_on(&self, day: NaiveDate) -> &[&'a SponsorshipEvent] {
        self.buckets.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// Group events by day. Fails on the first unparseable timestamp.
pub fn group_events_by_day(
    events: &[SponsorshipEvent],
) -> Result<DayBuckets<'_>, EventTimestampError> {
    let mut buckets: BTreeMap<NaiveDate, Vec<&SponsorshipEvent>> = BTreeMap::new();
    for event in events {
        buckets.entry(event.day()?).or_default().push(event);
    }
    Ok(DayBuckets { buckets })
}
