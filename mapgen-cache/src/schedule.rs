//! Wipe schedule computation and scheduled cache eviction
//!
//! The game rotates procedurally generated worlds on a fixed schedule:
//! the first Thursday of every calendar month at 20:00 in a fixed UTC+2
//! reference timezone. Entries cached before that instant become stale
//! once it has passed, and a scheduled purge sweeps out entries no
//! tracked server references anymore.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Datelike, Days, FixedOffset, TimeZone, Utc, Weekday};
use parking_lot::Mutex;
use tracing::debug;

use crate::image::ImageStore;
use crate::metadata::MetadataStore;
use crate::Result;

/// Fixed offset of the reference timezone (UTC+2)
const RESET_UTC_OFFSET_SECS: i32 = 2 * 3600;

/// Local wall-clock hour of the reset
const RESET_HOUR: u32 = 20;

/// Local wall-clock minute of the reset
const RESET_MINUTE: u32 = 0;

/// Reset point of `now`'s calendar month
///
/// The first Thursday of the month at 20:00 in the fixed reference
/// timezone, converted back to an absolute instant. Exactly one reset
/// point is current relative to any `now`.
pub fn next_reset_point(now: DateTime<Utc>) -> DateTime<Utc> {
    let tz = FixedOffset::east_opt(RESET_UTC_OFFSET_SECS).unwrap();
    let day_one = now.with_timezone(&tz).date_naive().with_day(1).unwrap();

    let days_to_thursday = (Weekday::Thu.num_days_from_monday() + 7
        - day_one.weekday().num_days_from_monday())
        % 7;
    let thursday = day_one + Days::new(u64::from(days_to_thursday));

    let local = thursday.and_hms_opt(RESET_HOUR, RESET_MINUTE, 0).unwrap();
    // A fixed offset maps every local time to exactly one instant.
    tz.from_local_datetime(&local).unwrap().with_timezone(&Utc)
}

/// Whether a rotation boundary has passed since `cached_at`
///
/// True iff `now` has reached the reset point and the entry was cached
/// strictly before it. An entry cached exactly at the reset point is not
/// stale.
pub fn is_stale(
    cached_at: DateTime<Utc>,
    now: DateTime<Utc>,
    reset_point: DateTime<Utc>,
) -> bool {
    now >= reset_point && cached_at < reset_point
}

/// Runs the scheduled purge at most once per rotation window
///
/// Owns the last-purge instant as an explicit field so repeated status
/// checks within the same window stay cheap: the directory sweeps only
/// run the first time a reset point is seen to have passed.
#[derive(Debug, Default)]
pub struct ResetScheduler {
    last_purge: Mutex<Option<DateTime<Utc>>>,
}

impl ResetScheduler {
    /// Create a scheduler that has never purged
    pub fn new() -> Self {
        Self::default()
    }

    /// Instant of the last purge this scheduler ran, if any
    pub fn last_purge(&self) -> Option<DateTime<Utc>> {
        *self.last_purge.lock()
    }

    /// Sweep both cache tiers if the reset point has passed and no purge
    /// has run for it yet
    ///
    /// Returns whether a purge actually ran. No-op while `now` is before
    /// the reset point, and after a purge already ran at or after it.
    pub async fn purge_if_due(
        &self,
        reset_point: DateTime<Utc>,
        now: DateTime<Utc>,
        active_keys: &HashSet<String>,
        active_paths: &HashSet<PathBuf>,
        metadata: &MetadataStore,
        images: &ImageStore,
    ) -> Result<bool> {
        if now < reset_point {
            return Ok(false);
        }
        if self
            .last_purge
            .lock()
            .is_some_and(|last| last >= reset_point)
        {
            return Ok(false);
        }

        debug!("Running scheduled cache purge for reset point {}", reset_point);
        metadata.sweep(active_keys).await?;
        images.sweep(active_paths).await?;

        *self.last_purge.lock() = Some(now);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeZone;
    use tempfile::TempDir;

    use super::*;
    use crate::metadata::CachedMap;
    use crate::paths::{CachePaths, CacheRoots};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn march_2024_resets_on_the_seventh() {
        // 2024-03-01 is a Friday, so the first Thursday is the 7th;
        // 20:00 at UTC+2 is 18:00 UTC.
        let reset = next_reset_point(utc(2024, 3, 15, 12, 0));
        assert_eq!(reset, utc(2024, 3, 7, 18, 0));
    }

    #[test]
    fn month_starting_on_thursday_resets_on_day_one() {
        // 2024-02-01 is a Thursday.
        let reset = next_reset_point(utc(2024, 2, 20, 0, 0));
        assert_eq!(reset, utc(2024, 2, 1, 18, 0));
    }

    #[test]
    fn reference_timezone_shifts_the_month_boundary() {
        // 22:30 UTC on the last day of March is already April 1st at
        // UTC+2, so the April reset applies.
        let reset = next_reset_point(utc(2024, 3, 31, 22, 30));
        assert_eq!(reset, utc(2024, 4, 4, 18, 0));
    }

    #[test]
    fn staleness_boundaries() {
        let reset = utc(2024, 3, 7, 18, 0);

        // Cached exactly at the reset point: not stale.
        assert!(!is_stale(reset, utc(2024, 3, 8, 0, 0), reset));
        // Before the reset point nothing is stale, however old.
        assert!(!is_stale(utc(2020, 1, 1, 0, 0), utc(2024, 3, 7, 17, 59), reset));
        // Cached before, observed after: stale.
        assert!(is_stale(utc(2024, 3, 7, 17, 59), utc(2024, 3, 7, 18, 0), reset));
        // Cached after the boundary stays fresh far past it.
        assert!(!is_stale(utc(2024, 3, 7, 18, 1), utc(2024, 3, 30, 0, 0), reset));
    }

    #[test]
    fn record_without_timestamp_counts_as_stale() {
        let record = CachedMap {
            key: "3500-42".into(),
            map: mapgen_client::MapMetadata::default(),
            cached_at: None,
        };
        let reset = utc(2024, 3, 7, 18, 0);
        assert!(record.is_stale(utc(2024, 3, 8, 0, 0), reset));
    }

    #[tokio::test]
    async fn purge_runs_at_most_once_per_window() {
        let dir = TempDir::new().unwrap();
        let paths = Arc::new(CachePaths::new(CacheRoots::new(
            dir.path().join("meta"),
            dir.path().join("img"),
        )));
        let metadata = MetadataStore::new(Arc::clone(&paths));
        let images = ImageStore::new(Arc::clone(&paths));

        let stale = CachedMap {
            key: "3500-42".into(),
            map: mapgen_client::MapMetadata::default(),
            cached_at: None,
        };
        metadata.save(stale).await.unwrap();

        let scheduler = ResetScheduler::new();
        let reset = utc(2024, 3, 7, 18, 0);
        let active = HashSet::new();
        let active_paths = HashSet::new();

        // Before the reset point: nothing happens.
        let ran = scheduler
            .purge_if_due(reset, utc(2024, 3, 7, 17, 0), &active, &active_paths, &metadata, &images)
            .await
            .unwrap();
        assert!(!ran);
        assert!(metadata.load("3500-42").await.is_some());

        // First call after the reset point sweeps.
        let ran = scheduler
            .purge_if_due(reset, utc(2024, 3, 7, 19, 0), &active, &active_paths, &metadata, &images)
            .await
            .unwrap();
        assert!(ran);
        assert!(metadata.load("3500-42").await.is_none());

        // Second call in the same window is a no-op even with new entries.
        let again = CachedMap {
            key: "3500-43".into(),
            map: mapgen_client::MapMetadata::default(),
            cached_at: None,
        };
        metadata.save(again).await.unwrap();
        let ran = scheduler
            .purge_if_due(reset, utc(2024, 3, 7, 20, 0), &active, &active_paths, &metadata, &images)
            .await
            .unwrap();
        assert!(!ran);
        assert!(metadata.load("3500-43").await.is_some());
    }
}
