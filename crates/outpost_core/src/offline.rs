//! Offline catch-up.
//!
//! Runs once at load time, before the live world is built. Each resource
//! is caught up independently from its own `lastSavedAt` (or the snapshot's
//! `lastOnline` when a resource has none):
//!
//! ```text
//! elapsed = clamp(floor((now - saved) in minutes), 0, max_minutes)
//! gain    = generation * elapsed * 60 * offline_factor   (if generation > 0 and elapsed >= 1)
//! amount  = min(amount + gain, capacity)
//! ```
//!
//! The calculation is pure: the same inputs always produce the same report
//! and the input snapshot is never modified.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::Content;
use crate::snapshot::{ResourceSnapshot, SnapshotResources};
use crate::stations::ResourceKind;

/// Result of a catch-up.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OfflineReport {
    /// Resources after catch-up.
    pub updated_resources: SnapshotResources,
    /// Largest elapsed whole-minute count across resources, after capping.
    pub minutes_passed: u64,
    /// Amount actually added, for resources that gained anything.
    pub gains: BTreeMap<ResourceKind, f64>,
}

impl OfflineReport {
    /// Check if any resource gained.
    #[must_use]
    pub fn has_gains(&self) -> bool {
        !self.gains.is_empty()
    }
}

/// Whole minutes between two instants, clamped into `[0, max_minutes]`.
#[must_use]
pub fn elapsed_minutes(saved: DateTime<Utc>, now: DateTime<Utc>, max_minutes: u64) -> u64 {
    let minutes = (now - saved).num_minutes();
    u64::try_from(minutes).unwrap_or(0).min(max_minutes)
}

/// Compute offline gains for every saved resource.
///
/// `last_online` is the fallback for resources saved without their own
/// timestamp. Resources with no timestamp at all, no generation, or less
/// than one elapsed minute come back unchanged. A resource that gained has
/// its `lastSavedAt` advanced to `now`.
///
/// Entries are taken as given: a missing `capacity` clamps against the
/// base capacity and a missing `autoGeneration` produces nothing.
/// [`SystemManager::load`](crate::manager::SystemManager::load) fills
/// both from the saved upgrade levels before calling this.
#[must_use]
pub fn catch_up(
    saved: &SnapshotResources,
    last_online: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    max_minutes: u64,
    content: &Content,
) -> OfflineReport {
    let mut report = OfflineReport {
        updated_resources: *saved,
        ..OfflineReport::default()
    };

    for (kind, entry) in saved.iter() {
        let Some(since) = entry.last_saved_at.or(last_online) else {
            continue;
        };
        let elapsed = elapsed_minutes(since, now, max_minutes);
        report.minutes_passed = report.minutes_passed.max(elapsed);

        let generation = entry.generation.unwrap_or(0.0);
        if generation <= 0.0 || elapsed < 1 {
            continue;
        }

        let Some(data) = content.resource(kind) else {
            tracing::warn!(resource = %kind, "No tuning for offline catch-up");
            continue;
        };
        let capacity = entry.capacity.unwrap_or_else(|| data.capacity_at(0));
        let produced = generation * elapsed as f64 * 60.0 * data.offline_factor;
        let amount = (entry.amount + produced).min(capacity);
        let gain = amount - entry.amount;
        if gain <= 0.0 {
            continue;
        }

        report.updated_resources.set(
            kind,
            ResourceSnapshot {
                amount,
                last_saved_at: Some(now),
                ..*entry
            },
        );
        report.gains.insert(kind, gain);
    }

    if report.has_gains() {
        tracing::info!(
            minutes = report.minutes_passed,
            gains = ?report.gains,
            "Offline progress applied"
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn energy(amount: f64, generation: f64, saved: DateTime<Utc>) -> SnapshotResources {
        let mut resources = SnapshotResources::default();
        resources.set(
            ResourceKind::Energy,
            ResourceSnapshot {
                amount,
                capacity: Some(100.0),
                generation: Some(generation),
                last_saved_at: Some(saved),
            },
        );
        resources
    }

    #[test]
    fn test_gain_clamped_to_capacity() {
        let content = Content::default();
        let saved = energy(10.0, 2.0, t0());
        let report = catch_up(&saved, None, t0() + Duration::minutes(60), 1440, &content);

        assert_eq!(report.minutes_passed, 60);
        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&90.0));
        let updated = report.updated_resources.get(ResourceKind::Energy).unwrap();
        assert_eq!(updated.amount, 100.0);
        assert_eq!(updated.last_saved_at, Some(t0() + Duration::minutes(60)));
    }

    #[test]
    fn test_unclamped_gain_uses_factor() {
        let content = Content::default();
        let mut saved = SnapshotResources::default();
        saved.set(
            ResourceKind::Insight,
            ResourceSnapshot {
                amount: 0.0,
                capacity: Some(1_000.0),
                generation: Some(1.0),
                last_saved_at: Some(t0()),
            },
        );

        let report = catch_up(&saved, None, t0() + Duration::minutes(2), 1440, &content);
        // 1 * 2 * 60 * 0.2
        assert_eq!(report.gains.get(&ResourceKind::Insight), Some(&24.0));
    }

    #[test]
    fn test_cap_equals_max_minutes() {
        let content = Content::default();
        let mut saved = SnapshotResources::default();
        saved.set(
            ResourceKind::Crew,
            ResourceSnapshot {
                amount: 0.0,
                capacity: Some(1.0e9),
                generation: Some(1.0),
                last_saved_at: Some(t0()),
            },
        );

        let long = catch_up(&saved, None, t0() + Duration::minutes(10_000), 1440, &content);
        let exact = catch_up(&saved, None, t0() + Duration::minutes(1440), 1440, &content);
        assert_eq!(long.minutes_passed, 1440);
        assert_eq!(long.gains, exact.gains);
    }

    #[test]
    fn test_idempotent() {
        let content = Content::default();
        let saved = energy(10.0, 2.0, t0());
        let now = t0() + Duration::minutes(30);

        let a = catch_up(&saved, None, now, 1440, &content);
        let b = catch_up(&saved, None, now, 1440, &content);
        assert_eq!(a, b);
        assert_eq!(saved, energy(10.0, 2.0, t0()));
    }

    #[test]
    fn test_no_generation_or_short_absence_unchanged() {
        let content = Content::default();

        let idle = energy(10.0, 0.0, t0());
        let report = catch_up(&idle, None, t0() + Duration::minutes(60), 1440, &content);
        assert!(!report.has_gains());
        assert_eq!(report.updated_resources, idle);

        let brief = energy(10.0, 2.0, t0());
        let report = catch_up(&brief, None, t0() + Duration::seconds(59), 1440, &content);
        assert_eq!(report.minutes_passed, 0);
        assert_eq!(report.updated_resources, brief);
    }

    #[test]
    fn test_clock_skew_is_zero() {
        let content = Content::default();
        let saved = energy(10.0, 2.0, t0());
        let report = catch_up(&saved, None, t0() - Duration::hours(3), 1440, &content);
        assert_eq!(report.minutes_passed, 0);
        assert!(!report.has_gains());
    }

    #[test]
    fn test_last_online_fallback() {
        let content = Content::default();
        let mut saved = energy(0.0, 1.0, t0());
        if let Some(entry) = saved.energy.as_mut() {
            entry.last_saved_at = None;
        }

        let report = catch_up(&saved, Some(t0()), t0() + Duration::minutes(1), 1440, &content);
        assert_eq!(report.gains.get(&ResourceKind::Energy), Some(&60.0));

        let report = catch_up(&saved, None, t0() + Duration::minutes(1), 1440, &content);
        assert!(!report.has_gains());
    }

    #[test]
    fn test_full_storage_not_touched() {
        let content = Content::default();
        let saved = energy(100.0, 2.0, t0());
        let report = catch_up(&saved, None, t0() + Duration::minutes(5), 1440, &content);
        assert_eq!(report.updated_resources, saved);
    }

    #[test]
    fn test_clamped_amount_never_exceeds_capacity() {
        let content = Content::default();
        let capacity = 711.323_851_690_238_3;
        let mut saved = SnapshotResources::default();
        saved.set(
            ResourceKind::Insight,
            ResourceSnapshot {
                amount: 58.023_054_054_696_73,
                capacity: Some(capacity),
                generation: Some(1.0),
                last_saved_at: Some(t0()),
            },
        );

        let report = catch_up(&saved, None, t0() + Duration::minutes(55), 1440, &content);
        let updated = report.updated_resources.get(ResourceKind::Insight).unwrap();
        assert!(updated.amount <= capacity);
        assert_eq!(updated.amount, capacity);
        assert_eq!(
            report.gains.get(&ResourceKind::Insight),
            Some(&(capacity - 58.023_054_054_696_73))
        );
    }
}
