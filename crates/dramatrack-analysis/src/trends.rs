//! Genre distribution shifts across a trailing window of snapshots.

use std::collections::BTreeSet;

use chrono::Duration;
use dramatrack_core::Snapshot;

use crate::types::{GenreTrend, TrendResult};

pub const DEFAULT_TREND_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct TrendAggregator {
    window: Duration,
}

impl Default for TrendAggregator {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_TREND_WINDOW_DAYS))
    }
}

impl TrendAggregator {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Compare the earliest and latest of `snapshots` (oldest first).
    ///
    /// Returns `None` when fewer than two snapshots are available.
    #[must_use]
    pub fn aggregate(&self, platform: &str, snapshots: &[Snapshot]) -> Option<TrendResult> {
        let (start, end) = match snapshots {
            [first, .., last] => (first, last),
            _ => return None,
        };

        let all_genres: BTreeSet<&str> = start
            .items
            .iter()
            .chain(&end.items)
            .flat_map(|i| i.genres.iter().map(String::as_str))
            .collect();

        let mut genres: Vec<GenreTrend> = all_genres
            .into_iter()
            .filter_map(|genre| {
                let count_start = start.genre_count(genre);
                let count_end = end.genre_count(genre);
                let delta = signed(count_end) - signed(count_start);
                (delta != 0).then(|| GenreTrend {
                    genre: genre.to_string(),
                    count_start,
                    count_end,
                    delta,
                })
            })
            .collect();

        genres.sort_by(|a, b| {
            b.delta
                .abs()
                .cmp(&a.delta.abs())
                .then_with(|| a.genre.cmp(&b.genre))
        });

        Some(TrendResult {
            platform: platform.to_string(),
            window_start: start.captured_at,
            window_end: end.captured_at,
            genres,
        })
    }
}

fn signed(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}
