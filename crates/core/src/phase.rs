//! Market-phase classification for live-vs-delayed endpoint routing.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Trading-session phase at a point in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketPhase {
    Pre,
    Open,
    Post,
    Closed,
}

impl MarketPhase {
    /// Live quote endpoints are only used during the open session; every
    /// other phase routes to the delayed family.
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Classifies exchange-local time into a market phase.
///
/// Weekends are `Closed`. Weekdays: 04:00-09:30 `Pre`, 09:30-16:00 `Open`,
/// 16:00-20:00 `Post`, otherwise `Closed`. Exchange holidays are not
/// modeled here; the quote staleness gate catches them downstream.
#[must_use]
pub fn market_phase(local: NaiveDateTime) -> MarketPhase {
    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return MarketPhase::Closed;
    }

    let t = local.time();
    let pre_start = NaiveTime::from_hms_opt(4, 0, 0).unwrap();
    let open_start = NaiveTime::from_hms_opt(9, 30, 0).unwrap();
    let close = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
    let post_end = NaiveTime::from_hms_opt(20, 0, 0).unwrap();

    if t >= open_start && t < close {
        MarketPhase::Open
    } else if t >= pre_start && t < open_start {
        MarketPhase::Pre
    } else if t >= close && t < post_end {
        MarketPhase::Post
    } else {
        MarketPhase::Closed
    }
}
