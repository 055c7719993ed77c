use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of white balls in a draw
pub const WHITE_BALL_COUNT: usize = 5;
/// Highest white ball value
pub const WHITE_BALL_MAX: u8 = 69;
/// Highest powerball value
pub const POWERBALL_MAX: u8 = 26;

/// Which provider produced a draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTag {
    /// California Lottery structured API
    CaApi,
    /// California Lottery draw-game page
    CaWeb,
    /// powerball.com (main or history page)
    PowerballCom,
    /// Synthetic generator, never real data
    MockData,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceTag::CaApi => "ca_api",
            SourceTag::CaWeb => "ca_web",
            SourceTag::PowerballCom => "powerball.com",
            SourceTag::MockData => "mock_data",
        }
    }
}

/// Provenance tag carried on every draw.
///
/// Serialized as the bare source name, with an `_enhanced` suffix once a
/// partial or synthetic record has been backfilled from a secondary source.
/// The underlying tag is never lost by enrichment, so a mock draw stays
/// recognisable as `mock_data_enhanced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Provenance {
    pub source: SourceTag,
    pub enhanced: bool,
}

impl Provenance {
    pub fn new(source: SourceTag) -> Self {
        Self {
            source,
            enhanced: false,
        }
    }

    pub fn enhanced(self) -> Self {
        Self {
            enhanced: true,
            ..self
        }
    }

    pub fn is_mock(&self) -> bool {
        self.source == SourceTag::MockData
    }
}

impl From<SourceTag> for Provenance {
    fn from(source: SourceTag) -> Self {
        Self::new(source)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enhanced {
            write!(f, "{}_enhanced", self.source.as_str())
        } else {
            f.write_str(self.source.as_str())
        }
    }
}

impl FromStr for Provenance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, enhanced) = match s.strip_suffix("_enhanced") {
            Some(base) => (base, true),
            None => (s, false),
        };

        let source = match base {
            "ca_api" => SourceTag::CaApi,
            "ca_web" => SourceTag::CaWeb,
            "powerball.com" => SourceTag::PowerballCom,
            "mock_data" => SourceTag::MockData,
            other => return Err(format!("unknown draw source: {}", other)),
        };

        Ok(Self { source, enhanced })
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.to_string()
    }
}

impl TryFrom<String> for Provenance {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One prize tier as reported by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrizeTier {
    pub tier: String,
    pub winners: u32,
    pub prize: String,
}

/// A validated Powerball draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub draw_number: u32,
    /// Serialized as `YYYY-MM-DD`
    pub draw_date: NaiveDate,
    pub white_balls: [u8; WHITE_BALL_COUNT],
    pub powerball: u8,
    pub jackpot_amount: f64,
    pub winners: u32,
    pub source: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prize_breakdown: Option<Vec<PrizeTier>>,
}

impl Draw {
    /// True when the white-ball set and powerball are identical
    pub fn same_numbers(&self, other: &Draw) -> bool {
        let mut a = self.white_balls;
        let mut b = other.white_balls;
        a.sort_unstable();
        b.sort_unstable();
        a == b && self.powerball == other.powerball
    }

    pub fn is_mock(&self) -> bool {
        self.source.is_mock()
    }
}

/// Unvalidated draw as parsed from one source payload.
///
/// Parsers produce this immediately at the boundary; only the validator turns
/// it into a [`Draw`].
#[derive(Debug, Clone, PartialEq)]
pub struct RawCandidate {
    /// `None` when the source does not expose a draw number
    pub draw_number: Option<u32>,
    pub draw_date: NaiveDate,
    pub white_balls: Vec<u32>,
    pub powerball: u32,
    pub jackpot_amount: f64,
    pub winners: u32,
    pub source: SourceTag,
    pub prize_breakdown: Option<Vec<PrizeTier>>,
}

/// Powerball is drawn Monday, Wednesday and Saturday
pub fn is_draw_day(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Mon | Weekday::Wed | Weekday::Sat)
}

/// First draw day strictly after `date`
pub fn next_draw_day(date: NaiveDate) -> NaiveDate {
    let mut day = date + Duration::days(1);
    while !is_draw_day(day) {
        day += Duration::days(1);
    }
    day
}

/// Draw days in `(older, newer]`; 0 when `newer <= older`
pub fn draw_days_between(older: NaiveDate, newer: NaiveDate) -> u32 {
    let mut count = 0;
    let mut day = older;
    while day < newer {
        day += Duration::days(1);
        if is_draw_day(day) {
            count += 1;
        }
    }
    count
}
