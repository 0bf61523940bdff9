use crate::error::{validation_error, AppResult, Error};
use crate::events::CalendarEvent;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use rust_i18n::t;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Calendar layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalendarView {
    #[default]
    Month,
    Week,
    Day,
}

impl CalendarView {
    pub fn as_str(self) -> &'static str {
        match self {
            CalendarView::Month => "month",
            CalendarView::Week => "week",
            CalendarView::Day => "day",
        }
    }
}

impl FromStr for CalendarView {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "month" => Ok(CalendarView::Month),
            "week" => Ok(CalendarView::Week),
            "day" => Ok(CalendarView::Day),
            other => Err(validation_error(&format!("Unknown calendar view: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Dates shown by a view, `end` is exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ViewRange {
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day < end)
    }

    /// The range as UTC instants for a given timezone
    pub fn to_utc(&self, tz: &Tz) -> (DateTime<Utc>, DateTime<Utc>) {
        (local_midnight_utc(self.start, tz), local_midnight_utc(self.end, tz))
    }
}

fn out_of_range(date: NaiveDate) -> Error {
    validation_error(&t!("validation_date_out_of_range", date = date.to_string()))
}

fn add_days(date: NaiveDate, days: i64) -> AppResult<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| out_of_range(date))
}

/// Start of the week containing `date`
pub fn start_of_week(date: NaiveDate, week_start: Weekday) -> AppResult<NaiveDate> {
    let offset = (7 + date.weekday().num_days_from_monday() - week_start.num_days_from_monday()) % 7;
    add_days(date, -(offset as i64))
}

/// Dates visible in `view` around `anchor`
pub fn visible_range(
    view: CalendarView,
    anchor: NaiveDate,
    week_start: Weekday,
) -> AppResult<ViewRange> {
    let range = match view {
        CalendarView::Day => ViewRange {
            start: anchor,
            end: add_days(anchor, 1)?,
        },
        CalendarView::Week => {
            let start = start_of_week(anchor, week_start)?;
            ViewRange {
                start,
                end: add_days(start, 7)?,
            }
        }
        CalendarView::Month => {
            let first = add_days(anchor, -(anchor.day0() as i64))?;
            let next_first = first
                .checked_add_months(Months::new(1))
                .ok_or_else(|| out_of_range(anchor))?;
            let last = add_days(next_first, -1)?;
            ViewRange {
                start: start_of_week(first, week_start)?,
                end: add_days(start_of_week(last, week_start)?, 7)?,
            }
        }
    };
    Ok(range)
}

/// Anchor date one view step away, month steps clamp the day of month
pub fn navigate(view: CalendarView, anchor: NaiveDate, direction: Direction) -> AppResult<NaiveDate> {
    match (view, direction) {
        (CalendarView::Day, Direction::Previous) => add_days(anchor, -1),
        (CalendarView::Day, Direction::Next) => add_days(anchor, 1),
        (CalendarView::Week, Direction::Previous) => add_days(anchor, -7),
        (CalendarView::Week, Direction::Next) => add_days(anchor, 7),
        (CalendarView::Month, Direction::Previous) => anchor
            .checked_sub_months(Months::new(1))
            .ok_or_else(|| out_of_range(anchor)),
        (CalendarView::Month, Direction::Next) => anchor
            .checked_add_months(Months::new(1))
            .ok_or_else(|| out_of_range(anchor)),
    }
}

/// UTC instant of local midnight, moved past a DST gap if midnight does not exist
fn local_midnight_utc(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let midnight = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| {
            midnight
                .checked_add_signed(Duration::hours(1))
                .and_then(|later| tz.from_local_datetime(&later).earliest())
        })
        .map(|local| local.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// One cell of the calendar grid
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    /// False for the leading/trailing days of neighbouring months in month view
    pub in_focus: bool,
    pub is_today: bool,
    pub events: Vec<CalendarEvent>,
}

/// Everything a client needs to draw one view
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPage {
    pub view: CalendarView,
    pub anchor: NaiveDate,
    pub range: ViewRange,
    pub previous: NaiveDate,
    pub next: NaiveDate,
    pub timezone: String,
    pub days: Vec<CalendarDay>,
}

/// Lay out `events` for a view, bucketing them by local day in `tz`
pub fn build_page(
    view: CalendarView,
    anchor: NaiveDate,
    week_start: Weekday,
    tz: &Tz,
    today: NaiveDate,
    events: &[CalendarEvent],
) -> AppResult<CalendarPage> {
    let range = visible_range(view, anchor, week_start)?;
    let previous = navigate(view, anchor, Direction::Previous)?;
    let next = navigate(view, anchor, Direction::Next)?;

    // Day boundaries, `range.end` included
    let bounds: Vec<NaiveDate> = range.days().chain(std::iter::once(range.end)).collect();

    let days = bounds
        .windows(2)
        .map(|pair| {
            let date = pair[0];
            let from = local_midnight_utc(date, tz);
            let to = local_midnight_utc(pair[1], tz);
            let mut day_events: Vec<CalendarEvent> = events
                .iter()
                .filter(|event| event.overlaps(from, to))
                .cloned()
                .collect();
            day_events.sort_by_key(|event| event.start);

            let in_focus = match view {
                CalendarView::Month => {
                    date.month() == anchor.month() && date.year() == anchor.year()
                }
                _ => true,
            };

            CalendarDay {
                date,
                in_focus,
                is_today: date == today,
                events: day_events,
            }
        })
        .collect();

    Ok(CalendarPage {
        view,
        anchor,
        range,
        previous,
        next,
        timezone: tz.name().to_string(),
        days,
    })
}
