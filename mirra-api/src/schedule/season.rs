use time::{Month, OffsetDateTime};

const HOUR: u32 = 3600;
const DAY: u32 = 24 * HOUR;

/// Approximate sunrise per month, seconds after midnight UTC (January first).
pub const SUNRISE_TABLE: [u32; 12] = [
    9 * HOUR,
    8 * HOUR + HOUR / 2,
    7 * HOUR + HOUR / 2,
    6 * HOUR + HOUR / 2,
    5 * HOUR + HOUR / 2,
    4 * HOUR,
    5 * HOUR + HOUR / 2,
    6 * HOUR,
    7 * HOUR,
    7 * HOUR + 48 * 60,
    8 * HOUR + HOUR / 2,
    9 * HOUR + 18 * 60,
];

/// Daily sampling keyed to a time of day that drifts with the seasons.
///
/// The reference time for a date is interpolated between the entry of its
/// month and the next month's entry, weighted by the day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeasonalSchedule {
    pub table: [u32; 12],
    /// Added to the interpolated reference time
    pub offset: u32,
}

impl Default for SeasonalSchedule {
    fn default() -> Self {
        Self {
            table: SUNRISE_TABLE,
            offset: 2 * HOUR,
        }
    }
}

impl SeasonalSchedule {
    pub fn new(table: [u32; 12], offset: u32) -> Self {
        Self { table, offset }
    }

    /// Target seconds after midnight for the day containing `epoch`.
    pub fn target_time_of_day(&self, epoch: u32) -> u32 {
        let date = OffsetDateTime::from_unix_timestamp(epoch as i64)
            .unwrap_or(OffsetDateTime::UNIX_EPOCH);

        let month = u8::from(date.month()) as usize - 1;
        let point_a = self.table[month] as f32;
        let point_b = self.table[(month + 1) % 12] as f32;

        let days = days_in_month(date.year(), date.month()) as f32;
        let weight = (date.day() as f32 - 1.0) / days;

        let reference = libm::roundf(point_a + (point_b - point_a) * weight) as u32;
        reference + self.offset
    }

    /// Seconds from `now` until the next future occurrence of the target.
    pub fn delay_until_next(&self, now: u32) -> u32 {
        let midnight = now - now % DAY;
        let today = midnight.saturating_add(self.target_time_of_day(now));
        if today > now {
            return today - now;
        }

        let tomorrow_midnight = midnight.saturating_add(DAY);
        let tomorrow = tomorrow_midnight.saturating_add(self.target_time_of_day(tomorrow_midnight));
        tomorrow.saturating_sub(now)
    }
}

fn days_in_month(year: i32, month: Month) -> u8 {
    match month {
        Month::February if time::util::is_leap_year(year) => 29,
        Month::February => 28,
        Month::April | Month::June | Month::September | Month::November => 30,
        _ => 31,
    }
}
