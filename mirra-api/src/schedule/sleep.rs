use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WakeSource {
    /// Internal oscillator, sub-second resolution
    Timer,
    /// External RTC alarm, 1 second resolution
    RtcAlarm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepPlan {
    /// Epoch second the device should be awake again
    pub wake_at: u32,
    /// Seconds to sleep
    pub duration: u32,
    pub source: WakeSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepPolicy {
    /// Upper bound on a single deep sleep
    pub max_sleep: u32,
    /// Sleeps shorter than this use the internal timer
    pub timer_threshold: u32,
}

impl Default for SleepPolicy {
    fn default() -> Self {
        Self {
            max_sleep: 3600,
            timer_threshold: 10,
        }
    }
}

impl SleepPolicy {
    /// Plans a sleep until the earliest of `wake_times`, clipped to `max_sleep`.
    pub fn plan<I>(&self, now: u32, wake_times: I) -> SleepPlan
    where
        I: IntoIterator<Item = u32>,
    {
        let duration = wake_times
            .into_iter()
            .min()
            .map(|at| at.saturating_sub(now))
            .unwrap_or(self.max_sleep)
            .min(self.max_sleep);

        let source = if duration < self.timer_threshold {
            WakeSource::Timer
        } else {
            WakeSource::RtcAlarm
        };

        SleepPlan {
            wake_at: now.saturating_add(duration),
            duration,
            source,
        }
    }
}
