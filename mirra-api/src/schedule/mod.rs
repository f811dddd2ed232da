mod season;
mod sleep;

pub use season::*;
pub use sleep::*;

/// Advances `next` by whole intervals until it lies strictly after `current`.
///
/// Catches a schedule up after any sleep longer than one interval. The result
/// stays congruent to `next` modulo `interval`. A zero interval leaves `next`
/// untouched.
pub fn next_scheduled(current: u32, next: u32, interval: u32) -> u32 {
    if interval == 0 || next > current {
        return next;
    }

    let steps = (current - next) / interval + 1;
    next.saturating_add(steps.saturating_mul(interval))
}

/// Rounds `time` up to a multiple of `rounding`; zero disables rounding.
pub fn round_up(time: u32, rounding: u32) -> u32 {
    if rounding == 0 {
        return time;
    }
    time.div_ceil(rounding).saturating_mul(rounding)
}

/// First sample slot after a schedule assignment at `cur_time`.
pub fn first_sample_time(cur_time: u32, interval: u32, rounding: u32, offset: u32) -> u32 {
    round_up(cur_time.saturating_add(interval), rounding).saturating_add(offset)
}

/// Messages a node may send per comm period: one and a half intervals worth
/// of samples, plus one.
pub fn max_messages(comm_interval: u32, sample_interval: u32) -> u32 {
    if sample_interval == 0 {
        return 1;
    }
    let allowance = 3 * comm_interval as u64 / (2 * sample_interval as u64) + 1;
    allowance.min(u32::MAX as u64) as u32
}

/// Length in seconds of one node's comm slot.
pub fn comm_period_length(max_messages: u32, sensor_data_timeout_ms: u32, time_config_timeout_ms: u32) -> u32 {
    let total_ms = max_messages as u64 * sensor_data_timeout_ms as u64 + time_config_timeout_ms as u64;
    (total_ms / 1000).min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_scheduled_catches_up() {
        assert_eq!(next_scheduled(100, 150, 60), 150);
        assert_eq!(next_scheduled(150, 150, 60), 210);
        assert_eq!(next_scheduled(1000, 150, 60), 1050);
        assert_eq!(next_scheduled(0, 0, 10), 10);
    }

    #[test]
    fn test_next_scheduled_properties() {
        let intervals = [1u32, 7, 60, 3600, 86_400];
        let points = [0u32, 1, 59, 3599, 86_399, 1_700_000_000, 1_700_003_601];

        for &interval in &intervals {
            for &now in &points {
                for &next in &points {
                    let v = next_scheduled(now, next, interval);
                    assert!(v > now, "v={v} now={now} next={next} interval={interval}");
                    assert_eq!(v % interval, next % interval);
                    assert!(v >= next);

                    // Idempotent once caught up
                    assert_eq!(next_scheduled(now, v, interval), v);
                    // Monotonic in the current time
                    assert!(next_scheduled(now + 1, next, interval) >= v);
                }
            }
        }
    }

    #[test]
    fn test_round_up() {
        assert_eq!(round_up(3600, 3600), 3600);
        assert_eq!(round_up(3601, 3600), 7200);
        assert_eq!(round_up(59, 60), 60);
        assert_eq!(round_up(1234, 0), 1234);
    }

    #[test]
    fn test_first_sample_time() {
        let t = 1_699_999_200; // multiple of 3600
        assert_eq!(first_sample_time(t, 3600, 3600, 0), t + 3600);
        assert_eq!(first_sample_time(t + 10, 3600, 3600, 0), t + 7200);
        assert_eq!(first_sample_time(t + 10, 3600, 3600, 120), t + 7320);
        assert_eq!(first_sample_time(t + 10, 600, 0, 0), t + 610);
    }

    #[test]
    fn test_max_messages() {
        assert_eq!(max_messages(86_400, 10_800), 13);
        assert_eq!(max_messages(1800, 3600), 1);
        assert_eq!(max_messages(3600, 0), 1);
    }

    #[test]
    fn test_comm_period_length() {
        assert_eq!(comm_period_length(13, 6000, 3000), 81);
        assert_eq!(comm_period_length(0, 6000, 3000), 3);
    }
}
