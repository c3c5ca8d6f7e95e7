//! Batch progress percentage

/// Percentage of `total_secs` covered by `completed_secs` plus the time
/// spent in the running step
///
/// `elapsed_in_step_secs` is capped at `step_secs` so overrunning a step
/// never reports more progress than finishing it would. Without a known
/// total the result is 0.
pub fn process_percentage(total_secs: u32, completed_secs: u32, elapsed_in_step_secs: u64, step_secs: u32) -> u8 {
    if total_secs == 0 {
        return 0;
    }
    let in_step = elapsed_in_step_secs.min(u64::from(step_secs));
    let done = u64::from(completed_secs) + in_step;
    let percent = done.saturating_mul(100) / u64::from(total_secs);
    percent.min(100) as u8
}

/// Percentage of a single timed cycle, for machines without step tracking
pub fn cycle_percentage(total_secs: u32, elapsed_secs: u64) -> u8 {
    process_percentage(total_secs, 0, elapsed_secs, total_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_total_is_zero() {
        assert_eq!(process_percentage(0, 0, 500, 500), 0);
        assert_eq!(cycle_percentage(0, 10), 0);
    }

    #[test]
    fn test_completed_plus_elapsed() {
        // 300 of 1000 done, 200 into a 400 s step
        assert_eq!(process_percentage(1000, 300, 200, 400), 50);
    }

    #[test]
    fn test_overrun_is_capped_at_step_time() {
        assert_eq!(process_percentage(1000, 300, 10_000, 400), 70);
    }

    #[test]
    fn test_never_above_hundred() {
        assert_eq!(process_percentage(100, 150, 0, 0), 100);
        assert_eq!(cycle_percentage(60, 3600), 100);
    }

    #[test]
    fn test_monotonic_across_step_change() {
        let steps = [120u32, 300, 60, 200];
        let total: u32 = steps.iter().sum();
        let mut last = 0u8;
        let mut completed = 0u32;

        for step in steps {
            // overrun each step by 50 s
            for elapsed in (0..=u64::from(step) + 50).step_by(5) {
                let percent = process_percentage(total, completed, elapsed, step);
                assert!(percent >= last, "{percent} < {last}");
                last = percent;
            }
            completed += step;
        }
        assert_eq!(process_percentage(total, completed, 0, 0), 100);
    }
}
