/// Minimum number of recent blocks required before a retarget is considered.
pub const RETARGET_WINDOW: usize = 10;

/// Target mean time between blocks, in seconds.
pub const TARGET_BLOCK_TIME_SECS: i64 = 600;

/// Propose a new difficulty from the timestamps of the last `RETARGET_WINDOW`
/// (or more) blocks, oldest first. Returns `None` when there isn't enough
/// history yet or the mean block time is already within tolerance of
/// [`TARGET_BLOCK_TIME_SECS`].
///
/// Mirrors a simple Bitcoin-style retarget: if blocks are coming in more than
/// twice as fast as target, raise difficulty by one; if more than 1.5x
/// slower, lower it by one (never below 1). This is advisory — the caller
/// applies it only at its own epoch boundaries (see `RETARGET_WINDOW` usage
/// in `gc-ledger`).
pub fn adjust_difficulty(current_difficulty: u32, recent_timestamps: &[i64]) -> Option<u32> {
    if recent_timestamps.len() < RETARGET_WINDOW {
        return None;
    }

    let deltas: Vec<i64> = recent_timestamps
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .collect();

    if deltas.is_empty() {
        return None;
    }

    let mean = deltas.iter().sum::<i64>() as f64 / deltas.len() as f64;

    if mean < TARGET_BLOCK_TIME_SECS as f64 * 0.5 {
        Some(current_difficulty + 1)
    } else if mean > TARGET_BLOCK_TIME_SECS as f64 * 1.5 {
        Some(current_difficulty.saturating_sub(1).max(1))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timestamps(start: i64, count: usize, step: i64) -> Vec<i64> {
        (0..count as i64).map(|i| start + i * step).collect()
    }

    #[test]
    fn not_enough_history_returns_none() {
        let ts = timestamps(0, 5, 600);
        assert_eq!(adjust_difficulty(4, &ts), None);
    }

    #[test]
    fn fast_blocks_raise_difficulty() {
        let ts = timestamps(0, RETARGET_WINDOW, 100);
        assert_eq!(adjust_difficulty(4, &ts), Some(5));
    }

    #[test]
    fn slow_blocks_lower_difficulty() {
        let ts = timestamps(0, RETARGET_WINDOW, 1200);
        assert_eq!(adjust_difficulty(4, &ts), Some(3));
    }

    #[test]
    fn difficulty_never_drops_below_one() {
        let ts = timestamps(0, RETARGET_WINDOW, 1200);
        assert_eq!(adjust_difficulty(1, &ts), Some(1));
    }

    #[test]
    fn on_target_blocks_need_no_adjustment() {
        let ts = timestamps(0, RETARGET_WINDOW, 600);
        assert_eq!(adjust_difficulty(4, &ts), None);
    }
}
