pub mod mine;
pub mod retarget;

pub use mine::{meets_difficulty, mine, MineOutcome, CANCEL_CHECK_INTERVAL, MAX_NONCE};
pub use retarget::{adjust_difficulty, RETARGET_WINDOW, TARGET_BLOCK_TIME_SECS};
