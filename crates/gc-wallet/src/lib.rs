pub mod address;
pub mod error;
pub mod wallet;

pub use error::WalletError;
pub use wallet::{Direction, ExportedWallet, HistoryEntry, Wallet};
