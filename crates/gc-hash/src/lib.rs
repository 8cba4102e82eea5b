pub mod canonical;
pub mod error;
pub mod nonce;

pub use canonical::{hash_bytes, hash_pair, hash_str, hash_value, to_canonical_json};
pub use error::HashError;
pub use nonce::generate_nonce;
