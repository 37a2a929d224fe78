//! Tracking-token generator
//!
//! 以纳秒时间戳 + 128 位随机数为种子，xxh64 压缩为 16 位 hex。
//! 生成器本身不保证全局唯一；clicks.ref_token 上的唯一索引才是权威保证，
//! 碰撞时由调用方重新生成。

use rand::RngExt;
use xxhash_rust::xxh64::xxh64;

/// Fixed token width, also the join-key width echoed back by webhooks
pub const TOKEN_LEN: usize = 16;

/// Generate a 16-character lowercase-hex tracking token.
pub fn generate() -> String {
    let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let salt: u128 = rand::rng().random();
    let seed = format!("{}-{:032x}", nanos, salt);
    format!("{:016x}", xxh64(seed.as_bytes(), 0))
}
