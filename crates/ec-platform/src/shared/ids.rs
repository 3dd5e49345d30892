//! Document IDs
//!
//! 13-character Crockford Base32 strings that sort by creation time:
//! 42 bits of milliseconds, 10 random bits, 12 bits of a process counter.

use std::sync::atomic::{AtomicU16, Ordering};

use chrono::Utc;
use rand::Rng;

const ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ID_LEN: usize = 13;

static COUNTER: AtomicU16 = AtomicU16::new(0);

pub fn new_id() -> String {
    let millis = Utc::now().timestamp_millis().max(0) as u64;
    let random = rand::thread_rng().gen::<u16>() as u64 & 0x3FF;
    let counter = COUNTER.fetch_add(1, Ordering::Relaxed) as u64 & 0xFFF;

    encode((millis & 0x3FF_FFFF_FFFF) << 22 | random << 12 | counter)
}

fn encode(mut value: u64) -> String {
    let mut out = [b'0'; ID_LEN];
    for slot in out.iter_mut().rev() {
        *slot = ALPHABET[(value & 0x1F) as usize];
        value >>= 5;
    }
    out.iter().map(|&b| b as char).collect()
}

/// Cheap shape check used before hitting the database with a path id.
pub fn is_valid_id(id: &str) -> bool {
    id.len() == ID_LEN && id.bytes().all(|b| ALPHABET.contains(&b.to_ascii_uppercase()))
}
