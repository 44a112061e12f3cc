//! Poll id generation
//!
//! Ids are the creation time in base-36 milliseconds followed by a random
//! base-36 suffix. No shared counter is involved, so concurrent creators
//! in separate processes do not coordinate.

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::models::PollId;

const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix (~62 bits of entropy)
const SUFFIX_LEN: usize = 12;

pub fn generate_poll_id(now: DateTime<Utc>) -> PollId {
    let millis = u64::try_from(now.timestamp_millis()).unwrap_or(0);
    let mut id = to_base36(millis);

    let mut rng = rand::thread_rng();
    id.extend((0..SUFFIX_LEN).map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char));

    PollId(id)
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(ALPHABET[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();
    String::from_utf8_lossy(&digits).into_owned()
}
