/// Current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a short random suffix for human-facing identifiers.
///
/// Two base36 characters (1296 values). Order numbers combine a
/// monotonic counter with this suffix, so the suffix only has to break
/// ties between counters that collide after a counter reset.
pub fn random_suffix() -> String {
    use rand::Rng;
    const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let mut rng = rand::thread_rng();
    (0..2)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}
