use rand::Rng;
use uuid::Uuid;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";
const SHORT_ID_LEN: usize = 21;

/// URL-safe random identifier used for most records
pub fn short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Chapter identifiers are UUIDs
pub fn chapter_id() -> String {
    Uuid::new_v4().to_string()
}

/// Blob key under which a chapter body is stored
pub fn chapter_blob_key(novel_id: &str, chapter_id: &str) -> String {
    format!("{}/{}.txt.gz", novel_id, chapter_id)
}
