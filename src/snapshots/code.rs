use rand::Rng;

/// Characters allowed in snapshot codes (uppercase alphanumeric, excluding confusing chars)
/// Removed: 0, O, 1, I to avoid confusion
const SNAPSHOT_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const SNAPSHOT_CODE_LENGTH: usize = 4;

/// Generate a random 4-character snapshot code (uniqueness is checked by the store).
pub fn generate_snapshot_code() -> String {
    let mut rng = rand::thread_rng();
    (0..SNAPSHOT_CODE_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..SNAPSHOT_CODE_CHARS.len());
            char::from(SNAPSHOT_CODE_CHARS[idx])
        })
        .collect()
}

/// Validate snapshot code format (after normalization).
pub fn is_valid_snapshot_code(code: &str) -> bool {
    code.len() == SNAPSHOT_CODE_LENGTH && code.bytes().all(|b| SNAPSHOT_CODE_CHARS.contains(&b))
}

/// Normalize snapshot code (uppercase, trimmed)
pub fn normalize_snapshot_code(code: &str) -> String {
    code.trim().to_uppercase()
}
