use rand::RngCore;

/// Sanitized filenames keep at most this many trailing characters so the
/// extension survives truncation.
const MAX_NAME_LEN: usize = 80;

/// Derive a namespaced storage key:
/// `trips/<trip>/<media|attachments>/<random>_<sanitized filename>`.
/// Any kind other than "media" maps to the attachments folder. The random
/// component keeps concurrent uploads of identically named files distinct.
pub fn storage_key(trip_id: &str, kind: &str, filename: &str) -> String {
    let folder = if kind == "media" { "media" } else { "attachments" };

    let mut nonce = [0u8; 8];
    rand::rng().fill_bytes(&mut nonce);

    format!(
        "trips/{}/{}/{}_{}",
        trip_id,
        folder,
        hex::encode(nonce),
        sanitize_filename(filename)
    )
}

/// Restrict to `[A-Za-z0-9._-]` (everything else becomes `_`) and keep the
/// last [`MAX_NAME_LEN`] characters.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let len = cleaned.chars().count();
    if len > MAX_NAME_LEN {
        cleaned.chars().skip(len - MAX_NAME_LEN).collect()
    } else {
        cleaned
    }
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == "..")
}
