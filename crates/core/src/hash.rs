use sha2::{Digest, Sha256};

/// SHA-256 of the given field values joined with `", "`, as lowercase hex.
pub fn digest_fields<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let joined = fields.into_iter().collect::<Vec<_>>().join(", ");
    to_hex(&sha256_bytes(joined.as_bytes()))
}

pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
