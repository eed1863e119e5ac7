use rand::rngs::OsRng;
use rand::RngCore;

pub const INVITE_CODE_LENGTH: usize = 8;

/// Uppercase letters and digits without the look-alikes 0 O 1 I
pub const INVITE_CODE_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Draw a fresh code from the operating system's CSPRNG.
///
/// The alphabet has exactly 32 symbols, so reducing a random byte modulo 32
/// keeps every symbol equally likely.
pub fn generate_invite_code() -> String {
    let mut bytes = [0u8; INVITE_CODE_LENGTH];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| INVITE_CODE_ALPHABET[usize::from(*b) % INVITE_CODE_ALPHABET.len()] as char)
        .collect()
}

/// Canonical lookup form: trimmed and uppercased. Blank input has no form.
pub fn normalize_invite_code(code: &str) -> Option<String> {
    let code = code.trim();
    if code.is_empty() {
        None
    } else {
        Some(code.to_ascii_uppercase())
    }
}
