use rand::Rng;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const ACCESS_CODE_LEN: usize = 6;

/// Random project access code drawn from `A-Z0-9`.
pub fn generate() -> String {
    let mut rng = rand::thread_rng();
    (0..ACCESS_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Email of the guest account bound to an access code.
pub fn guest_email(access_code: &str) -> String {
    format!("{}@example.com", access_code)
}
