//! HMAC-SHA256 token verification (§4.1 step 4).
//!
//! `msg = uid || ":" || path || ":" || expires`; the presented token is
//! base64url without padding, compared to the expected MAC in constant time.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Verify `token` against `(uid, path, expires)` signed with `secret`.
/// `expires` must parse as an integer strictly greater than the current
/// epoch second. Any parse failure or mismatch returns `false`.
pub fn verify_token(secret: &str, uid: &str, path: &str, expires: &str, token: &str) -> bool {
    let Ok(expires_val) = expires.parse::<i64>() else {
        return false;
    };
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(i64::MAX);
    if expires_val <= now {
        return false;
    }

    let Ok(presented) = URL_SAFE_NO_PAD.decode(token) else {
        return false;
    };

    let msg = format!("{uid}:{path}:{expires}");
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(msg.as_bytes());
    let expected = mac.finalize().into_bytes();

    expected.as_slice().ct_eq(&presented).into()
}

/// Sign `(uid, path, expires)` with `secret`, producing the token a caller
/// would present. Used by tests and by anything minting links server-side.
pub fn sign_token(secret: &str, uid: &str, path: &str, expires: i64) -> String {
    let msg = format!("{uid}:{path}:{expires}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(msg.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}
