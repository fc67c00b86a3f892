use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signature the gateway attaches to a completed checkout: HMAC-SHA256 over
/// `<gateway_order_id>|<gateway_payment_id>`, lowercase hex.
pub fn sign(gateway_order_id: &str, gateway_payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a claimed signature against the shared secret. Comparison happens on
/// the decoded MAC bytes via `verify_slice`, which is constant-time. Any
/// missing field or malformed hex is simply invalid; this never fails loudly.
pub fn verify(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    claimed_signature: &str,
    secret: &str,
) -> bool {
    if gateway_order_id.is_empty() || gateway_payment_id.is_empty() || claimed_signature.is_empty() {
        return false;
    }

    let claimed = match hex::decode(claimed_signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(gateway_payment_id.as_bytes());

    mac.verify_slice(&claimed).is_ok()
}
