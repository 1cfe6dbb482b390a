//! HMAC-SHA1 token signing and verification.
//!
//! A timestamped token has the form `<created>|<signature>` where `created`
//! is the creation time in seconds encoded with [`codec::encode_int`] and the
//! signature is URL-safe base64 of `HMAC(secret, message || created)`.
//! Binding the timestamp into the signed material keeps tokens stateless.

use crate::error::{SignerError, SignerResult};
use crate::key::SecretKey;
use herald_core::codec;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use time::OffsetDateTime;

type HmacSha1 = Hmac<Sha1>;

/// Length of the base32 segment appended to list-size exempt addresses.
const EXEMPT_SUFFIX_LEN: usize = 10;

/// Length of cache scope segments.
const CACHE_SCOPE_LEN: usize = 16;

/// Outcome of verifying a timestamped token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureStatus {
    /// Signature matches and the token has not expired.
    Ok,
    /// Signature is missing, malformed or does not match.
    Bad,
    /// Signature matches but the token is older than the timeout.
    Timeout,
}

/// Signs and verifies messages under the process-wide secret.
#[derive(Clone)]
pub struct TokenSigner {
    mac: HmacSha1,
}

impl TokenSigner {
    /// Create a signer keyed with `key`.
    pub fn new(key: &SecretKey) -> SignerResult<Self> {
        let mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| SignerError::KeyLoading(format!("invalid HMAC key: {e}")))?;
        Ok(Self { mac })
    }

    fn digest(&self, parts: &[&[u8]]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        for part in parts {
            mac.update(part);
        }
        mac.finalize().into_bytes().to_vec()
    }

    /// Sign `message` with the current time.
    pub fn sign(&self, message: &str) -> SignerResult<String> {
        self.sign_at(message, OffsetDateTime::now_utc().unix_timestamp())
    }

    /// Sign `message` as if created at `created` (unix seconds).
    pub fn sign_at(&self, message: &str, created: i64) -> SignerResult<String> {
        let created = codec::encode_int(created)?;
        let signature = self.digest(&[message.as_bytes(), created.as_bytes()]);
        Ok(format!("{created}|{}", codec::encode_base64(&signature)))
    }

    /// Verify a token against the current time.
    ///
    /// `timeout` is in seconds; `None` skips the expiry check.
    pub fn verify(&self, message: &str, token: &str, timeout: Option<i64>) -> SignatureStatus {
        self.verify_at(
            message,
            token,
            timeout,
            OffsetDateTime::now_utc().unix_timestamp(),
        )
    }

    /// Verify a token as of `now` (unix seconds).
    pub fn verify_at(
        &self,
        message: &str,
        token: &str,
        timeout: Option<i64>,
        now: i64,
    ) -> SignatureStatus {
        let Some((created, signature)) = token.split_once('|') else {
            return SignatureStatus::Bad;
        };
        let Ok(provided) = codec::decode_base64(signature) else {
            return SignatureStatus::Bad;
        };

        let expected = self.digest(&[message.as_bytes(), created.as_bytes()]);
        if expected.len() != provided.len() || !bool::from(expected.ct_eq(&provided)) {
            return SignatureStatus::Bad;
        }

        let Ok(created_at) = codec::decode_int(created) else {
            return SignatureStatus::Bad;
        };
        if let Some(timeout) = timeout
            && now.saturating_sub(timeout) > created_at
        {
            return SignatureStatus::Timeout;
        }
        SignatureStatus::Ok
    }

    /// Untimed signature as URL-safe base64.
    pub fn sign_untimed(&self, message: &str) -> String {
        codec::encode_base64(&self.digest(&[message.as_bytes()]))
    }

    /// Untimed signature as lower-case base32 without padding.
    pub fn sign_untimed_base32(&self, message: &str) -> String {
        codec::encode_base32(&self.digest(&[message.as_bytes()]))
    }

    /// Untimed signature as padded lower-case base32, usable as a DNS label.
    pub fn dns_safe(&self, message: &str) -> String {
        codec::encode_base32_padded(&self.digest(&[message.as_bytes()]))
    }

    /// Address that lets `list_name` bypass the list service's size limit.
    pub fn list_size_exempt(&self, list_name: &str) -> String {
        let signature = self.sign_untimed_base32(list_name);
        format!("{list_name}+big/{}", &signature[..EXEMPT_SUFFIX_LEN])
    }

    /// Compact, non-reversible key segment for responses fetched with
    /// `credential`.
    pub fn cache_scope(&self, credential: &str) -> String {
        let signature = self.digest(&[b"cache-scope:", credential.as_bytes()]);
        let mut scope = codec::encode_base32(&signature);
        scope.truncate(CACHE_SCOPE_LEN);
        scope
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TokenSigner([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: i64 = 1_700_000_000;

    fn signer(secret: &str) -> TokenSigner {
        TokenSigner::new(&SecretKey::from_bytes(secret.as_bytes()).unwrap()).unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = signer("secret");
        let token = signer.sign("create:session-1").unwrap();

        assert_eq!(
            signer.verify("create:session-1", &token, None),
            SignatureStatus::Ok
        );
        assert_eq!(
            signer.verify("create:session-1", &token, Some(0)),
            SignatureStatus::Ok
        );
        assert_eq!(
            signer.verify("create:session-1", &token, Some(3600)),
            SignatureStatus::Ok
        );
    }

    #[test]
    fn test_token_format() {
        let signer = signer("secret");
        let token = signer.sign_at("message", T).unwrap();
        let (created, signature) = token.split_once('|').unwrap();

        assert_eq!(codec::decode_int(created).unwrap(), T);
        assert_eq!(codec::decode_base64(signature).unwrap().len(), 20);
        assert!(!signature.contains('='));
    }

    #[test]
    fn test_signature_is_deterministic() {
        let signer = signer("secret");
        assert_eq!(
            signer.sign_at("message", T).unwrap(),
            signer.sign_at("message", T).unwrap()
        );
    }

    #[test]
    fn test_expiry() {
        let signer = signer("secret");
        let token = signer.sign_at("message", T).unwrap();

        assert_eq!(
            signer.verify_at("message", &token, Some(5), T + 10),
            SignatureStatus::Timeout
        );
        assert_eq!(
            signer.verify_at("message", &token, Some(5), T + 1),
            SignatureStatus::Ok
        );
        assert_eq!(
            signer.verify_at("message", &token, Some(5), T + 5),
            SignatureStatus::Ok
        );
        assert_eq!(
            signer.verify_at("message", &token, None, T + 1_000_000),
            SignatureStatus::Ok
        );
    }

    #[test]
    fn test_tampered_signature_is_bad() {
        let signer = signer("secret");
        let token = signer.sign_at("message", T).unwrap();
        let (created, signature) = token.split_once('|').unwrap();

        for (i, original) in signature.char_indices() {
            let replacement = if original == 'A' { 'B' } else { 'A' };
            let mut tampered_sig = signature.to_string();
            tampered_sig.replace_range(i..i + 1, &replacement.to_string());
            let tampered = format!("{created}|{tampered_sig}");
            assert_eq!(
                signer.verify_at("message", &tampered, Some(60), T),
                SignatureStatus::Bad,
                "flipping position {i} was not detected"
            );
        }
    }

    #[test]
    fn test_tampered_timestamp_is_bad() {
        let signer = signer("secret");
        let token = signer.sign_at("message", T).unwrap();
        let (_, signature) = token.split_once('|').unwrap();
        let forged = format!("{}|{signature}", codec::encode_int(T + 3600).unwrap());

        assert_eq!(
            signer.verify_at("message", &forged, Some(5), T + 3600),
            SignatureStatus::Bad
        );
    }

    #[test]
    fn test_malformed_tokens_are_bad() {
        let signer = signer("secret");
        assert_eq!(signer.verify("message", "", None), SignatureStatus::Bad);
        assert_eq!(
            signer.verify("message", "no-separator", None),
            SignatureStatus::Bad
        );
        assert_eq!(
            signer.verify("message", "abc|not base64!", None),
            SignatureStatus::Bad
        );
    }

    #[test]
    fn test_wrong_message_or_key_is_bad() {
        let token = signer("secret").sign_at("message", T).unwrap();
        assert_eq!(
            signer("secret").verify_at("other", &token, None, T),
            SignatureStatus::Bad
        );
        assert_eq!(
            signer("different").verify_at("message", &token, None, T),
            SignatureStatus::Bad
        );
    }

    #[test]
    fn test_negative_timestamp_cannot_be_signed() {
        let err = signer("secret").sign_at("message", -1).unwrap_err();
        assert!(matches!(err, SignerError::Encoding(_)));
    }

    #[test]
    fn test_untimed_signatures() {
        let signer = signer("secret");
        let b32 = signer.sign_untimed_base32("widgets");
        assert_eq!(b32.len(), 32);
        assert!(b32.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_eq!(signer.dns_safe("widgets"), b32);
        assert_eq!(
            codec::decode_base64(&signer.sign_untimed("widgets")).unwrap(),
            codec::decode_base32(&b32).unwrap()
        );
    }

    #[test]
    fn test_list_size_exempt() {
        let signer = signer("secret");
        let address = signer.list_size_exempt("widgets");
        let suffix = address.strip_prefix("widgets+big/").unwrap();
        assert_eq!(suffix.len(), 10);
        assert!(signer.sign_untimed_base32("widgets").starts_with(suffix));
    }

    #[test]
    fn test_cache_scope_segments_by_credential() {
        let signer = signer("secret");
        let a = signer.cache_scope("token-a");
        assert_eq!(a.len(), 16);
        assert_eq!(a, signer.cache_scope("token-a"));
        assert_ne!(a, signer.cache_scope("token-b"));
        assert!(!a.contains("token"));
    }
}
