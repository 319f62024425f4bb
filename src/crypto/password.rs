//! Salted PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored form: `pbkdf2-sha256$<iterations>$<salt>$<hash>` with salt and
//! hash in unpadded standard base64. The iteration count travels with the
//! hash, so raising the configured cost never invalidates old accounts.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use super::CryptoError;

pub const PBKDF2_ITERATIONS: u32 = 600_000;
pub const HASH_LENGTH: usize = 32;
pub const SALT_LENGTH: usize = 32;

const SCHEME: &str = "pbkdf2-sha256";

/// Derived hash bytes, zeroed on drop.
#[derive(Zeroize)]
#[zeroize(drop)]
struct DerivedHash {
    bytes: [u8; HASH_LENGTH],
}

impl DerivedHash {
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut bytes = [0u8; HASH_LENGTH];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut bytes);
        Self { bytes }
    }
}

/// Parsed `pbkdf2-sha256$...` string.
struct StoredHash {
    iterations: u32,
    salt: Vec<u8>,
    hash: Vec<u8>,
}

impl StoredHash {
    fn parse(stored: &str) -> Result<Self, CryptoError> {
        let mut parts = stored.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return Err(CryptoError::MalformedHash);
        };

        if scheme != SCHEME {
            return Err(CryptoError::MalformedHash);
        }
        let iterations: u32 = iterations.parse().map_err(|_| CryptoError::MalformedHash)?;
        if iterations == 0 {
            return Err(CryptoError::MalformedHash);
        }

        let salt = STANDARD_NO_PAD
            .decode(salt)
            .map_err(|_| CryptoError::MalformedHash)?;
        let hash = STANDARD_NO_PAD
            .decode(hash)
            .map_err(|_| CryptoError::MalformedHash)?;
        if hash.len() != HASH_LENGTH {
            return Err(CryptoError::MalformedHash);
        }

        Ok(Self { iterations, salt, hash })
    }
}

/// Generate a cryptographically random salt
pub fn generate_salt() -> [u8; SALT_LENGTH] {
    let mut salt = [0u8; SALT_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> Result<String, CryptoError> {
    if iterations == 0 {
        return Err(CryptoError::InvalidIterations);
    }
    let salt = generate_salt();
    let derived = DerivedHash::derive(password, &salt, iterations);
    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        STANDARD_NO_PAD.encode(salt),
        STANDARD_NO_PAD.encode(derived.bytes)
    ))
}

/// A well-formed stored hash that no password matches: the salt and the
/// hash are independent random bytes. Verifying against it costs the
/// same PBKDF2 work as verifying a real account at `iterations`.
pub fn decoy_hash(iterations: u32) -> String {
    let hash: [u8; HASH_LENGTH] = rand::random();
    format!(
        "{SCHEME}${}${}${}",
        iterations.max(1),
        STANDARD_NO_PAD.encode(generate_salt()),
        STANDARD_NO_PAD.encode(hash)
    )
}

/// Check a candidate password against a stored hash in constant time.
///
/// A malformed stored hash is an error, not a mismatch, so corrupted
/// account records surface instead of silently locking the user out.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CryptoError> {
    let stored = StoredHash::parse(stored)?;
    let candidate = DerivedHash::derive(password, &stored.salt, stored.iterations);
    Ok(candidate.bytes[..].ct_eq(&stored.hash[..]).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: u32 = 1_000;

    #[test]
    fn verifies_original_password_only() {
        let stored = hash_password("correct horse", FAST).unwrap();
        assert!(verify_password("correct horse", &stored).unwrap());
        assert!(!verify_password("correct horse ", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("password", FAST).unwrap();
        let b = hash_password("password", FAST).unwrap();
        assert_ne!(a, b);
        assert!(verify_password("password", &a).unwrap());
        assert!(verify_password("password", &b).unwrap());
    }

    #[test]
    fn stored_form_carries_iterations() {
        let stored = hash_password("pw", 1234).unwrap();
        let parts: Vec<&str> = stored.split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2-sha256");
        assert_eq!(parts[1], "1234");
    }

    #[test]
    fn malformed_hash_is_an_error() {
        for bad in [
            "",
            "password",
            "pbkdf2-sha256$abc$AAAA$AAAA",
            "pbkdf2-sha256$0$AAAA$AAAA",
            "bcrypt$10$AAAA$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA",
            "pbkdf2-sha256$1000$AAAA$AAAA$extra",
        ] {
            assert!(
                matches!(verify_password("pw", bad), Err(CryptoError::MalformedHash)),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn zero_iterations_rejected() {
        assert!(matches!(
            hash_password("pw", 0),
            Err(CryptoError::InvalidIterations)
        ));
    }

    #[test]
    fn generate_salt_is_random() {
        assert_ne!(generate_salt(), generate_salt());
    }

    #[test]
    fn decoy_hash_is_well_formed_and_matches_nothing() {
        let decoy = decoy_hash(FAST);
        let parsed = StoredHash::parse(&decoy).unwrap();
        assert_eq!(parsed.iterations, FAST);
        assert_eq!(parsed.salt.len(), SALT_LENGTH);
        assert!(!verify_password("", &decoy).unwrap());
        assert!(!verify_password("password", &decoy).unwrap());
        assert_ne!(decoy, decoy_hash(FAST));
    }
}
