// Password-derived master key (Argon2i).
//
// The derived key is a 32-byte `SessionKey`, so it can key a `SessionCipher`
// directly. The salt is caller-supplied and must be at least 8 bytes.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::{Result, TetherTrustError};
use crate::freshness::{SessionKey, SESSION_KEY_LEN};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterKeyParams {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl MasterKeyParams {
    /// 32 MiB, 3 passes, 4 lanes.
    pub const DEFAULT: Self = Self {
        memory_kib: 32 * 1024,
        iterations: 3,
        parallelism: 4,
    };

    /// Cheap parameters for tests only.
    pub const TESTING: Self = Self {
        memory_kib: 256,
        iterations: 2,
        parallelism: 1,
    };
}

impl Default for MasterKeyParams {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Derive a master key from `password` and `salt`.
///
/// Bad parameters (e.g. a salt shorter than 8 bytes) are a
/// [`TetherTrustError::CryptoSetup`] error.
pub fn derive_master_key(
    password: &[u8],
    salt: &[u8],
    params: MasterKeyParams,
) -> Result<SessionKey> {
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(SESSION_KEY_LEN),
    )
    .map_err(|e| TetherTrustError::CryptoSetup(format!("argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2i, Version::V0x13, argon2_params);

    let mut output = [0u8; SESSION_KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| TetherTrustError::CryptoSetup(format!("argon2: {e}")))?;

    let key = SessionKey::from_bytes(output);
    zeroize::Zeroize::zeroize(&mut output);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2i_known_answer() {
        // Reference vector: Argon2i v1.3, t=2, m=256 KiB, p=1.
        let key = derive_master_key(b"password", b"somesalt", MasterKeyParams::TESTING).unwrap();
        assert_eq!(
            hex::encode(key.as_bytes()),
            "89e9029f4637b295beb027056a7336c414fadd43f6b208645281cb214a56452f"
        );
    }

    #[test]
    fn salt_and_password_change_the_key() {
        let base = derive_master_key(b"password", b"somesalt", MasterKeyParams::TESTING).unwrap();
        let other_salt =
            derive_master_key(b"password", b"diffsalt", MasterKeyParams::TESTING).unwrap();
        let other_pw = derive_master_key(b"different", b"somesalt", MasterKeyParams::TESTING).unwrap();
        assert!(!base.ct_eq(&other_salt));
        assert!(!base.ct_eq(&other_pw));
    }

    #[test]
    fn short_salt_rejected() {
        let err = derive_master_key(b"password", b"short", MasterKeyParams::TESTING).unwrap_err();
        assert!(matches!(err, TetherTrustError::CryptoSetup(_)));
    }

    #[test]
    fn default_matches_documented_cost() {
        let p = MasterKeyParams::default();
        assert_eq!((p.memory_kib, p.iterations, p.parallelism), (32 * 1024, 3, 4));
    }
}
