// PEM key files: `<dir>/<name>.pem` (PKCS#8 private key) and
// `<dir>/<name>.pub.pem` (SPKI public key).
//
// Any failure here is a `CryptoSetup` error: the process must not start
// serving or dialing without its key material.

use std::fs;
use std::path::{Path, PathBuf};

use ed25519_dalek::pkcs8::spki::{DecodePublicKey, EncodePublicKey};
use ed25519_dalek::pkcs8::spki::der::pem::LineEnding;
use ed25519_dalek::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::crypto::keys::{IdentityKeyPair, PeerPublicKey};
use crate::error::{Result, TetherTrustError};

/// Default directory holding key files.
pub const DEFAULT_KEY_DIR: &str = "certs";

/// Path of the private key file for `name`.
pub fn private_key_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.pem"))
}

/// Path of the public key file for `name`.
pub fn public_key_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.pub.pem"))
}

/// Write both halves of `keypair` under `dir`, creating it if needed.
pub fn save_key_pair(dir: &Path, keypair: &IdentityKeyPair) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| setup(dir, e))?;

    let private_pem = keypair
        .signing_key()
        .to_pkcs8_pem(LineEnding::LF)
        .map_err(|e| TetherTrustError::CryptoSetup(format!("encode private key: {e}")))?;
    let private_path = private_key_path(dir, keypair.name());
    write_private(&private_path, private_pem.as_bytes())?;

    let public_pem = keypair
        .verifying_key()
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| TetherTrustError::CryptoSetup(format!("encode public key: {e}")))?;
    let public_path = public_key_path(dir, keypair.name());
    fs::write(&public_path, public_pem.as_bytes()).map_err(|e| setup(&public_path, e))?;

    tracing::info!(name = keypair.name(), dir = %dir.display(), "wrote key pair");
    Ok(())
}

/// Load the identity keypair `name` from `dir`.
pub fn load_key_pair(dir: &Path, name: &str) -> Result<IdentityKeyPair> {
    let path = private_key_path(dir, name);
    let pem = fs::read_to_string(&path).map_err(|e| setup(&path, e))?;
    let signing_key = SigningKey::from_pkcs8_pem(&pem).map_err(|e| {
        TetherTrustError::CryptoSetup(format!("malformed private key {}: {e}", path.display()))
    })?;
    Ok(IdentityKeyPair::from_signing_key(name, signing_key))
}

/// Load the pre-provisioned public key of peer `name` from `dir`.
pub fn load_public_key(dir: &Path, name: &str) -> Result<PeerPublicKey> {
    let path = public_key_path(dir, name);
    let pem = fs::read_to_string(&path).map_err(|e| setup(&path, e))?;
    let verifying_key = VerifyingKey::from_public_key_pem(&pem).map_err(|e| {
        TetherTrustError::CryptoSetup(format!("malformed public key {}: {e}", path.display()))
    })?;
    Ok(PeerPublicKey::new(name, verifying_key))
}

fn setup(path: &Path, err: std::io::Error) -> TetherTrustError {
    TetherTrustError::CryptoSetup(format!("{}: {err}", path.display()))
}

/// Write secret material so the file is never readable by anyone but the owner.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
        .map_err(|e| setup(path, e))?;
    // `mode` only applies on creation; an existing file keeps its bits.
    file.set_permissions(fs::Permissions::from_mode(0o600))
        .map_err(|e| setup(path, e))?;
    file.write_all(contents).map_err(|e| setup(path, e))
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).map_err(|e| setup(path, e))
}
