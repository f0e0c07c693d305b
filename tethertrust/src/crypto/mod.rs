// Crypto module declarations

pub mod aead;
pub mod keys;
pub mod keystore;
pub mod master_key;
pub mod signature;
pub mod wrap;
