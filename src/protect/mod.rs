//! Reversible field obfuscation.
//!
//! This keeps values out of plain sight on disk. It is not encryption and must not be
//! relied on to protect secrets from anyone with access to the key material.

pub mod obfuscated;

use std::cell::RefCell;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{SettingsError, SettingsResult};

const KEY_DOMAIN: &[u8] = b"json-settings/obfuscation/v1";
const NONCE_LEN: usize = 16;
const TAG_LEN: usize = 8;

/// A reversible transform applied to marked fields. `deobfuscate` must invert `obfuscate`
/// exactly, and must fail rather than return garbage when it can tell the input was not
/// produced with the same key.
pub trait Obfuscator: Send + Sync + fmt::Debug {
    fn obfuscate(&self, plain: &[u8]) -> String;
    fn deobfuscate(&self, encoded: &str) -> SettingsResult<Vec<u8>>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct ObfuscationKey([u8; 32]);

impl ObfuscationKey {
    /// Key tied to the current account: its home directory and, on Unix, the uid owning
    /// that directory. Files written under one account do not decode under another. The
    /// home directory comes from `HOME` when set, so a process that overrides `HOME`
    /// derives a different key.
    pub fn for_current_user() -> Self {
        let home = dirs::home_dir();
        let home_text = home
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_default();

        let digest = Sha256::new()
            .chain_update(KEY_DOMAIN)
            .chain_update(home_text.as_bytes())
            .chain_update([0_u8])
            .chain_update(account_id(home.as_deref()).to_le_bytes())
            .finalize();
        Self(digest.into())
    }

    pub fn from_secret(secret: &[u8]) -> Self {
        let digest = Sha256::new()
            .chain_update(KEY_DOMAIN)
            .chain_update(secret)
            .finalize();
        Self(digest.into())
    }
}

#[cfg(unix)]
fn account_id(home: Option<&Path>) -> u64 {
    use std::fs;
    use std::os::unix::fs::MetadataExt;

    home.and_then(|path| fs::metadata(path).ok())
        .map(|meta| u64::from(meta.uid()))
        .unwrap_or(u64::MAX)
}

#[cfg(not(unix))]
fn account_id(_home: Option<&Path>) -> u64 {
    0
}

impl fmt::Debug for ObfuscationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ObfuscationKey(..)")
    }
}

/// SHA-256 keystream XOR with a random per-value nonce and a short check tag. Output is
/// base64 of `nonce || tag || ciphertext`.
#[derive(Debug, Clone)]
pub struct KeyedObfuscator {
    key: ObfuscationKey,
}

impl KeyedObfuscator {
    pub fn new(key: ObfuscationKey) -> Self {
        Self { key }
    }

    pub fn for_current_user() -> Self {
        Self::new(ObfuscationKey::for_current_user())
    }

    fn apply_keystream(&self, nonce: &[u8], data: &mut [u8]) {
        for (counter, chunk) in data.chunks_mut(32).enumerate() {
            let block = Sha256::new()
                .chain_update(self.key.0)
                .chain_update(nonce)
                .chain_update((counter as u64).to_le_bytes())
                .finalize();
            for (byte, pad) in chunk.iter_mut().zip(block.iter()) {
                *byte ^= pad;
            }
        }
    }

    fn check_tag(&self, nonce: &[u8], ciphertext: &[u8]) -> [u8; TAG_LEN] {
        let digest = Sha256::new()
            .chain_update(b"tag")
            .chain_update(self.key.0)
            .chain_update(nonce)
            .chain_update(ciphertext)
            .finalize();
        let mut tag = [0_u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        tag
    }
}

impl Obfuscator for KeyedObfuscator {
    fn obfuscate(&self, plain: &[u8]) -> String {
        let mut nonce = [0_u8; NONCE_LEN];
        rand::thread_rng().fill(&mut nonce);

        let mut ciphertext = plain.to_vec();
        self.apply_keystream(&nonce, &mut ciphertext);
        let tag = self.check_tag(&nonce, &ciphertext);

        let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&tag);
        out.extend_from_slice(&ciphertext);
        STANDARD.encode(out)
    }

    fn deobfuscate(&self, encoded: &str) -> SettingsResult<Vec<u8>> {
        let raw = STANDARD
            .decode(encoded)
            .map_err(|err| SettingsError::Obfuscation(format!("invalid encoding: {err}")))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(SettingsError::Obfuscation(
                "value too short to be obfuscated data".to_string(),
            ));
        }

        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        if self.check_tag(nonce, ciphertext) != tag {
            return Err(SettingsError::Obfuscation(
                "check failed; value was written with a different key or is corrupt".to_string(),
            ));
        }

        let mut plain = ciphertext.to_vec();
        self.apply_keystream(nonce, &mut plain);
        Ok(plain)
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Arc<dyn Obfuscator>>> = const { RefCell::new(None) };
}

/// Runs `f` with `obfuscator` serving every [`obfuscated`] field (de)serialized on this
/// thread. The previous obfuscator is restored afterwards, also on panic.
pub fn with_obfuscator<R>(obfuscator: Arc<dyn Obfuscator>, f: impl FnOnce() -> R) -> R {
    let _guard = ActiveGuard::install(obfuscator);
    f()
}

pub(crate) fn with_active<R>(f: impl FnOnce(&dyn Obfuscator) -> R) -> Option<R> {
    let current = ACTIVE.with(|active| active.borrow().clone());
    current.map(|obfuscator| f(obfuscator.as_ref()))
}

struct ActiveGuard {
    previous: Option<Arc<dyn Obfuscator>>,
}

impl ActiveGuard {
    fn install(obfuscator: Arc<dyn Obfuscator>) -> Self {
        let previous = ACTIVE.with(|active| active.replace(Some(obfuscator)));
        Self { previous }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|active| *active.borrow_mut() = previous);
    }
}
