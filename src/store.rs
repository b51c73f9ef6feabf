use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use crate::error::{SettingsError, SettingsResult};
use crate::paths::{self, PlatformFolders, SpecialFolders};
use crate::protect::{KeyedObfuscator, Obfuscator, with_obfuscator};
use crate::settings::JsonSettings;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Loads and saves [`JsonSettings`] types.
///
/// There is no locking: concurrent saves to the same file, from threads or processes,
/// race and the last writer wins. Writes go straight to the target file, so a reader can
/// observe a partially written file.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    folders: Arc<dyn SpecialFolders>,
    obfuscator: Arc<dyn Obfuscator>,
}

impl SettingsStore {
    pub fn new(
        folders: impl SpecialFolders + 'static,
        obfuscator: impl Obfuscator + 'static,
    ) -> Self {
        Self {
            folders: Arc::new(folders),
            obfuscator: Arc::new(obfuscator),
        }
    }

    pub fn platform() -> Self {
        Self::new(PlatformFolders, KeyedObfuscator::for_current_user())
    }

    /// Resolves the file location for `T`, creating its directory if needed.
    pub fn full_path<T: JsonSettings>(&self) -> SettingsResult<PathBuf> {
        paths::resolve(
            self.folders.as_ref(),
            T::SCOPE,
            T::COMPANY_NAME,
            T::PRODUCT_NAME,
            T::FILENAME,
        )
    }

    /// Reads `T` from disk. A missing or empty file yields `T::default()`; malformed
    /// content is an error. A leading UTF-8 byte order mark is ignored, so a file holding
    /// only a BOM counts as empty.
    pub fn load<T: JsonSettings>(&self) -> SettingsResult<T> {
        let path = self.full_path::<T>()?;

        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(T::default());
            }
            Err(err) => return Err(err.into()),
        };

        let mut raw = Vec::new();
        file.read_to_end(&mut raw)?;
        drop(file);

        let content = raw.strip_prefix(UTF8_BOM).unwrap_or(&raw[..]);
        if content.is_empty() {
            tracing::debug!(path = %path.display(), "empty settings file, using defaults");
            return Ok(T::default());
        }

        // Invalid UTF-8 is rejected by the decoder, not by the read.
        let settings =
            with_obfuscator(self.obfuscator.clone(), || serde_json::from_slice(content))
                .map_err(SettingsError::Deserialization)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Writes `settings` as indented JSON, replacing any existing file.
    ///
    /// The file is truncated before encoding, so an encoding failure leaves it empty.
    pub fn save<T: JsonSettings>(&self, settings: &T) -> SettingsResult<()> {
        let path = self.full_path::<T>()?;

        let mut writer = BufWriter::new(File::create(&path)?);
        let payload = with_obfuscator(self.obfuscator.clone(), || {
            serde_json::to_string_pretty(settings)
        })
        .map_err(SettingsError::Serialization)?;
        writer.write_all(payload.as_bytes())?;
        writer.flush()?;
        drop(writer);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&path, perms)?;
        }

        tracing::debug!(path = %path.display(), bytes = payload.len(), "saved settings");
        Ok(())
    }

    /// Deletes the settings file for `T`. A missing file is not an error.
    pub fn remove<T: JsonSettings>(&self) -> SettingsResult<()> {
        let path = self.full_path::<T>()?;
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!(path = %path.display(), "removed settings file");
        }

        Ok(())
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::platform()
    }
}
