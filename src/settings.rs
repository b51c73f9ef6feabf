use std::path::PathBuf;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SettingsResult;
use crate::paths::Scope;
use crate::store::SettingsStore;

/// A settings type persisted as one JSON file.
///
/// The identity constants pick the file location,
/// `<root for SCOPE>/<COMPANY_NAME>/<PRODUCT_NAME>/<FILENAME>`, and are never written into
/// the file. They must stay fixed for the lifetime of the type.
///
/// The provided methods go through [`SettingsStore::default`], which uses the platform
/// folders and the current user's obfuscation key.
pub trait JsonSettings: Serialize + DeserializeOwned + Default {
    const SCOPE: Scope;
    const COMPANY_NAME: &'static str;
    const PRODUCT_NAME: &'static str;
    /// Bare file name, without directory components.
    const FILENAME: &'static str;

    fn load() -> SettingsResult<Self> {
        SettingsStore::default().load()
    }

    fn save(&self) -> SettingsResult<()> {
        SettingsStore::default().save(self)
    }

    fn full_path(&self) -> SettingsResult<PathBuf> {
        SettingsStore::default().full_path::<Self>()
    }
}
