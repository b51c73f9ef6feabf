pub mod error;
pub mod paths;
pub mod protect;
pub mod settings;
pub mod store;

pub use error::{SettingsError, SettingsResult};
pub use paths::{FixedFolders, FolderKind, PlatformFolders, Scope, SpecialFolders};
pub use protect::{KeyedObfuscator, ObfuscationKey, Obfuscator, obfuscated, with_obfuscator};
pub use settings::JsonSettings;
pub use store::SettingsStore;
