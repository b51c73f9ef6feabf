use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SettingsError, SettingsResult};

/// Where a settings file lives: shared by a local application install, or private to a
/// user profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    PerApplicationMachineWide,
    PerUser,
}

/// Platform directory roots a scope can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FolderKind {
    LocalApplicationData,
    Documents,
}

pub fn scope_to_folder_kind(scope: Scope) -> FolderKind {
    match scope {
        Scope::PerApplicationMachineWide => FolderKind::LocalApplicationData,
        Scope::PerUser => FolderKind::Documents,
    }
}

/// Resolves a [`FolderKind`] to an absolute directory.
pub trait SpecialFolders: Send + Sync + fmt::Debug {
    fn resolve_special_folder(&self, kind: FolderKind) -> SettingsResult<PathBuf>;
}

/// Folder roots as reported by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformFolders;

impl SpecialFolders for PlatformFolders {
    fn resolve_special_folder(&self, kind: FolderKind) -> SettingsResult<PathBuf> {
        match kind {
            FolderKind::LocalApplicationData => dirs::data_local_dir().ok_or_else(|| {
                SettingsError::PathResolution(
                    "unable to resolve local application data directory".to_string(),
                )
            }),
            // Unix-likes without XDG user dirs have no Documents folder; use home.
            FolderKind::Documents => dirs::document_dir()
                .or_else(dirs::home_dir)
                .ok_or_else(|| {
                    SettingsError::PathResolution(
                        "unable to resolve user documents directory".to_string(),
                    )
                }),
        }
    }
}

/// Explicit roots, for embedders that relocate storage.
#[derive(Debug, Clone)]
pub struct FixedFolders {
    app_data_root: PathBuf,
    documents_root: PathBuf,
}

impl FixedFolders {
    pub fn new(app_data_root: impl Into<PathBuf>, documents_root: impl Into<PathBuf>) -> Self {
        Self {
            app_data_root: app_data_root.into(),
            documents_root: documents_root.into(),
        }
    }

    pub fn app_data_root(&self) -> &Path {
        &self.app_data_root
    }

    pub fn documents_root(&self) -> &Path {
        &self.documents_root
    }
}

impl SpecialFolders for FixedFolders {
    fn resolve_special_folder(&self, kind: FolderKind) -> SettingsResult<PathBuf> {
        Ok(match kind {
            FolderKind::LocalApplicationData => self.app_data_root.clone(),
            FolderKind::Documents => self.documents_root.clone(),
        })
    }
}

/// Computes `<root>/<company>/<product>/<filename>` and makes sure the containing directory
/// exists. Runs the directory check on every call, reads included.
///
/// `filename` must not contain path separators; that is not checked.
pub fn resolve(
    folders: &dyn SpecialFolders,
    scope: Scope,
    company_name: &str,
    product_name: &str,
    filename: &str,
) -> SettingsResult<PathBuf> {
    let root = folders.resolve_special_folder(scope_to_folder_kind(scope))?;
    let path = root.join(company_name).join(product_name).join(filename);

    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }

    tracing::debug!(?scope, path = %path.display(), "resolved settings path");
    Ok(path)
}

fn ensure_dir(dir: &Path) -> SettingsResult<()> {
    if dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(dir).map_err(|err| {
        SettingsError::PathResolution(format!("unable to create {}: {err}", dir.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_scopes_to_distinct_folder_kinds() {
        assert_eq!(
            scope_to_folder_kind(Scope::PerApplicationMachineWide),
            FolderKind::LocalApplicationData
        );
        assert_eq!(scope_to_folder_kind(Scope::PerUser), FolderKind::Documents);
    }

    #[test]
    fn creates_missing_parent_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folders = FixedFolders::new(tmp.path().join("app"), tmp.path().join("docs"));

        let path = resolve(&folders, Scope::PerUser, "Acme", "Widget", "settings.json")
            .expect("path should resolve");

        assert_eq!(path, tmp.path().join("docs/Acme/Widget/settings.json"));
        assert!(path.parent().expect("parent").is_dir());
        assert!(!path.exists());
    }

    #[test]
    fn is_idempotent_when_directory_exists() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let folders = FixedFolders::new(tmp.path().join("app"), tmp.path().join("docs"));

        let first = resolve(
            &folders,
            Scope::PerApplicationMachineWide,
            "Acme",
            "Widget",
            "settings.json",
        )
        .expect("first resolve");
        let second = resolve(
            &folders,
            Scope::PerApplicationMachineWide,
            "Acme",
            "Widget",
            "settings.json",
        )
        .expect("second resolve");

        assert_eq!(first, second);
        assert!(first.starts_with(folders.app_data_root()));
    }

    #[test]
    fn reports_directory_creation_failure() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "file, not a directory").expect("write blocker");
        let folders = FixedFolders::new(&blocker, &blocker);

        let err = resolve(&folders, Scope::PerUser, "Acme", "Widget", "settings.json")
            .expect_err("creating a directory under a file must fail");

        assert!(matches!(err, SettingsError::PathResolution(_)));
    }
}
