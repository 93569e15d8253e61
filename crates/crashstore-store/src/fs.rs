use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::{FsConnectionConfig, RuntimeConfigItem};
use crate::connection::BlobConnection;
use crate::error::{ConnectionError, ConnectionResult};
use crate::health::HealthState;

/// Blob connection backed by a local directory.
///
/// Each key maps to a file at the same relative path under `root`, so
/// `v1/dump/<CRASHID>` lives at `<root>/v1/dump/<CRASHID>`. Objects are
/// written to a temporary sibling and renamed into place; a reader sees
/// either the previous object or the complete new one.
#[derive(Debug)]
pub struct FsConnection {
    config: FsConnectionConfig,
}

impl FsConnection {
    /// Open a connection rooted at `config.root`.
    ///
    /// Creates the root first when `config.create` is set. Unless
    /// `config.verify` is cleared, fails if the root is not an accessible
    /// directory, so misconfiguration surfaces at startup rather than on the
    /// first crash.
    pub async fn open(config: FsConnectionConfig) -> ConnectionResult<Self> {
        if config.create {
            tokio::fs::create_dir_all(&config.root).await?;
        }
        let conn = Self { config };
        if conn.config.verify {
            conn.verify_configuration().await?;
        }
        Ok(conn)
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    /// Check that the root exists and is a directory.
    ///
    /// This does not prove the directory is writable.
    pub async fn verify_configuration(&self) -> ConnectionResult<()> {
        let meta = tokio::fs::metadata(&self.config.root).await?;
        if !meta.is_dir() {
            return Err(ConnectionError::Unavailable(format!(
                "{} is not a directory",
                self.config.root.display()
            )));
        }
        Ok(())
    }

    fn object_path(&self, key: &str) -> ConnectionResult<PathBuf> {
        let invalid = |reason: &str| ConnectionError::InvalidKey {
            key: key.to_string(),
            reason: reason.to_string(),
        };
        if key.is_empty() {
            return Err(invalid("key must not be empty"));
        }
        if key.starts_with('/') {
            return Err(invalid("key must be relative"));
        }
        let mut path = self.config.root.clone();
        for segment in key.split('/') {
            match segment {
                "" => return Err(invalid("key has an empty segment")),
                "." | ".." => return Err(invalid("key has a relative path segment")),
                s if s.contains('\\') || s.contains('\0') => {
                    return Err(invalid("key segment has a forbidden character"))
                }
                s => path.push(s),
            }
        }
        Ok(path)
    }
}

#[async_trait]
impl BlobConnection for FsConnection {
    async fn save_object(&self, key: &str, data: &[u8]) -> ConnectionResult<()> {
        let path = self.object_path(key)?;
        let parent = path
            .parent()
            .ok_or_else(|| ConnectionError::InvalidKey {
                key: key.to_string(),
                reason: "key has no parent directory".into(),
            })?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple()));

        tokio::fs::write(&tmp, data).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(tmp = %tmp.display(), error = %cleanup, "failed to remove temporary object");
            }
            return Err(e.into());
        }
        debug!(key, bytes = data.len(), "object saved");
        Ok(())
    }

    async fn load_object(&self, key: &str) -> ConnectionResult<Vec<u8>> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ConnectionError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_health(&self, state: &mut HealthState) {
        if let Err(e) = self.verify_configuration().await {
            state.add_error("FsConnection", e.to_string());
        }
    }

    fn runtime_config(&self, namespace: &[String]) -> Vec<RuntimeConfigItem> {
        vec![
            RuntimeConfigItem::new(
                namespace,
                "root",
                self.config.root.display().to_string(),
                "Directory that holds every stored object.",
            ),
            RuntimeConfigItem::new(
                namespace,
                "create",
                self.config.create.to_string(),
                "Create the root directory on startup. Development setups only.",
            ),
            RuntimeConfigItem::new(
                namespace,
                "verify",
                self.config.verify.to_string(),
                "Fail startup if the root directory is missing or not a directory.",
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(root: &Path) -> FsConnectionConfig {
        FsConnectionConfig {
            root: root.to_path_buf(),
            create: false,
            verify: true,
        }
    }

    async fn temp_conn() -> (tempfile::TempDir, FsConnection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = FsConnection::open(config(dir.path())).await.unwrap();
        (dir, conn)
    }

    #[tokio::test]
    async fn save_and_load_nested_key() {
        let (dir, conn) = temp_conn().await;
        let key = "v2/raw_crash/ab3/20200102/ab3456ef-0000-0000-0000-20200102abcd";
        conn.save_object(key, b"{}").await.unwrap();

        assert!(dir.path().join(key).is_file());
        assert_eq!(conn.load_object(key).await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn save_overwrites_and_leaves_no_temporaries() {
        let (dir, conn) = temp_conn().await;
        conn.save_object("v1/dump/id", b"first").await.unwrap();
        conn.save_object("v1/dump/id", b"second").await.unwrap();
        assert_eq!(conn.load_object("v1/dump/id").await.unwrap(), b"second");

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("v1/dump"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("id")]);
    }

    #[tokio::test]
    async fn load_missing_is_not_found() {
        let (_dir, conn) = temp_conn().await;
        let err = conn.load_object("v1/dump_names/nope").await.unwrap_err();
        assert!(matches!(err, ConnectionError::NotFound { .. }));
    }

    #[tokio::test]
    async fn reject_escaping_keys() {
        let (_dir, conn) = temp_conn().await;
        for key in ["", "/abs", "v1/../x", "v1/./x", "v1//x", "v1/x/"] {
            let err = conn.save_object(key, b"x").await.unwrap_err();
            assert!(
                matches!(err, ConnectionError::InvalidKey { .. }),
                "key {key:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn open_fails_for_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let err = FsConnection::open(config(&missing)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Io(_)));
    }

    #[tokio::test]
    async fn open_fails_for_file_root() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        std::fs::write(&file, b"x").unwrap();
        let err = FsConnection::open(config(&file)).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Unavailable(_)));
    }

    #[tokio::test]
    async fn open_without_verify_skips_check() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(&dir.path().join("later"));
        cfg.verify = false;
        assert!(FsConnection::open(cfg).await.is_ok());
    }

    #[tokio::test]
    async fn open_creates_root_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("a/b");
        let mut cfg = config(&root);
        cfg.create = true;
        let conn = FsConnection::open(cfg).await.unwrap();
        assert!(conn.root().is_dir());
    }

    #[tokio::test]
    async fn health_records_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let conn = FsConnection::open(config(&root)).await.unwrap();

        let mut state = HealthState::new();
        conn.check_health(&mut state).await;
        assert!(state.is_healthy());

        std::fs::remove_dir(&root).unwrap();
        let mut state = HealthState::new();
        conn.check_health(&mut state).await;
        assert!(!state.is_healthy());
        assert_eq!(state.errors()[0].name, "FsConnection");
    }

    #[tokio::test]
    async fn runtime_config_lists_options() {
        let (dir, conn) = temp_conn().await;
        let items = conn.runtime_config(&["crashstorage".to_string()]);
        let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, vec!["root", "create", "verify"]);
        assert_eq!(items[0].value, dir.path().display().to_string());
        assert_eq!(items[0].namespace, vec!["crashstorage".to_string()]);
    }
}
