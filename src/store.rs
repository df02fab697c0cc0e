//! On-disk persistence of the bearer token.

use anyhow::{Context, Result};
use log::debug;
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::runtime::Runtime;

const APP_DIR: &str = "tokfetch";
const TOKEN_FILE: &str = "token.json";

/// Reads and writes a [`Token`] as JSON at a fixed path.
pub struct TokenStore<'a, R: Runtime> {
    runtime: &'a R,
    path: PathBuf,
}

impl<'a, R: Runtime> TokenStore<'a, R> {
    pub fn new(runtime: &'a R, path: PathBuf) -> Self {
        Self { runtime, path }
    }

    /// `<config_dir>/tokfetch/token.json`
    pub fn default_path(runtime: &R) -> Result<PathBuf> {
        let config_dir = runtime
            .config_dir()
            .context("Could not determine the user config directory; use --token-file")?;
        Ok(config_dir.join(APP_DIR).join(TOKEN_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[tracing::instrument(skip(self))]
    pub fn load(&self) -> Result<Token> {
        if !self.runtime.exists(&self.path) {
            anyhow::bail!(
                "No token found at {:?}. Run `tokfetch token import` first.",
                self.path
            );
        }

        let content = self
            .runtime
            .read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {:?}", self.path))?;
        let token: Token = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse token file {:?}", self.path))?;

        debug!("Loaded token {} from {:?}", token.masked(), self.path);
        Ok(token)
    }

    /// Writes to a sibling temp file first, then renames over the target.
    #[tracing::instrument(skip(self, token))]
    pub fn save(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            self.runtime
                .create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(token).context("Failed to serialize token")?;
        let tmp = self.path.with_extension("json.tmp");

        self.runtime.write(&tmp, json.as_bytes())?;
        self.runtime.set_permissions(&tmp, 0o600)?;
        if let Err(e) = self.runtime.rename(&tmp, &self.path) {
            let _ = self.runtime.remove_file(&tmp);
            return Err(e).with_context(|| format!("Failed to write token file {:?}", self.path));
        }

        debug!("Saved token {} to {:?}", token.masked(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_default_path() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_config_dir()
            .returning(|| Some(PathBuf::from("/home/user/.config")));

        let path = TokenStore::default_path(&runtime).unwrap();
        assert_eq!(path, PathBuf::from("/home/user/.config/tokfetch/token.json"));
    }

    #[test]
    fn test_default_path_without_config_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_config_dir().returning(|| None);

        let err = TokenStore::default_path(&runtime).unwrap_err();
        assert!(err.to_string().contains("--token-file"));
    }

    #[test]
    fn test_load_missing_file() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let store = TokenStore::new(&runtime, PathBuf::from("/tmp/token.json"));
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("tokfetch token import"));
    }

    #[test]
    fn test_load_invalid_json() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("not json".to_string()));

        let store = TokenStore::new(&runtime, PathBuf::from("/tmp/token.json"));
        let err = store.load().unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_save_writes_temp_then_renames() {
        let path = PathBuf::from("/cfg/tokfetch/token.json");
        let tmp = PathBuf::from("/cfg/tokfetch/token.json.tmp");

        let mut runtime = MockRuntime::new();
        let mut seq = mockall::Sequence::new();
        runtime
            .expect_create_dir_all()
            .with(eq(PathBuf::from("/cfg/tokfetch")))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        runtime
            .expect_write()
            .withf({
                let tmp = tmp.clone();
                move |p, contents| {
                    p == tmp.as_path() && String::from_utf8_lossy(contents).contains("\"access_token\": \"a\"")
                }
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_set_permissions()
            .with(eq(tmp.clone()), eq(0o600))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(eq(tmp.clone()), eq(path.clone()))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let store = TokenStore::new(&runtime, path);
        store.save(&Token::expiring_in("a", "r", 60)).unwrap();
    }

    #[test]
    fn test_save_removes_temp_when_rename_fails() {
        let mut runtime = MockRuntime::new();
        runtime.expect_create_dir_all().returning(|_| Ok(()));
        runtime.expect_write().returning(|_, _| Ok(()));
        runtime.expect_set_permissions().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("cross-device link")));
        runtime
            .expect_remove_file()
            .with(eq(PathBuf::from("/cfg/token.json.tmp")))
            .times(1)
            .returning(|_| Ok(()));

        let store = TokenStore::new(&runtime, PathBuf::from("/cfg/token.json"));
        let err = store.save(&Token::expiring_in("a", "r", 60)).unwrap_err();
        assert!(err.to_string().contains("Failed to write token file"));
    }

    #[test]
    fn test_save_then_load_on_disk() {
        let runtime = RealRuntime;
        let dir = tempdir().unwrap();
        let store = TokenStore::new(&runtime, dir.path().join("nested/token.json"));

        let token = Token::expiring_in("access-token", "refresh-token", 3600);
        store.save(&token).unwrap();

        assert_eq!(store.load().unwrap(), token);
        assert!(!dir.path().join("nested/token.json.tmp").exists());
    }
}
