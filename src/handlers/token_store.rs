use std::fs;
use std::path::{Path, PathBuf};
use ini::Ini;
use crate::models::error::TrackerError;

pub const TOKEN_KEY: &str = "VEHICLE_TOKEN";

/// Persists the vehicle token as `VEHICLE_TOKEN=...` in an env-style file.
///
/// Other keys in the file are kept when the token is rewritten. Comments are not.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `None` when the file or the key is missing, or the value is blank.
    pub fn load(&self) -> Result<Option<String>, TrackerError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let file = Ini::load_from_file(&self.path)?;
        Ok(file
            .section(None::<String>)
            .and_then(|general| general.get(TOKEN_KEY))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string))
    }

    pub fn save(&self, token: &str) -> Result<(), TrackerError> {
        let mut file = if self.path.exists() {
            Ini::load_from_file(&self.path)?
        } else {
            Ini::new()
        };
        file.with_general_section().set(TOKEN_KEY, token);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        file.write_to_file(&self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_has_no_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("1.env"));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("state").join(".env"));
        store.save("tok-1").unwrap();
        assert_eq!(store.load().unwrap(), Some("tok-1".to_string()));
    }

    #[test]
    fn save_keeps_other_keys_and_replaces_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, "ADDRESS=10.0.0.2:8000\nVEHICLE_TOKEN=old\n").unwrap();
        let store = TokenStore::new(&path);

        store.save("new-token").unwrap();

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("ADDRESS=10.0.0.2:8000"));
        assert!(contents.contains("VEHICLE_TOKEN=new-token"));
        assert!(!contents.contains("old"));
        assert_eq!(store.load().unwrap(), Some("new-token".to_string()));
    }

    #[test]
    fn reads_quoted_and_blank_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let store = TokenStore::new(&path);

        fs::write(&path, "# tracker\nVEHICLE_TOKEN=\"abc\"\n").unwrap();
        assert_eq!(store.load().unwrap(), Some("abc".to_string()));

        fs::write(&path, "VEHICLE_TOKEN=\n").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
