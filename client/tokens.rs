use heart_deps::log;
use heart_util::error::Result;
use std::{
	collections::BTreeMap,
	fs::OpenOptions,
	io::Write,
	path::{Path, PathBuf},
	sync::Mutex,
};

/// The key the session token is stored under.
pub const TOKEN_KEY: &str = "token";

/// A string key-value store for credentials. The submission controller receives one of these instead of reading ambient storage.
pub trait TokenStore: Send + Sync {
	fn get(&self, key: &str) -> Option<String>;
	fn set(&self, key: &str, value: &str) -> Result<()>;
	fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
	values: Mutex<BTreeMap<String, String>>,
}

impl MemoryTokenStore {
	pub fn new() -> MemoryTokenStore {
		MemoryTokenStore::default()
	}

	pub fn with_token(token: &str) -> MemoryTokenStore {
		let store = MemoryTokenStore::new();
		store
			.values
			.lock()
			.unwrap()
			.insert(TOKEN_KEY.to_owned(), token.to_owned());
		store
	}
}

impl TokenStore for MemoryTokenStore {
	fn get(&self, key: &str) -> Option<String> {
		self.values.lock().unwrap().get(key).cloned()
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		self.values
			.lock()
			.unwrap()
			.insert(key.to_owned(), value.to_owned());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		self.values.lock().unwrap().remove(key);
		Ok(())
	}
}

/// Stores each key as a file named after the key in `dir`. On unix the files are readable by their owner only.
#[derive(Debug)]
pub struct FileTokenStore {
	dir: PathBuf,
}

impl FileTokenStore {
	pub fn new(dir: impl Into<PathBuf>) -> FileTokenStore {
		FileTokenStore { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn path(&self, key: &str) -> PathBuf {
		self.dir.join(key)
	}
}

impl TokenStore for FileTokenStore {
	fn get(&self, key: &str) -> Option<String> {
		match std::fs::read_to_string(self.path(key)) {
			Ok(value) => {
				let value = value.trim();
				if value.is_empty() {
					None
				} else {
					Some(value.to_owned())
				}
			}
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => None,
			Err(error) => {
				log::error!("failed to read {}: {}", self.path(key).display(), error);
				None
			}
		}
	}

	fn set(&self, key: &str, value: &str) -> Result<()> {
		std::fs::create_dir_all(&self.dir)?;
		let mut options = OpenOptions::new();
		options.write(true).create(true).truncate(true);
		#[cfg(unix)]
		std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
		let mut file = options.open(self.path(key))?;
		// The mode only applies to new files.
		#[cfg(unix)]
		file.set_permissions(std::os::unix::fs::PermissionsExt::from_mode(0o600))?;
		file.write_all(value.as_bytes())?;
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<()> {
		match std::fs::remove_file(self.path(key)) {
			Ok(()) => Ok(()),
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(error) => Err(error.into()),
		}
	}
}

#[test]
fn test_memory_token_store() {
	let store = MemoryTokenStore::new();
	assert_eq!(store.get(TOKEN_KEY), None);
	store.set(TOKEN_KEY, "abc").unwrap();
	assert_eq!(store.get(TOKEN_KEY), Some("abc".to_owned()));
	store.remove(TOKEN_KEY).unwrap();
	assert_eq!(store.get(TOKEN_KEY), None);
	store.remove(TOKEN_KEY).unwrap();
}

#[test]
fn test_file_token_store() {
	let dir = tempfile::tempdir().unwrap();
	let store = FileTokenStore::new(dir.path().join("heart"));
	assert_eq!(store.get(TOKEN_KEY), None);
	store.set(TOKEN_KEY, "abc").unwrap();
	assert_eq!(store.get(TOKEN_KEY), Some("abc".to_owned()));
	let reopened = FileTokenStore::new(dir.path().join("heart"));
	assert_eq!(reopened.get(TOKEN_KEY), Some("abc".to_owned()));
	reopened.remove(TOKEN_KEY).unwrap();
	assert_eq!(store.get(TOKEN_KEY), None);
	store.remove(TOKEN_KEY).unwrap();
}

#[cfg(unix)]
#[test]
fn test_file_token_store_is_private() {
	use std::os::unix::fs::PermissionsExt;
	let dir = tempfile::tempdir().unwrap();
	let store = FileTokenStore::new(dir.path());
	let path = dir.path().join(TOKEN_KEY);
	std::fs::write(&path, "old").unwrap();
	std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();
	store.set(TOKEN_KEY, "abc").unwrap();
	let mode = std::fs::metadata(&path).unwrap().permissions().mode();
	assert_eq!(mode & 0o777, 0o600);
	assert_eq!(store.get(TOKEN_KEY), Some("abc".to_owned()));
	std::fs::remove_file(&path).unwrap();
	store.set(TOKEN_KEY, "def").unwrap();
	let mode = std::fs::metadata(&path).unwrap().permissions().mode();
	assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_unreadable_token_is_absent() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::create_dir(dir.path().join(TOKEN_KEY)).unwrap();
	let store = FileTokenStore::new(dir.path());
	assert_eq!(store.get(TOKEN_KEY), None);
}
