//! Session context: the bearer token and whether the user is signed in.
//!
//! One `Session` is created at startup (restoring any persisted token), shared
//! behind an `Arc`, read by every outbound request and mutated only by
//! sign-in/sign-out. Being authenticated is derived from holding a token, so
//! no reader can see "signed in" without also seeing the token.

use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// Name the token is persisted under.
const TOKEN_KEY: &str = "token";

/// Durable storage for the credential token.
pub trait TokenStore: Send + Sync {
  fn load(&self) -> Result<Option<String>>;
  fn save(&self, token: &str) -> Result<()>;
  fn clear(&self) -> Result<()>;
}

/// Store that forgets everything when the process exits.
#[derive(Default)]
pub struct MemoryTokenStore {
  token: Mutex<Option<String>>,
}

impl TokenStore for MemoryTokenStore {
  fn load(&self) -> Result<Option<String>> {
    let token = self.token.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(token.clone())
  }

  fn save(&self, token: &str) -> Result<()> {
    let mut slot = self.token.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = Some(token.to_string());
    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let mut slot = self.token.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;
    *slot = None;
    Ok(())
  }
}

/// SQLite-backed key/value store in the user data directory.
pub struct SqliteTokenStore {
  conn: Mutex<Connection>,
}

const SESSION_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_store (
    name TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl SqliteTokenStore {
  /// Open the store at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create session directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open session database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory store.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SESSION_SCHEMA)
      .map_err(|e| eyre!("Failed to run session migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("staffdir").join("session.db"))
  }
}

impl TokenStore for SqliteTokenStore {
  fn load(&self) -> Result<Option<String>> {
    let conn = self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .query_row(
        "SELECT value FROM session_store WHERE name = ?",
        params![TOKEN_KEY],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read session token: {}", e))
  }

  fn save(&self, token: &str) -> Result<()> {
    let conn = self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO session_store (name, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![TOKEN_KEY, token],
      )
      .map_err(|e| eyre!("Failed to store session token: {}", e))?;

    Ok(())
  }

  fn clear(&self) -> Result<()> {
    let conn = self.conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM session_store WHERE name = ?", params![TOKEN_KEY])
      .map_err(|e| eyre!("Failed to clear session token: {}", e))?;

    Ok(())
  }
}

pub struct Session {
  token: RwLock<Option<String>>,
  store: Box<dyn TokenStore>,
}

impl Session {
  /// Create a session, picking up a token persisted by an earlier run.
  pub fn restore(store: Box<dyn TokenStore>) -> Result<Self> {
    let token = store.load()?;
    if token.is_some() {
      info!("restored persisted session");
    }

    Ok(Self {
      token: RwLock::new(token),
      store,
    })
  }

  /// A signed-out session that is never persisted.
  pub fn in_memory() -> Self {
    Self {
      token: RwLock::new(None),
      store: Box::new(MemoryTokenStore::default()),
    }
  }

  pub fn token(&self) -> Option<String> {
    match self.token.read() {
      Ok(token) => token.clone(),
      Err(poisoned) => poisoned.into_inner().clone(),
    }
  }

  pub fn is_authenticated(&self) -> bool {
    self.token().is_some()
  }

  /// Store the token and mark the session authenticated.
  ///
  /// The token is persisted before it becomes visible, a failed write only
  /// costs the next restart its session.
  pub fn sign_in(&self, token: String) {
    if let Err(e) = self.store.save(&token) {
      warn!(error = %e, "failed to persist session token");
    }

    let mut slot = match self.token.write() {
      Ok(slot) => slot,
      Err(poisoned) => poisoned.into_inner(),
    };
    *slot = Some(token);
    info!("session authenticated");
  }

  /// Drop the token, both in memory and on disk.
  pub fn sign_out(&self) {
    {
      let mut slot = match self.token.write() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
      };
      if slot.take().is_none() {
        return;
      }
    }

    if let Err(e) = self.store.clear() {
      warn!(error = %e, "failed to clear persisted session token");
    }
    info!("session cleared");
  }
}

impl std::fmt::Debug for Session {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Session")
      .field("authenticated", &self.is_authenticated())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_in_memory_session_starts_signed_out() {
    let session = Session::in_memory();
    assert!(!session.is_authenticated());
    assert_eq!(session.token(), None);
  }

  #[test]
  fn test_sign_in_then_out() {
    let session = Session::in_memory();
    session.sign_in("abc".to_string());
    assert!(session.is_authenticated());
    assert_eq!(session.token().as_deref(), Some("abc"));

    session.sign_out();
    assert!(!session.is_authenticated());
    assert_eq!(session.token(), None);
  }

  #[test]
  fn test_sqlite_store_round_trip() {
    let store = SqliteTokenStore::open_in_memory().unwrap();
    assert_eq!(store.load().unwrap(), None);

    store.save("first").unwrap();
    store.save("second").unwrap();
    assert_eq!(store.load().unwrap().as_deref(), Some("second"));

    store.clear().unwrap();
    assert_eq!(store.load().unwrap(), None);
  }

  /// Shares one store between two sessions, standing in for a restart.
  struct SharedStore(std::sync::Arc<MemoryTokenStore>);

  impl TokenStore for SharedStore {
    fn load(&self) -> Result<Option<String>> {
      self.0.load()
    }
    fn save(&self, token: &str) -> Result<()> {
      self.0.save(token)
    }
    fn clear(&self) -> Result<()> {
      self.0.clear()
    }
  }

  #[test]
  fn test_token_survives_restart_until_sign_out() {
    let backing = std::sync::Arc::new(MemoryTokenStore::default());

    let first = Session::restore(Box::new(SharedStore(backing.clone()))).unwrap();
    first.sign_in("persisted".to_string());

    let second = Session::restore(Box::new(SharedStore(backing.clone()))).unwrap();
    assert_eq!(second.token().as_deref(), Some("persisted"));

    second.sign_out();
    let third = Session::restore(Box::new(SharedStore(backing))).unwrap();
    assert!(!third.is_authenticated());
  }
}
