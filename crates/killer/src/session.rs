//! Game session for Killer.
//!
//! A [`Killer`] session owns the table of pending tokens and the players that
//! have been registered from it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Maximum number of players in a game of Killer.
pub const MAX_PLAYERS: usize = 4;

/// Identifier of a registered player: the token scanned from their QR code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Create an id from a scanned token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token this id was created from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A player registered in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// The player's id.
    pub id: PlayerId,
    /// Display name taken from the token table.
    pub name: String,
    /// Photo captured during registration, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<PathBuf>,
    /// When the player was registered.
    pub registered_at: DateTime<Utc>,
}

/// A single game of Killer.
#[derive(Debug, Clone)]
pub struct Killer {
    amount_players: usize,
    player_data: HashMap<String, String>,
    players: Vec<Player>,
}

impl Killer {
    /// Create a session for `amount_players` players with an empty token table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyPlayers`] if `amount_players` exceeds
    /// [`MAX_PLAYERS`].
    pub fn new(amount_players: usize) -> Result<Self> {
        Self::with_player_data(amount_players, HashMap::new())
    }

    /// Create a session with a token → name table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TooManyPlayers`] if `amount_players` exceeds
    /// [`MAX_PLAYERS`].
    pub fn with_player_data(
        amount_players: usize,
        player_data: HashMap<String, String>,
    ) -> Result<Self> {
        if amount_players > MAX_PLAYERS {
            return Err(Error::TooManyPlayers {
                requested: amount_players,
                max: MAX_PLAYERS,
            });
        }

        debug!(
            amount_players,
            tokens = player_data.len(),
            "Created Killer session"
        );
        Ok(Self {
            amount_players,
            player_data,
            players: Vec::with_capacity(amount_players),
        })
    }

    /// Number of players this session was created for.
    #[must_use]
    pub fn amount_players(&self) -> usize {
        self.amount_players
    }

    /// Registered players in registration order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Look up a registered player.
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    /// Whether every player slot is taken.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= self.amount_players
    }

    /// The display name stored for `token`, if any.
    #[must_use]
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.player_data.get(token).map(String::as_str)
    }

    /// Register the player whose token was scanned.
    ///
    /// Registering an already registered token returns its existing id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LookupMiss`] if the token is not in the table and
    /// [`Error::SessionFull`] if every player slot is taken. No player is
    /// added in either case.
    pub fn register(&mut self, token: &str) -> Result<PlayerId> {
        let Some(name) = self.player_data.get(token) else {
            debug!(token, "Token not in player table");
            return Err(Error::LookupMiss {
                token: token.to_string(),
            });
        };

        let id = PlayerId::new(token);
        if self.player(&id).is_some() {
            debug!(%id, "Player already registered");
            return Ok(id);
        }

        if self.is_full() {
            return Err(Error::SessionFull {
                limit: self.amount_players,
            });
        }

        info!(%id, name = %name, "Player added to session");
        self.players.push(Player {
            id: id.clone(),
            name: name.clone(),
            photo: None,
            registered_at: Utc::now(),
        });
        Ok(id)
    }

    /// Record the photo captured for a registered player.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownPlayer`] if no player has this id.
    pub fn attach_photo(&mut self, id: &PlayerId, photo: PathBuf) -> Result<()> {
        let player = self
            .players
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| Error::UnknownPlayer { id: id.to_string() })?;
        player.photo = Some(photo);
        Ok(())
    }
}

/// Read a token → name table from a JSON object file.
///
/// # Errors
///
/// Returns [`Error::Roster`] if the file cannot be read or is not a JSON
/// object of strings.
pub fn load_player_data(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let roster_error = |message: String| Error::Roster {
        path: path.to_path_buf(),
        message,
    };

    let content = std::fs::read_to_string(path).map_err(|e| roster_error(e.to_string()))?;
    let table: HashMap<String, String> =
        serde_json::from_str(&content).map_err(|e| roster_error(e.to_string()))?;

    info!(path = %path.display(), tokens = table.len(), "Loaded roster");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice_table() -> HashMap<String, String> {
        HashMap::from([("abc123".to_string(), "Alice".to_string())])
    }

    #[test]
    fn test_new_accepts_up_to_max_players() {
        for n in 0..=MAX_PLAYERS {
            let session = Killer::new(n).unwrap();
            assert_eq!(session.amount_players(), n);
        }
    }

    #[test]
    fn test_new_rejects_too_many_players() {
        for n in [MAX_PLAYERS + 1, 10, 100, usize::MAX] {
            let err = Killer::new(n).unwrap_err();
            assert!(matches!(
                err,
                Error::TooManyPlayers { requested, max: MAX_PLAYERS } if requested == n
            ));
        }
    }

    #[test]
    fn test_register_known_token() {
        let mut session = Killer::with_player_data(4, alice_table()).unwrap();

        let id = session.register("abc123").unwrap();
        assert_eq!(id.as_str(), "abc123");
        assert_eq!(session.players().len(), 1);
        assert_eq!(session.player(&id).unwrap().name, "Alice");
        assert!(session.player(&id).unwrap().photo.is_none());
    }

    #[test]
    fn test_register_unknown_token() {
        let mut session = Killer::with_player_data(4, alice_table()).unwrap();

        let err = session.register("zzz").unwrap_err();
        assert!(err.is_lookup_miss());
        assert!(session.players().is_empty());
    }

    #[test]
    fn test_register_twice_keeps_one_player() {
        let mut session = Killer::with_player_data(4, alice_table()).unwrap();

        let first = session.register("abc123").unwrap();
        let second = session.register("abc123").unwrap();
        assert_eq!(first, second);
        assert_eq!(session.players().len(), 1);
    }

    #[test]
    fn test_register_when_full() {
        let table = HashMap::from([
            ("a".to_string(), "Alice".to_string()),
            ("b".to_string(), "Bob".to_string()),
        ]);
        let mut session = Killer::with_player_data(1, table).unwrap();

        session.register("a").unwrap();
        assert!(session.is_full());
        assert!(matches!(
            session.register("b"),
            Err(Error::SessionFull { limit: 1 })
        ));
        assert_eq!(session.players().len(), 1);
    }

    #[test]
    fn test_lookup_does_not_register() {
        let session = Killer::with_player_data(4, alice_table()).unwrap();
        assert_eq!(session.lookup("abc123"), Some("Alice"));
        assert_eq!(session.lookup("zzz"), None);
        assert!(session.players().is_empty());
    }

    #[test]
    fn test_attach_photo() {
        let mut session = Killer::with_player_data(4, alice_table()).unwrap();
        let id = session.register("abc123").unwrap();

        session
            .attach_photo(&id, PathBuf::from("abc123_photo.png"))
            .unwrap();
        assert_eq!(
            session.player(&id).unwrap().photo,
            Some(PathBuf::from("abc123_photo.png"))
        );

        let err = session
            .attach_photo(&PlayerId::new("nobody"), PathBuf::from("x.png"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownPlayer { .. }));
    }

    #[test]
    fn test_player_id_display() {
        let id = PlayerId::new("abc123");
        assert_eq!(id.to_string(), "abc123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc123\"");
    }

    #[test]
    fn test_load_player_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, r#"{"abc123": "Alice", "def456": "Bob"}"#).unwrap();

        let table = load_player_data(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table["abc123"], "Alice");
    }

    #[test]
    fn test_load_player_data_rejects_non_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roster.json");
        std::fs::write(&path, r#"["Alice", "Bob"]"#).unwrap();

        assert!(matches!(
            load_player_data(&path),
            Err(Error::Roster { .. })
        ));
    }

    #[test]
    fn test_load_player_data_missing_file() {
        assert!(matches!(
            load_player_data("/nonexistent/roster.json"),
            Err(Error::Roster { .. })
        ));
    }
}
