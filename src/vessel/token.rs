//! Spawn tokens: the identity string produced by credential verification
//!
//! The first `user_id_len` characters are the user id. If the token is long
//! enough to hold a second `vessel_id_len` segment, that segment is the
//! vessel id; otherwise intake mints a fresh one.

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::core::config::SpawnConfig;

/// Segment lengths of a spawn token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLayout {
    pub user_id_len: usize,
    pub vessel_id_len: usize,
}

impl TokenLayout {
    pub fn from_config(config: &SpawnConfig) -> Self {
        Self {
            user_id_len: config.user_id_len,
            vessel_id_len: config.vessel_id_len,
        }
    }

    /// Validate a verified identity; `None` if it cannot hold a user id
    pub fn parse(&self, identity: &str) -> Option<SpawnToken> {
        let user_end = char_offset(identity, self.user_id_len)?;
        let vessel_end = char_offset(&identity[user_end..], self.vessel_id_len)
            .map(|len| user_end + len);

        Some(SpawnToken {
            raw: identity.to_owned(),
            user_end,
            vessel_end,
        })
    }

    /// Random document id of vessel-id length
    pub fn mint_vessel_id<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        rng.sample_iter(&Alphanumeric)
            .take(self.vessel_id_len)
            .map(char::from)
            .collect()
    }
}

impl Default for TokenLayout {
    fn default() -> Self {
        Self::from_config(&SpawnConfig::default())
    }
}

/// Byte offset just past the first `chars` characters, if there are that many
fn char_offset(s: &str, chars: usize) -> Option<usize> {
    if chars == 0 {
        return Some(0);
    }
    s.char_indices()
        .nth(chars - 1)
        .map(|(offset, c)| offset + c.len_utf8())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnToken {
    raw: String,
    user_end: usize,
    vessel_end: Option<usize>,
}

impl SpawnToken {
    pub fn user_id(&self) -> &str {
        &self.raw[..self.user_end]
    }

    /// Stored vessel id, when the token carries one
    pub fn vessel_id(&self) -> Option<&str> {
        self.vessel_end.map(|end| &self.raw[self.user_end..end])
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
