use crate::id::{GuildId, UserId};
use std::fmt;

/// Parameters and credentials needed to negotiate a session with a voice
/// server, as handed over by the main gateway.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct SessionEntry {
    /// Host assigned to this call, possibly carrying a scheme and/or a
    /// (bogus) port which are stripped before use.
    pub endpoint: String,
    /// ID of the target voice channel's parent guild.
    pub guild_id: GuildId,
    /// Unique string describing this session for validation/authentication purposes.
    pub session_id: String,
    /// Ephemeral secret used to validate the above session.
    pub token: String,
    /// ID of the connecting user.
    pub user_id: UserId,
}

impl fmt::Debug for SessionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEntry")
            .field("endpoint", &self.endpoint)
            .field("guild_id", &self.guild_id)
            .field("session_id", &self.session_id)
            .field("token", &"<secret>")
            .field("user_id", &self.user_id)
            .finish()
    }
}
