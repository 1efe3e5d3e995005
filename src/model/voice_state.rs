use serde::Deserialize;

use crate::model::{Id, Merge, Possible};
use crate::store::traits::Keyed;

/// A user's voice connection state. Keyed by user id inside its guild.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VoiceState {
    #[serde(default)]
    pub guild_id: Possible<Id>,
    /// `Null` or missing when the user left voice.
    #[serde(default)]
    pub channel_id: Possible<Id>,
    pub user_id: Id,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
    #[serde(default)]
    pub self_stream: Possible<bool>,
    #[serde(default)]
    pub self_video: bool,
    #[serde(default)]
    pub suppress: bool,
    #[serde(default)]
    pub request_to_speak_timestamp: Possible<String>,
}

impl VoiceState {
    /// Returns `true` if the state places the user in a voice channel.
    pub fn is_connected(&self) -> bool {
        self.channel_id.is_present()
    }
}

impl Merge for VoiceState {
    fn merge(&self, update: &Self) -> Self {
        Self {
            guild_id: self.guild_id.merge(&update.guild_id),
            channel_id: self.channel_id.merge(&update.channel_id),
            self_stream: self.self_stream.merge(&update.self_stream),
            request_to_speak_timestamp: self
                .request_to_speak_timestamp
                .merge(&update.request_to_speak_timestamp),
            ..update.clone()
        }
    }
}

impl Keyed for VoiceState {
    fn key(&self) -> Id {
        self.user_id
    }
}
