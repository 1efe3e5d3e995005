pub use crate::config::StoreConfig;
pub use crate::dispatch::InvalidationCause;
pub use crate::error::StoreError;
pub use crate::mirror::{DataAccessor, GatewayDataUpdater, PresenceAndUser, StateMirror};
pub use crate::model::{
    Channel, Emoji, Guild, Id, Member, Merge, Message, Possible, Presence, Role, User, VoiceState,
};
pub use crate::store::StorageBackend;
