//! Entity records mirrored from the gateway.
//!
//! Every optional field is a [`Possible`]: records double as partial
//! updates, and [`Merge`] applies one record onto another without touching
//! the fields the update never sent.

pub mod channel;
pub mod emoji;
pub mod guild;
pub mod id;
pub mod member;
pub mod message;
pub mod possible;
pub mod presence;
pub mod role;
pub mod scheduled_event;
pub mod stage_instance;
pub mod sticker;
pub mod thread;
pub mod user;
pub mod voice_state;

pub use channel::{Channel, PermissionOverwrite};
pub use emoji::{Emoji, EmojiKey, ReactionEmoji};
pub use guild::Guild;
pub use id::Id;
pub use member::Member;
pub use message::{Attachment, Message, PartialMessage, Reaction, StoredMessage};
pub use possible::{Merge, Possible};
pub use presence::{Activity, ClientStatus, Presence};
pub use role::Role;
pub use scheduled_event::ScheduledEvent;
pub use stage_instance::StageInstance;
pub use sticker::Sticker;
pub use thread::{ThreadMember, ThreadMetadata};
pub use user::{PartialUser, User, UserRef};
pub use voice_state::VoiceState;
