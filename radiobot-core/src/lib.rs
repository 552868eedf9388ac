//! Primitives shared by every radiobot crate: identifiers, configuration,
//! tracks, volume, and the two collaborator seams the radio core drives
//! (the audio transport and the track resolver).

mod config;
mod events;
mod resolver;
mod track;
mod transport;
mod util;
mod volume;

pub use config::*;
pub use events::*;
pub use resolver::*;
pub use track::*;
pub use transport::*;
pub use util::*;
pub use volume::*;

/// A chat platform snowflake.
pub type Snowflake = u64;

/// Identifies a tenant.
pub type GuildId = Snowflake;
/// Identifies a voice (or stage) channel a radio plays in.
pub type ChannelId = Snowflake;
/// Identifies a role that may be allowed to manage a radio.
pub type RoleId = Snowflake;
/// Identifies a user, for example the owner of a station.
pub type UserId = Snowflake;
