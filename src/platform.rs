//! The slice of the chat platform the dynamic voice system talks to.
//!
//! The voice manager only sees [`VoicePlatform`]. The running bot implements it on top
//! of serenity's cache and HTTP client (see [`crate::data::CacheHttpHolder`]); tests
//! implement it in memory.

use serenity::{
    all::{
        ChannelId, GuildId, Member, PermissionOverwrite, PermissionOverwriteType, Permissions,
        RoleId, UserId,
    },
    async_trait,
};

use crate::error::PlatformError;

/// What the voice manager needs to know about a voice channel at a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub id: ChannelId,
    pub name: String,
    pub parent_id: Option<ChannelId>,
    /// Users currently connected to the channel.
    pub occupants: Vec<UserId>,
}

impl ChannelSnapshot {
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }
}

/// The member whose voice state changed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoiceMember {
    pub id: UserId,
    pub name: String,
    pub display_name: String,
    pub bot: bool,
}

impl From<&Member> for VoiceMember {
    fn from(member: &Member) -> Self {
        VoiceMember {
            id: member.user.id,
            name: member.user.name.clone(),
            display_name: member.display_name().to_string(),
            bot: member.user.bot,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
}

impl UserSummary {
    pub fn mention(&self) -> String {
        format!("<@{}>", self.id.get())
    }
}

#[async_trait]
pub trait VoicePlatform: Send + Sync + 'static {
    fn bot_user_id(&self) -> UserId;

    /// Every voice channel of the guild as currently known.
    fn voice_channels(&self, guild: GuildId) -> Vec<ChannelSnapshot>;

    /// A channel of the guild, `None` once it can no longer be resolved.
    fn channel(&self, guild: GuildId, id: ChannelId) -> Option<ChannelSnapshot>;

    fn user(&self, id: UserId) -> Option<UserSummary>;

    async fn create_voice_channel(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
        reason: &str,
    ) -> Result<ChannelSnapshot, PlatformError>;

    async fn delete_channel(&self, id: ChannelId, reason: &str) -> Result<(), PlatformError>;

    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError>;
}

/// Permission overwrites of a freshly created temporary channel.
///
/// Everyone may join and talk, the owner gets full control over their own channel and
/// the bot keeps enough access to manage and delete it later.
pub fn temp_channel_overwrites(
    guild: GuildId,
    owner: UserId,
    bot: UserId,
) -> Vec<PermissionOverwrite> {
    let everyone = Permissions::VIEW_CHANNEL | Permissions::CONNECT | Permissions::SPEAK;
    vec![
        PermissionOverwrite {
            allow: everyone,
            deny: Permissions::empty(),
            // the @everyone role shares its id with the guild.
            kind: PermissionOverwriteType::Role(RoleId::new(guild.get())),
        },
        PermissionOverwrite {
            allow: everyone
                | Permissions::MOVE_MEMBERS
                | Permissions::MANAGE_CHANNELS
                | Permissions::MUTE_MEMBERS
                | Permissions::DEAFEN_MEMBERS,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(owner),
        },
        PermissionOverwrite {
            allow: Permissions::VIEW_CHANNEL
                | Permissions::CONNECT
                | Permissions::MANAGE_CHANNELS
                | Permissions::MOVE_MEMBERS,
            deny: Permissions::empty(),
            kind: PermissionOverwriteType::Member(bot),
        },
    ]
}
