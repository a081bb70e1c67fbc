use std::sync::Arc;

use serenity::{
    all::{
        Cache, CacheHttp, ChannelId, ChannelType, CreateChannel, Guild, GuildChannel, GuildId,
        Http, PermissionOverwrite, UserId,
    },
    async_trait,
    prelude::TypeMapKey,
};

use crate::{
    config::Config,
    error::PlatformError,
    features::temp_voice::VoiceManager,
    platform::{ChannelSnapshot, UserSummary, VoicePlatform},
};

pub type TempVoice = VoiceManager<CacheHttpHolder>;

#[derive(Debug)]
pub struct Data {
    pub(crate) config: Arc<Config>,
    pub(crate) temp_voice: Arc<TempVoice>,
}

pub struct TempVoiceKey;

impl TypeMapKey for TempVoiceKey {
    type Value = Arc<TempVoice>;
}

pub struct ConfigKey;

impl TypeMapKey for ConfigKey {
    type Value = Arc<Config>;
}

#[derive(Clone)]
pub struct CacheHttpHolder(pub(crate) Arc<Cache>, pub(crate) Arc<Http>);

impl CacheHttp for CacheHttpHolder {
    fn http(&self) -> &Http {
        &self.1
    }

    fn cache(&self) -> Option<&Arc<Cache>> {
        Some(&self.0)
    }
}

fn snapshot(guild: &Guild, channel: &GuildChannel) -> ChannelSnapshot {
    ChannelSnapshot {
        id: channel.id,
        name: channel.name.clone(),
        parent_id: channel.parent_id,
        occupants: guild
            .voice_states
            .values()
            .filter(|x| x.channel_id == Some(channel.id))
            .map(|x| x.user_id)
            .collect(),
    }
}

#[async_trait]
impl VoicePlatform for CacheHttpHolder {
    fn bot_user_id(&self) -> UserId {
        self.0.current_user().id
    }

    fn voice_channels(&self, guild: GuildId) -> Vec<ChannelSnapshot> {
        let Some(guild) = self.0.guild(guild) else {
            return vec![];
        };
        guild
            .channels
            .values()
            .filter(|x| x.kind == ChannelType::Voice)
            .map(|x| snapshot(&guild, x))
            .collect()
    }

    fn channel(&self, guild: GuildId, id: ChannelId) -> Option<ChannelSnapshot> {
        let guild = self.0.guild(guild)?;
        let channel = guild.channels.get(&id)?;
        Some(snapshot(&guild, channel))
    }

    fn user(&self, id: UserId) -> Option<UserSummary> {
        self.0.user(id).map(|x| UserSummary {
            id,
            name: x.name.clone(),
        })
    }

    async fn create_voice_channel(
        &self,
        guild: GuildId,
        category: Option<ChannelId>,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
        reason: &str,
    ) -> Result<ChannelSnapshot, PlatformError> {
        let mut create_channel = CreateChannel::new(name)
            .kind(ChannelType::Voice)
            .permissions(overwrites)
            .audit_log_reason(reason);
        if let Some(category) = category {
            create_channel = create_channel.category(category);
        }
        let channel = guild.create_channel(self, create_channel).await?;
        Ok(ChannelSnapshot {
            id: channel.id,
            name: channel.name,
            parent_id: channel.parent_id,
            occupants: vec![],
        })
    }

    async fn delete_channel(&self, id: ChannelId, reason: &str) -> Result<(), PlatformError> {
        self.1.delete_channel(id, Some(reason)).await?;
        Ok(())
    }

    async fn move_member(
        &self,
        guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        guild.move_member(self, user, channel).await?;
        Ok(())
    }
}
