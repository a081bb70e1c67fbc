use std::sync::Arc;

use serenity::{
    all::{
        ActivityData, ChannelType, Context, EventHandler, GuildChannel, GuildId, Message,
        OnlineStatus, Ready, VoiceState,
    },
    async_trait,
};

use crate::{
    data::{TempVoice, TempVoiceKey},
    features::temp_voice::VoiceTransition,
    platform::VoiceMember,
};

pub struct Handler;

async fn temp_voice(cx: &Context) -> Option<Arc<TempVoice>> {
    let manager = cx.data.read().await.get::<TempVoiceKey>().cloned();
    if manager.is_none() {
        log::error!("Dynamic voice manager is missing from the client data");
    }
    manager
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, cx: Context, ready: Ready) {
        log::info!("{} is connected!", ready.user.name);
        cx.set_presence(
            Some(ActivityData::watching("the voice channels")),
            OnlineStatus::Online,
        );
    }

    /// Guild data, voice channels included, is only complete once the cache is ready.
    async fn cache_ready(&self, cx: Context, _guilds: Vec<GuildId>) {
        let Some(manager) = temp_voice(&cx).await else {
            return;
        };
        if cx.cache.guild(manager.guild_id()).is_none() {
            log::warn!(
                "The bot is not a member of the configured guild {}",
                manager.guild_id()
            );
        }
        manager.discover_triggers();
        manager.start_sweep();
    }

    async fn channel_delete(
        &self,
        cx: Context,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        if channel.kind != ChannelType::Voice {
            return;
        }
        if let Some(manager) = temp_voice(&cx).await {
            manager.handle_channel_deleted(channel.id);
        }
    }

    async fn voice_state_update(&self, cx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(member) = new.member.as_ref() else {
            return;
        };
        let Some(manager) = temp_voice(&cx).await else {
            return;
        };
        let transition = VoiceTransition {
            guild_id: new.guild_id,
            member: VoiceMember::from(member),
            before: old.and_then(|x| x.channel_id),
            after: new.channel_id,
        };
        tokio::spawn(async move {
            manager.handle_voice_state(transition).await;
        });
    }
}
