use poise::CreateReply;
use serenity::all::{ChannelId, Colour, CreateEmbed, User};

use super::reply_error;
use crate::{
    embeds::channel_list_pages,
    features::temp_voice::{ChannelLookup, UserChannelDeletion},
    Context, Error,
};

/// Manage the dynamic voice channels.
#[poise::command(
    slash_command,
    guild_only,
    rename = "dynamic-voice",
    subcommands("status", "list", "reconfigure", "cleanup", "delete", "info"),
    default_member_permissions = "MANAGE_CHANNELS",
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "MANAGE_CHANNELS|MOVE_MEMBERS"
)]
pub async fn temp_voice(_cx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Show the current state of the dynamic voice channels.
#[poise::command(slash_command, guild_only)]
pub async fn status(cx: Context<'_>) -> Result<(), Error> {
    let report = cx.data().temp_voice.status();
    cx.send(CreateReply {
        embeds: vec![CreateEmbed::from(&report).field(
            "📋 Commands",
            "`/dynamic-voice list` - list active channels\n\
            `/dynamic-voice reconfigure` - rescan trigger channels\n\
            `/dynamic-voice cleanup` - delete empty channels now\n\
            `/dynamic-voice delete` - delete a member's channel",
            false,
        )],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// List every active dynamic voice channel.
#[poise::command(slash_command, guild_only)]
pub async fn list(cx: Context<'_>) -> Result<(), Error> {
    let listings = cx.data().temp_voice.list();
    if listings.is_empty() {
        cx.say("📭 There are no active temporary channels.").await?;
        return Ok(());
    }
    let embeds = channel_list_pages(&listings);
    cx.send(CreateReply {
        embeds,
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Rescan the server for trigger channels.
#[poise::command(slash_command, guild_only)]
pub async fn reconfigure(cx: Context<'_>) -> Result<(), Error> {
    let triggers = cx.data().temp_voice.discover_triggers();
    let mut embed = CreateEmbed::new()
        .title("✅ Reconfiguration completed")
        .description(format!("Trigger channels found: **{}**", triggers.len()))
        .color(Colour::DARK_GREEN);
    if !triggers.is_empty() {
        embed = embed.field(
            "📢 Trigger channels",
            triggers
                .iter()
                .map(|x| format!("• <#{}>", x.id.get()))
                .collect::<Vec<_>>()
                .join("\n"),
            false,
        );
    }
    cx.send(CreateReply {
        embeds: vec![embed],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Delete every empty dynamic voice channel right now.
#[poise::command(slash_command, guild_only)]
pub async fn cleanup(cx: Context<'_>) -> Result<(), Error> {
    cx.defer().await?;
    let report = cx.data().temp_voice.force_cleanup().await;
    cx.send(CreateReply {
        embeds: vec![CreateEmbed::from(&report)],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Delete the dynamic voice channel of a member.
#[poise::command(slash_command, guild_only)]
pub async fn delete(
    cx: Context<'_>,
    #[description = "Member whose dynamic channel will be deleted"] user: User,
) -> Result<(), Error> {
    let (title, description) = match cx.data().temp_voice.delete_for_user(user.id).await {
        UserChannelDeletion::NoChannel => {
            return reply_error(
                cx,
                "Channel not found",
                format!("<@{}> has no active dynamic channel.", user.id.get()),
            )
            .await;
        }
        UserChannelDeletion::Failed(err) => {
            return reply_error(cx, "Unable to delete the channel", err.user_message()).await;
        }
        UserChannelDeletion::Deleted(name) => (
            "✅ Channel deleted",
            format!("Channel of <@{}> deleted: **{}**", user.id.get(), name),
        ),
        UserChannelDeletion::RecordsCleaned => (
            "✅ Records cleaned",
            format!("Channel records of <@{}> cleaned up.", user.id.get()),
        ),
    };
    cx.send(CreateReply {
        embeds: vec![CreateEmbed::new()
            .title(title)
            .description(description)
            .color(Colour::DARK_GREEN)],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Show details about a dynamic voice channel.
#[poise::command(slash_command, guild_only)]
pub async fn info(
    cx: Context<'_>,
    #[description = "The dynamic voice channel"]
    #[channel_types("Voice")]
    channel: ChannelId,
) -> Result<(), Error> {
    let embed = match cx.data().temp_voice.channel_info(channel) {
        ChannelLookup::Live(listing) => CreateEmbed::from(&listing),
        ChannelLookup::RecordsCleaned => CreateEmbed::new()
            .title("✅ Records cleaned")
            .description(format!(
                "Channel {} no longer exists, its records were cleaned up.",
                channel.get()
            ))
            .color(Colour::ORANGE),
        ChannelLookup::Untracked => {
            return reply_error(
                cx,
                "Not a dynamic channel",
                format!("<#{}> is not a registered dynamic channel.", channel.get()),
            )
            .await;
        }
    };
    cx.send(CreateReply {
        embeds: vec![embed],
        ..Default::default()
    })
    .await?;
    Ok(())
}
