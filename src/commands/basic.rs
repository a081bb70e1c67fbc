use std::time::Duration;

use poise::CreateReply;
use serenity::all::{Colour, CreateEmbed, Member};

use crate::{
    embeds::{member_summary, server_summary},
    Context, Error,
};

fn short_commit() -> &'static str {
    let commit = option_env!("BUILD_COMMIT").unwrap_or("unknown");
    commit.get(0..7).unwrap_or(commit)
}

/// Check the latency of the bot.
#[poise::command(slash_command, prefix_command)]
pub async fn ping(cx: Context<'_>) -> Result<(), Error> {
    let latency = cx.ping().await;
    let colour = if latency.is_zero() || latency > Duration::from_millis(300) {
        Colour::ORANGE
    } else {
        Colour::DARK_GREEN
    };
    cx.send(CreateReply {
        embeds: vec![CreateEmbed::new()
            .title("🏓 Pong!")
            .description(if latency.is_zero() {
                "Gateway latency is not measured yet.".to_string()
            } else {
                format!("Gateway latency: **{}ms**", latency.as_millis())
            })
            .color(colour)],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Show information about the bot.
#[poise::command(slash_command, prefix_command, aliases("beep", "version"))]
pub async fn info(cx: Context<'_>) -> Result<(), Error> {
    let current_user = cx.http().get_current_user().await?;
    let status = cx.data().temp_voice.status();
    cx.send(CreateReply {
        embeds: vec![CreateEmbed::new()
            .color(0x330064)
            .description(format!(
                "# {}",
                current_user
                    .global_name
                    .clone()
                    .unwrap_or(current_user.name.clone())
            ))
            .fields([
                ("Version", format!("`{}`", env!("CARGO_PKG_VERSION")), true),
                ("Build", format!("`{}`", short_commit()), true),
                ("Built at", format!("<t:{}>", env!("BUILD_TIME")), true),
                (
                    "Prefix",
                    format!("`{}`", cx.data().config.command_prefix),
                    true,
                ),
                (
                    "Dynamic channels",
                    format!("{} active", status.channels),
                    true,
                ),
            ])
            .thumbnail(
                current_user
                    .avatar_url()
                    .unwrap_or(current_user.default_avatar_url()),
            )],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Show information about this server.
#[poise::command(slash_command, guild_only)]
pub async fn server(cx: Context<'_>) -> Result<(), Error> {
    let embed = {
        let Some(guild) = cx.guild() else {
            return Err("guild is not cached".into());
        };
        server_summary(&guild)
    };
    cx.send(CreateReply {
        embeds: vec![embed],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Show information about a member.
#[poise::command(slash_command, guild_only)]
pub async fn user(
    cx: Context<'_>,
    #[description = "Member to show, yourself by default"] member: Option<Member>,
) -> Result<(), Error> {
    let member = match member {
        Some(member) => member,
        None => cx
            .author_member()
            .await
            .ok_or("unable to resolve the invoking member")?
            .into_owned(),
    };
    let embed = {
        let Some(guild) = cx.guild() else {
            return Err("guild is not cached".into());
        };
        member_summary(&guild, &member)
    };
    cx.send(CreateReply {
        embeds: vec![embed],
        ..Default::default()
    })
    .await?;
    Ok(())
}
