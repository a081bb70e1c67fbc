use poise::{ChoiceParameter, CreateReply};
use serenity::all::{ChannelId, Colour, CreateEmbed, CreateEmbedFooter, CreateMessage};

use super::reply_error;
use crate::{
    error::PlatformError,
    features::announcement::{
        parse_colour, shorten, Announcement, Template, DEFAULT_COLOUR, NAMED_COLOURS,
    },
    Context, Error,
};

const CONFIRM_TITLE_LENGTH: usize = 50;

fn guild_icon(cx: Context<'_>) -> Option<String> {
    cx.guild().and_then(|x| x.icon_url())
}

fn sent_by(cx: Context<'_>) -> String {
    format!("Sent by {}", cx.author().display_name())
}

/// Posts the announcement, answering the invoker itself when it cannot be sent.
///
/// Returns the channel it landed in.
async fn publish(
    cx: Context<'_>,
    channel: Option<ChannelId>,
    announcement: &Announcement,
    kind: &str,
) -> Result<Option<ChannelId>, Error> {
    if let Err(err) = announcement.validate() {
        reply_error(cx, "Invalid embed", format!("Unable to build the embed: {err}.")).await?;
        return Ok(None);
    }
    let channel = channel.unwrap_or(cx.channel_id());
    let message = CreateMessage::new().embed(CreateEmbed::from(announcement));
    if let Err(err) = channel.send_message(cx, message).await {
        let err = PlatformError::from(err);
        log::warn!("Unable to send a {kind} embed to {channel}: {err}");
        let message = match err {
            PlatformError::Forbidden => {
                format!("I can't send embeds in <#{}>.", channel.get())
            }
            err => err.user_message().to_string(),
        };
        reply_error(cx, "Embed not sent", message).await?;
        return Ok(None);
    }
    log::info!(
        "@{} ({}) sent a {kind} embed to {channel}: \"{}\"",
        cx.author().name,
        cx.author().id,
        announcement.title
    );
    Ok(Some(channel))
}

async fn confirm(cx: Context<'_>, title: &str, fields: Vec<(&str, String)>) -> Result<(), Error> {
    cx.send(CreateReply {
        ephemeral: Some(true),
        embeds: vec![CreateEmbed::new()
            .title(format!("✅ {title}"))
            .color(Colour::DARK_GREEN)
            .fields(fields.into_iter().map(|(name, value)| (name, value, true)))],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Post official announcements as embeds.
#[poise::command(
    slash_command,
    guild_only,
    subcommands(
        "embed_simple",
        "embed_advanced",
        "embed_template",
        "embed_preview",
        "embed_help",
        "templates"
    ),
    default_member_permissions = "MANAGE_MESSAGES",
    required_permissions = "MANAGE_MESSAGES"
)]
pub async fn admin(_cx: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Send a basic embed with a title and a description.
#[poise::command(slash_command, guild_only, rename = "embed-simple")]
pub async fn embed_simple(
    cx: Context<'_>,
    #[description = "Title of the embed"] title: String,
    #[description = "Main content of the embed"] description: String,
    #[description = "Channel to send it to, the current one by default"]
    #[channel_types("Text", "News")]
    channel: Option<ChannelId>,
) -> Result<(), Error> {
    let announcement = Announcement {
        footer: Some(sent_by(cx)),
        thumbnail: guild_icon(cx),
        ..Announcement::new(title, description)
    };
    let Some(channel) = publish(cx, channel, &announcement, "simple").await? else {
        return Ok(());
    };
    confirm(
        cx,
        "Embed sent",
        vec![("📍 Channel", format!("<#{}>", channel.get()))],
    )
    .await
}

/// Send a fully customised embed.
#[poise::command(slash_command, guild_only, rename = "embed-advanced")]
pub async fn embed_advanced(
    cx: Context<'_>,
    #[description = "Title of the embed"] title: String,
    #[description = "Main content of the embed"] description: String,
    #[description = "Colour name or hex code like #ff0000"] colour: Option<String>,
    #[description = "Footer text"] footer: Option<String>,
    #[description = "Channel to send it to, the current one by default"]
    #[channel_types("Text", "News")]
    channel: Option<ChannelId>,
    #[description = "Author line shown above the title"] author: Option<String>,
    #[description = "Show the server icon, on by default"] thumbnail: Option<bool>,
) -> Result<(), Error> {
    let colour_name = colour.unwrap_or("blue".to_string());
    let resolved = parse_colour(&colour_name);
    let announcement = Announcement {
        colour: resolved.unwrap_or(DEFAULT_COLOUR),
        footer: Some(footer.unwrap_or_else(|| sent_by(cx))),
        author,
        thumbnail: if thumbnail.unwrap_or(true) {
            guild_icon(cx)
        } else {
            None
        },
        ..Announcement::new(title, description)
    };
    let Some(channel) = publish(cx, channel, &announcement, "advanced").await? else {
        return Ok(());
    };
    confirm(
        cx,
        "Advanced embed sent",
        vec![
            ("📍 Channel", format!("<#{}>", channel.get())),
            (
                "🎨 Colour",
                match resolved {
                    Some(_) => colour_name,
                    None => format!("{colour_name} (unknown, used blue)"),
                },
            ),
            (
                "📝 Title",
                shorten(&announcement.title, CONFIRM_TITLE_LENGTH),
            ),
        ],
    )
    .await
}

/// Send an embed built from a predefined template.
#[poise::command(slash_command, guild_only, rename = "embed-template")]
pub async fn embed_template(
    cx: Context<'_>,
    #[description = "Template to use"] template: Template,
    #[description = "Title of the embed"] title: String,
    #[description = "Main content of the embed"] content: String,
    #[description = "Channel to send it to, the current one by default"]
    #[channel_types("Text", "News")]
    channel: Option<ChannelId>,
) -> Result<(), Error> {
    let announcement = Announcement {
        thumbnail: guild_icon(cx),
        ..Announcement::from_template(template, &title, content)
    };
    let kind = format!("template-{}", template.name());
    let Some(channel) = publish(cx, channel, &announcement, &kind).await? else {
        return Ok(());
    };
    confirm(
        cx,
        "Template embed sent",
        vec![
            (
                "📋 Template",
                format!("{} {}", template.emoji(), template.label()),
            ),
            ("📍 Channel", format!("<#{}>", channel.get())),
            ("📝 Title", shorten(&title, CONFIRM_TITLE_LENGTH)),
        ],
    )
    .await
}

/// Preview an embed without sending it.
#[poise::command(slash_command, guild_only, ephemeral, rename = "embed-preview")]
pub async fn embed_preview(
    cx: Context<'_>,
    #[description = "Title of the embed"] title: String,
    #[description = "Content of the embed"] description: String,
    #[description = "Colour name or hex code"] colour: Option<String>,
    #[description = "Template to use instead of a colour"] template: Option<Template>,
) -> Result<(), Error> {
    let mut announcement = match template {
        Some(template) => Announcement::from_template(template, &title, description),
        None => Announcement {
            colour: colour
                .as_deref()
                .and_then(parse_colour)
                .unwrap_or(DEFAULT_COLOUR),
            footer: Some(format!("Preview by {}", cx.author().display_name())),
            ..Announcement::new(title, description)
        },
    };
    announcement.thumbnail = guild_icon(cx);
    if let Err(err) = announcement.validate() {
        return reply_error(cx, "Invalid embed", format!("Unable to build the embed: {err}.")).await;
    }

    let mut info = CreateEmbed::new()
        .title("👁️ Embed preview")
        .description("This is how the embed will look. Use the other commands to send it.")
        .color(Colour::new(0xFEE75C));
    if let Some(template) = template {
        info = info.field(
            "📋 Template",
            format!("{} {}", template.emoji(), template.label()),
            true,
        );
    }
    if let Some(colour) = colour {
        info = info.field("🎨 Colour", colour, true);
    }
    cx.send(CreateReply {
        embeds: vec![info, CreateEmbed::from(&announcement)],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Guide to the announcement commands.
#[poise::command(slash_command, guild_only, ephemeral, rename = "embed-help")]
pub async fn embed_help(cx: Context<'_>) -> Result<(), Error> {
    let templates = Template::ALL
        .iter()
        .map(|x| format!("{} **{}** - {}", x.emoji(), x.label(), x.footer()))
        .collect::<Vec<_>>()
        .join("\n");
    let colours = NAMED_COLOURS
        .iter()
        .map(|(name, _)| format!("`{name}`"))
        .collect::<Vec<_>>()
        .join(", ");
    let embed = CreateEmbed::new()
        .title("📚 Announcement commands")
        .description("Send official server messages as embeds.")
        .color(Colour::BLUE)
        .field(
            "📝 Commands",
            "`/admin embed-simple` - basic embed\n\
            `/admin embed-advanced` - customisable embed\n\
            `/admin embed-template` - embed from a template\n\
            `/admin embed-preview` - preview without sending\n\
            `/admin templates` - template examples\n\
            `/admin embed-help` - this guide",
            false,
        )
        .field("📋 Templates", templates, false)
        .field(
            "🎨 Colours",
            format!("{colours}\n💡 Hex codes like `#ff0000` work too."),
            false,
        )
        .field(
            "💡 Examples",
            "`/admin embed-simple title:Maintenance description:The server is down tonight`\n\n\
            `/admin embed-template template:announcement title:New event content:Sign-ups are open`\n\n\
            `/admin embed-advanced title:Rules description:Server rules colour:red`",
            false,
        )
        .footer(CreateEmbedFooter::new(
            "Only members who can manage messages can use these commands",
        ));
    cx.send(CreateReply {
        embeds: vec![embed],
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Show an example of every template.
#[poise::command(slash_command, guild_only, ephemeral)]
pub async fn templates(cx: Context<'_>) -> Result<(), Error> {
    let mut embeds = vec![CreateEmbed::new()
        .title("📋 Embed templates")
        .description("Predefined designs for different kinds of messages.")
        .color(Colour::BLUE)
        .footer(CreateEmbedFooter::new(
            "Use /admin embed-template template:<name> to send one",
        ))];
    embeds.extend(Template::ALL.iter().map(|&template| {
        CreateEmbed::from(&Announcement::from_template(
            template,
            format!("{} example", template.label()),
            format!(
                "This is how the `{}` template looks.",
                template.name()
            ),
        ))
    }));
    cx.send(CreateReply {
        embeds,
        ..Default::default()
    })
    .await?;
    Ok(())
}
