use serenity::all::{
    ChannelType, Colour, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, Guild, Member,
    Timestamp,
};

use crate::features::{
    announcement::Announcement,
    temp_voice::{ChannelListing, CleanupReport, StatusReport},
};

/// Occupants listed by mention before the rest is summarised.
const MAX_LISTED_OCCUPANTS: usize = 10;
const EMBED_FIELD_LIMIT: usize = 25;
const MESSAGE_EMBED_LIMIT: usize = 10;

fn owner_mention(listing: &ChannelListing) -> String {
    listing
        .owner
        .as_ref()
        .map(|x| format!("{} ({})", x.mention(), x.name))
        .unwrap_or(format!("<@{}>", listing.record.owner.get()))
}

impl From<&StatusReport> for CreateEmbed {
    fn from(value: &StatusReport) -> Self {
        CreateEmbed::new()
            .title("🔧 Dynamic Voice Channels")
            .color(Colour::BLUE)
            .field(
                "📊 Current state",
                format!(
                    "**Trigger channels:** {}\n**Active temporary channels:** {}\n**Members with a channel:** {}",
                    value.triggers, value.channels, value.owners
                ),
                true,
            )
            .field(
                "⚙️ Configuration",
                format!(
                    "**Prefix:** {}\n**Cleanup delay:** {}s\n**Sweep:** every {} min, {}\n**Empty age:** {} min",
                    value.settings.channel_prefix,
                    value.settings.cleanup_delay.as_secs(),
                    value.settings.sweep_interval.as_secs() / 60,
                    if value.sweep_running { "✅ running" } else { "⏸️ stopped" },
                    value.settings.empty_age.as_secs() / 60,
                ),
                true,
            )
    }
}

impl From<&CleanupReport> for CreateEmbed {
    fn from(value: &CleanupReport) -> Self {
        let mut embed = CreateEmbed::new()
            .title("🧹 Cleanup completed")
            .color(Colour::DARK_GREEN)
            .description(format!("Channels processed: **{}**", value.processed()))
            .field(
                "📊 Updated state",
                format!("**Remaining active channels:** {}", value.remaining),
                false,
            );
        if value.failed > 0 {
            embed = embed
                .color(Colour::ORANGE)
                .footer(CreateEmbedFooter::new(format!(
                    "{} channel(s) could not be deleted, the next sweep retries.",
                    value.failed
                )));
        }
        embed
    }
}

impl From<&ChannelListing> for CreateEmbed {
    fn from(value: &ChannelListing) -> Self {
        let occupants = &value.channel.occupants;
        let mut embed = CreateEmbed::new()
            .title(format!("🎙️ {}", value.channel.name))
            .color(Colour::BLUE)
            .fields([
                ("👤 Owner", owner_mention(value), true),
                (
                    "👥 Connected",
                    format!("**{}** connected", occupants.len()),
                    true,
                ),
                (
                    "⏰ Created",
                    format!("<t:{}:R>", value.record.created_at.timestamp()),
                    true,
                ),
            ])
            .field(
                "📊 Details",
                format!(
                    "**Channel ID:** {}\n**Owner ID:** {}\n**Created from:** <#{}>\n**Category:** {}",
                    value.record.id.get(),
                    value.record.owner.get(),
                    value.record.trigger.get(),
                    value
                        .record
                        .category
                        .map(|x| format!("<#{}>", x.get()))
                        .unwrap_or("No category".to_string())
                ),
                false,
            );
        if !occupants.is_empty() {
            let mut text = occupants
                .iter()
                .take(MAX_LISTED_OCCUPANTS)
                .map(|x| format!("<@{}>", x.get()))
                .collect::<Vec<_>>()
                .join("\n");
            if occupants.len() > MAX_LISTED_OCCUPANTS {
                text += &format!("\n... and {} more", occupants.len() - MAX_LISTED_OCCUPANTS);
            }
            embed = embed.field("🎧 Connected members", text, false);
        }
        embed
    }
}

fn channel_list(listings: &[ChannelListing]) -> CreateEmbed {
    CreateEmbed::new()
        .title("📋 Active Dynamic Channels")
        .color(Colour::DARK_GREEN)
        .fields(listings.iter().map(|x| {
            (
                format!("🎙️ {}", x.channel.name),
                format!(
                    "**Owner:** {}\n**Members:** {}\n**Created:** {}",
                    owner_mention(x),
                    x.channel.occupants.len(),
                    x.record.created_at.format("%H:%M:%S")
                ),
                true,
            )
        }))
}

/// Splits the listings over as many embeds as one message can carry.
pub fn channel_list_pages(listings: &[ChannelListing]) -> Vec<CreateEmbed> {
    let shown = listings.len().min(EMBED_FIELD_LIMIT * MESSAGE_EMBED_LIMIT);
    let mut embeds: Vec<CreateEmbed> = listings[..shown]
        .chunks(EMBED_FIELD_LIMIT)
        .map(channel_list)
        .collect();
    if listings.len() > shown {
        if let Some(last) = embeds.pop() {
            embeds.push(last.footer(CreateEmbedFooter::new(format!(
                "... and {} more",
                listings.len() - shown
            ))));
        }
    }
    embeds
}

impl From<&Announcement> for CreateEmbed {
    fn from(value: &Announcement) -> Self {
        let mut embed = CreateEmbed::new()
            .title(&value.title)
            .description(&value.description)
            .color(value.colour)
            .timestamp(Timestamp::now());
        if let Some(footer) = &value.footer {
            embed = embed.footer(CreateEmbedFooter::new(footer));
        }
        if let Some(author) = &value.author {
            embed = embed.author(CreateEmbedAuthor::new(author));
        }
        if let Some(thumbnail) = &value.thumbnail {
            embed = embed.thumbnail(thumbnail);
        }
        embed
    }
}

pub fn server_summary(guild: &Guild) -> CreateEmbed {
    let count = |kind: ChannelType| guild.channels.values().filter(|x| x.kind == kind).count();
    let mut embed = CreateEmbed::new()
        .title(format!("🏠 {}", guild.name))
        .color(Colour::BLUE)
        .timestamp(Timestamp::now())
        .fields([
            (
                "📊 Statistics",
                format!(
                    "**Members:** {}\n**Channels:** {}\n**Roles:** {}",
                    guild.member_count,
                    guild.channels.len(),
                    guild.roles.len()
                ),
                true,
            ),
            (
                "ℹ️ Information",
                format!(
                    "**Created:** <t:{}:D>\n**Owner:** <@{}>\n**Verification level:** {:?}",
                    guild.id.created_at().unix_timestamp(),
                    guild.owner_id.get(),
                    guild.verification_level
                ),
                true,
            ),
            (
                "📁 Channels",
                format!(
                    "**Text:** {}\n**Voice:** {}\n**Categories:** {}",
                    count(ChannelType::Text),
                    count(ChannelType::Voice),
                    count(ChannelType::Category)
                ),
                true,
            ),
        ])
        .footer(CreateEmbedFooter::new(format!("ID: {}", guild.id)));
    if let Some(icon) = guild.icon_url() {
        embed = embed.thumbnail(icon);
    }
    embed
}

pub fn member_summary(guild: &Guild, member: &Member) -> CreateEmbed {
    let mut roles: Vec<_> = member
        .roles
        .iter()
        .filter_map(|x| guild.roles.get(x))
        .collect();
    roles.sort_by_key(|x| std::cmp::Reverse(x.position));
    let colour = roles
        .iter()
        .map(|x| x.colour)
        .find(|x| x.0 != 0)
        .unwrap_or(Colour::BLUE);
    let admin = guild.member_permissions(member).administrator();

    let mut embed = CreateEmbed::new()
        .title(format!("👤 {}", member.display_name()))
        .color(colour)
        .timestamp(Timestamp::now())
        .thumbnail(member.face())
        .fields([
            (
                "ℹ️ Information",
                format!(
                    "**Name:** {}\n**ID:** {}",
                    member.user.name,
                    member.user.id.get()
                ),
                true,
            ),
            (
                "📅 Dates",
                format!(
                    "**Account created:** <t:{}:D>\n**Joined:** {}",
                    member.user.id.created_at().unix_timestamp(),
                    member
                        .joined_at
                        .map(|x| format!("<t:{}:D>", x.unix_timestamp()))
                        .unwrap_or("Unknown".to_string())
                ),
                true,
            ),
            (
                "🎭 Roles",
                format!(
                    "**Roles:** {}\n**Permissions:** {}",
                    roles.len(),
                    if admin { "👑 Admin" } else { "👤 Member" }
                ),
                true,
            ),
        ]);
    if let Some(top) = roles.first() {
        embed = embed.field("🏆 Highest role", format!("<@&{}>", top.id.get()), false);
    }
    embed
}
