use poise::{Command, CreateReply};
use serenity::all::{Colour, CreateEmbed};

use crate::{Context, Data, Error};

mod admin;
mod basic;
mod temp_voice;

pub fn build_commands() -> Vec<Command<Data, Error>> {
    vec![
        basic::ping(),
        basic::info(),
        basic::server(),
        basic::user(),
        admin::admin(),
        temp_voice::temp_voice(),
    ]
}

async fn reply_error<T: AsRef<str>>(cx: Context<'_>, title: &str, message: T) -> Result<(), Error> {
    cx.send(CreateReply {
        ephemeral: Some(true),
        embeds: vec![CreateEmbed::new()
            .title(format!("❌ {}", title))
            .description(message.as_ref())
            .color(Colour::RED)],
        ..Default::default()
    })
    .await?;
    Ok(())
}
