use std::{io, panic};

use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use poise::{CreateReply, FrameworkError};

use crate::{data::Data, Error};

pub fn setup_logger(level: LevelFilter) -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new().info(Color::BrightBlue);
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let time = chrono::Local::now();
            out.finish(format_args!(
                "[{} {} {}] {}",
                time.format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                colors.color(record.level()),
                message
            ));
        })
        .chain(
            fern::Dispatch::new()
                .level(LevelFilter::Warn)
                .level_for("uaint_bot", level)
                .chain(io::stdout()),
        )
        .apply()?;
    Ok(())
}

pub fn setup_panic_logger_hook() {
    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|x| x.to_string())
            .unwrap_or("unknown".to_string());
        let payload = info.payload();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            log::error!("Panic occurred at {}: {}", location, msg);
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            log::error!("Panic occurred at {}: {}", location, msg);
        } else {
            log::error!("Panic occurred at {}", location);
        }
        // still calls the default hook for detailed information.
        default_hook(info);
    }));
}

pub fn log_framework_error(err: &FrameworkError<'_, Data, Error>) {
    match err {
        FrameworkError::Command { error, ctx, .. } => {
            log::warn!(
                "Error when processing command \"{}\": {}",
                ctx.command().qualified_name,
                error
            );
        }
        FrameworkError::CommandPanic { payload, .. } => {
            log::error!(
                "Panic when processing command: {}",
                payload.clone().unwrap_or("no error message".to_string())
            );
        }
        FrameworkError::EventHandler { error, event, .. } => {
            log::error!(
                "Error when handling event {}: {}",
                event.snake_case_name(),
                error
            );
        }
        FrameworkError::UnknownCommand { .. }
        | FrameworkError::DmOnly { .. }
        | FrameworkError::CooldownHit { .. }
        | FrameworkError::NotAnOwner { .. }
        | FrameworkError::MissingBotPermissions { .. }
        | FrameworkError::MissingUserPermissions { .. }
        | FrameworkError::SubcommandRequired { .. }
        | FrameworkError::GuildOnly { .. }
        | FrameworkError::NsfwOnly { .. }
        | FrameworkError::CommandStructureMismatch { .. }
        | FrameworkError::UnknownInteraction { .. }
        | FrameworkError::CommandCheckFailed { .. } => {}
        _ => {
            log::warn!("Encountered unhandled error: {err:?}");
        }
    }
}

/// Logs the error and tells the invoker, in private, that their command failed.
pub async fn on_framework_error(err: FrameworkError<'_, Data, Error>) {
    log_framework_error(&err);
    let (ctx, message) = match &err {
        FrameworkError::Command { ctx, .. } | FrameworkError::CommandPanic { ctx, .. } => {
            (*ctx, "Something went wrong while running this command.".to_string())
        }
        FrameworkError::MissingBotPermissions {
            ctx,
            missing_permissions,
            ..
        } => (
            *ctx,
            format!(
                "I'm missing these permissions: {}",
                missing_permissions.get_permission_names().join(", ")
            ),
        ),
        FrameworkError::MissingUserPermissions { ctx, .. } => (
            *ctx,
            "You need the Manage Channels permission to use this command.".to_string(),
        ),
        _ => return,
    };
    let reply = CreateReply {
        content: Some(format!("❌ {}", message)),
        ephemeral: Some(true),
        ..Default::default()
    };
    if let Err(err) = ctx.send(reply).await {
        log::warn!("Unable to report command error: {err}");
    }
}
