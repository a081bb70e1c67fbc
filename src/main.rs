use std::{process, sync::Arc, time::Duration};

use commands::build_commands;
use config::Config;
use data::{CacheHttpHolder, ConfigKey, Data, TempVoice, TempVoiceKey};
use event_handler::Handler;
use logging::{on_framework_error, setup_logger, setup_panic_logger_hook};
use poise::{FrameworkError, PrefixFrameworkOptions};
use serenity::{all::GatewayIntents, Client};
use tokio::signal;

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

mod commands;
mod config;
mod data;
mod embeds;
mod error;
mod event_handler;
mod features;
mod logging;
mod models;
mod platform;

fn intents() -> GatewayIntents {
    // message content is needed for prefix commands.
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_VOICE_STATES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
}

async fn async_main(config: Config) {
    let config = Arc::new(config);

    let options = poise::FrameworkOptions::<_, Error> {
        commands: build_commands(),
        prefix_options: PrefixFrameworkOptions {
            prefix: Some(config.command_prefix.clone()),
            ..Default::default()
        },
        on_error: |err: FrameworkError<'_, Data, Error>| Box::pin(on_framework_error(err)),
        post_command: |cx: Context<'_>| {
            Box::pin(async move {
                log::info!(target: "uaint_bot::command", "@{} ({}) executed \"{}\"", cx.author().name, cx.author().id, cx.command().qualified_name);
            })
        },
        ..Default::default()
    };

    let framework = poise::Framework::builder()
        .setup(move |cx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(cx, &framework.options().commands).await?;
                let data = cx.data.read().await;
                let (Some(config), Some(temp_voice)) =
                    (data.get::<ConfigKey>(), data.get::<TempVoiceKey>())
                else {
                    return Err("client data is not initialized".into());
                };
                Ok(Data {
                    config: config.clone(),
                    temp_voice: temp_voice.clone(),
                })
            })
        })
        .options(options)
        .build();

    log::info!("Starting bot...");

    let mut client = match Client::builder(&config.token, intents())
        .event_handler(Handler)
        .framework(framework)
        .type_map_insert::<ConfigKey>(config.clone())
        .await
    {
        Ok(client) => client,
        Err(err) => {
            log::error!("Unable to create the client: {err}");
            process::exit(1);
        }
    };

    let temp_voice = Arc::new(TempVoice::new(
        CacheHttpHolder(client.cache.clone(), client.http.clone()),
        config.guild_id,
        config.voice.clone(),
    ));
    client
        .data
        .write()
        .await
        .insert::<TempVoiceKey>(temp_voice.clone());

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        let shutdown = async move {
            log::info!("Shutting down...");
            temp_voice.stop_sweep();
            tokio::select! {
                _ = async move {
                    shard_manager.shutdown_all().await;
                } => {},
                _ = tokio::time::sleep(Duration::from_secs(5)) => {
                    log::error!("Unable to gracefully shutdown in time.");
                    process::exit(2);
                }
            }
            process::exit(0);
        };
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                log::error!("Unable to listen for SIGTERM: {err}");
                let _ = signal::ctrl_c().await;
                shutdown.await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => shutdown.await,
            _ = sigterm.recv() => shutdown.await
        };
    });

    if let Err(err) = client.start().await {
        log::error!("Client error: {err:?}");
    }

    process::exit(1);
}

fn main() {
    // behavior of logger can be configured with environment variables,
    // so loads .env before setting up the logger.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            panic!("{err}");
        }
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            process::exit(1);
        }
    };

    setup_logger(config.log_level).expect("Unable to setup logger.");
    setup_panic_logger_hook();

    let _guard;
    if let Ok(sentry_dsn) = std::env::var("SENTRY_DSN") {
        _guard = sentry::init((
            sentry_dsn,
            sentry::ClientOptions {
                release: Some(
                    format!(
                        "{}@{}{}",
                        env!("CARGO_PKG_NAME"),
                        env!("CARGO_PKG_VERSION"),
                        option_env!("BUILD_COMMIT")
                            .map(|x| format!("+{}", x))
                            .unwrap_or_default()
                    )
                    .into(),
                ),
                ..Default::default()
            },
        ));
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Unable to build the runtime.")
        .block_on(async_main(config));
}
