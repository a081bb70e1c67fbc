use std::{env, str::FromStr, time::Duration};

use log::LevelFilter;
use serenity::all::GuildId;
use thiserror::Error;

const DEFAULT_TRIGGER_NAMES: &str = "🔧 Crear Canal,Crear Canal,➕ Crear Canal";
const DEFAULT_CHANNEL_PREFIX: &str = "💬 Canal de";
const DEFAULT_CLEANUP_DELAY_SECS: u64 = 10;
const DEFAULT_SWEEP_INTERVAL_MINS: u64 = 5;
const DEFAULT_EMPTY_AGE_MINS: u64 = 2;
const SETTLE_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Tunables of the dynamic voice channel system.
#[derive(Clone, Debug)]
pub struct VoiceSettings {
    /// Voice channels whose name contains any of these (case-insensitive) are triggers.
    pub trigger_names: Vec<String>,
    pub channel_prefix: String,
    /// Wait before a channel found empty after a leave gets deleted.
    pub cleanup_delay: Duration,
    pub sweep_interval: Duration,
    /// Minimum age of an empty channel before the sweep deletes it.
    pub empty_age: Duration,
    /// Wait after a leave event before the occupant count is trusted.
    pub settle_delay: Duration,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        VoiceSettings {
            trigger_names: split_list(DEFAULT_TRIGGER_NAMES),
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            cleanup_delay: Duration::from_secs(DEFAULT_CLEANUP_DELAY_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_MINS * 60),
            empty_age: Duration::from_secs(DEFAULT_EMPTY_AGE_MINS * 60),
            settle_delay: SETTLE_DELAY,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub token: String,
    pub guild_id: GuildId,
    pub command_prefix: String,
    pub log_level: LevelFilter,
    pub voice: VoiceSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self, ConfigError> {
        let token = lookup("DISCORD_TOKEN")
            .filter(|x| !x.is_empty())
            .ok_or(ConfigError::Missing("DISCORD_TOKEN"))?;
        let guild_id: u64 = parse(&lookup, "GUILD_ID")?.ok_or(ConfigError::Missing("GUILD_ID"))?;
        if guild_id == 0 {
            return Err(ConfigError::Invalid {
                key: "GUILD_ID",
                value: "0".to_string(),
            });
        }

        let defaults = VoiceSettings::default();
        let voice = VoiceSettings {
            trigger_names: lookup("DYNAMIC_VOICE_TRIGGER_NAMES")
                .map(|x| split_list(&x))
                .unwrap_or(defaults.trigger_names),
            channel_prefix: lookup("DYNAMIC_VOICE_CHANNEL_PREFIX")
                .unwrap_or(defaults.channel_prefix),
            cleanup_delay: parse(&lookup, "DYNAMIC_VOICE_CLEANUP_DELAY")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.cleanup_delay),
            sweep_interval: parse_minutes(&lookup, "DYNAMIC_VOICE_CLEANUP_INTERVAL")?
                .unwrap_or(defaults.sweep_interval),
            empty_age: parse_minutes(&lookup, "DYNAMIC_VOICE_EMPTY_AGE")?
                .unwrap_or(defaults.empty_age),
            settle_delay: defaults.settle_delay,
        };
        if voice.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "DYNAMIC_VOICE_CLEANUP_INTERVAL",
                value: "0".to_string(),
            });
        }

        Ok(Config {
            token,
            guild_id: GuildId::new(guild_id),
            command_prefix: lookup("COMMAND_PREFIX").unwrap_or("!".to_string()),
            log_level: parse(&lookup, "LOG_LEVEL")?.unwrap_or(LevelFilter::Info),
            voice,
        })
    }
}

fn parse<T: FromStr, F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn parse_minutes<F: Fn(&str) -> Option<String>>(
    lookup: &F,
    key: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(minutes) = parse::<u64, _>(lookup, key)? else {
        return Ok(None);
    };
    minutes
        .checked_mul(60)
        .map(|x| Some(Duration::from_secs(x)))
        .ok_or(ConfigError::Invalid {
            key,
            value: minutes.to_string(),
        })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string)
        .collect()
}
