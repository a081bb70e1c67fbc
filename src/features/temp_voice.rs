//! Dynamic voice channels.
//!
//! Joining a trigger channel gives the member a voice channel of their own. Empty
//! temporary channels are reclaimed twice over: a leave event schedules a delayed,
//! re-checked deletion, and a periodic sweep catches whatever the events missed.
//! Both paths end in [`VoiceManager::delete_temp_channel`], which is idempotent.

use std::{
    collections::HashSet,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, PoisonError, RwLock,
    },
};

use dashmap::DashMap;
use serenity::all::{ChannelId, GuildId, UserId};
use tokio::{
    task::{AbortHandle, JoinHandle},
    time::{self, Duration, MissedTickBehavior},
};

use crate::{
    config::VoiceSettings,
    error::PlatformError,
    models::temp_channel::TempChannel,
    platform::{temp_channel_overwrites, ChannelSnapshot, UserSummary, VoiceMember, VoicePlatform},
};

mod registry;
#[cfg(test)]
mod tests;

pub use registry::Registry;

const DELETE_REASON: &str = "Dynamic voice channel is empty";
const MAX_CHANNEL_NAME_LENGTH: usize = 100;

/// A voice state change, reduced to what the manager cares about.
#[derive(Clone, Debug)]
pub struct VoiceTransition {
    pub guild_id: Option<GuildId>,
    pub member: VoiceMember,
    pub before: Option<ChannelId>,
    pub after: Option<ChannelId>,
}

#[derive(Debug)]
pub enum Deletion {
    Deleted,
    /// The channel was already gone, only the records were dropped.
    Stale,
    Untracked,
    Occupied,
    Failed(PlatformError),
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub deleted: usize,
    pub stale: usize,
    pub failed: usize,
    pub remaining: usize,
}

impl CleanupReport {
    pub fn processed(&self) -> usize {
        self.deleted + self.stale
    }
}

#[derive(Debug)]
pub enum UserChannelDeletion {
    NoChannel,
    Deleted(String),
    RecordsCleaned,
    Failed(PlatformError),
}

#[derive(Clone, Debug)]
pub struct StatusReport {
    pub triggers: usize,
    pub channels: usize,
    pub owners: usize,
    pub sweep_running: bool,
    pub settings: VoiceSettings,
}

/// A tracked channel together with its live view.
#[derive(Clone, Debug)]
pub struct ChannelListing {
    pub record: TempChannel,
    pub channel: ChannelSnapshot,
    pub owner: Option<UserSummary>,
}

#[derive(Debug)]
pub enum ChannelLookup {
    Live(ChannelListing),
    /// Tracked, but the channel no longer resolves, its records were dropped.
    RecordsCleaned,
    Untracked,
}

struct PendingDeletion {
    ticket: u64,
    handle: AbortHandle,
}

pub struct VoiceManager<P> {
    platform: P,
    guild_id: GuildId,
    settings: VoiceSettings,
    registry: Mutex<Registry>,
    triggers: RwLock<HashSet<ChannelId>>,
    pending: DashMap<ChannelId, PendingDeletion>,
    next_ticket: AtomicU64,
    sweep: Mutex<Option<JoinHandle<()>>>,
}

impl<P> fmt::Debug for VoiceManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceManager")
            .field("guild_id", &self.guild_id)
            .field("settings", &self.settings)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

fn log_platform_error(action: &str, err: &PlatformError) {
    match err {
        PlatformError::Forbidden => log::error!("Missing permissions to {action}"),
        PlatformError::NotFound => log::warn!("Unable to {action}: it no longer exists"),
        PlatformError::Transport(err) => log::error!("Unable to {action}: {err}"),
    }
}

impl<P: VoicePlatform> VoiceManager<P> {
    pub fn new(platform: P, guild_id: GuildId, settings: VoiceSettings) -> Self {
        VoiceManager {
            platform,
            guild_id,
            settings,
            registry: Mutex::new(Registry::default()),
            triggers: RwLock::new(HashSet::new()),
            pending: DashMap::new(),
            next_ticket: AtomicU64::new(0),
            sweep: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub(crate) fn platform(&self) -> &P {
        &self.platform
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    // never hold this across an await.
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rescans the guild for trigger channels and swaps the result in as a whole.
    pub fn discover_triggers(&self) -> Vec<ChannelSnapshot> {
        let names: Vec<String> = self
            .settings
            .trigger_names
            .iter()
            .map(|x| x.to_lowercase())
            .collect();
        let found: Vec<ChannelSnapshot> = self
            .platform
            .voice_channels(self.guild_id)
            .into_iter()
            .filter(|channel| {
                let name = channel.name.to_lowercase();
                names.iter().any(|x| name.contains(x.as_str()))
            })
            .filter(|channel| !self.is_tracked(channel.id))
            .collect();
        for channel in &found {
            log::info!("Trigger channel configured: #{}", channel.name);
        }
        let ids: HashSet<ChannelId> = found.iter().map(|x| x.id).collect();
        log::info!("{} trigger channels configured", ids.len());
        *self.triggers.write().unwrap_or_else(PoisonError::into_inner) = ids;
        found
    }

    pub fn is_trigger(&self, channel: ChannelId) -> bool {
        self.triggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&channel)
    }

    pub fn trigger_ids(&self) -> Vec<ChannelId> {
        self.triggers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn is_tracked(&self, channel: ChannelId) -> bool {
        self.registry().contains(channel)
    }

    pub fn channel_of(&self, owner: UserId) -> Option<ChannelId> {
        self.registry().channel_of(owner)
    }

    pub async fn handle_voice_state(self: &Arc<Self>, transition: VoiceTransition) {
        if transition.guild_id != Some(self.guild_id) || transition.member.bot {
            return;
        }
        // mute, deafen, stream and the like.
        if transition.before == transition.after {
            return;
        }
        if let Some(after) = transition.after {
            if self.is_trigger(after) {
                self.handle_trigger_join(&transition.member, after).await;
            } else if self.is_tracked(after) {
                self.cancel_pending_deletion(after);
            }
        }
        if let Some(before) = transition.before {
            if self.is_tracked(before) {
                self.handle_temp_channel_leave(before);
            }
        }
    }

    pub async fn handle_trigger_join(&self, member: &VoiceMember, trigger: ChannelId) {
        let existing = self.channel_of(member.id);
        if let Some(existing) = existing {
            match self.platform.channel(self.guild_id, existing) {
                Some(channel) if channel.is_empty() => {
                    match self
                        .platform
                        .move_member(self.guild_id, member.id, existing)
                        .await
                    {
                        Ok(()) => {
                            self.cancel_pending_deletion(existing);
                            log::info!(
                                "@{} moved back to their channel {}",
                                member.name,
                                channel.name
                            );
                        }
                        Err(err) => log_platform_error(&format!("move @{}", member.name), &err),
                    }
                    return;
                }
                // still occupied, the member gets a fresh channel.
                Some(_) => {}
                None => {
                    self.cleanup_channel_records(existing);
                }
            }
        }

        let Some(channel) = self.create_temp_channel(member, trigger).await else {
            return;
        };
        match self
            .platform
            .move_member(self.guild_id, member.id, channel.id)
            .await
        {
            Ok(()) => log::info!("@{} moved to their new channel {}", member.name, channel.name),
            Err(err) => {
                log_platform_error(&format!("move @{}", member.name), &err);
                // the member most likely left the trigger meanwhile, nobody will ever join.
                self.delete_temp_channel(channel.id).await;
            }
        }
    }

    /// Creates a voice channel owned by `member` next to the trigger and tracks it.
    pub async fn create_temp_channel(
        &self,
        member: &VoiceMember,
        trigger: ChannelId,
    ) -> Option<ChannelSnapshot> {
        let category = self
            .platform
            .channel(self.guild_id, trigger)
            .and_then(|x| x.parent_id);
        let name: String = format!("{} {}", self.settings.channel_prefix, member.display_name)
            .chars()
            .take(MAX_CHANNEL_NAME_LENGTH)
            .collect();
        let overwrites =
            temp_channel_overwrites(self.guild_id, member.id, self.platform.bot_user_id());
        let reason = format!("Dynamic voice channel created for @{}", member.name);
        match self
            .platform
            .create_voice_channel(self.guild_id, category, &name, overwrites, &reason)
            .await
        {
            Ok(channel) => {
                let previous =
                    self.registry()
                        .insert(TempChannel::new(channel.id, member.id, trigger, category));
                if let Some(previous) = previous {
                    log::debug!(
                        "@{} owns {} now, {} stays tracked until empty",
                        member.name,
                        channel.id,
                        previous
                    );
                }
                log::info!("Temporary channel {} created for @{}", channel.name, member.name);
                Some(channel)
            }
            Err(err) => {
                log_platform_error("create a temporary voice channel", &err);
                None
            }
        }
    }

    /// Someone left a tracked channel: after the settle delay, an empty channel gets
    /// its deletion scheduled. A later leave of the same channel restarts the wait.
    pub fn handle_temp_channel_leave(self: &Arc<Self>, channel: ChannelId) {
        let manager = Arc::clone(self);
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let task = tokio::spawn(async move {
            time::sleep(manager.settings.settle_delay).await;
            match manager.platform.channel(manager.guild_id, channel) {
                Some(snapshot) if snapshot.is_empty() => {
                    manager.schedule_channel_deletion(channel, ticket).await;
                }
                Some(_) => manager.release_ticket(channel, ticket),
                None => {
                    manager.release_ticket(channel, ticket);
                    manager.cleanup_channel_records(channel);
                }
            }
        });
        let pending = PendingDeletion {
            ticket,
            handle: task.abort_handle(),
        };
        if let Some(previous) = self.pending.insert(channel, pending) {
            previous.handle.abort();
        }
    }

    async fn schedule_channel_deletion(&self, channel: ChannelId, ticket: u64) -> Deletion {
        time::sleep(self.settings.cleanup_delay).await;
        // from here on the task can no longer be cancelled, the re-check decides.
        self.release_ticket(channel, ticket);
        self.delete_if_empty(channel).await
    }

    fn release_ticket(&self, channel: ChannelId, ticket: u64) {
        self.pending.remove_if(&channel, |_, x| x.ticket == ticket);
    }

    /// Aborts a deletion still waiting on its delays.
    pub fn cancel_pending_deletion(&self, channel: ChannelId) -> bool {
        match self.pending.remove(&channel) {
            Some((_, pending)) => {
                pending.handle.abort();
                log::debug!("Pending deletion of {} cancelled", channel);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn has_pending_deletion(&self, channel: ChannelId) -> bool {
        self.pending.contains_key(&channel)
    }

    /// Re-reads the channel and deletes it only if it still exists and is empty.
    pub async fn delete_if_empty(&self, channel: ChannelId) -> Deletion {
        match self.platform.channel(self.guild_id, channel) {
            None => {
                if self.cleanup_channel_records(channel) {
                    Deletion::Stale
                } else {
                    Deletion::Untracked
                }
            }
            Some(snapshot) if !snapshot.is_empty() => Deletion::Occupied,
            Some(_) => self.delete_temp_channel(channel).await,
        }
    }

    /// Deletes a tracked channel and drops its records.
    ///
    /// Untracked ids are left alone. A channel the platform no longer knows counts as
    /// deleted. On any other failure the records stay so a later sweep retries.
    pub async fn delete_temp_channel(&self, channel: ChannelId) -> Deletion {
        if !self.is_tracked(channel) {
            return Deletion::Untracked;
        }
        let name = self
            .platform
            .channel(self.guild_id, channel)
            .map(|x| x.name)
            .unwrap_or_else(|| channel.to_string());
        match self.platform.delete_channel(channel, DELETE_REASON).await {
            Ok(()) => {
                self.cleanup_channel_records(channel);
                log::info!("Temporary channel deleted: {}", name);
                Deletion::Deleted
            }
            Err(PlatformError::NotFound) => {
                self.cleanup_channel_records(channel);
                log::debug!("Temporary channel {} was already gone", name);
                Deletion::Stale
            }
            Err(err) => {
                log_platform_error(&format!("delete channel {}", name), &err);
                Deletion::Failed(err)
            }
        }
    }

    /// Drops the records of a channel that no longer exists.
    pub fn cleanup_channel_records(&self, channel: ChannelId) -> bool {
        let removed = self.registry().remove(channel);
        removed.is_some()
    }

    /// A tracked channel was deleted outside of the manager.
    pub fn handle_channel_deleted(&self, channel: ChannelId) {
        self.cancel_pending_deletion(channel);
        if self.cleanup_channel_records(channel) {
            log::info!("Temporary channel {} was deleted externally", channel);
        }
    }

    /// Walks every tracked channel: unresolvable ones lose their records, empty ones
    /// older than `min_age` (or all empty ones without it) are deleted.
    pub async fn reconcile(&self, min_age: Option<Duration>) -> CleanupReport {
        let records = self.registry().records();
        let mut report = CleanupReport::default();
        for record in records {
            match self.platform.channel(self.guild_id, record.id) {
                None => {
                    if self.cleanup_channel_records(record.id) {
                        report.stale += 1;
                    }
                }
                Some(channel)
                    if channel.is_empty() && min_age.map_or(true, |x| record.age() > x) =>
                {
                    match self.delete_temp_channel(record.id).await {
                        Deletion::Deleted => report.deleted += 1,
                        Deletion::Stale => report.stale += 1,
                        Deletion::Failed(_) => report.failed += 1,
                        Deletion::Untracked | Deletion::Occupied => {}
                    }
                }
                Some(_) => {}
            }
        }
        report.remaining = self.registry().len();
        report
    }

    pub async fn sweep(&self) -> CleanupReport {
        self.reconcile(Some(self.settings.empty_age)).await
    }

    /// Deletes every empty channel right away, skipping the grace delays.
    pub async fn force_cleanup(&self) -> CleanupReport {
        self.reconcile(None).await
    }

    /// Starts the periodic sweep unless it is already running.
    pub fn start_sweep(self: &Arc<Self>) -> bool {
        let mut sweep = self.sweep.lock().unwrap_or_else(PoisonError::into_inner);
        if sweep.as_ref().is_some_and(|x| !x.is_finished()) {
            return false;
        }
        let manager = Arc::clone(self);
        *sweep = Some(tokio::spawn(async move {
            let mut interval = time::interval(manager.settings.sweep_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let report = manager.sweep().await;
                if report.processed() > 0 || report.failed > 0 {
                    log::info!(
                        "Sweep deleted {} channels, dropped {} stale records, {} failed",
                        report.deleted,
                        report.stale,
                        report.failed
                    );
                } else {
                    log::debug!("Sweep found nothing to clean up");
                }
            }
        }));
        log::info!(
            "Temporary voice sweep started, every {}s",
            self.settings.sweep_interval.as_secs()
        );
        true
    }

    pub fn stop_sweep(&self) {
        let handle = self
            .sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            log::info!("Temporary voice sweep stopped");
        }
    }

    pub fn sweep_running(&self) -> bool {
        self.sweep
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|x| !x.is_finished())
    }

    pub fn status(&self) -> StatusReport {
        let (channels, owners) = {
            let registry = self.registry();
            (registry.len(), registry.owner_count())
        };
        StatusReport {
            triggers: self.trigger_ids().len(),
            channels,
            owners,
            sweep_running: self.sweep_running(),
            settings: self.settings.clone(),
        }
    }

    /// Tracked channels that still resolve, oldest first.
    pub fn list(&self) -> Vec<ChannelListing> {
        let records = self.registry().records();
        let mut listings: Vec<ChannelListing> = records
            .into_iter()
            .filter_map(|record| {
                let channel = self.platform.channel(self.guild_id, record.id)?;
                Some(ChannelListing {
                    owner: self.platform.user(record.owner),
                    record,
                    channel,
                })
            })
            .collect();
        listings.sort_by_key(|x| x.record.created_at);
        listings
    }

    pub fn channel_info(&self, channel: ChannelId) -> ChannelLookup {
        let record = self.registry().get(channel).cloned();
        let Some(record) = record else {
            return ChannelLookup::Untracked;
        };
        let Some(snapshot) = self.platform.channel(self.guild_id, channel) else {
            self.cleanup_channel_records(channel);
            return ChannelLookup::RecordsCleaned;
        };
        ChannelLookup::Live(ChannelListing {
            owner: self.platform.user(record.owner),
            record,
            channel: snapshot,
        })
    }

    pub async fn delete_for_user(&self, user: UserId) -> UserChannelDeletion {
        let Some(channel) = self.channel_of(user) else {
            return UserChannelDeletion::NoChannel;
        };
        let Some(snapshot) = self.platform.channel(self.guild_id, channel) else {
            self.cleanup_channel_records(channel);
            return UserChannelDeletion::RecordsCleaned;
        };
        match self.delete_temp_channel(channel).await {
            Deletion::Deleted => UserChannelDeletion::Deleted(snapshot.name),
            Deletion::Failed(err) => UserChannelDeletion::Failed(err),
            Deletion::Stale | Deletion::Untracked | Deletion::Occupied => {
                UserChannelDeletion::RecordsCleaned
            }
        }
    }
}
