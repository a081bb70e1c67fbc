use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serenity::{
    all::{ChannelId, GuildId, PermissionOverwrite, UserId},
    async_trait,
};
use tokio::time::{self, Duration};

use super::*;

const GUILD: u64 = 1;
const BOT: u64 = 2;
const CATEGORY: u64 = 5;
const LOBBY: u64 = 10;
const GENERAL: u64 = 11;

#[derive(Clone, Copy, Debug)]
enum Failure {
    Forbidden,
    NotFound,
    Transport,
}

impl Failure {
    fn error(self) -> PlatformError {
        match self {
            Failure::Forbidden => PlatformError::Forbidden,
            Failure::NotFound => PlatformError::NotFound,
            Failure::Transport => {
                PlatformError::Transport(Box::new(serenity::Error::Other("connection reset")))
            }
        }
    }
}

#[derive(Default)]
struct FakeState {
    channels: HashMap<ChannelId, ChannelSnapshot>,
    users: HashMap<UserId, UserSummary>,
    next_id: u64,
    created: Vec<(String, Option<ChannelId>)>,
    deleted: Vec<ChannelId>,
    moves: Vec<(UserId, ChannelId)>,
    fail_create: Option<Failure>,
    fail_delete: Option<Failure>,
    fail_move: Option<Failure>,
}

/// In-memory guild with a single category holding a trigger and a plain channel.
#[derive(Default)]
struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    fn new() -> Self {
        let platform = FakePlatform::default();
        platform.add_channel(LOBBY, "➕ Crear Canal", Some(CATEGORY));
        platform.add_channel(GENERAL, "General", Some(CATEGORY));
        platform
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    fn add_channel(&self, id: u64, name: &str, parent: Option<u64>) {
        self.state().channels.insert(
            ChannelId::new(id),
            ChannelSnapshot {
                id: ChannelId::new(id),
                name: name.to_string(),
                parent_id: parent.map(ChannelId::new),
                occupants: vec![],
            },
        );
    }

    fn add_user(&self, id: u64, name: &str) {
        self.state().users.insert(
            UserId::new(id),
            UserSummary {
                id: UserId::new(id),
                name: name.to_string(),
            },
        );
    }

    /// Connects the user to a channel, leaving whatever channel they were in.
    fn connect(&self, user: UserId, channel: ChannelId) {
        let mut state = self.state();
        for snapshot in state.channels.values_mut() {
            snapshot.occupants.retain(|x| *x != user);
        }
        if let Some(snapshot) = state.channels.get_mut(&channel) {
            snapshot.occupants.push(user);
        }
    }

    fn disconnect(&self, user: UserId) -> Option<ChannelId> {
        let mut state = self.state();
        let mut left = None;
        for snapshot in state.channels.values_mut() {
            let before = snapshot.occupants.len();
            snapshot.occupants.retain(|x| *x != user);
            if snapshot.occupants.len() != before {
                left = Some(snapshot.id);
            }
        }
        left
    }

    /// Removes a channel behind the manager's back.
    fn vanish(&self, channel: ChannelId) {
        self.state().channels.remove(&channel);
    }

    fn exists(&self, channel: ChannelId) -> bool {
        self.state().channels.contains_key(&channel)
    }

    fn voice_channel_of(&self, user: UserId) -> Option<ChannelId> {
        self.state()
            .channels
            .values()
            .find(|x| x.occupants.contains(&user))
            .map(|x| x.id)
    }

    fn created_count(&self) -> usize {
        self.state().created.len()
    }

    fn deleted(&self) -> Vec<ChannelId> {
        self.state().deleted.clone()
    }
}

#[async_trait]
impl VoicePlatform for FakePlatform {
    fn bot_user_id(&self) -> UserId {
        UserId::new(BOT)
    }

    fn voice_channels(&self, guild: GuildId) -> Vec<ChannelSnapshot> {
        if guild != GuildId::new(GUILD) {
            return vec![];
        }
        self.state().channels.values().cloned().collect()
    }

    fn channel(&self, guild: GuildId, id: ChannelId) -> Option<ChannelSnapshot> {
        if guild != GuildId::new(GUILD) {
            return None;
        }
        self.state().channels.get(&id).cloned()
    }

    fn user(&self, id: UserId) -> Option<UserSummary> {
        self.state().users.get(&id).cloned()
    }

    async fn create_voice_channel(
        &self,
        _guild: GuildId,
        category: Option<ChannelId>,
        name: &str,
        overwrites: Vec<PermissionOverwrite>,
        _reason: &str,
    ) -> Result<ChannelSnapshot, PlatformError> {
        assert_eq!(overwrites.len(), 3);
        let mut state = self.state();
        if let Some(failure) = state.fail_create {
            return Err(failure.error());
        }
        state.next_id += 1;
        let id = ChannelId::new(1000 + state.next_id);
        let snapshot = ChannelSnapshot {
            id,
            name: name.to_string(),
            parent_id: category,
            occupants: vec![],
        };
        state.channels.insert(id, snapshot.clone());
        state.created.push((name.to_string(), category));
        Ok(snapshot)
    }

    async fn delete_channel(&self, id: ChannelId, _reason: &str) -> Result<(), PlatformError> {
        let mut state = self.state();
        if let Some(failure) = state.fail_delete {
            return Err(failure.error());
        }
        if state.channels.remove(&id).is_none() {
            return Err(PlatformError::NotFound);
        }
        state.deleted.push(id);
        Ok(())
    }

    async fn move_member(
        &self,
        _guild: GuildId,
        user: UserId,
        channel: ChannelId,
    ) -> Result<(), PlatformError> {
        if let Some(failure) = self.state().fail_move {
            return Err(failure.error());
        }
        if !self.exists(channel) {
            return Err(PlatformError::NotFound);
        }
        self.connect(user, channel);
        self.state().moves.push((user, channel));
        Ok(())
    }
}

fn manager() -> Arc<VoiceManager<FakePlatform>> {
    let manager = Arc::new(VoiceManager::new(
        FakePlatform::new(),
        GuildId::new(GUILD),
        VoiceSettings::default(),
    ));
    manager.discover_triggers();
    manager
}

fn member(id: u64, name: &str) -> VoiceMember {
    VoiceMember {
        id: UserId::new(id),
        name: name.to_lowercase(),
        display_name: name.to_string(),
        bot: false,
    }
}

async fn join_trigger(manager: &Arc<VoiceManager<FakePlatform>>, member: &VoiceMember) {
    let before = manager.platform().voice_channel_of(member.id);
    manager.platform().connect(member.id, ChannelId::new(LOBBY));
    manager
        .handle_voice_state(VoiceTransition {
            guild_id: Some(GuildId::new(GUILD)),
            member: member.clone(),
            before,
            after: Some(ChannelId::new(LOBBY)),
        })
        .await;
}

async fn leave_voice(manager: &Arc<VoiceManager<FakePlatform>>, member: &VoiceMember) {
    let before = manager.platform().disconnect(member.id);
    manager
        .handle_voice_state(VoiceTransition {
            guild_id: Some(GuildId::new(GUILD)),
            member: member.clone(),
            before,
            after: None,
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn discovers_triggers_case_insensitively() {
    let manager = manager();
    assert_eq!(manager.trigger_ids(), vec![ChannelId::new(LOBBY)]);

    manager.platform().add_channel(12, "CREAR CANAL (gaming)", None);
    manager.platform().vanish(ChannelId::new(LOBBY));
    let found = manager.discover_triggers();

    assert_eq!(found.len(), 1);
    assert!(manager.is_trigger(ChannelId::new(12)));
    assert!(!manager.is_trigger(ChannelId::new(LOBBY)));
    assert!(!manager.is_trigger(ChannelId::new(GENERAL)));
}

#[tokio::test(start_paused = true)]
async fn joining_trigger_creates_and_moves_into_own_channel() {
    let manager = manager();
    let ana = member(100, "Ana");

    join_trigger(&manager, &ana).await;

    let channel = manager.channel_of(ana.id).expect("Ana should own a channel");
    assert_eq!(manager.platform().voice_channel_of(ana.id), Some(channel));
    assert_eq!(
        manager.platform().state().created,
        vec![("💬 Canal de Ana".to_string(), Some(ChannelId::new(CATEGORY)))]
    );
    let record = manager.registry().get(channel).cloned().unwrap();
    assert_eq!(record.owner, ana.id);
    assert_eq!(record.trigger, ChannelId::new(LOBBY));
    assert_eq!(record.category, Some(ChannelId::new(CATEGORY)));
    assert_eq!(manager.status().channels, 1);
}

#[tokio::test(start_paused = true)]
async fn channel_is_deleted_once_empty_for_the_cleanup_delay() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();

    leave_voice(&manager, &ana).await;
    assert!(manager.has_pending_deletion(channel));

    time::sleep(Duration::from_secs(5)).await;
    assert!(manager.platform().exists(channel));

    time::sleep(Duration::from_secs(7)).await;
    assert!(!manager.platform().exists(channel));
    assert_eq!(manager.platform().deleted(), vec![channel]);
    assert!(!manager.has_pending_deletion(channel));
    let status = manager.status();
    assert_eq!(status.channels, 0);
    assert_eq!(status.owners, 0);
}

#[tokio::test(start_paused = true)]
async fn rejoining_before_cleanup_reuses_the_same_channel() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();

    leave_voice(&manager, &ana).await;
    time::sleep(Duration::from_millis(500)).await;
    join_trigger(&manager, &ana).await;

    assert_eq!(manager.platform().created_count(), 1);
    assert_eq!(manager.platform().voice_channel_of(ana.id), Some(channel));
    assert!(!manager.has_pending_deletion(channel));

    time::sleep(Duration::from_secs(30)).await;
    assert!(manager.platform().exists(channel));
    assert_eq!(manager.channel_of(ana.id), Some(channel));
}

#[tokio::test(start_paused = true)]
async fn occupied_channel_survives_its_owner_leaving() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    manager.platform().connect(UserId::new(200), channel);

    leave_voice(&manager, &ana).await;
    time::sleep(Duration::from_secs(30)).await;

    assert!(manager.platform().exists(channel));
    assert!(manager.is_tracked(channel));
}

#[tokio::test(start_paused = true)]
async fn owner_of_occupied_channel_gets_a_fresh_one() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let first = manager.channel_of(ana.id).unwrap();
    manager.platform().connect(UserId::new(200), first);

    join_trigger(&manager, &ana).await;

    let second = manager.channel_of(ana.id).unwrap();
    assert_ne!(first, second);
    assert_eq!(manager.platform().voice_channel_of(ana.id), Some(second));
    let status = manager.status();
    assert_eq!(status.channels, 2);
    assert_eq!(status.owners, 1);
    assert!(manager.registry().is_consistent());

    // the older channel is still reclaimed once its last occupant leaves.
    manager.platform().disconnect(UserId::new(200));
    let report = manager.force_cleanup().await;
    assert_eq!(report.deleted, 1);
    assert!(!manager.platform().exists(first));
    assert_eq!(manager.channel_of(ana.id), Some(second));
}

#[tokio::test(start_paused = true)]
async fn bots_and_foreign_guilds_are_ignored() {
    let manager = manager();
    let mut robot = member(300, "Robot");
    robot.bot = true;
    join_trigger(&manager, &robot).await;

    let ana = member(100, "Ana");
    manager
        .handle_voice_state(VoiceTransition {
            guild_id: Some(GuildId::new(999)),
            member: ana.clone(),
            before: None,
            after: Some(ChannelId::new(LOBBY)),
        })
        .await;

    assert_eq!(manager.platform().created_count(), 0);
    assert_eq!(manager.status().channels, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_creation_leaves_member_in_trigger() {
    let manager = manager();
    manager.platform().state().fail_create = Some(Failure::Forbidden);
    let ana = member(100, "Ana");

    join_trigger(&manager, &ana).await;

    assert!(manager.platform().state().moves.is_empty());
    assert_eq!(
        manager.platform().voice_channel_of(ana.id),
        Some(ChannelId::new(LOBBY))
    );
    assert_eq!(manager.channel_of(ana.id), None);
}

#[tokio::test(start_paused = true)]
async fn failed_move_discards_the_new_channel() {
    let manager = manager();
    manager.platform().state().fail_move = Some(Failure::Transport);
    let ana = member(100, "Ana");

    join_trigger(&manager, &ana).await;

    assert_eq!(manager.platform().created_count(), 1);
    assert_eq!(manager.platform().deleted().len(), 1);
    assert_eq!(manager.status().channels, 0);
    assert_eq!(manager.channel_of(ana.id), None);
}

#[tokio::test(start_paused = true)]
async fn deleting_untracked_channel_is_a_no_op() {
    let manager = manager();

    let result = manager.delete_temp_channel(ChannelId::new(GENERAL)).await;

    assert!(matches!(result, Deletion::Untracked));
    assert!(manager.platform().exists(ChannelId::new(GENERAL)));
    assert!(manager.platform().deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn deleting_a_vanished_channel_cleans_records() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    manager.platform().vanish(channel);

    assert!(matches!(
        manager.delete_temp_channel(channel).await,
        Deletion::Stale
    ));
    assert!(!manager.is_tracked(channel));
    assert_eq!(manager.channel_of(ana.id), None);

    // a second attempt changes nothing.
    assert!(matches!(
        manager.delete_temp_channel(channel).await,
        Deletion::Untracked
    ));
    assert!(manager.registry().is_consistent());
}

#[tokio::test(start_paused = true)]
async fn rejected_deletion_keeps_records_for_a_retry() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    manager.platform().disconnect(ana.id);
    manager.platform().state().fail_delete = Some(Failure::Forbidden);

    let report = manager.force_cleanup().await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.remaining, 1);
    assert_eq!(manager.channel_of(ana.id), Some(channel));

    manager.platform().state().fail_delete = None;
    let report = manager.force_cleanup().await;
    assert_eq!(report.deleted, 1);
    assert_eq!(report.remaining, 0);
}

#[tokio::test(start_paused = true)]
async fn not_found_on_delete_counts_as_gone() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    manager.platform().disconnect(ana.id);
    manager.platform().state().fail_delete = Some(Failure::NotFound);

    let report = manager.force_cleanup().await;

    assert_eq!(report.stale, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(manager.channel_of(ana.id), None);
}

#[tokio::test(start_paused = true)]
async fn sweep_spares_young_channels() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    // left without the event ever arriving.
    manager.platform().disconnect(ana.id);

    let report = manager.sweep().await;
    assert_eq!(report, CleanupReport { remaining: 1, ..Default::default() });

    time::advance(Duration::from_secs(121)).await;
    let report = manager.sweep().await;
    assert_eq!(report.deleted, 1);
    assert!(!manager.platform().exists(channel));
}

#[tokio::test(start_paused = true)]
async fn periodic_sweep_reclaims_channels_missed_by_events() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    manager.platform().disconnect(ana.id);

    assert!(manager.start_sweep());
    assert!(!manager.start_sweep());
    assert!(manager.sweep_running());

    time::sleep(Duration::from_secs(299)).await;
    assert!(manager.platform().exists(channel));

    time::sleep(Duration::from_secs(2)).await;
    assert!(!manager.platform().exists(channel));
    assert_eq!(manager.status().channels, 0);

    manager.stop_sweep();
    tokio::task::yield_now().await;
    assert!(!manager.sweep_running());
}

#[tokio::test(start_paused = true)]
async fn force_cleanup_drops_stale_and_keeps_occupied() {
    let manager = manager();
    let ana = member(100, "Ana");
    let bea = member(101, "Bea");
    join_trigger(&manager, &ana).await;
    join_trigger(&manager, &bea).await;
    let occupied = manager.channel_of(ana.id).unwrap();
    let stale = manager.channel_of(bea.id).unwrap();
    manager.platform().vanish(stale);

    let report = manager.force_cleanup().await;

    assert_eq!(report.stale, 1);
    assert_eq!(report.deleted, 0);
    assert_eq!(report.remaining, 1);
    assert!(manager.is_tracked(occupied));
    assert!(manager.platform().exists(occupied));
    assert_eq!(manager.channel_of(bea.id), None);
    assert!(manager.platform().deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delete_for_user_covers_every_case() {
    let manager = manager();
    let ana = member(100, "Ana");
    let bea = member(101, "Bea");

    assert!(matches!(
        manager.delete_for_user(ana.id).await,
        UserChannelDeletion::NoChannel
    ));

    join_trigger(&manager, &ana).await;
    match manager.delete_for_user(ana.id).await {
        UserChannelDeletion::Deleted(name) => assert_eq!(name, "💬 Canal de Ana"),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(manager.channel_of(ana.id), None);

    join_trigger(&manager, &bea).await;
    manager.platform().vanish(manager.channel_of(bea.id).unwrap());
    assert!(matches!(
        manager.delete_for_user(bea.id).await,
        UserChannelDeletion::RecordsCleaned
    ));
    assert_eq!(manager.status().channels, 0);
}

#[tokio::test(start_paused = true)]
async fn info_and_list_describe_live_channels() {
    let manager = manager();
    manager.platform().add_user(100, "ana");
    let ana = member(100, "Ana");
    let bea = member(101, "Bea");
    join_trigger(&manager, &ana).await;
    time::advance(Duration::from_secs(1)).await;
    join_trigger(&manager, &bea).await;
    let channel = manager.channel_of(ana.id).unwrap();

    let ChannelLookup::Live(info) = manager.channel_info(channel) else {
        panic!("Ana's channel should resolve");
    };
    assert_eq!(info.channel.occupants, vec![ana.id]);
    assert_eq!(info.owner.map(|x| x.mention()), Some("<@100>".to_string()));
    assert!(matches!(
        manager.channel_info(ChannelId::new(GENERAL)),
        ChannelLookup::Untracked
    ));

    manager.platform().vanish(manager.channel_of(bea.id).unwrap());
    let listings = manager.list();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].record.owner, ana.id);
}

#[tokio::test(start_paused = true)]
async fn externally_deleted_channel_is_forgotten() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    leave_voice(&manager, &ana).await;
    manager.platform().vanish(channel);

    manager.handle_channel_deleted(channel);

    assert!(!manager.has_pending_deletion(channel));
    assert_eq!(manager.channel_of(ana.id), None);
    time::sleep(Duration::from_secs(30)).await;
    assert!(manager.platform().deleted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn each_owner_has_at_most_one_channel_through_churn() {
    let manager = manager();
    let members: Vec<VoiceMember> = (0..4).map(|x| member(100 + x, "Someone")).collect();

    for round in 0..6u64 {
        for (i, m) in members.iter().enumerate() {
            if (round + i as u64) % 2 == 0 {
                join_trigger(&manager, m).await;
            } else {
                leave_voice(&manager, m).await;
            }
            assert!(manager.registry().is_consistent());
        }
        time::sleep(Duration::from_millis(700 * round)).await;
    }
    time::sleep(Duration::from_secs(60)).await;

    // members 1 and 3 ended the churn connected, 0 and 2 left for good.
    let listings = manager.list();
    assert_eq!(listings.len(), 2);
    assert!(listings.iter().all(|x| !x.channel.is_empty()));
    assert_eq!(manager.platform().created_count(), members.len());
    assert_eq!(manager.status().owners, 2);
    assert!(manager.registry().is_consistent());
}

#[tokio::test(start_paused = true)]
async fn info_on_vanished_channel_cleans_its_records() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    manager.platform().vanish(channel);

    assert!(matches!(
        manager.channel_info(channel),
        ChannelLookup::RecordsCleaned
    ));
    assert!(!manager.is_tracked(channel));
    assert_eq!(manager.channel_of(ana.id), None);
    assert!(matches!(
        manager.channel_info(channel),
        ChannelLookup::Untracked
    ));
}

#[tokio::test(start_paused = true)]
async fn hopping_from_own_channel_to_trigger_returns_the_member() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();

    // a single event: own channel -> trigger.
    join_trigger(&manager, &ana).await;

    assert_eq!(manager.platform().created_count(), 1);
    assert_eq!(manager.platform().voice_channel_of(ana.id), Some(channel));
    assert_eq!(manager.channel_of(ana.id), Some(channel));

    // the leave half of the event finds the member back and deletes nothing.
    time::sleep(Duration::from_secs(30)).await;
    assert!(manager.platform().exists(channel));
    assert!(!manager.has_pending_deletion(channel));
    assert!(manager.platform().deleted().is_empty());
    assert!(manager.registry().is_consistent());
}

#[tokio::test(start_paused = true)]
async fn failed_move_back_keeps_member_in_trigger() {
    let manager = manager();
    let ana = member(100, "Ana");
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    leave_voice(&manager, &ana).await;
    manager.platform().state().fail_move = Some(Failure::Forbidden);

    join_trigger(&manager, &ana).await;

    assert_eq!(manager.platform().created_count(), 1);
    assert_eq!(
        manager.platform().voice_channel_of(ana.id),
        Some(ChannelId::new(LOBBY))
    );
    assert_eq!(manager.channel_of(ana.id), Some(channel));
    // the pending deletion was not cancelled, the empty channel is still reclaimed.
    time::sleep(Duration::from_secs(12)).await;
    assert!(!manager.platform().exists(channel));
    assert_eq!(manager.channel_of(ana.id), None);
}

#[tokio::test(start_paused = true)]
async fn discovery_skips_temp_channels_named_like_triggers() {
    let manager = manager();
    let mut ana = member(100, "Ana");
    ana.display_name = "Crear Canal fan".to_string();
    join_trigger(&manager, &ana).await;
    let channel = manager.channel_of(ana.id).unwrap();
    assert!(manager
        .platform()
        .channel(GuildId::new(GUILD), channel)
        .unwrap()
        .name
        .contains("Crear Canal"));

    let found = manager.discover_triggers();

    assert_eq!(found.len(), 1);
    assert_eq!(manager.trigger_ids(), vec![ChannelId::new(LOBBY)]);
    assert!(!manager.is_trigger(channel));
}

#[tokio::test(start_paused = true)]
async fn manager_has_a_debug_representation() {
    let manager = manager();
    let text = format!("{:?}", manager);
    assert!(text.starts_with("VoiceManager"));
    assert!(text.contains("guild_id"));
}
