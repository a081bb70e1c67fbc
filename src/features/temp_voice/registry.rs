use std::collections::HashMap;

use serenity::all::{ChannelId, UserId};

use crate::models::temp_channel::TempChannel;

/// Live temporary channels, indexed both by channel and by owner.
///
/// Both maps are only ever changed together: every owner entry points at a record
/// whose owner is that user.
#[derive(Debug, Default)]
pub struct Registry {
    channels: HashMap<ChannelId, TempChannel>,
    owners: HashMap<UserId, ChannelId>,
}

impl Registry {
    /// Tracks a new channel and makes it its owner's current one.
    ///
    /// Returns the channel the owner pointed at before, if any. That record stays
    /// tracked so it still gets cleaned up.
    pub fn insert(&mut self, channel: TempChannel) -> Option<ChannelId> {
        let previous = self.owners.insert(channel.owner, channel.id);
        self.channels.insert(channel.id, channel);
        previous
    }

    /// Forgets a channel. The owner entry goes too, unless it already points elsewhere.
    pub fn remove(&mut self, id: ChannelId) -> Option<TempChannel> {
        let record = self.channels.remove(&id)?;
        if self.owners.get(&record.owner) == Some(&id) {
            self.owners.remove(&record.owner);
        }
        Some(record)
    }

    pub fn get(&self, id: ChannelId) -> Option<&TempChannel> {
        self.channels.get(&id)
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.contains_key(&id)
    }

    pub fn channel_of(&self, owner: UserId) -> Option<ChannelId> {
        self.owners.get(&owner).copied()
    }

    pub fn records(&self) -> Vec<TempChannel> {
        self.channels.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    #[cfg(test)]
    pub(crate) fn is_consistent(&self) -> bool {
        self.owners.iter().all(|(owner, id)| {
            self.channels
                .get(id)
                .is_some_and(|record| record.owner == *owner)
        })
    }
}
