use chrono::{DateTime, Utc};
use serenity::all::{ChannelId, UserId};
use tokio::time::{Duration, Instant};

/// A voice channel created for one member, tracked until it is deleted.
#[derive(Clone, Debug)]
pub struct TempChannel {
    pub id: ChannelId,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
    /// Monotonic creation time, used for age checks.
    pub created: Instant,
    pub trigger: ChannelId,
    pub category: Option<ChannelId>,
}

impl TempChannel {
    pub fn new<C: Into<ChannelId>, U: Into<UserId>, T: Into<ChannelId>>(
        id: C,
        owner: U,
        trigger: T,
        category: Option<ChannelId>,
    ) -> Self {
        TempChannel {
            id: id.into(),
            owner: owner.into(),
            created_at: Utc::now(),
            created: Instant::now(),
            trigger: trigger.into(),
            category,
        }
    }

    pub fn age(&self) -> Duration {
        self.created.elapsed()
    }
}
