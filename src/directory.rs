use serenity::model::channel::{ChannelType, GuildChannel};
use serenity::model::id::ChannelId;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// The channel kinds the directory keeps track of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Text,
    Voice,
    Other,
}

impl From<ChannelType> for ChannelKind {
    fn from(kind: ChannelType) -> Self {
        match kind {
            ChannelType::Text => ChannelKind::Text,
            ChannelType::Voice => ChannelKind::Voice,
            _ => ChannelKind::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub kind: ChannelKind,
}

impl ChannelInfo {
    pub fn new(id: impl Into<ChannelId>, name: impl Into<String>, kind: ChannelKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
        }
    }
}

impl From<&GuildChannel> for ChannelInfo {
    fn from(channel: &GuildChannel) -> Self {
        Self {
            id: channel.id,
            name: channel.name.clone(),
            kind: channel.kind.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Inserted,
    /// The name already belongs to `existing`; nothing was changed.
    DuplicateName { existing: ChannelId },
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// The name is owned by a different channel now.
    StaleIgnored,
    Missing,
    Unsupported,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ChannelMaps {
    text: HashMap<String, ChannelId>,
    voice: HashMap<String, ChannelId>,
}

impl ChannelMaps {
    fn map(&self, kind: ChannelKind) -> Option<&HashMap<String, ChannelId>> {
        match kind {
            ChannelKind::Text => Some(&self.text),
            ChannelKind::Voice => Some(&self.voice),
            ChannelKind::Other => None,
        }
    }

    fn map_mut(&mut self, kind: ChannelKind) -> Option<&mut HashMap<String, ChannelId>> {
        match kind {
            ChannelKind::Text => Some(&mut self.text),
            ChannelKind::Voice => Some(&mut self.voice),
            ChannelKind::Other => None,
        }
    }

    fn add(&mut self, channel: &ChannelInfo) -> AddOutcome {
        let Some(map) = self.map_mut(channel.kind) else {
            return AddOutcome::Unsupported;
        };

        if let Some(existing) = map.get(&channel.name) {
            warn!(
                "{:?} channel \"{}\" ({}) shares its name with {}, it won't be reachable by name",
                channel.kind, channel.name, channel.id, existing
            );
            return AddOutcome::DuplicateName {
                existing: *existing,
            };
        }

        map.insert(channel.name.clone(), channel.id);
        debug!(
            "\"{}\" added to {:?} channels list",
            channel.name, channel.kind
        );
        AddOutcome::Inserted
    }

    fn remove(&mut self, channel: &ChannelInfo) -> RemoveOutcome {
        let Some(map) = self.map_mut(channel.kind) else {
            return RemoveOutcome::Unsupported;
        };

        match map.get(&channel.name) {
            None => RemoveOutcome::Missing,
            Some(stored) if *stored != channel.id => RemoveOutcome::StaleIgnored,
            Some(_) => {
                map.remove(&channel.name);
                debug!(
                    "\"{}\" removed from {:?} channels list",
                    channel.name, channel.kind
                );
                RemoveOutcome::Removed
            }
        }
    }
}

/// Name to id lookup for the text and voice channels of the configured guild.
///
/// Channel names are not unique on Discord, so the first channel registered
/// under a name owns it until that same channel is removed or renamed.
#[derive(Debug, Default)]
pub struct ChannelDirectory {
    maps: RwLock<ChannelMaps>,
}

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, channel: &ChannelInfo) -> AddOutcome {
        self.maps.write().await.add(channel)
    }

    /// Removes `channel.name` only while it still points at `channel.id`.
    pub async fn remove(&self, channel: &ChannelInfo) -> RemoveOutcome {
        self.maps.write().await.remove(channel)
    }

    /// Drops the old name/id pair and registers the new one under a single lock.
    pub async fn rename(&self, old: &ChannelInfo, new: &ChannelInfo) -> (RemoveOutcome, AddOutcome) {
        let mut maps = self.maps.write().await;
        let removed = maps.remove(old);
        let added = maps.add(new);
        (removed, added)
    }

    /// Replaces both maps with the given channels, keeping the first channel
    /// seen for every name.
    pub async fn rebuild<'a, I>(&self, channels: I)
    where
        I: IntoIterator<Item = &'a ChannelInfo>,
    {
        let mut fresh = ChannelMaps::default();
        for channel in channels {
            fresh.add(channel);
        }
        *self.maps.write().await = fresh;
    }

    pub async fn clear(&self) {
        *self.maps.write().await = ChannelMaps::default();
    }

    pub async fn lookup(&self, name: &str, kind: ChannelKind) -> Option<ChannelId> {
        self.maps.read().await.map(kind)?.get(name).copied()
    }

    pub async fn text_channel(&self, name: &str) -> Option<ChannelId> {
        self.lookup(name, ChannelKind::Text).await
    }

    pub async fn voice_channel(&self, name: &str) -> Option<ChannelId> {
        self.lookup(name, ChannelKind::Voice).await
    }

    /// Reverse lookup, used when the gateway has no cached copy of a channel.
    pub async fn name_of(&self, id: ChannelId, kind: ChannelKind) -> Option<String> {
        self.maps
            .read()
            .await
            .map(kind)?
            .iter()
            .find(|(_, stored)| **stored == id)
            .map(|(name, _)| name.clone())
    }

    pub async fn len(&self, kind: ChannelKind) -> usize {
        self.maps.read().await.map(kind).map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self) -> bool {
        let maps = self.maps.read().await;
        maps.text.is_empty() && maps.voice.is_empty()
    }

    /// Copy of the text and voice maps taken under one read lock.
    pub async fn snapshot(&self) -> (HashMap<String, ChannelId>, HashMap<String, ChannelId>) {
        let maps = self.maps.read().await;
        (maps.text.clone(), maps.voice.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(id: u64, name: &str) -> ChannelInfo {
        ChannelInfo::new(id, name, ChannelKind::Text)
    }

    fn voice(id: u64, name: &str) -> ChannelInfo {
        ChannelInfo::new(id, name, ChannelKind::Voice)
    }

    #[test]
    fn classifies_channel_types() {
        assert_eq!(ChannelKind::from(ChannelType::Text), ChannelKind::Text);
        assert_eq!(ChannelKind::from(ChannelType::Voice), ChannelKind::Voice);
        assert_eq!(ChannelKind::from(ChannelType::Category), ChannelKind::Other);
        assert_eq!(ChannelKind::from(ChannelType::News), ChannelKind::Other);
        assert_eq!(ChannelKind::from(ChannelType::Stage), ChannelKind::Other);
    }

    #[tokio::test]
    async fn first_registered_name_wins() {
        let directory = ChannelDirectory::new();

        assert_eq!(directory.add(&text(1, "general")).await, AddOutcome::Inserted);
        assert_eq!(
            directory.add(&text(2, "general")).await,
            AddOutcome::DuplicateName {
                existing: ChannelId::new(1)
            }
        );
        assert_eq!(
            directory.text_channel("general").await,
            Some(ChannelId::new(1))
        );
    }

    #[tokio::test]
    async fn text_and_voice_names_are_independent() {
        let directory = ChannelDirectory::new();

        directory.add(&text(1, "lobby")).await;
        directory.add(&voice(2, "lobby")).await;

        assert_eq!(directory.text_channel("lobby").await, Some(ChannelId::new(1)));
        assert_eq!(directory.voice_channel("lobby").await, Some(ChannelId::new(2)));
        assert_eq!(directory.len(ChannelKind::Text).await, 1);
        assert_eq!(directory.len(ChannelKind::Voice).await, 1);
    }

    #[tokio::test]
    async fn other_kinds_are_ignored() {
        let directory = ChannelDirectory::new();
        let category = ChannelInfo::new(9u64, "stuff", ChannelKind::Other);

        assert_eq!(directory.add(&category).await, AddOutcome::Unsupported);
        assert_eq!(directory.remove(&category).await, RemoveOutcome::Unsupported);
        assert!(directory.is_empty().await);
        assert_eq!(directory.lookup("stuff", ChannelKind::Other).await, None);
    }

    #[tokio::test]
    async fn stale_remove_keeps_current_owner() {
        let directory = ChannelDirectory::new();
        directory.add(&text(2, "general")).await;

        assert_eq!(
            directory.remove(&text(1, "general")).await,
            RemoveOutcome::StaleIgnored
        );
        assert_eq!(
            directory.text_channel("general").await,
            Some(ChannelId::new(2))
        );

        assert_eq!(directory.remove(&text(2, "general")).await, RemoveOutcome::Removed);
        assert_eq!(directory.text_channel("general").await, None);
        assert_eq!(directory.remove(&text(2, "general")).await, RemoveOutcome::Missing);
    }

    #[tokio::test]
    async fn rename_moves_the_entry() {
        let directory = ChannelDirectory::new();
        directory.add(&text(5, "old")).await;

        let outcome = directory.rename(&text(5, "old"), &text(5, "new")).await;

        assert_eq!(outcome, (RemoveOutcome::Removed, AddOutcome::Inserted));
        assert_eq!(directory.text_channel("old").await, None);
        assert_eq!(directory.text_channel("new").await, Some(ChannelId::new(5)));
        assert_eq!(
            directory.name_of(ChannelId::new(5), ChannelKind::Text).await,
            Some("new".to_string())
        );
    }

    #[tokio::test]
    async fn rebuild_keeps_first_seen_and_is_idempotent() {
        let directory = ChannelDirectory::new();
        directory.add(&text(99, "leftover")).await;

        let channels = vec![
            text(1, "general"),
            text(2, "general"),
            voice(3, "General"),
            voice(4, "afk"),
            ChannelInfo::new(5u64, "category", ChannelKind::Other),
        ];

        directory.rebuild(&channels).await;
        let first = directory.snapshot().await;
        directory.rebuild(&channels).await;
        let second = directory.snapshot().await;

        assert_eq!(first, second);
        let (text_map, voice_map) = first;
        assert_eq!(text_map.len(), 1);
        assert_eq!(text_map.get("general"), Some(&ChannelId::new(1)));
        assert!(!text_map.contains_key("leftover"));
        assert_eq!(voice_map.len(), 2);
        assert_eq!(voice_map.get("afk"), Some(&ChannelId::new(4)));
    }

    #[tokio::test]
    async fn clear_empties_both_maps() {
        let directory = ChannelDirectory::new();
        directory.rebuild(&[text(1, "general"), voice(2, "afk")]).await;
        assert!(!directory.is_empty().await);

        directory.clear().await;

        assert!(directory.is_empty().await);
    }

    #[tokio::test]
    async fn entries_always_belong_to_the_last_successful_add() {
        // Replays a fixed interleaving of adds and removes for two channels
        // fighting over one name and checks the owner after every step.
        let directory = ChannelDirectory::new();
        let mut owner: Option<u64> = None;

        let steps: [(bool, u64); 10] = [
            (true, 1),
            (true, 2),
            (false, 2),
            (false, 1),
            (true, 2),
            (false, 1),
            (true, 1),
            (false, 2),
            (true, 1),
            (false, 1),
        ];

        for (is_add, id) in steps {
            let channel = text(id, "general");
            if is_add {
                if directory.add(&channel).await == AddOutcome::Inserted {
                    owner = Some(id);
                }
            } else if directory.remove(&channel).await == RemoveOutcome::Removed {
                assert_eq!(owner, Some(id));
                owner = None;
            }

            assert_eq!(
                directory.text_channel("general").await,
                owner.map(ChannelId::new)
            );
        }
    }

    #[tokio::test]
    async fn concurrent_mutations_leave_one_owner() {
        let directory = std::sync::Arc::new(ChannelDirectory::new());

        let mut handles = Vec::new();
        for id in 1..=16u64 {
            let directory = directory.clone();
            handles.push(tokio::spawn(async move {
                directory.add(&text(id, "race")).await
            }));
        }

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap() == AddOutcome::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert!(directory.text_channel("race").await.is_some());
    }
}
