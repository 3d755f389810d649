use crate::DashboardConfig;
use crate::error::{PipelineError, Stage};
use crate::pipeline::{fetch_snapshot, resolve};
use analytics::{
    DashboardView, FilterState, FilterUpdate, SearchPage, SearchState, ValidationError,
    build_dashboard,
};
use chrono::{DateTime, TimeDelta, Utc};
use datastore::{InMemoryStore, Store, is_stale};
use domain::{ApiKey, ChannelId, ChannelSnapshot, Comment};
use log::{debug, info};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use uuid::Uuid;
use youtube_api::{YouTubeApi, fetch_video_comments};

type ResolutionKey = (ApiKey, String);
type SnapshotKey = (ApiKey, ChannelId);
type CommentsKey = (ApiKey, String);

/// Channel currently shown by a session
#[derive(Debug, Clone)]
struct ActiveChannel {
    api_key: ApiKey,
    channel_name: String,
    snapshot: Arc<ChannelSnapshot>,
}

/// A filter change that was refused; `current` is the last valid view
#[derive(Debug)]
pub struct FilterRejected {
    pub error: ValidationError,
    pub current: Option<DashboardView>,
}

/// Everything one dashboard user owns: caches, selections, pagination.
///
/// Created on session start and dropped on session end; nothing is shared
/// with other sessions.
pub struct Session {
    resolutions: InMemoryStore<ResolutionKey, ChannelId>,
    snapshots: InMemoryStore<SnapshotKey, Arc<ChannelSnapshot>>,
    comments: InMemoryStore<CommentsKey, Arc<Vec<Comment>>>,
    max_playlist_pages: usize,
    max_comments: usize,
    active: Option<ActiveChannel>,
    filters: Option<FilterState>,
    search: SearchState,
}

impl Session {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            resolutions: InMemoryStore::new(config.cache_ttl),
            snapshots: InMemoryStore::new(config.cache_ttl),
            comments: InMemoryStore::new(config.cache_ttl),
            max_playlist_pages: config.max_playlist_pages,
            max_comments: config.max_comments,
            active: None,
            filters: None,
            search: SearchState::new(config.page_size),
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<ChannelSnapshot>> {
        self.active.as_ref().map(|active| &active.snapshot)
    }

    pub fn filters(&self) -> Option<&FilterState> {
        self.filters.as_ref()
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Show `channel_name`, going to the network only on cache misses.
    ///
    /// The resolved identifier is reused while the name and key stay the
    /// same. On failure the session shows no channel.
    pub async fn load_channel(
        &mut self,
        api: &dyn YouTubeApi,
        api_key: ApiKey,
        channel_name: &str,
    ) -> Result<Arc<ChannelSnapshot>, PipelineError> {
        let channel_name = channel_name.trim();
        if api_key.is_empty() || channel_name.is_empty() {
            return Err(PipelineError::MissingInput);
        }

        let known_id = self
            .active
            .as_ref()
            .filter(|active| active.api_key == api_key && active.channel_name == channel_name)
            .map(|active| active.snapshot.channel.id.clone());

        let result = async {
            let channel_id = match known_id {
                Some(id) => id,
                None => self.resolve_cached(api, &api_key, channel_name).await?,
            };
            self.snapshot_for(api, &api_key, &channel_id, false).await
        }
        .await;

        self.activate(result, api_key, channel_name.to_string())
    }

    /// Refetch the active channel, bypassing and then repopulating the cache
    pub async fn refresh(
        &mut self,
        api: &dyn YouTubeApi,
    ) -> Option<Result<Arc<ChannelSnapshot>, PipelineError>> {
        let active = self.active.clone()?;
        let channel_id = active.snapshot.channel.id.clone();
        info!("Refreshing channel {channel_id}");
        self.comments.clear();

        let result = self
            .snapshot_for(api, &active.api_key, &channel_id, true)
            .await;
        Some(self.activate(result, active.api_key, active.channel_name))
    }

    async fn resolve_cached(
        &self,
        api: &dyn YouTubeApi,
        api_key: &ApiKey,
        channel_name: &str,
    ) -> Result<ChannelId, PipelineError> {
        let key = (api_key.clone(), channel_name.to_string());
        if let Some(id) = self.resolutions.get(&key) {
            debug!("Channel name '{channel_name}' resolved from cache");
            return Ok(id);
        }

        let id = resolve(api, api_key, channel_name).await?;
        self.resolutions.put(key, id.clone());
        Ok(id)
    }

    async fn snapshot_for(
        &self,
        api: &dyn YouTubeApi,
        api_key: &ApiKey,
        channel_id: &ChannelId,
        force_refresh: bool,
    ) -> Result<Arc<ChannelSnapshot>, PipelineError> {
        let key = (api_key.clone(), channel_id.clone());
        if !force_refresh {
            if let Some(snapshot) = self.snapshots.get(&key) {
                debug!("Snapshot for {channel_id} served from cache");
                return Ok(snapshot);
            }
        }

        let snapshot =
            Arc::new(fetch_snapshot(api, api_key, channel_id, self.max_playlist_pages).await?);
        self.snapshots.put(key, snapshot.clone());
        Ok(snapshot)
    }

    /// Top-level comments of `video_id`, fetched with the active channel's
    /// key and cached like snapshots. `None` without an active channel.
    pub async fn video_comments(
        &self,
        api: &dyn YouTubeApi,
        video_id: &str,
    ) -> Option<Result<Arc<Vec<Comment>>, PipelineError>> {
        let active = self.active.as_ref()?;
        let key = (active.api_key.clone(), video_id.to_string());
        if let Some(comments) = self.comments.get(&key) {
            debug!("Comments for {video_id} served from cache");
            return Some(Ok(comments));
        }

        let result = fetch_video_comments(api, &active.api_key, video_id, self.max_comments)
            .await
            .map(Arc::new)
            .map_err(PipelineError::fetch(Stage::Comments));
        if let Ok(comments) = &result {
            self.comments.put(key, comments.clone());
        }
        Some(result)
    }

    fn activate(
        &mut self,
        result: Result<Arc<ChannelSnapshot>, PipelineError>,
        api_key: ApiKey,
        channel_name: String,
    ) -> Result<Arc<ChannelSnapshot>, PipelineError> {
        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.active = None;
                self.filters = None;
                return Err(err);
            }
        };

        let same_channel = self
            .active
            .as_ref()
            .is_some_and(|active| active.snapshot.channel.id == snapshot.channel.id);
        if !same_channel || self.filters.is_none() {
            self.filters = FilterState::initial(&snapshot.details);
            self.search = SearchState::new(self.search.page_size());
        }

        self.active = Some(ActiveChannel {
            api_key,
            channel_name,
            snapshot: snapshot.clone(),
        });
        Ok(snapshot)
    }

    /// Statistics view for the current filters
    pub fn dashboard(&self) -> Option<DashboardView> {
        let snapshot = self.snapshot()?;
        let filters = self.filters.as_ref()?;
        Some(build_dashboard(&snapshot.details, filters))
    }

    /// Apply a filter change; invalid changes leave the state as it was
    pub fn apply_filters(
        &mut self,
        update: FilterUpdate,
    ) -> Option<Result<DashboardView, FilterRejected>> {
        let current = self.filters.as_ref()?;
        match current.apply(update) {
            Ok(next) => {
                self.filters = Some(next);
                self.dashboard().map(Ok)
            }
            Err(error) => Some(Err(FilterRejected {
                error,
                current: self.dashboard(),
            })),
        }
    }

    /// Search box changed; the window resets only if the text differs
    pub fn search(&mut self, query: &str) -> Option<SearchPage> {
        let snapshot = self.snapshot()?.clone();
        self.search = self.search.with_query(query);
        Some(self.search.page(&snapshot.videos))
    }

    /// "Load next page"; `Some(None)` once the last page is showing
    pub fn next_page(&mut self) -> Option<Option<SearchPage>> {
        let snapshot = self.snapshot()?.clone();
        let Some(next) = self.search.advanced(&snapshot.videos) else {
            return Some(None);
        };
        self.search = next;
        Some(Some(self.search.page(&snapshot.videos)))
    }

    /// Current page without changing anything
    pub fn current_page(&self) -> Option<SearchPage> {
        let snapshot = self.snapshot()?;
        Some(self.search.page(&snapshot.videos))
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

struct SessionSlot {
    session: SharedSession,
    last_seen: DateTime<Utc>,
}

/// Live sessions by id. Each session sits behind its own async mutex so at
/// most one pipeline runs per session.
///
/// A session unused for `session_idle_ttl` is ended: lookups treat it as
/// gone and every new session reaps the idle ones.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
    config: DashboardConfig,
}

impl SessionRegistry {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    fn idle_ttl(&self) -> TimeDelta {
        self.config.session_idle_ttl
    }

    pub fn create(&self) -> Uuid {
        self.create_at(Utc::now())
    }

    pub fn create_at(&self, now: DateTime<Utc>) -> Uuid {
        self.reap_idle(now);
        let id = Uuid::new_v4();
        self.sessions
            .write()
            .expect("Failed to acquire write lock on sessions")
            .insert(
                id,
                SessionSlot {
                    session: Arc::new(Mutex::new(Session::new(&self.config))),
                    last_seen: now,
                },
            );
        info!("Session {id} started");
        id
    }

    pub fn get(&self, id: &Uuid) -> Option<SharedSession> {
        self.get_at(id, Utc::now())
    }

    /// Look up a session and mark it used as of `now`
    pub fn get_at(&self, id: &Uuid, now: DateTime<Utc>) -> Option<SharedSession> {
        let mut sessions = self
            .sessions
            .write()
            .expect("Failed to acquire write lock on sessions");
        if is_stale(sessions.get(id)?.last_seen, self.idle_ttl(), now) {
            sessions.remove(id);
            info!("Session {id} expired after being idle");
            return None;
        }
        let slot = sessions.get_mut(id)?;
        slot.last_seen = now;
        Some(slot.session.clone())
    }

    /// End every session idle for the configured time, returning how many
    pub fn reap_idle(&self, now: DateTime<Utc>) -> usize {
        let idle_ttl = self.idle_ttl();
        let mut sessions = self
            .sessions
            .write()
            .expect("Failed to acquire write lock on sessions");
        let before = sessions.len();
        sessions.retain(|_, slot| !is_stale(slot.last_seen, idle_ttl, now));
        let reaped = before - sessions.len();
        if reaped > 0 {
            info!("Ended {reaped} idle session(s)");
        }
        reaped
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        let removed = self
            .sessions
            .write()
            .expect("Failed to acquire write lock on sessions")
            .remove(id)
            .is_some();
        if removed {
            info!("Session {id} ended");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .expect("Failed to acquire read lock on sessions")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
