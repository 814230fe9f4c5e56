use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::feed::{FetchError, PlayerFeed};
use crate::journal::{RunJournal, RunRecord};
use crate::player::{Player, PlayerId, RawPlayer};
use crate::repository::{PlayerRepository, StorageError};

/// A well-formed raw record for tests.
pub fn raw_player(id: &str, team: &str) -> RawPlayer {
    RawPlayer {
        external_id: Some(id.to_owned()),
        secondary_id: Some(format!("00-{id:0>7}")),
        full_name: Some(format!("Player {id}")),
        first_name: None,
        last_name: None,
        position: Some("WR".to_owned()),
        team: Some(team.to_owned()),
        active: Some(true),
        decode_error: None,
    }
}

/// In-memory repository for testing. Can be told to start failing writes.
#[derive(Default)]
pub struct InMemoryRepository {
    players: Mutex<BTreeMap<PlayerId, Player>>,
    saves: AtomicU64,
    fail_after: Mutex<Option<u64>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let `n` more saves succeed, then fail every save after that.
    pub fn fail_after(&self, n: u64) {
        let done = self.saves.load(Ordering::SeqCst);
        *self.fail_after.lock().unwrap() = Some(done + n);
    }

    pub fn len(&self) -> usize {
        self.players.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl PlayerRepository for InMemoryRepository {
    async fn save(&self, player: &Player) -> Result<(), StorageError> {
        if let Some(limit) = *self.fail_after.lock().unwrap()
            && self.saves.load(Ordering::SeqCst) >= limit
        {
            return Err(StorageError::Database("connection lost".into()));
        }

        self.saves.fetch_add(1, Ordering::SeqCst);
        self.players
            .lock()
            .unwrap()
            .insert(player.external_id.clone(), player.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &PlayerId) -> Result<Player, StorageError> {
        self.players
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.clone()))
    }

    async fn find_all(&self) -> Result<Vec<Player>, StorageError> {
        Ok(self.players.lock().unwrap().values().cloned().collect())
    }
}

/// Feed that replays queued errors first, then returns a fixed roster.
pub struct ScriptedFeed {
    label: String,
    records: Vec<RawPlayer>,
    queued_errors: Mutex<VecDeque<FetchError>>,
    always_fail: Option<FetchError>,
    latency: Option<Duration>,
    calls: AtomicU64,
}

impl ScriptedFeed {
    pub fn returning(records: Vec<RawPlayer>) -> Self {
        Self {
            label: "scripted".to_owned(),
            records,
            queued_errors: Mutex::new(VecDeque::new()),
            always_fail: None,
            latency: None,
            calls: AtomicU64::new(0),
        }
    }

    pub fn failing(error: FetchError) -> Self {
        Self {
            always_fail: Some(error),
            ..Self::returning(Vec::new())
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail the next call with `error`.
    pub fn push_error(&self, error: FetchError) {
        self.queued_errors.lock().unwrap().push_back(error);
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlayerFeed for ScriptedFeed {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch_all(&self) -> Result<Vec<RawPlayer>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self.queued_errors.lock().unwrap().pop_front();
        if let Some(error) = queued {
            return Err(error);
        }
        if let Some(error) = &self.always_fail {
            return Err(error.clone());
        }

        Ok(self.records.clone())
    }
}

/// Feed that parks inside `fetch_all` until released.
pub struct BlockingFeed {
    records: Vec<RawPlayer>,
    entered: Notify,
    released: Notify,
    calls: AtomicU64,
}

impl BlockingFeed {
    pub fn new(records: Vec<RawPlayer>) -> Self {
        Self {
            records,
            entered: Notify::new(),
            released: Notify::new(),
            calls: AtomicU64::new(0),
        }
    }

    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.notify_one();
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl PlayerFeed for BlockingFeed {
    fn label(&self) -> &str {
        "blocking"
    }

    async fn fetch_all(&self) -> Result<Vec<RawPlayer>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.released.notified().await;
        Ok(self.records.clone())
    }
}

#[derive(Default)]
pub struct InMemoryJournal {
    records: Mutex<Vec<RunRecord>>,
}

impl InMemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<RunRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RunJournal for InMemoryJournal {
    async fn record(&self, run: &RunRecord) -> Result<(), StorageError> {
        self.records.lock().unwrap().push(run.clone());
        Ok(())
    }

    async fn last_run(&self) -> Result<Option<RunRecord>, StorageError> {
        Ok(self.records.lock().unwrap().last().cloned())
    }
}

/// Clock that jumps straight to each deadline it is asked to wait for.
///
/// Deadlines are recorded so tests can assert on the schedule. Optionally
/// cancels a token once a given number of sleeps has been requested.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
    sleeps: Mutex<Vec<DateTime<Utc>>>,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
            cancel_after: Mutex::new(None),
        }
    }

    pub fn cancel_after(&self, sleeps: usize, token: CancellationToken) {
        *self.cancel_after.lock().unwrap() = Some((sleeps, token));
    }

    pub fn sleeps(&self) -> Vec<DateTime<Utc>> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep_until(&self, deadline: DateTime<Utc>) {
        let count = {
            let mut sleeps = self.sleeps.lock().unwrap();
            sleeps.push(deadline);
            sleeps.len()
        };

        {
            let mut now = self.now.lock().unwrap();
            if deadline > *now {
                *now = deadline;
            }
        }

        let token = match self.cancel_after.lock().unwrap().as_ref() {
            Some((limit, token)) if count >= *limit => Some(token.clone()),
            _ => None,
        };
        if let Some(token) = token {
            token.cancel();
        }

        tokio::task::yield_now().await;
    }
}
