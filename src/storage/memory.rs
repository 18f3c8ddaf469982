// In-memory store
// Process-lifetime records; the default backend when no database path
// is configured

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use super::models::{NewPitchAnalysis, NewUser, PitchAnalysis, User};
use super::Storage;

/// In-memory implementation of [`Storage`].
///
/// All state lives behind a single mutex, so id assignment is
/// serialized: ids are strictly increasing and never reused for the
/// lifetime of the process.
pub struct MemStorage {
    inner: Mutex<Inner>,
}

struct Inner {
    users: BTreeMap<i64, User>,
    analyses: BTreeMap<i64, PitchAnalysis>,
    next_user_id: i64,
    next_analysis_id: i64,
}

impl MemStorage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                users: BTreeMap::new(),
                analyses: BTreeMap::new(),
                next_user_id: 1,
                next_analysis_id: 1,
            }),
        }
    }

    fn locked(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to lock store: {}", e))
    }
}

impl Default for MemStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for MemStorage {
    async fn get_user(&self, id: i64) -> Result<Option<User>> {
        Ok(self.locked()?.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .locked()?
            .users
            .values()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut inner = self.locked()?;
        let id = inner.next_user_id;
        inner.next_user_id += 1;
        let user = User {
            id,
            username: new_user.username,
            password: new_user.password,
        };
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn create_pitch_analysis(
        &self,
        new_analysis: NewPitchAnalysis,
    ) -> Result<PitchAnalysis> {
        let mut inner = self.locked()?;
        let id = inner.next_analysis_id;
        inner.next_analysis_id += 1;
        let analysis = new_analysis.into_record(id, Utc::now());
        inner.analyses.insert(id, analysis.clone());
        Ok(analysis)
    }

    async fn get_pitch_analysis(&self, id: i64) -> Result<Option<PitchAnalysis>> {
        Ok(self.locked()?.analyses.get(&id).cloned())
    }

    async fn list_pitch_analyses(&self, user_id: Option<i64>) -> Result<Vec<PitchAnalysis>> {
        let inner = self.locked()?;
        Ok(inner
            .analyses
            .values()
            .filter(|analysis| match user_id {
                Some(uid) => analysis.user_id == Some(uid),
                None => true,
            })
            .cloned()
            .collect())
    }
}
