//! Test helpers.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use async_trait::async_trait;
use jiff::Timestamp;
use replygate_app::{
    auth::{CredentialRecord, CredentialRepository, MockAuthService, NewCredential},
    context::AppContext,
    rate_limits::{
        InsertOutcome, MockRateLimitService, RateLimitDecision, RateLimitPolicy,
        RateLimitRepository,
    },
    replies::MockReplyGenerator,
    sessions::MockSessionService,
    users::UserUuid,
};
use salvo::{affix_state::inject, prelude::*};
use uuid::Uuid;

use crate::state::{GatewaySettings, State};

/// Long enough to pass the structural bearer checks.
pub(crate) const VALID_TOKEN: &str = "dGVzdC10b2tlbi10aGF0LWlzLWxvbmctZW5vdWdoLWZvci1iZWFyZXI";

pub(crate) fn test_settings() -> GatewaySettings {
    GatewaySettings {
        session_cookie_name: "session".to_string(),
        issue_policy: RateLimitPolicy::new(10, 60_000),
        generate_policy: RateLimitPolicy::new(30, 60_000),
    }
}

/// Service mocks. Every default expects no calls at all.
pub(crate) struct Mocks {
    pub auth: MockAuthService,
    pub sessions: MockSessionService,
    pub rate_limits: MockRateLimitService,
    pub replies: MockReplyGenerator,
}

impl Default for Mocks {
    fn default() -> Self {
        let mut auth = MockAuthService::new();
        auth.expect_issue_token().never();
        auth.expect_authenticate_bearer().never();
        auth.expect_revoke_user_tokens().never();
        auth.expect_list_user_tokens().never();

        let mut sessions = MockSessionService::new();
        sessions.expect_authenticate_session().never();

        let mut rate_limits = MockRateLimitService::new();
        rate_limits.expect_check().never();
        rate_limits.expect_prune().never();

        let mut replies = MockReplyGenerator::new();
        replies.expect_generate().never();

        Self {
            auth,
            sessions,
            rate_limits,
            replies,
        }
    }
}

impl Mocks {
    fn into_state(self) -> Arc<State> {
        State::shared(
            AppContext {
                auth: Arc::new(self.auth),
                sessions: Arc::new(self.sessions),
                rate_limits: Arc::new(self.rate_limits),
                replies: Arc::new(self.replies),
            },
            test_settings(),
        )
    }
}

/// Auth mock resolving any bearer token to `user`, once.
pub(crate) fn authenticating_as(user: UserUuid) -> MockAuthService {
    let mut auth = MockAuthService::new();

    auth.expect_authenticate_bearer()
        .once()
        .return_once(move |_| Ok(user));

    auth
}

/// Rate limiter that admits one request whose key starts with `prefix`.
pub(crate) fn allow_all(prefix: &'static str) -> MockRateLimitService {
    let mut rate_limits = MockRateLimitService::new();

    rate_limits
        .expect_check()
        .once()
        .withf(move |key, _| key.starts_with(prefix))
        .return_once(|_, policy| RateLimitDecision::allow(policy, 1, policy.window_ms));

    rate_limits
}

pub(crate) fn service_with(mocks: Mocks, route: Router) -> Service {
    service_with_state(mocks.into_state(), route)
}

pub(crate) fn service_with_state(state: Arc<State>, route: Router) -> Service {
    Service::new(Router::new().hoop(inject(state)).push(route))
}

pub(crate) fn service_with_auth(auth: MockAuthService, route: Router) -> Service {
    service_with(
        Mocks {
            auth,
            ..Mocks::default()
        },
        route,
    )
}

/// Credential store kept in memory, one row per user like the real table.
#[derive(Debug, Default)]
pub(crate) struct MemoryCredentials {
    rows: Mutex<Vec<CredentialRecord>>,
}

impl MemoryCredentials {
    fn rows(&self) -> std::sync::MutexGuard<'_, Vec<CredentialRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn live(&self) -> usize {
        self.rows().len()
    }
}

#[async_trait]
impl CredentialRepository for MemoryCredentials {
    async fn replace_user_credential(
        &self,
        credential: NewCredential,
    ) -> Result<CredentialRecord, sqlx::Error> {
        let record = CredentialRecord {
            uuid: credential.uuid,
            user_uuid: credential.user_uuid,
            token_hash: credential.token_hash,
            created_at: Timestamp::now(),
            expires_at: credential.expires_at,
        };

        let mut rows = self.rows();
        rows.retain(|row| row.user_uuid != record.user_uuid);
        rows.push(record.clone());

        Ok(record)
    }

    async fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<CredentialRecord>, sqlx::Error> {
        Ok(self
            .rows()
            .iter()
            .find(|row| row.token_hash == token_hash)
            .cloned())
    }

    async fn delete_credential(&self, uuid: Uuid) -> Result<u64, sqlx::Error> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|row| row.uuid != uuid);

        Ok((before - rows.len()) as u64)
    }

    async fn delete_user_credentials(&self, user: UserUuid) -> Result<u64, sqlx::Error> {
        let mut rows = self.rows();
        let before = rows.len();
        rows.retain(|row| row.user_uuid != user);

        Ok((before - rows.len()) as u64)
    }

    async fn list_user_credentials(
        &self,
        user: UserUuid,
    ) -> Result<Vec<CredentialRecord>, sqlx::Error> {
        Ok(self
            .rows()
            .iter()
            .filter(|row| row.user_uuid == user)
            .cloned()
            .collect())
    }
}

/// Fixed-window counters kept in memory, keyed like the real primary key.
#[derive(Debug, Default)]
pub(crate) struct MemoryWindows {
    counts: Mutex<HashMap<(String, i64), i32>>,
}

impl MemoryWindows {
    fn counts(&self) -> std::sync::MutexGuard<'_, HashMap<(String, i64), i32>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RateLimitRepository for MemoryWindows {
    async fn increment_below(
        &self,
        key: &str,
        window_start: i64,
        max_requests: i32,
    ) -> Result<Option<i32>, sqlx::Error> {
        Ok(self
            .counts()
            .get_mut(&(key.to_string(), window_start))
            .filter(|count| **count < max_requests)
            .map(|count| {
                *count += 1;
                *count
            }))
    }

    async fn find_count(&self, key: &str, window_start: i64) -> Result<Option<i32>, sqlx::Error> {
        Ok(self.counts().get(&(key.to_string(), window_start)).copied())
    }

    async fn insert_first(
        &self,
        key: &str,
        window_start: i64,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let mut counts = self.counts();
        let slot = (key.to_string(), window_start);

        if counts.contains_key(&slot) {
            return Ok(InsertOutcome::Conflict);
        }

        counts.insert(slot, 1);

        Ok(InsertOutcome::Inserted)
    }

    async fn prune_before(&self, window_start: i64) -> Result<u64, sqlx::Error> {
        let mut counts = self.counts();
        let before = counts.len();
        counts.retain(|(_, start), _| *start >= window_start);

        Ok((before - counts.len()) as u64)
    }
}
