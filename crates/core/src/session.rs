//! Session Store embedded in each account record.
//!
//! An account carries an ordered list of [`Session`]s (insertion order is
//! login order). The list is persisted as a single JSON document, so every
//! function here is a pure transformation of that list; the caller writes the
//! whole list back in one statement.
//!
//! Stale sessions (older than [`SESSION_TTL_HOURS`] from their login time, or
//! with a login time that is missing or unparsable) are always pruned before
//! a login attempt is evaluated with [`decide_login`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::types::Timestamp;

/// Hours after `login_time` at which a session is considered stale.
pub const SESSION_TTL_HOURS: i64 = 24;

/// Reason sent with `force-logout` when another device forces a login.
pub const FORCE_LOGIN_REASON: &str = "New login from another device";

/// Reason sent with `force-logout` when an administrator deletes the account.
pub const ACCOUNT_DELETED_REASON: &str = "Your account has been deleted by an administrator";

/// Placeholder recorded when the client does not send a user agent or the
/// peer address is unavailable.
pub const UNKNOWN_CLIENT: &str = "Unknown";

/// One authenticated login instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The bearer token issued for this login.
    pub token: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub login_time: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_activity: Option<Timestamp>,
    #[serde(default)]
    pub user_agent: String,
    #[serde(default)]
    pub origin_address: String,
}

impl Session {
    /// Start a new session at `now`.
    pub fn new(
        token: impl Into<String>,
        now: Timestamp,
        user_agent: impl Into<String>,
        origin_address: impl Into<String>,
    ) -> Self {
        Self {
            token: token.into(),
            login_time: Some(now),
            last_activity: Some(now),
            user_agent: user_agent.into(),
            origin_address: origin_address.into(),
        }
    }

    /// A session is stale when its login time is unknown or at least
    /// [`SESSION_TTL_HOURS`] old.
    pub fn is_stale(&self, now: Timestamp) -> bool {
        match self.login_time {
            Some(login_time) => now - login_time >= Duration::hours(SESSION_TTL_HOURS),
            None => true,
        }
    }
}

/// Accept RFC 3339 strings; map anything else (null, garbage, wrong type) to
/// `None` so the session is pruned instead of failing the whole document.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }))
}

/// Ordered list of an account's live sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActiveSessions(Vec<Session>);

impl ActiveSessions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Remove every stale session. Returns how many were removed.
    pub fn prune_stale(&mut self, now: Timestamp) -> usize {
        let before = self.0.len();
        self.0.retain(|s| !s.is_stale(now));
        before - self.0.len()
    }

    /// The earliest stored session, reported on login conflicts.
    pub fn first(&self) -> Option<&Session> {
        self.0.first()
    }

    /// Drop all sessions. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let count = self.0.len();
        self.0.clear();
        count
    }

    pub fn push(&mut self, session: Session) {
        self.0.push(session);
    }

    /// Remove the session holding `token`. Returns `false` when no session
    /// matched, leaving the list untouched.
    pub fn remove_token(&mut self, token: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|s| s.token != token);
        before != self.0.len()
    }

    /// Bump `last_activity` on the session holding `token`.
    pub fn touch(&mut self, token: &str, now: Timestamp) -> bool {
        match self.0.iter_mut().find(|s| s.token == token) {
            Some(session) => {
                session.last_activity = Some(now);
                true
            }
            None => false,
        }
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.0.iter().any(|s| s.token == token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Session> {
        self.0.iter()
    }
}

impl From<Vec<Session>> for ActiveSessions {
    fn from(sessions: Vec<Session>) -> Self {
        Self(sessions)
    }
}

// ---------------------------------------------------------------------------
// Login admission
// ---------------------------------------------------------------------------

/// How the client asked to log in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMode {
    /// Plain login; refused while another session is live.
    Normal,
    /// Evict every other session, then log in.
    Force,
    /// Evict every session and stop without issuing a token.
    LogoutOnly,
}

impl LoginMode {
    /// `only_logout` is only honoured together with `force_login`.
    pub fn from_flags(force_login: bool, only_logout: bool) -> Self {
        match (force_login, only_logout) {
            (true, true) => LoginMode::LogoutOnly,
            (true, false) => LoginMode::Force,
            (false, _) => LoginMode::Normal,
        }
    }
}

/// Summary of the blocking session returned with a login conflict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionInfo {
    pub login_time: Option<Timestamp>,
    pub user_agent: String,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            login_time: session.login_time,
            user_agent: session.user_agent.clone(),
        }
    }
}

/// Outcome of evaluating a login attempt against the pruned session list.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginDecision {
    /// No live session; start one.
    Admit,
    /// A live session exists and the client did not force.
    Conflict(SessionInfo),
    /// Clear every session, notify the old devices, then start one.
    EvictThenAdmit,
    /// Clear every session, notify the old devices, issue nothing.
    EvictOnly,
}

/// Decide what a login attempt does. `sessions` must already be pruned.
pub fn decide_login(sessions: &ActiveSessions, mode: LoginMode) -> LoginDecision {
    match mode {
        LoginMode::Normal => match sessions.first() {
            Some(first) => LoginDecision::Conflict(SessionInfo::from(first)),
            None => LoginDecision::Admit,
        },
        LoginMode::Force => LoginDecision::EvictThenAdmit,
        LoginMode::LogoutOnly => LoginDecision::EvictOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn now() -> Timestamp {
        Utc::now()
    }

    fn session_at(token: &str, login_time: Timestamp) -> Session {
        Session::new(token, login_time, "agent", "127.0.0.1")
    }

    #[test]
    fn fresh_session_is_not_stale() {
        let now = now();
        assert!(!session_at("a", now - Duration::hours(23)).is_stale(now));
    }

    #[test]
    fn session_at_ttl_boundary_is_stale() {
        let now = now();
        assert!(session_at("a", now - Duration::hours(SESSION_TTL_HOURS)).is_stale(now));
        assert!(session_at("b", now - Duration::hours(30)).is_stale(now));
    }

    #[test]
    fn prune_removes_only_stale_sessions() {
        let now = now();
        let mut sessions = ActiveSessions::from(vec![
            session_at("old", now - Duration::hours(25)),
            session_at("new", now - Duration::minutes(5)),
        ]);

        assert_eq!(sessions.prune_stale(now), 1);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions.first().unwrap().token, "new");
    }

    #[test]
    fn prune_of_expired_sessions_leaves_no_conflict() {
        let now = now();
        let mut sessions = ActiveSessions::from(vec![
            session_at("a", now - Duration::hours(48)),
            session_at("b", now - Duration::hours(24)),
        ]);
        sessions.prune_stale(now);

        assert!(sessions.is_empty());
        assert_eq!(decide_login(&sessions, LoginMode::Normal), LoginDecision::Admit);
    }

    #[test]
    fn missing_or_garbage_login_time_is_pruned() {
        let raw = serde_json::json!([
            { "token": "missing", "user_agent": "x", "origin_address": "y" },
            { "token": "garbage", "login_time": "not-a-date" },
            { "token": "number", "login_time": 12345 },
            { "token": "good", "login_time": Utc::now().to_rfc3339() }
        ]);
        let mut sessions: ActiveSessions = serde_json::from_value(raw).unwrap();
        assert_eq!(sessions.len(), 4);

        assert_eq!(sessions.prune_stale(now()), 3);
        assert_eq!(sessions.first().unwrap().token, "good");
    }

    #[test]
    fn sessions_survive_json_round_trip() {
        let sessions = ActiveSessions::from(vec![session_at("t", now())]);
        let json = serde_json::to_value(&sessions).unwrap();
        assert!(json.is_array());
        let back: ActiveSessions = serde_json::from_value(json).unwrap();
        assert_eq!(back, sessions);
    }

    #[test]
    fn conflict_reports_first_stored_session() {
        let now = now();
        let mut first = session_at("first", now - Duration::hours(2));
        first.user_agent = "Firefox".into();
        let mut second = session_at("second", now - Duration::hours(1));
        second.user_agent = "Chrome".into();
        let sessions = ActiveSessions::from(vec![first, second]);

        assert_matches!(
            decide_login(&sessions, LoginMode::Normal),
            LoginDecision::Conflict(info) if info.user_agent == "Firefox"
        );
    }

    #[test]
    fn force_modes_evict_regardless_of_sessions() {
        let empty = ActiveSessions::new();
        let busy = ActiveSessions::from(vec![session_at("a", now())]);

        assert_eq!(decide_login(&empty, LoginMode::Force), LoginDecision::EvictThenAdmit);
        assert_eq!(decide_login(&busy, LoginMode::Force), LoginDecision::EvictThenAdmit);
        assert_eq!(decide_login(&busy, LoginMode::LogoutOnly), LoginDecision::EvictOnly);
    }

    #[test]
    fn only_logout_requires_force() {
        assert_eq!(LoginMode::from_flags(false, true), LoginMode::Normal);
        assert_eq!(LoginMode::from_flags(true, false), LoginMode::Force);
        assert_eq!(LoginMode::from_flags(true, true), LoginMode::LogoutOnly);
    }

    #[test]
    fn remove_token_is_idempotent() {
        let mut sessions =
            ActiveSessions::from(vec![session_at("a", now()), session_at("b", now())]);

        assert!(sessions.remove_token("a"));
        assert!(!sessions.remove_token("a"));
        assert!(!sessions.remove_token("unknown"));
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn clear_reports_removed_count() {
        let mut sessions =
            ActiveSessions::from(vec![session_at("a", now()), session_at("b", now())]);
        assert_eq!(sessions.clear(), 2);
        assert!(sessions.is_empty());
    }

    #[test]
    fn touch_updates_last_activity_only_for_matching_token() {
        let start = now() - Duration::minutes(10);
        let mut sessions = ActiveSessions::from(vec![session_at("a", start)]);
        let later = now();

        assert!(sessions.touch("a", later));
        assert!(!sessions.touch("zzz", later));
        let session = sessions.first().unwrap();
        assert_eq!(session.last_activity, Some(later));
        assert_eq!(session.login_time, Some(start));
    }
}
