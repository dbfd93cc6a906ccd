//! In-memory session storage.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};
use uuid::Uuid;
use wisp_http::handler::{Session, SessionHook};
use wisp_http::protocol::{Request, Response};

/// Cookie carrying the session id unless configured otherwise
pub const DEFAULT_SESSION_COOKIE: &str = "WISP_SESSION_ID";

type SessionData = HashMap<String, String>;

/// [`SessionHook`] keeping session data in process memory.
///
/// The session id travels in a cookie. Clients without one get a fresh UUID v4;
/// ids the store doesn't know start out with empty data. Data lives until the
/// process exits.
#[derive(Debug)]
pub struct MemorySessionStore {
    cookie_name: String,
    sessions: Mutex<HashMap<String, SessionData>>,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::with_cookie_name(DEFAULT_SESSION_COOKIE)
    }

    pub fn with_cookie_name(cookie_name: impl Into<String>) -> Self {
        Self { cookie_name: cookie_name.into(), sessions: Mutex::new(HashMap::new()) }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn remove(&self, id: &str) -> bool {
        self.lock().remove(id).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionData>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SessionHook for MemorySessionStore {
    fn open(&self, request: &Request) -> Session {
        let id = match request.cookie(&self.cookie_name) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().to_string(),
        };

        let data = self.lock().get(&id).cloned().unwrap_or_default();
        trace!(session = %id, entries = data.len(), "session opened");
        Session::with_data(id, data)
    }

    fn close(&self, response: &mut Response, session: Session) {
        let (id, data) = session.into_parts();
        let cookie = format!("{}={id}; Path=/; HttpOnly", self.cookie_name);
        self.lock().insert(id, data);

        if let Err(e) = response.append_header("Set-Cookie", &cookie) {
            warn!(cause = %e, "can't set session cookie");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::SET_COOKIE;
    use wisp_http::codec::{ParseStatus, RequestParser};

    fn request(cookie: Option<&str>) -> Request {
        let raw = match cookie {
            Some(cookie) => format!("GET / HTTP/1.1\r\nCookie: {cookie}\r\n\r\n"),
            None => "GET / HTTP/1.1\r\n\r\n".to_string(),
        };
        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(raw.as_bytes()), ParseStatus::Good);
        parser.decode().unwrap()
    }

    #[test]
    fn new_client_gets_fresh_id() {
        let store = MemorySessionStore::new();
        let session = store.open(&request(None));
        assert!(Uuid::parse_str(session.id()).is_ok());
        assert!(session.data().is_empty());

        let other = store.open(&request(Some("theme=dark")));
        assert_ne!(session.id(), other.id());
    }

    #[test]
    fn data_survives_between_requests() {
        let store = MemorySessionStore::new();
        let mut session = store.open(&request(None));
        session.insert("user", "alice");
        let id = session.id().to_string();

        let mut response = Response::new();
        store.close(&mut response, session);
        assert_eq!(store.len(), 1);
        assert_eq!(
            response.headers().get(SET_COOKIE).unwrap().to_str().unwrap(),
            format!("WISP_SESSION_ID={id}; Path=/; HttpOnly")
        );

        let session = store.open(&request(Some(format!("theme=dark; WISP_SESSION_ID={id}").as_str())));
        assert_eq!(session.id(), id);
        assert_eq!(session.get("user"), Some("alice"));
    }

    #[test]
    fn unknown_id_starts_empty() {
        let store = MemorySessionStore::with_cookie_name("SID");
        let session = store.open(&request(Some("SID=from-elsewhere")));
        assert_eq!(session.id(), "from-elsewhere");
        assert!(session.data().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn close_keeps_other_cookies() {
        let store = MemorySessionStore::new();
        let mut response = Response::new();
        response.append_header("Set-Cookie", "theme=dark").unwrap();
        store.close(&mut response, Session::new("abc"));
        assert_eq!(response.headers().get_all(SET_COOKIE).iter().count(), 2);
        assert!(store.remove("abc"));
    }
}
