//! Session store
//!
//! One map keyed by PID holds both active and completed sessions, so a PID is
//! never in both sets at once and never in neither while its exit is being
//! recorded: the swap from active to completed happens under a single lock.
//! Completed sessions are retained in completion order and evicted FIFO.

use super::constants::MAX_COMPLETED_SESSIONS;
use super::process::ExitWatch;
use super::session::{
    ActiveSessionInfo, CompletedSession, CompletedSessionInfo, ReadOutput, Session, SessionRecord,
};
use crate::error::{Error, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct Inner {
    sessions: HashMap<u32, SessionRecord>,
    /// PIDs of completed sessions, oldest first.
    completion_order: VecDeque<u32>,
}

impl Inner {
    fn forget_completed(&mut self, pid: u32) {
        self.completion_order.retain(|p| *p != pid);
    }
}

/// Registry of active and completed sessions.
#[derive(Debug)]
pub struct SessionStore {
    inner: Mutex<Inner>,
    max_completed: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(MAX_COMPLETED_SESSIONS)
    }
}

impl SessionStore {
    /// Create a store retaining at most `max_completed` completed sessions.
    #[must_use]
    pub fn new(max_completed: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_completed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a freshly spawned session.
    pub(crate) fn insert(&self, session: Session) {
        let pid = session.pid;
        let mut inner = self.lock();
        match inner.sessions.insert(pid, SessionRecord::Active(session)) {
            Some(SessionRecord::Completed(_)) => {
                warn!(pid = %pid, "PID reused, dropping unread completed session");
                inner.forget_completed(pid);
            }
            Some(SessionRecord::Active(_)) => {
                warn!(pid = %pid, "PID reused while still tracked as active");
            }
            None => {}
        }
    }

    /// Pull pending output of an active session into its buffer.
    /// Returns the number of new bytes.
    pub(crate) fn drain(&self, pid: u32) -> Option<usize> {
        match self.lock().sessions.get_mut(&pid) {
            Some(SessionRecord::Active(session)) => Some(session.drain()),
            _ => None,
        }
    }

    /// Flag an active session as blocked after its execution timeout.
    ///
    /// Returns the full output so far and resets the buffer, so the next
    /// read only reports what comes after.
    pub(crate) fn mark_blocked(&self, pid: u32) -> Option<String> {
        let mut inner = self.lock();
        match inner.sessions.get_mut(&pid) {
            Some(SessionRecord::Active(session)) => {
                session.drain();
                session.is_blocked = true;
                let _ = session.take_buffered();
                Some(session.full_output())
            }
            _ => None,
        }
    }

    /// Read a session's output.
    ///
    /// Active sessions yield their buffered output; completed sessions are
    /// returned once and then forgotten.
    pub fn read(&self, pid: u32) -> Result<ReadOutput> {
        let mut inner = self.lock();
        if let Some(SessionRecord::Active(session)) = inner.sessions.get_mut(&pid) {
            session.drain();
            let output = session.take_buffered();
            return Ok(if output.is_empty() {
                ReadOutput::NoNewOutput
            } else {
                ReadOutput::NewOutput(output)
            });
        }

        match inner.sessions.remove(&pid) {
            Some(SessionRecord::Completed(completed)) => {
                inner.forget_completed(pid);
                debug!(pid = %pid, "Completed session consumed");
                Ok(ReadOutput::Completed(completed))
            }
            Some(active @ SessionRecord::Active(_)) => {
                inner.sessions.insert(pid, active);
                Err(Error::SessionNotFound(pid))
            }
            None => Err(Error::SessionNotFound(pid)),
        }
    }

    /// Exit watch and kill switch of an active session, for termination.
    ///
    /// The kill switch is handed out at most once.
    pub(crate) fn begin_termination(
        &self,
        pid: u32,
    ) -> Option<(Option<oneshot::Sender<()>>, ExitWatch)> {
        let mut inner = self.lock();
        match inner.sessions.get_mut(&pid) {
            Some(SessionRecord::Active(session)) => Some((
                session.handle.take_kill_switch(),
                session.handle.watch(),
            )),
            _ => None,
        }
    }

    /// Move an active session to the completed set.
    ///
    /// Returns `None` if the session is not active, which makes concurrent
    /// finalization from the completion watcher and a force terminate safe.
    pub(crate) fn finalize(&self, pid: u32, exit_code: i32) -> Option<CompletedSession> {
        let mut inner = self.lock();
        if !matches!(inner.sessions.get(&pid), Some(SessionRecord::Active(_))) {
            return None;
        }
        let Some(SessionRecord::Active(session)) = inner.sessions.remove(&pid) else {
            return None;
        };

        let completed = session.complete(exit_code);
        inner
            .sessions
            .insert(pid, SessionRecord::Completed(completed.clone()));
        inner.completion_order.push_back(pid);

        while inner.completion_order.len() > self.max_completed {
            if let Some(oldest) = inner.completion_order.pop_front() {
                inner.sessions.remove(&oldest);
                debug!(pid = %oldest, "Evicted oldest completed session");
            }
        }

        debug!(pid = %pid, exit_code, "Session completed");
        Some(completed)
    }

    /// Copy of a completed session without consuming it.
    pub fn completed_snapshot(&self, pid: u32) -> Option<CompletedSession> {
        match self.lock().sessions.get(&pid) {
            Some(SessionRecord::Completed(completed)) => Some(completed.clone()),
            _ => None,
        }
    }

    /// Whether `pid` is an active session.
    #[must_use]
    pub fn is_active(&self, pid: u32) -> bool {
        matches!(self.lock().sessions.get(&pid), Some(SessionRecord::Active(_)))
    }

    /// Snapshots of all active sessions, by PID.
    #[must_use]
    pub fn active(&self) -> Vec<ActiveSessionInfo> {
        let inner = self.lock();
        let mut list: Vec<_> = inner
            .sessions
            .values()
            .filter_map(|record| match record {
                SessionRecord::Active(session) => Some(session.info()),
                SessionRecord::Completed(_) => None,
            })
            .collect();
        list.sort_by_key(|info| info.pid);
        list
    }

    /// Snapshots of retained completed sessions, oldest first.
    #[must_use]
    pub fn completed(&self) -> Vec<CompletedSessionInfo> {
        let inner = self.lock();
        inner
            .completion_order
            .iter()
            .filter_map(|pid| match inner.sessions.get(pid) {
                Some(SessionRecord::Completed(completed)) => Some(completed.info()),
                _ => None,
            })
            .collect()
    }

    /// Number of active sessions.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.lock()
            .sessions
            .values()
            .filter(|record| matches!(record, SessionRecord::Active(_)))
            .count()
    }

    /// Number of retained completed sessions.
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.lock().completion_order.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::process::FakeProcess;

    fn spawn_fake(store: &SessionStore, pid: u32) -> FakeProcess {
        let (fake, handle) = FakeProcess::new();
        store.insert(Session::new(pid, format!("cmd-{}", pid), handle));
        fake
    }

    #[test]
    fn test_read_active_then_completed_once() {
        let store = SessionStore::default();
        let mut fake = spawn_fake(&store, 10);

        assert_eq!(store.read(10).unwrap(), ReadOutput::NoNewOutput);
        fake.emit("hello\n");
        assert_eq!(store.read(10).unwrap(), ReadOutput::NewOutput("hello\n".into()));
        assert_eq!(store.read(10).unwrap(), ReadOutput::NoNewOutput);

        fake.emit("bye\n");
        fake.exit(0);
        let completed = store.finalize(10, 0).unwrap();
        assert_eq!(completed.output, "hello\nbye\n");

        match store.read(10).unwrap() {
            ReadOutput::Completed(c) => assert_eq!(c.exit_code, 0),
            other => panic!("expected completed, got {:?}", other),
        }
        assert!(matches!(store.read(10), Err(Error::SessionNotFound(10))));
        assert_eq!(store.completed_count(), 0);
    }

    #[test]
    fn test_unknown_pid() {
        let store = SessionStore::default();
        assert!(matches!(store.read(99), Err(Error::SessionNotFound(99))));
        assert!(store.drain(99).is_none());
        assert!(store.mark_blocked(99).is_none());
        assert!(store.begin_termination(99).is_none());
        assert!(store.finalize(99, 0).is_none());
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let store = SessionStore::default();
        let _fake = spawn_fake(&store, 5);

        assert!(store.finalize(5, 1).is_some());
        assert!(store.finalize(5, -9).is_none());
        assert_eq!(store.completed_count(), 1);
        assert_eq!(store.completed_snapshot(5).unwrap().exit_code, 1);
        assert!(!store.is_active(5));
    }

    #[test]
    fn test_pid_in_exactly_one_set() {
        let store = SessionStore::default();
        let _fake = spawn_fake(&store, 42);
        assert_eq!(store.active_count(), 1);
        assert_eq!(store.completed_count(), 0);

        store.finalize(42, 0);
        assert_eq!(store.active_count(), 0);
        assert_eq!(store.completed_count(), 1);
        assert!(store.active().is_empty());
        assert_eq!(store.completed()[0].pid, 42);
    }

    #[test]
    fn test_completed_eviction_is_fifo() {
        let store = SessionStore::new(100);
        let mut fakes = Vec::new();
        for pid in 1..=101 {
            fakes.push(spawn_fake(&store, pid));
            store.finalize(pid, 0);
        }

        assert_eq!(store.completed_count(), 100);
        assert!(store.completed_snapshot(1).is_none());
        assert!(matches!(store.read(1), Err(Error::SessionNotFound(1))));
        assert!(store.completed_snapshot(2).is_some());
        assert_eq!(store.completed().last().unwrap().pid, 101);
    }

    #[test]
    fn test_mark_blocked_resets_buffer() {
        let store = SessionStore::default();
        let fake = spawn_fake(&store, 3);
        fake.emit("partial");

        assert_eq!(store.mark_blocked(3).as_deref(), Some("partial"));
        assert!(store.active()[0].is_blocked);
        assert_eq!(store.read(3).unwrap(), ReadOutput::NoNewOutput);

        fake.emit(" more");
        assert_eq!(store.read(3).unwrap(), ReadOutput::NewOutput(" more".into()));
    }

    #[test]
    fn test_begin_termination_hands_out_kill_switch_once() {
        let store = SessionStore::default();
        let _fake = spawn_fake(&store, 8);

        let (first, _) = store.begin_termination(8).unwrap();
        assert!(first.is_some());
        let (second, _) = store.begin_termination(8).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_pid_reuse_drops_stale_completed() {
        let store = SessionStore::default();
        let _old = spawn_fake(&store, 77);
        store.finalize(77, 0);
        assert_eq!(store.completed_count(), 1);

        let _new = spawn_fake(&store, 77);
        assert!(store.is_active(77));
        assert_eq!(store.completed_count(), 0);
        assert_eq!(store.read(77).unwrap(), ReadOutput::NoNewOutput);
    }

    #[test]
    fn test_active_sorted_by_pid() {
        let store = SessionStore::default();
        let _a = spawn_fake(&store, 30);
        let _b = spawn_fake(&store, 10);
        let _c = spawn_fake(&store, 20);

        let pids: Vec<u32> = store.active().iter().map(|i| i.pid).collect();
        assert_eq!(pids, vec![10, 20, 30]);
        assert_eq!(store.active()[1].command, "cmd-20");
    }
}
