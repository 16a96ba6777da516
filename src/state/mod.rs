mod roster;
mod round;
mod shuffle;
mod vote;

pub use shuffle::{SeededShuffler, Shuffler, ThreadShuffler};

use crate::protocol::{Delivery, ServerMessage};
use crate::types::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

/// The one game session of the process.
///
/// Operations take `&mut self` and do no locking of their own. Callers that
/// dispatch concurrently must serialize access (see [`AppState`]), otherwise
/// the `size + 1 == roster size` barrier checks can race.
pub struct Session {
    phase: Phase,
    admin: Option<Identity>,
    /// Kept in join order for display
    roster: Vec<Participant>,
    start_fragment: Option<String>,
    correct_continuation: Option<String>,
    submissions: BTreeMap<Identity, String>,
    /// Computed once per round, then read-only until the round resets
    shuffled: Option<Vec<ShuffledEntry>>,
    // Scores live as long as the session and survive round resets
    right_score: BTreeMap<Identity, u32>,
    sympathy_score: BTreeMap<Identity, u32>,
    voted: HashSet<Identity>,
    shuffler: Box<dyn Shuffler + Send>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_shuffler(Box::new(ThreadShuffler))
    }

    pub fn with_shuffler(shuffler: Box<dyn Shuffler + Send>) -> Self {
        Self {
            phase: Phase::Idle,
            admin: None,
            roster: Vec::new(),
            start_fragment: None,
            correct_continuation: None,
            submissions: BTreeMap::new(),
            shuffled: None,
            right_score: BTreeMap::new(),
            sympathy_score: BTreeMap::new(),
            voted: HashSet::new(),
            shuffler,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Clear everything that belongs to a single round. Roster, admin and
    /// scores are left alone.
    fn reset_round(&mut self) {
        self.phase = Phase::Idle;
        self.start_fragment = None;
        self.correct_continuation = None;
        self.submissions.clear();
        self.shuffled = None;
        self.voted.clear();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Trimmed, case-folded form used for every piece of submitted text
pub(crate) fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Single mutual-exclusion boundary around the session
    pub session: Arc<Mutex<Session>>,
    /// Live connections by chat handle. Each has its own unbounded queue, so
    /// a slow client delays only itself and never loses messages.
    pub connections: Arc<RwLock<HashMap<ChatHandle, mpsc::UnboundedSender<ServerMessage>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_session(Session::new())
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            connections: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a connection and get the queue of messages addressed to it
    pub async fn connect(&self, handle: &str) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections.write().await.insert(handle.to_string(), tx);
        rx
    }

    pub async fn disconnect(&self, handle: &str) {
        self.connections.write().await.remove(handle);
    }

    /// Queue a message for its handle. Returns false if nobody is connected
    /// under that handle; the message is dropped and logged.
    pub async fn deliver(&self, delivery: Delivery) -> bool {
        let connections = self.connections.read().await;
        let sent = connections
            .get(&delivery.to)
            .map(|tx| tx.send(delivery.msg.clone()).is_ok())
            .unwrap_or(false);
        if !sent {
            tracing::warn!(handle = %delivery.to, "No live connection, message dropped");
        }
        sent
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
