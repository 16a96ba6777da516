use serde::{Deserialize, Serialize};

/// Opaque username-like key, unique per participant
pub type Identity = String;
/// Opaque delivery address, only interpreted by the transport
pub type ChatHandle = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub identity: Identity,
    pub handle: ChatHandle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Idle,
    CollectingAnswers,
    ReadyToVote,
    Voting,
}

/// One anonymized line of the ballot. `author` is `None` only for the
/// admin's correct continuation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShuffledEntry {
    pub author: Option<Identity>,
    pub text: String,
}

impl ShuffledEntry {
    pub fn is_correct(&self) -> bool {
        self.author.is_none()
    }
}

/// Cumulative standings, each list ordered by ascending score
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Standings {
    pub right: Vec<(Identity, u32)>,
    pub sympathy: Vec<(Identity, u32)>,
}
