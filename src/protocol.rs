use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    Join,
    Leave,
    ClaimAdmin,
    ReleaseAdmin,
    Restart,
    WhoIsAdmin,
    /// Free text, interpreted by sender role and current phase
    Text {
        text: String,
    },
    StartVoting,
    Vote {
        right: usize,
        sympathy: usize,
    },
    Results,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        identity: Identity,
        phase: Phase,
        admin: Option<Identity>,
        server_now: String,
    },
    Joined,
    Left,
    AdminClaimed,
    AdminReleased,
    RoundRestarted,
    CurrentAdmin {
        admin: Option<Identity>,
    },
    /// Sent to the others when the admin opens a round
    FragmentPrompt {
        fragment: String,
    },
    /// Confirms the fragment went out to everyone else
    FragmentSent,
    ContinuationAccepted,
    AnswerAccepted,
    /// Admin-only view of the ballot, authors included (`None` = correct)
    AnswersPreview {
        entries: Vec<ShuffledEntry>,
    },
    /// Anonymous numbered ballot for the voters
    Ballot {
        entries: Vec<BallotEntry>,
    },
    VotingStarted,
    VoteAccepted,
    Results {
        standings: Standings,
    },
    /// Broadcast once the admin role is freed after a completed round
    RoundFinished,
    Error {
        code: String,
        msg: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BallotEntry {
    /// 1-based, as used in votes
    pub number: usize,
    pub text: String,
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<crate::error::GameError> for ServerMessage {
    fn from(e: crate::error::GameError) -> Self {
        ServerMessage::error(e.code(), e.to_string())
    }
}

/// An outbound message and the chat handle it is addressed to
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub to: ChatHandle,
    pub msg: ServerMessage,
}

impl Delivery {
    pub fn new(to: impl Into<ChatHandle>, msg: ServerMessage) -> Self {
        Self { to: to.into(), msg }
    }
}
