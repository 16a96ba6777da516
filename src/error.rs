//! Rule violations reported by the session engine.
//!
//! Every variant is an expected, recoverable condition. The transport relays
//! the message to the participant who triggered it and nobody else.

use crate::types::Identity;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Wait until the current game is over")]
    InvalidPhase,

    #[error("Stop being the admin first")]
    StillAdmin,

    #[error("There is already an admin: {0}")]
    AdminAlreadySet(Identity),

    #[error("You are not taking part in the game")]
    NotParticipant,

    #[error("You are not the admin")]
    NotAdmin,

    #[error("The admin does not submit answers")]
    AdminCannotSubmit,

    #[error("Not everyone has voted yet")]
    VotingIncomplete,

    #[error("Votes have already been cast, the round has to be finished")]
    VoteInProgress,

    #[error("The game has not started")]
    NoActiveRound,

    #[error("The admin has not sent the opening lines yet")]
    MissingFragment,

    #[error("The admin has not sent the correct continuation yet")]
    MissingContinuation,

    #[error("Not everyone has sent an answer")]
    SubmissionsIncomplete,

    #[error("Voting is already in progress")]
    AlreadyVoting,

    #[error("Voting cannot start right now")]
    NotReady,

    #[error("This is not the voting phase")]
    NotVotingPhase,

    #[error("The admin cannot vote")]
    AdminCannotVote,

    #[error("Vote {index} is out of range, pick a number from 1 to {len}")]
    OutOfRange { index: usize, len: usize },

    #[error("You have already voted")]
    AlreadyVoted,

    #[error("Voting for your own answer is not nice")]
    SelfSympathyVote,
}

impl GameError {
    /// Stable machine-readable code for the wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidPhase => "INVALID_PHASE",
            GameError::StillAdmin => "STILL_ADMIN",
            GameError::AdminAlreadySet(_) => "ADMIN_ALREADY_SET",
            GameError::NotParticipant => "NOT_PARTICIPANT",
            GameError::NotAdmin => "NOT_ADMIN",
            GameError::AdminCannotSubmit => "ADMIN_CANNOT_SUBMIT",
            GameError::VotingIncomplete => "VOTING_INCOMPLETE",
            GameError::VoteInProgress => "VOTE_IN_PROGRESS",
            GameError::NoActiveRound => "NO_ACTIVE_ROUND",
            GameError::MissingFragment => "MISSING_FRAGMENT",
            GameError::MissingContinuation => "MISSING_CONTINUATION",
            GameError::SubmissionsIncomplete => "SUBMISSIONS_INCOMPLETE",
            GameError::AlreadyVoting => "ALREADY_VOTING",
            GameError::NotReady => "NOT_READY",
            GameError::NotVotingPhase => "NOT_VOTING_PHASE",
            GameError::AdminCannotVote => "ADMIN_CANNOT_VOTE",
            GameError::OutOfRange { .. } => "OUT_OF_RANGE",
            GameError::AlreadyVoted => "ALREADY_VOTED",
            GameError::SelfSympathyVote => "SELF_SYMPATHY_VOTE",
        }
    }
}
