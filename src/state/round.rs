use super::{normalize, Session};
use crate::error::{GameError, GameResult};
use crate::types::*;

impl Session {
    /// Admin opens a round with the first lines of a poem
    pub fn set_start_fragment(&mut self, actor: &str, text: &str) -> GameResult<()> {
        self.require_admin(actor)?;
        if self.phase != Phase::Idle {
            return Err(GameError::InvalidPhase);
        }

        self.start_fragment = Some(normalize(text));
        self.phase = Phase::CollectingAnswers;
        tracing::info!(admin = actor, "Round started, collecting answers");
        Ok(())
    }

    /// Admin stores the genuine ending. Does not change the phase.
    pub fn set_correct_continuation(&mut self, actor: &str, text: &str) -> GameResult<()> {
        self.require_admin(actor)?;
        if self.phase != Phase::CollectingAnswers {
            return Err(GameError::InvalidPhase);
        }

        self.correct_continuation = Some(normalize(text));
        tracing::debug!("Correct continuation stored");
        Ok(())
    }

    /// Store a participant's continuation (last write wins).
    /// Returns true when this completes collection.
    pub fn add_submission(&mut self, actor: &str, text: &str) -> GameResult<bool> {
        if self.phase != Phase::CollectingAnswers {
            return Err(GameError::InvalidPhase);
        }
        if !self.is_participant(actor) {
            return Err(GameError::NotParticipant);
        }
        if self.is_admin(actor) {
            return Err(GameError::AdminCannotSubmit);
        }

        self.submissions.insert(actor.to_string(), normalize(text));
        tracing::debug!(
            participant = actor,
            submitted = self.submissions.len(),
            expected = self.roster.len().saturating_sub(1),
            "Submission stored"
        );
        Ok(self.collection_complete())
    }

    /// Abandon the current round. Only allowed before anyone has voted;
    /// admin and roster stay as they are.
    pub fn restart(&mut self) -> GameResult<()> {
        if !self.voted.is_empty() {
            return Err(GameError::VoteInProgress);
        }

        self.reset_round();
        tracing::info!("Round restarted");
        Ok(())
    }

    /// Every non-admin participant has submitted
    pub fn collection_complete(&self) -> bool {
        self.submissions.len() + 1 == self.roster.len()
    }

    pub fn has_submitted(&self, identity: &str) -> bool {
        self.submissions.contains_key(identity)
    }

    pub fn start_fragment(&self) -> Option<&str> {
        self.start_fragment.as_deref()
    }

    fn require_admin(&self, actor: &str) -> GameResult<()> {
        if self.is_admin(actor) {
            Ok(())
        } else {
            Err(GameError::NotAdmin)
        }
    }
}
