use super::Session;
use crate::error::{GameError, GameResult};
use crate::types::*;

impl Session {
    /// Add a participant, or update the handle of one already present
    pub fn join(&mut self, identity: Identity, handle: ChatHandle) -> GameResult<()> {
        if self.phase != Phase::Idle {
            return Err(GameError::InvalidPhase);
        }

        match self.roster.iter_mut().find(|p| p.identity == identity) {
            Some(existing) => existing.handle = handle,
            None => {
                tracing::info!(%identity, "Participant joined");
                self.roster.push(Participant { identity, handle });
            }
        }
        Ok(())
    }

    /// Remove a participant. Leaving without being a member is a no-op.
    pub fn leave(&mut self, identity: &str) -> GameResult<()> {
        if self.is_admin(identity) {
            return Err(GameError::StillAdmin);
        }
        if self.phase != Phase::Idle {
            return Err(GameError::InvalidPhase);
        }

        let before = self.roster.len();
        self.roster.retain(|p| p.identity != identity);
        if self.roster.len() != before {
            tracing::info!(identity, "Participant left");
        }
        Ok(())
    }

    /// Point a current member at a new delivery handle. Membership does not
    /// change, so this is allowed in every phase. Returns true if the handle
    /// was updated.
    pub fn refresh_handle(&mut self, identity: &str, handle: &str) -> bool {
        match self.roster.iter_mut().find(|p| p.identity == identity) {
            Some(existing) if existing.handle != handle => {
                tracing::debug!(identity, handle, "Delivery handle refreshed");
                existing.handle = handle.to_string();
                true
            }
            _ => false,
        }
    }

    pub fn claim_admin(&mut self, identity: &str) -> GameResult<()> {
        if let Some(admin) = &self.admin {
            return Err(GameError::AdminAlreadySet(admin.clone()));
        }
        if !self.is_participant(identity) {
            return Err(GameError::NotParticipant);
        }

        tracing::info!(identity, "Admin claimed");
        self.admin = Some(identity.to_string());
        Ok(())
    }

    /// Step down as admin.
    ///
    /// In `Idle` this always succeeds. In `Voting` it also closes the round,
    /// but only once every non-admin participant has voted. Scores and roster
    /// survive.
    pub fn release_admin(&mut self) -> GameResult<()> {
        match self.phase {
            Phase::Idle => {
                self.admin = None;
                Ok(())
            }
            Phase::Voting => {
                if !self.voting_complete() {
                    return Err(GameError::VotingIncomplete);
                }
                self.admin = None;
                self.reset_round();
                let standings = self.results();
                tracing::info!(
                    right = ?standings.right,
                    sympathy = ?standings.sympathy,
                    "Round finished"
                );
                Ok(())
            }
            _ => Err(GameError::InvalidPhase),
        }
    }

    pub fn admin(&self) -> Option<&Identity> {
        self.admin.as_ref()
    }

    pub fn is_admin(&self, identity: &str) -> bool {
        self.admin.as_deref() == Some(identity)
    }

    pub fn is_participant(&self, identity: &str) -> bool {
        self.roster.iter().any(|p| p.identity == identity)
    }

    /// Delivery handle of the current admin, if any
    pub fn admin_handle(&self) -> Option<&ChatHandle> {
        let admin = self.admin.as_deref()?;
        self.handle_of(admin)
    }

    pub fn handle_of(&self, identity: &str) -> Option<&ChatHandle> {
        self.roster
            .iter()
            .find(|p| p.identity == identity)
            .map(|p| &p.handle)
    }

    /// All participants in join order
    pub fn participants(&self) -> &[Participant] {
        &self.roster
    }

    /// Everyone except the admin, in join order
    pub fn others(&self) -> Vec<&Participant> {
        self.roster
            .iter()
            .filter(|p| !self.is_admin(&p.identity))
            .collect()
    }
}
