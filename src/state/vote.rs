use super::Session;
use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::BTreeMap;

impl Session {
    pub fn start_voting(&mut self) -> GameResult<()> {
        if self.phase == Phase::Voting {
            return Err(GameError::AlreadyVoting);
        }
        if self.phase != Phase::ReadyToVote {
            return Err(GameError::NotReady);
        }
        if !self.collection_complete() {
            return Err(GameError::SubmissionsIncomplete);
        }

        self.phase = Phase::Voting;
        tracing::info!("Voting started");
        Ok(())
    }

    /// Record a participant's two picks, both 1-based positions on the
    /// ballot: `right` is the guess at the genuine continuation, `sympathy`
    /// the favourite entry. Returns true once every non-admin has voted.
    pub fn cast_vote(&mut self, voter: &str, right: usize, sympathy: usize) -> GameResult<bool> {
        if self.phase != Phase::Voting {
            return Err(GameError::NotVotingPhase);
        }
        if self.is_admin(voter) {
            return Err(GameError::AdminCannotVote);
        }
        let entries = self.shuffled.as_ref().ok_or(GameError::NotVotingPhase)?;
        let len = entries.len();
        for index in [right, sympathy] {
            if index == 0 || index > len {
                return Err(GameError::OutOfRange { index, len });
            }
        }
        if self.voted.contains(voter) {
            return Err(GameError::AlreadyVoted);
        }

        let guessed = &entries[right - 1];
        let favourite = &entries[sympathy - 1];
        if favourite.author.as_deref() == Some(voter) {
            return Err(GameError::SelfSympathyVote);
        }

        let guessed_right = guessed.is_correct();
        let favourite_author = favourite.author.clone();

        *self.right_score.entry(voter.to_string()).or_insert(0) += u32::from(guessed_right);
        // Picking the genuine continuation as favourite credits nobody
        if let Some(author) = favourite_author {
            *self.sympathy_score.entry(author).or_insert(0) += 1;
        }
        self.voted.insert(voter.to_string());
        self.sympathy_score.entry(voter.to_string()).or_insert(0);

        tracing::debug!(
            voter,
            guessed_right,
            voted = self.voted.len(),
            "Vote recorded"
        );
        Ok(self.voting_complete())
    }

    /// Every non-admin participant has voted
    pub fn voting_complete(&self) -> bool {
        self.voted.len() + 1 == self.roster.len()
    }

    pub fn has_voted(&self, identity: &str) -> bool {
        self.voted.contains(identity)
    }

    /// Cumulative scores over every round played in this session
    pub fn results(&self) -> Standings {
        Standings {
            right: ranked(&self.right_score),
            sympathy: ranked(&self.sympathy_score),
        }
    }
}

/// Ascending by score, ties by identity
fn ranked(scores: &BTreeMap<Identity, u32>) -> Vec<(Identity, u32)> {
    let mut ranked: Vec<_> = scores.iter().map(|(k, v)| (k.clone(), *v)).collect();
    // BTreeMap iteration is already ordered by identity and the sort is stable
    ranked.sort_by_key(|(_, score)| *score);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::{three_player_session, voting_session};

    // voting_session() ballot: 1 = bob, 2 = carol, 3 = correct

    fn score(list: &[(Identity, u32)], who: &str) -> Option<u32> {
        list.iter().find(|(id, _)| id == who).map(|(_, s)| *s)
    }

    #[test]
    fn test_start_voting_guards() {
        let mut session = three_player_session();
        assert_eq!(session.start_voting(), Err(GameError::NotReady));

        session.set_start_fragment("alice", "the cat sat").unwrap();
        assert_eq!(session.start_voting(), Err(GameError::NotReady));

        let mut session = voting_session();
        assert_eq!(session.start_voting(), Err(GameError::AlreadyVoting));
    }

    #[test]
    fn test_start_voting_rechecks_submissions() {
        let mut session = voting_session();
        session.restart().unwrap();
        // Force a stale ReadyToVote with a short submission list
        session.phase = Phase::ReadyToVote;
        assert_eq!(session.start_voting(), Err(GameError::SubmissionsIncomplete));
    }

    #[test]
    fn test_vote_outside_voting_phase() {
        let mut session = three_player_session();
        assert_eq!(
            session.cast_vote("bob", 1, 2),
            Err(GameError::NotVotingPhase)
        );
    }

    #[test]
    fn test_admin_cannot_vote() {
        let mut session = voting_session();
        assert_eq!(
            session.cast_vote("alice", 3, 1),
            Err(GameError::AdminCannotVote)
        );
        assert!(!session.has_voted("alice"));
    }

    #[test]
    fn test_vote_index_out_of_range() {
        let mut session = voting_session();
        assert_eq!(
            session.cast_vote("bob", 0, 2),
            Err(GameError::OutOfRange { index: 0, len: 3 })
        );
        assert_eq!(
            session.cast_vote("bob", 3, 4),
            Err(GameError::OutOfRange { index: 4, len: 3 })
        );
        assert!(!session.has_voted("bob"));
    }

    #[test]
    fn test_self_sympathy_rejected_regardless_of_right_pick() {
        let mut session = voting_session();
        for right in 1..=3 {
            assert_eq!(
                session.cast_vote("bob", right, 1),
                Err(GameError::SelfSympathyVote)
            );
        }
        assert!(!session.has_voted("bob"));
        assert!(session.results().right.is_empty());
    }

    #[test]
    fn test_second_vote_rejected() {
        let mut session = voting_session();
        session.cast_vote("bob", 3, 2).unwrap();
        assert_eq!(session.cast_vote("bob", 2, 3), Err(GameError::AlreadyVoted));
    }

    #[test]
    fn test_full_round_scoring() {
        let mut session = voting_session();

        assert!(!session.cast_vote("bob", 3, 2).unwrap());
        let standings = session.results();
        assert_eq!(score(&standings.right, "bob"), Some(1));
        assert_eq!(score(&standings.sympathy, "carol"), Some(1));
        assert_eq!(score(&standings.sympathy, "bob"), Some(0));

        assert!(session.cast_vote("carol", 1, 1).unwrap());
        let standings = session.results();
        assert_eq!(score(&standings.right, "carol"), Some(0));
        assert_eq!(score(&standings.sympathy, "bob"), Some(1));
        assert!(session.voting_complete());
    }

    #[test]
    fn test_sympathy_for_correct_entry_credits_nobody() {
        let mut session = voting_session();
        session.cast_vote("bob", 1, 3).unwrap();

        let standings = session.results();
        assert_eq!(standings.sympathy, vec![("bob".to_string(), 0)]);
        assert_eq!(standings.right, vec![("bob".to_string(), 0)]);
    }

    #[test]
    fn test_scores_accumulate_across_rounds() {
        let mut session = voting_session();
        session.cast_vote("bob", 3, 2).unwrap();
        session.cast_vote("carol", 3, 1).unwrap();
        session.release_admin().unwrap();

        session.claim_admin("alice").unwrap();
        session.set_start_fragment("alice", "twinkle twinkle").unwrap();
        session.set_correct_continuation("alice", "little star").unwrap();
        session.add_submission("bob", "big bright car").unwrap();
        session.add_submission("carol", "tiny moon").unwrap();
        session.get_shuffled_entries().unwrap();
        session.start_voting().unwrap();
        session.cast_vote("bob", 3, 2).unwrap();
        session.restart().unwrap_err();
        session.cast_vote("carol", 2, 1).unwrap();

        let standings = session.results();
        assert_eq!(score(&standings.right, "bob"), Some(2));
        assert_eq!(score(&standings.right, "carol"), Some(1));
        assert_eq!(score(&standings.sympathy, "bob"), Some(2));
        assert_eq!(score(&standings.sympathy, "carol"), Some(2));
    }

    #[test]
    fn test_results_sorted_ascending() {
        let mut session = voting_session();
        session.cast_vote("bob", 3, 2).unwrap();
        session.cast_vote("carol", 1, 1).unwrap();

        let standings = session.results();
        assert_eq!(
            standings.right,
            vec![("carol".to_string(), 0), ("bob".to_string(), 1)]
        );
        assert_eq!(
            standings.sympathy,
            vec![("bob".to_string(), 1), ("carol".to_string(), 1)]
        );
    }
}
