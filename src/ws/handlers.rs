//! Message dispatch
//!
//! Turns one inbound [`ClientMessage`] from a resolved participant into the
//! list of outbound deliveries it causes. The session lock is held for the
//! whole message, including the follow-up calls the transport makes on the
//! engine's behalf (answer preview, closing a finished round).

use crate::error::GameError;
use crate::protocol::{BallotEntry, ClientMessage, Delivery, ServerMessage};
use crate::state::{AppState, Session};
use crate::types::{Participant, Phase};
use std::sync::Arc;

/// Reply with an error and return early unless the sender is in the roster
macro_rules! check_participant {
    ($session:expr, $sender:expr) => {
        if !$session.is_participant(&$sender.identity) {
            return vec![reply($sender, GameError::NotParticipant.into())];
        }
    };
}

/// Reply with an error and return early unless the sender is the admin
macro_rules! check_admin {
    ($session:expr, $sender:expr) => {
        check_participant!($session, $sender);
        if !$session.is_admin(&$sender.identity) {
            return vec![reply($sender, GameError::NotAdmin.into())];
        }
    };
}

/// Handle a client message and return everything that has to be sent
pub async fn handle_message(
    msg: ClientMessage,
    sender: &Participant,
    state: &Arc<AppState>,
) -> Vec<Delivery> {
    tracing::debug!(identity = %sender.identity, ?msg, "Handling message");
    let mut session = state.session.lock().await;
    // A reconnected member gets future deliveries on the new connection
    session.refresh_handle(&sender.identity, &sender.handle);
    dispatch(&mut session, msg, sender)
}

pub fn dispatch(session: &mut Session, msg: ClientMessage, sender: &Participant) -> Vec<Delivery> {
    match msg {
        ClientMessage::Join => respond(
            sender,
            session
                .join(sender.identity.clone(), sender.handle.clone())
                .map(|_| ServerMessage::Joined),
        ),

        ClientMessage::Leave => respond(
            sender,
            session.leave(&sender.identity).map(|_| ServerMessage::Left),
        ),

        ClientMessage::Results => vec![reply(
            sender,
            ServerMessage::Results {
                standings: session.results(),
            },
        )],

        ClientMessage::ClaimAdmin => {
            check_participant!(session, sender);
            respond(
                sender,
                session
                    .claim_admin(&sender.identity)
                    .map(|_| ServerMessage::AdminClaimed),
            )
        }

        ClientMessage::WhoIsAdmin => {
            check_participant!(session, sender);
            vec![reply(
                sender,
                ServerMessage::CurrentAdmin {
                    admin: session.admin().cloned(),
                },
            )]
        }

        ClientMessage::ReleaseAdmin => {
            check_admin!(session, sender);
            respond(
                sender,
                session.release_admin().map(|_| ServerMessage::AdminReleased),
            )
        }

        ClientMessage::Restart => {
            check_admin!(session, sender);
            respond(
                sender,
                session.restart().map(|_| ServerMessage::RoundRestarted),
            )
        }

        ClientMessage::StartVoting => {
            check_admin!(session, sender);
            handle_start_voting(session, sender)
        }

        ClientMessage::Text { text } => {
            check_participant!(session, sender);
            if session.is_admin(&sender.identity) {
                handle_admin_text(session, sender, text)
            } else {
                handle_player_text(session, sender, text)
            }
        }

        ClientMessage::Vote { right, sympathy } => {
            check_participant!(session, sender);
            handle_vote(session, sender, right, sympathy)
        }
    }
}

fn handle_admin_text(session: &mut Session, sender: &Participant, text: String) -> Vec<Delivery> {
    match session.phase() {
        Phase::Idle => {
            if let Err(e) = session.set_start_fragment(&sender.identity, &text) {
                return vec![reply(sender, e.into())];
            }
            let mut out: Vec<Delivery> = session
                .others()
                .into_iter()
                .map(|p| {
                    Delivery::new(
                        p.handle.clone(),
                        ServerMessage::FragmentPrompt {
                            fragment: text.clone(),
                        },
                    )
                })
                .collect();
            out.push(reply(sender, ServerMessage::FragmentSent));
            out
        }
        Phase::CollectingAnswers => {
            if let Err(e) = session.set_correct_continuation(&sender.identity, &text) {
                return vec![reply(sender, e.into())];
            }
            let mut out = vec![reply(sender, ServerMessage::ContinuationAccepted)];
            // Everyone may have answered before the admin did
            if session.collection_complete() {
                out.extend(preview_for_admin(session));
            }
            out
        }
        _ => vec![text_not_accepted(sender)],
    }
}

fn handle_player_text(session: &mut Session, sender: &Participant, text: String) -> Vec<Delivery> {
    match session.phase() {
        Phase::CollectingAnswers => match session.add_submission(&sender.identity, &text) {
            Ok(complete) => {
                let mut out = Vec::new();
                if complete {
                    out.extend(preview_for_admin(session));
                }
                out.push(reply(sender, ServerMessage::AnswerAccepted));
                out
            }
            Err(e) => vec![reply(sender, e.into())],
        },
        Phase::Voting => match parse_vote(&text) {
            Some((right, sympathy)) => handle_vote(session, sender, right, sympathy),
            None => vec![reply(
                sender,
                ServerMessage::error(
                    "BAD_VOTE_FORMAT",
                    "Send two numbers separated by a space",
                ),
            )],
        },
        _ => vec![text_not_accepted(sender)],
    }
}

fn handle_start_voting(session: &mut Session, sender: &Participant) -> Vec<Delivery> {
    if let Err(e) = session.start_voting() {
        return vec![reply(sender, e.into())];
    }
    let entries = match session.get_shuffled_entries() {
        Ok(entries) => entries,
        Err(e) => return vec![reply(sender, e.into())],
    };

    let ballot: Vec<BallotEntry> = entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| BallotEntry {
            number: i + 1,
            text: entry.text,
        })
        .collect();

    let mut out: Vec<Delivery> = session
        .others()
        .into_iter()
        .map(|p| {
            Delivery::new(
                p.handle.clone(),
                ServerMessage::Ballot {
                    entries: ballot.clone(),
                },
            )
        })
        .collect();
    out.push(reply(sender, ServerMessage::VotingStarted));
    out
}

fn handle_vote(
    session: &mut Session,
    sender: &Participant,
    right: usize,
    sympathy: usize,
) -> Vec<Delivery> {
    match session.cast_vote(&sender.identity, right, sympathy) {
        Ok(false) => vec![reply(sender, ServerMessage::VoteAccepted)],
        Ok(true) => {
            let mut out = finish_round(session);
            out.push(reply(sender, ServerMessage::VoteAccepted));
            out
        }
        Err(e) => vec![reply(sender, e.into())],
    }
}

/// Last vote is in: standings go to the admin, then the admin role is
/// released, which resets the round.
fn finish_round(session: &mut Session) -> Vec<Delivery> {
    let mut out = Vec::new();
    if let Some(handle) = session.admin_handle() {
        out.push(Delivery::new(
            handle.clone(),
            ServerMessage::Results {
                standings: session.results(),
            },
        ));
    }

    match session.release_admin() {
        Ok(()) => out.extend(
            session
                .participants()
                .iter()
                .map(|p| Delivery::new(p.handle.clone(), ServerMessage::RoundFinished)),
        ),
        Err(e) => tracing::error!("Failed to close completed round: {}", e),
    }
    out
}

/// Admin view of the ballot, or the reason it cannot be built yet
fn preview_for_admin(session: &mut Session) -> Vec<Delivery> {
    let msg = match session.get_shuffled_entries() {
        Ok(entries) => ServerMessage::AnswersPreview { entries },
        Err(e) => e.into(),
    };
    match session.admin_handle() {
        Some(handle) => vec![Delivery::new(handle.clone(), msg)],
        None => Vec::new(),
    }
}

/// Parse "<right> <sympathy>" vote text
pub fn parse_vote(text: &str) -> Option<(usize, usize)> {
    let mut parts = text.split_whitespace();
    let right = parts.next()?.parse().ok()?;
    let sympathy = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((right, sympathy))
}

fn text_not_accepted(sender: &Participant) -> Delivery {
    reply(
        sender,
        ServerMessage::error("TEXT_NOT_ACCEPTED", "Poems cannot be sent right now"),
    )
}

fn reply(sender: &Participant, msg: ServerMessage) -> Delivery {
    Delivery::new(sender.handle.clone(), msg)
}

fn respond(sender: &Participant, result: Result<ServerMessage, GameError>) -> Vec<Delivery> {
    match result {
        Ok(msg) => vec![reply(sender, msg)],
        Err(e) => {
            tracing::debug!(identity = %sender.identity, "Rejected: {}", e);
            vec![reply(sender, e.into())]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::KeepOrder;

    fn participant(name: &str) -> Participant {
        Participant {
            identity: name.to_string(),
            handle: format!("chat-{}", name),
        }
    }

    fn state() -> Arc<AppState> {
        Arc::new(AppState::with_session(Session::with_shuffler(Box::new(
            KeepOrder,
        ))))
    }

    async fn send(state: &Arc<AppState>, who: &Participant, msg: ClientMessage) -> Vec<Delivery> {
        handle_message(msg, who, state).await
    }

    fn text(t: &str) -> ClientMessage {
        ClientMessage::Text {
            text: t.to_string(),
        }
    }

    fn error_code(deliveries: &[Delivery]) -> Option<&str> {
        deliveries.iter().find_map(|d| match &d.msg {
            ServerMessage::Error { code, .. } => Some(code.as_str()),
            _ => None,
        })
    }

    #[test]
    fn test_parse_vote() {
        assert_eq!(parse_vote("2 3"), Some((2, 3)));
        assert_eq!(parse_vote("  1\t2 "), Some((1, 2)));
        assert_eq!(parse_vote("2"), None);
        assert_eq!(parse_vote("1 2 3"), None);
        assert_eq!(parse_vote("one two"), None);
        assert_eq!(parse_vote("-1 2"), None);
    }

    #[tokio::test]
    async fn test_non_member_cannot_claim_admin() {
        let state = state();
        let out = send(&state, &participant("ghost"), ClientMessage::ClaimAdmin).await;
        assert_eq!(error_code(&out), Some("NOT_PARTICIPANT"));
    }

    #[tokio::test]
    async fn test_admin_only_commands() {
        let state = state();
        let bob = participant("bob");
        send(&state, &bob, ClientMessage::Join).await;

        for msg in [
            ClientMessage::StartVoting,
            ClientMessage::Restart,
            ClientMessage::ReleaseAdmin,
        ] {
            let out = send(&state, &bob, msg).await;
            assert_eq!(error_code(&out), Some("NOT_ADMIN"));
        }
    }

    #[tokio::test]
    async fn test_who_is_admin_reports_admin() {
        let state = state();
        let alice = participant("alice");
        let bob = participant("bob");
        send(&state, &alice, ClientMessage::Join).await;
        send(&state, &bob, ClientMessage::Join).await;
        send(&state, &alice, ClientMessage::ClaimAdmin).await;

        let out = send(&state, &bob, ClientMessage::WhoIsAdmin).await;
        assert_eq!(
            out,
            vec![Delivery::new(
                "chat-bob",
                ServerMessage::CurrentAdmin {
                    admin: Some("alice".to_string())
                }
            )]
        );
    }

    #[tokio::test]
    async fn test_fragment_goes_to_everyone_but_admin() {
        let state = state();
        let alice = participant("alice");
        for p in ["alice", "bob", "carol"] {
            send(&state, &participant(p), ClientMessage::Join).await;
        }
        send(&state, &alice, ClientMessage::ClaimAdmin).await;

        let out = send(&state, &alice, text("Roses are red")).await;

        let prompted: Vec<_> = out
            .iter()
            .filter(|d| matches!(d.msg, ServerMessage::FragmentPrompt { .. }))
            .map(|d| d.to.as_str())
            .collect();
        assert_eq!(prompted, vec!["chat-bob", "chat-carol"]);
        assert!(out.contains(&Delivery::new("chat-alice", ServerMessage::FragmentSent)));
    }

    #[tokio::test]
    async fn test_late_continuation_triggers_preview() {
        let state = state();
        let alice = participant("alice");
        let bob = participant("bob");
        send(&state, &alice, ClientMessage::Join).await;
        send(&state, &bob, ClientMessage::Join).await;
        send(&state, &alice, ClientMessage::ClaimAdmin).await;
        send(&state, &alice, text("the cat sat")).await;

        // Bob answers before the admin sent the correct ending
        let out = send(&state, &bob, text("in the hat")).await;
        assert_eq!(error_code(&out), Some("MISSING_CONTINUATION"));
        assert!(out.contains(&Delivery::new("chat-bob", ServerMessage::AnswerAccepted)));

        let out = send(&state, &alice, text("on the mat")).await;
        assert!(out.iter().any(|d| d.to == "chat-alice"
            && matches!(&d.msg, ServerMessage::AnswersPreview { entries } if entries.len() == 2)));
    }

    #[tokio::test]
    async fn test_reconnect_mid_round_receives_ballot() {
        let state = state();
        let alice = participant("alice");
        let bob = participant("bob");
        send(&state, &alice, ClientMessage::Join).await;
        send(&state, &bob, ClientMessage::Join).await;
        send(&state, &alice, ClientMessage::ClaimAdmin).await;
        send(&state, &alice, text("the cat sat")).await;
        send(&state, &alice, text("on the mat")).await;

        // Bob comes back on a new connection while the round is running
        let bob_again = Participant {
            identity: "bob".to_string(),
            handle: "chat-bob-2".to_string(),
        };
        let out = send(&state, &bob_again, text("in the hat")).await;
        assert!(out.contains(&Delivery::new("chat-bob-2", ServerMessage::AnswerAccepted)));

        let out = send(&state, &alice, ClientMessage::StartVoting).await;
        let ballot_to: Vec<_> = out
            .iter()
            .filter(|d| matches!(d.msg, ServerMessage::Ballot { .. }))
            .map(|d| d.to.as_str())
            .collect();
        assert_eq!(ballot_to, vec!["chat-bob-2"]);
    }

    #[tokio::test]
    async fn test_text_in_wrong_phase() {
        let state = state();
        let bob = participant("bob");
        send(&state, &bob, ClientMessage::Join).await;

        let out = send(&state, &bob, text("hello")).await;
        assert_eq!(error_code(&out), Some("TEXT_NOT_ACCEPTED"));
    }

    #[tokio::test]
    async fn test_bad_vote_text_never_reaches_engine() {
        let state = state();
        let alice = participant("alice");
        let bob = participant("bob");
        send(&state, &alice, ClientMessage::Join).await;
        send(&state, &bob, ClientMessage::Join).await;
        send(&state, &alice, ClientMessage::ClaimAdmin).await;
        send(&state, &alice, text("the cat sat")).await;
        send(&state, &alice, text("on the mat")).await;
        send(&state, &bob, text("in the hat")).await;
        send(&state, &alice, ClientMessage::StartVoting).await;

        let out = send(&state, &bob, text("first please")).await;
        assert_eq!(error_code(&out), Some("BAD_VOTE_FORMAT"));
        assert!(!state.session.lock().await.has_voted("bob"));
    }
}
