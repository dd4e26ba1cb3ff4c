use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{GameEntity, GameStatus, GameUpdate};

/// Admin actions that move the game forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Leave the lobby and show the first question.
    Start,
    /// Leave the answer reveal of the current question.
    Advance,
    /// Leave the break screen and show the next question.
    Resume,
}

/// Reasons a transition cannot be computed from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    /// The event is not accepted from the current status.
    #[error("invalid transition: {event:?} cannot be applied while in {from}")]
    Invalid {
        /// Status of the snapshot.
        from: GameStatus,
        /// Rejected event.
        event: GameEvent,
    },
    /// The reveal is showing but the scoring pass has not completed yet.
    #[error("results of question {question_index} are not ready yet")]
    ResultsPending {
        /// Index of the question being scored.
        question_index: usize,
    },
    /// The game record has an empty question order.
    #[error("game has no questions to play")]
    NoQuestions,
}

/// Status change plus the fields written with it, as one atomic update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Status before the transition.
    pub from: GameStatus,
    /// Status after the transition.
    pub to: GameStatus,
    /// Partial update to write to the game record.
    pub update: GameUpdate,
}

/// Compute the unique next status and fields for `event` applied to `game`.
///
/// `questions_per_category` is the block size after which a break is shown.
pub fn next_transition(
    game: &GameEntity,
    event: GameEvent,
    questions_per_category: usize,
) -> Result<Transition, TransitionError> {
    let from = game.status;
    let total = game.question_order.len();

    let (to, update) = match (from, event) {
        (GameStatus::Lobby, GameEvent::Start) => {
            if total == 0 {
                return Err(TransitionError::NoQuestions);
            }
            enter_question(0)
        }
        (GameStatus::AnswerReveal, GameEvent::Advance) => {
            if !game.results_ready {
                return Err(TransitionError::ResultsPending {
                    question_index: game.current_question_index,
                });
            }

            let next = game.current_question_index + 1;
            if next >= total {
                status_only(GameStatus::GameEnd)
            } else if next > 0 && next.checked_rem(questions_per_category) == Some(0) {
                // `leaderboard` doubles as "break imminent"; the break watcher navigates.
                status_only(GameStatus::Leaderboard)
            } else {
                enter_question(next)
            }
        }
        (GameStatus::Leaderboard | GameStatus::Break, GameEvent::Resume) => {
            let next = game.current_question_index + 1;
            if next >= total {
                status_only(GameStatus::GameEnd)
            } else {
                enter_question(next)
            }
        }
        (from, event) => return Err(TransitionError::Invalid { from, event }),
    };

    Ok(Transition { from, to, update })
}

fn status_only(status: GameStatus) -> (GameStatus, GameUpdate) {
    (
        status,
        GameUpdate {
            status: Some(status),
            ..GameUpdate::default()
        },
    )
}

fn enter_question(index: usize) -> (GameStatus, GameUpdate) {
    (
        GameStatus::QuestionDisplay,
        GameUpdate {
            status: Some(GameStatus::QuestionDisplay),
            current_question_index: Some(index),
            results_ready: Some(false),
        },
    )
}

/// Fields of a snapshot that identify a position in the game flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotKey {
    /// Status of the snapshot.
    pub status: GameStatus,
    /// Question index of the snapshot.
    pub question_index: usize,
    /// Readiness flag of the snapshot.
    pub results_ready: bool,
}

impl From<&GameEntity> for SnapshotKey {
    fn from(game: &GameEntity) -> Self {
        Self {
            status: game.status,
            question_index: game.current_question_index,
            results_ready: game.results_ready,
        }
    }
}

/// Errors that can occur when planning a transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A transition is already being written.
    #[error("a transition is already in flight")]
    AlreadyPending,
    /// The previous transition was written but the subscription has not delivered it yet.
    #[error("previous transition not yet observed")]
    AwaitingSync,
    /// The snapshot does not accept the event.
    #[error(transparent)]
    Rejected(#[from] TransitionError),
}

/// Errors that can occur when completing or aborting a plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettleError {
    /// No transition is pending.
    #[error("no transition is pending")]
    NoPending,
    /// Plan ID does not match the pending plan.
    #[error("plan {got} does not match pending plan {expected}")]
    IdMismatch {
        /// Pending plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned transition.
pub type PlanId = Uuid;

/// A transition validated against a snapshot but not yet written.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Event that triggered this plan.
    pub event: GameEvent,
    /// Computed transition.
    pub transition: Transition,
    /// Snapshot position the plan was computed from.
    pub origin: SnapshotKey,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// In-flight guard around [`next_transition`]: at most one transition is
/// written at a time, and a written transition must be observed before the
/// next one is planned.
#[derive(Debug, Clone)]
pub struct ProgressionMachine {
    questions_per_category: usize,
    pending: Option<Plan>,
    awaiting: Option<SnapshotKey>,
}

impl ProgressionMachine {
    /// Create a machine using the given category block size.
    pub fn new(questions_per_category: usize) -> Self {
        Self {
            questions_per_category,
            pending: None,
            awaiting: None,
        }
    }

    /// Plan currently being written, if any.
    pub fn pending(&self) -> Option<&Plan> {
        self.pending.as_ref()
    }

    /// Record a delivered snapshot; releases the sync guard once it moved on.
    pub fn observe(&mut self, snapshot: &GameEntity) {
        if self.awaiting != Some(SnapshotKey::from(snapshot)) {
            self.awaiting = None;
        }
    }

    /// Validate `event` against `snapshot` and reserve the in-flight slot.
    pub fn plan(&mut self, event: GameEvent, snapshot: &GameEntity) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let origin = SnapshotKey::from(snapshot);
        if self.awaiting == Some(origin) {
            return Err(PlanError::AwaitingSync);
        }

        let transition = next_transition(snapshot, event, self.questions_per_category)?;
        let plan = Plan {
            id: Uuid::new_v4(),
            event,
            transition,
            origin,
            pending_since: Instant::now(),
        };
        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Mark the pending plan as written.
    pub fn complete(&mut self, plan_id: PlanId) -> Result<Plan, SettleError> {
        let plan = self.take_pending(plan_id)?;
        self.awaiting = Some(plan.origin);
        Ok(plan)
    }

    /// Drop the pending plan after a failed write so the action can be retried.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), SettleError> {
        self.take_pending(plan_id).map(|_| ())
    }

    fn take_pending(&mut self, plan_id: PlanId) -> Result<Plan, SettleError> {
        let plan = self.pending.take().ok_or(SettleError::NoPending)?;

        if plan.id != plan_id {
            let expected = plan.id;
            self.pending = Some(plan);
            return Err(SettleError::IdMismatch {
                expected,
                got: plan_id,
            });
        }

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    const PER_CATEGORY: usize = 8;

    fn game(status: GameStatus, index: usize, total: usize, results_ready: bool) -> GameEntity {
        GameEntity {
            status,
            current_question_index: index,
            question_order: (0..total).map(|i| format!("q{i}")).collect(),
            questions: IndexMap::new(),
            results_ready,
        }
    }

    fn advance(index: usize, total: usize) -> Transition {
        next_transition(
            &game(GameStatus::AnswerReveal, index, total, true),
            GameEvent::Advance,
            PER_CATEGORY,
        )
        .unwrap()
    }

    #[test]
    fn advance_mid_category_enters_next_question() {
        let transition = advance(2, 16);
        assert_eq!(transition.to, GameStatus::QuestionDisplay);
        assert_eq!(
            transition.update,
            GameUpdate {
                status: Some(GameStatus::QuestionDisplay),
                current_question_index: Some(3),
                results_ready: Some(false),
            }
        );
    }

    #[test]
    fn advance_at_category_boundary_announces_break() {
        let transition = advance(7, 16);
        assert_eq!(transition.to, GameStatus::Leaderboard);
        assert_eq!(transition.update.current_question_index, None);
        assert_eq!(transition.update.results_ready, None);
    }

    #[test]
    fn advance_on_last_question_ends_game() {
        let transition = advance(15, 16);
        assert_eq!(transition.to, GameStatus::GameEnd);
        assert_eq!(
            transition.update,
            GameUpdate {
                status: Some(GameStatus::GameEnd),
                ..GameUpdate::default()
            }
        );
    }

    #[test]
    fn game_end_takes_precedence_over_break() {
        assert_eq!(advance(7, 8).to, GameStatus::GameEnd);
    }

    #[test]
    fn advance_requires_results_ready() {
        let err = next_transition(
            &game(GameStatus::AnswerReveal, 3, 16, false),
            GameEvent::Advance,
            PER_CATEGORY,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::ResultsPending { question_index: 3 });
    }

    #[test]
    fn advance_outside_reveal_is_rejected() {
        let err = next_transition(
            &game(GameStatus::QuestionDisplay, 3, 16, true),
            GameEvent::Advance,
            PER_CATEGORY,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Invalid {
                from: GameStatus::QuestionDisplay,
                event: GameEvent::Advance,
            }
        );
    }

    #[test]
    fn start_and_resume_enter_questions() {
        let start = next_transition(
            &game(GameStatus::Lobby, 0, 16, false),
            GameEvent::Start,
            PER_CATEGORY,
        )
        .unwrap();
        assert_eq!(start.update.current_question_index, Some(0));

        let resume = next_transition(
            &game(GameStatus::Leaderboard, 7, 16, true),
            GameEvent::Resume,
            PER_CATEGORY,
        )
        .unwrap();
        assert_eq!(resume.to, GameStatus::QuestionDisplay);
        assert_eq!(resume.update.current_question_index, Some(8));
        assert_eq!(resume.update.results_ready, Some(false));

        let empty = next_transition(
            &game(GameStatus::Lobby, 0, 0, false),
            GameEvent::Start,
            PER_CATEGORY,
        );
        assert_eq!(empty.unwrap_err(), TransitionError::NoQuestions);
    }

    #[test]
    fn second_plan_while_pending_is_refused() {
        let mut machine = ProgressionMachine::new(PER_CATEGORY);
        let snapshot = game(GameStatus::AnswerReveal, 2, 16, true);

        let plan = machine.plan(GameEvent::Advance, &snapshot).unwrap();
        assert_eq!(
            machine.plan(GameEvent::Advance, &snapshot).unwrap_err(),
            PlanError::AlreadyPending
        );

        machine.complete(plan.id).unwrap();
        assert!(machine.pending().is_none());
    }

    #[test]
    fn completed_plan_blocks_until_snapshot_moves() {
        let mut machine = ProgressionMachine::new(PER_CATEGORY);
        let before = game(GameStatus::AnswerReveal, 2, 16, true);

        let plan = machine.plan(GameEvent::Advance, &before).unwrap();
        machine.complete(plan.id).unwrap();

        // A stale delivery of the pre-write snapshot must not trigger a second advance.
        machine.observe(&before);
        assert_eq!(
            machine.plan(GameEvent::Advance, &before).unwrap_err(),
            PlanError::AwaitingSync
        );

        let after = before.clone().with_update(&plan.transition.update);
        machine.observe(&after);
        let err = machine.plan(GameEvent::Advance, &after).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Rejected(TransitionError::Invalid { .. })
        ));
    }

    #[test]
    fn abort_releases_guard_for_retry() {
        let mut machine = ProgressionMachine::new(PER_CATEGORY);
        let snapshot = game(GameStatus::AnswerReveal, 2, 16, true);

        let plan = machine.plan(GameEvent::Advance, &snapshot).unwrap();
        assert!(matches!(
            machine.abort(Uuid::new_v4()),
            Err(SettleError::IdMismatch { .. })
        ));
        machine.abort(plan.id).unwrap();

        assert!(machine.plan(GameEvent::Advance, &snapshot).is_ok());
    }
}
