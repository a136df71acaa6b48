use crate::{Action, Match, Move, Position, Side};

/// Reconciles server-reported positions with the locally kept match log.
///
/// The tracker is the single writer of its [`Match`]. Each incoming
/// position is diffed against the derived current position; if the
/// difference corresponds to exactly one action the action is appended,
/// otherwise a [`Action::Setup`] snapshot records the state verbatim.
#[derive(Debug)]
pub struct MatchTracker {
    match_log: Match,
    resumption: bool,
}

impl MatchTracker {
    pub fn new(player1: &str, player2: &str, length: u16, resumption: bool) -> Self {
        Self {
            match_log: Match::new(player1, player2, length, length > 0),
            resumption,
        }
    }

    pub fn match_log(&self) -> &Match {
        &self.match_log
    }

    /// Surrender the match log, e.g. for archiving.
    pub fn into_match(self) -> Match {
        self.match_log
    }

    /// Fold one server-reported position into the log. Returns the match
    /// winner once the match is decided.
    pub fn update(&mut self, new_position: &Position) -> Option<Side> {
        let current = self.match_log.current_position();

        if self.resumption {
            // History is unknown; snapshot and continue from here.
            self.resumption = false;
            if !new_position.equals_board(&current) {
                self.match_log
                    .append(Action::Setup(Box::new(new_position.clone())));
            }
            return self.match_log.winner();
        }

        if new_position.equals_board(&current) {
            return self.match_log.winner();
        }

        match self.infer_action(&current, new_position) {
            Some(action) => self.match_log.append(action),
            None => {
                tracing::debug!(
                    players = ?self.match_log.players,
                    "position not reachable by one action, snapshotting"
                );
                self.match_log
                    .append(Action::Setup(Box::new(new_position.clone())));
            }
        }

        if new_position.score != 0 || new_position.scores != current.scores {
            self.match_log.start_game();
        }

        self.match_log.winner()
    }

    /// Append an action produced locally (a validated own move, a cube
    /// or resignation decision).
    pub fn record(&mut self, action: Action) -> Option<Side> {
        self.match_log.append(action);
        if self.match_log.current_position().score != 0 {
            self.match_log.start_game();
        }
        self.match_log.winner()
    }

    fn infer_action(&self, current: &Position, new: &Position) -> Option<Action> {
        // A fresh roll: checkers unchanged, dice appear.
        if current.dice == [0, 0]
            && new.dice != [0, 0]
            && current.equals_checkers(new)
            && new.resigned == 0
        {
            let side = new.turn?;
            return Some(Action::Roll(
                side,
                new.dice[0].unsigned_abs(),
                new.dice[1].unsigned_abs(),
            ));
        }

        // A move: dice were up, checkers changed.
        if current.dice != [0, 0] && !current.equals_checkers(new) {
            let side = current.turn?;
            let m = current.check_move(new, side);
            if m.is_legal() {
                return Some(Action::Move(side, m));
            }
            // The server reported a game win while we still held a roll:
            // infer the final move by zeroing the winner's checkers. The
            // reconstruction is lossy; the snapshot keeps the log sound.
            if new.score != 0 {
                let winner = Side::of_occupancy(new.score.signum() as i8)?;
                let mut snapshot = new.clone();
                for p in snapshot.points.iter_mut() {
                    if Side::of_occupancy(*p) == Some(winner) {
                        *p = 0;
                    }
                }
                snapshot.bar[winner.index()] = 0;
                return Some(Action::Setup(Box::new(snapshot)));
            }
            return None;
        }

        // Cube turned.
        if current.cube_turned.is_none() && new.cube_turned.is_some() {
            return Some(Action::Double(new.cube_turned?));
        }

        // Cube taken.
        if current.cube_turned.is_some() && new.cube == current.cube * 2 {
            let taker = current.cube_turned?.other();
            return Some(Action::Take(taker));
        }

        // Cube dropped: the game settled for exactly the cube value.
        if current.cube_turned.is_some() && new.score.unsigned_abs() as u32 == current.cube {
            let winner = Side::of_occupancy(new.score.signum() as i8)?;
            return Some(Action::Drop(winner.other()));
        }

        // Resignation offered.
        if current.resigned == 0 && new.resigned != 0 {
            let offerer = if new.resigned > 0 {
                new.turn?
            } else {
                new.turn?.other()
            };
            return Some(Action::Resign(offerer, new.resigned.unsigned_abs()));
        }

        if current.resigned != 0 && new.resigned == 0 {
            let offerer = if current.resigned > 0 {
                current.turn?
            } else {
                current.turn?.other()
            };
            if new.score != 0 {
                return Some(Action::AcceptResign(offerer.other()));
            }
            if new.scores == current.scores {
                return Some(Action::RejectResign(offerer.other()));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MoveStatus, Movement};
    use pretty_assertions::assert_eq;

    fn tracked_position(tracker: &MatchTracker) -> Position {
        tracker.match_log().current_position()
    }

    #[test]
    fn roll_is_inferred() {
        let mut tracker = MatchTracker::new("alice", "bob", 5, false);
        let mut reported = tracked_position(&tracker);
        reported.turn = Some(Side::White);
        reported.dice = [3, 1];
        reported.reset_unused_dice();
        assert_eq!(tracker.update(&reported), None);
        assert_eq!(
            tracker.match_log().current_game().actions,
            vec![Action::Roll(Side::White, 3, 1)]
        );
    }

    #[test]
    fn move_is_inferred_and_validated() {
        let mut tracker = MatchTracker::new("alice", "bob", 5, false);
        let mut reported = tracked_position(&tracker);
        reported.turn = Some(Side::White);
        reported.dice = [3, 1];
        reported.reset_unused_dice();
        tracker.update(&reported);

        let mut moved = reported.clone();
        moved.points[7] -= 1;
        moved.points[5] -= 1;
        moved.points[4] += 2;
        moved.dice = [0, 0];
        moved.unused_dice = [0, 0];
        moved.turn = Some(Side::Black);
        tracker.update(&moved);

        let actions = &tracker.match_log().current_game().actions;
        assert_eq!(actions.len(), 2);
        match &actions[1] {
            Action::Move(Side::White, m) => {
                assert_eq!(m.status, MoveStatus::Legal);
                let mut froms: Vec<u8> = m.movements.iter().map(|mv| mv.from).collect();
                froms.sort_unstable();
                assert_eq!(froms, vec![6, 8]);
            }
            other => panic!("expected a move action, got {:?}", other),
        }
        assert!(tracked_position(&tracker).equals_checkers(&moved));
    }

    #[test]
    fn identical_position_appends_nothing() {
        let mut tracker = MatchTracker::new("alice", "bob", 5, false);
        let reported = tracked_position(&tracker);
        tracker.update(&reported);
        assert!(tracker.match_log().current_game().is_empty());
    }

    #[test]
    fn resumption_starts_with_snapshot() {
        let mut tracker = MatchTracker::new("alice", "bob", 7, true);
        let mut reported = Position::initial_for(7);
        reported.players = [String::from("alice"), String::from("bob")];
        reported.scores = [3, 2];
        reported.turn = Some(Side::Black);
        reported.cube = 2;
        reported.may_double = [false, true];
        tracker.update(&reported);
        let actions = &tracker.match_log().current_game().actions;
        assert_eq!(actions.len(), 1);
        assert!(matches!(actions[0], Action::Setup(_)));
        assert_eq!(tracked_position(&tracker).scores, [3, 2]);
    }

    #[test]
    fn double_and_take_inferred() {
        let mut tracker = MatchTracker::new("alice", "bob", 5, false);
        let mut reported = tracked_position(&tracker);
        reported.cube_turned = Some(Side::White);
        tracker.update(&reported);
        assert_eq!(
            tracker.match_log().current_game().actions,
            vec![Action::Double(Side::White)]
        );

        let mut taken = tracked_position(&tracker);
        taken.cube = 2;
        taken.cube_turned = None;
        taken.may_double = [false, true];
        tracker.update(&taken);
        assert_eq!(
            tracker.match_log().current_game().actions,
            vec![Action::Double(Side::White), Action::Take(Side::Black)]
        );
    }

    #[test]
    fn unreconstructable_position_snapshots() {
        let mut tracker = MatchTracker::new("alice", "bob", 5, false);
        let mut reported = tracked_position(&tracker);
        // Checkers changed with no dice anywhere in sight.
        reported.points[0] = 0;
        reported.points[11] = -7;
        tracker.update(&reported);
        let actions = &tracker.match_log().current_game().actions;
        assert!(matches!(actions[0], Action::Setup(_)));
    }

    #[test]
    fn match_winner_reported() {
        let mut tracker = MatchTracker::new("alice", "bob", 1, false);
        let mut reported = tracked_position(&tracker);
        reported.turn = Some(Side::White);
        reported.dice = [3, 1];
        reported.reset_unused_dice();
        tracker.update(&reported);
        let mut resigned = reported.clone();
        resigned.resigned = 1;
        tracker.update(&resigned);
        let mut settled = resigned.clone();
        settled.resigned = 0;
        settled.score = -1;
        settled.scores = [0, 1];
        settled.dice = [0, 0];
        settled.unused_dice = [0, 0];
        settled.turn = None;
        assert_eq!(tracker.update(&settled), Some(Side::Black));
    }
}
