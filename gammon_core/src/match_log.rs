use serde::{Deserialize, Serialize};

use crate::{Move, Position, Side};

/// One entry in a game's action log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// A roll by the given side.
    Roll(Side, u8, u8),
    /// A validated move by the given side.
    Move(Side, Move),
    /// The side turns the cube.
    Double(Side),
    /// The side takes a pending double.
    Take(Side),
    /// The side drops a pending double, conceding the game.
    Drop(Side),
    /// The side offers to resign for the given number of points
    /// (1 plain, 2 gammon, 3 backgammon), multiplied by the cube.
    Resign(Side, u8),
    /// The side accepts the opponent's pending resignation.
    AcceptResign(Side),
    /// The side rejects the opponent's pending resignation.
    RejectResign(Side),
    /// A snapshot for state that cannot be reconstructed action by
    /// action (match resumption, lossy server reports).
    Setup(Box<Position>),
}

/// An ordered sequence of actions forming one game of a match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub actions: Vec<Action>,
}

impl Game {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// A complete match: an ordered sequence of games between two players.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    /// Player names, white first.
    pub players: [String; 2],
    /// Match length; 0 denotes unlimited.
    pub length: u16,
    /// Whether the Crawford rule applies.
    pub crawford: bool,
    /// Match start, microseconds since the epoch.
    pub start_time_us: i64,
    pub games: Vec<Game>,
}

impl Match {
    pub fn new(player1: &str, player2: &str, length: u16, crawford: bool) -> Self {
        let start_time_us = chrono::Utc::now().timestamp_micros();
        Self {
            players: [player1.to_string(), player2.to_string()],
            length,
            crawford,
            start_time_us,
            games: vec![Game::default()],
        }
    }

    /// The game actions are currently appended to.
    pub fn current_game(&self) -> &Game {
        // `games` is never empty; `new` seeds it and `start_game` appends.
        self.games.last().expect("match has no games")
    }

    pub fn append(&mut self, action: Action) {
        self.games
            .last_mut()
            .expect("match has no games")
            .actions
            .push(action);
    }

    /// Seal the current game and open the next one.
    pub fn start_game(&mut self) {
        if !self.current_game().is_empty() {
            self.games.push(Game::default());
        }
    }

    /// Derive the position after folding every logged action over the
    /// opening position.
    pub fn current_position(&self) -> Position {
        let mut pos = Position::initial_for(self.length.min(255) as u8);
        pos.players = self.players.clone();
        for game in &self.games {
            if !game.is_empty() {
                // Each game restarts from the opening layout but keeps
                // the running scores and match framing.
                let scores = pos.scores;
                let mut fresh = Position::initial_for(pos.match_length);
                fresh.players = pos.players.clone();
                fresh.scores = scores;
                pos = fresh;
            }
            for action in &game.actions {
                apply_action(&mut pos, action);
            }
        }
        pos
    }

    /// Cumulative score for a side over all games.
    pub fn score(&self, side: Side) -> u8 {
        self.current_position().scores[side.index()]
    }

    /// The winning side once the match is decided.
    pub fn winner(&self) -> Option<Side> {
        let pos = self.current_position();
        if self.length > 0 {
            for side in [Side::White, Side::Black] {
                if pos.scores[side.index()] as u16 >= self.length {
                    return Some(side);
                }
            }
            None
        } else if pos.score != 0 {
            // An unlimited match ends with its first concluded game.
            Side::of_occupancy(pos.score.signum() as i8)
        } else {
            None
        }
    }
}

fn apply_action(pos: &mut Position, action: &Action) {
    match action {
        Action::Roll(side, d1, d2) => {
            pos.turn = Some(*side);
            pos.dice = [*d1 as i8, *d2 as i8];
            pos.score = 0;
            pos.reset_unused_dice();
        }
        Action::Move(side, m) => {
            pos.apply_move(m, *side);
        }
        Action::Double(side) => {
            pos.cube_turned = Some(*side);
        }
        Action::Take(side) => {
            pos.cube = pos.cube.saturating_mul(2);
            pos.cube_turned = None;
            pos.may_double = [false, false];
            pos.may_double[side.index()] = true;
        }
        Action::Drop(side) => {
            let winner = side.other();
            let value = pos.cube as i16;
            pos.cube_turned = None;
            settle(pos, winner, value);
        }
        Action::Resign(side, n) => {
            let n = *n as i8;
            pos.resigned = if pos.turn == Some(*side) { n } else { -n };
        }
        Action::AcceptResign(side) => {
            let value = pos.resigned.unsigned_abs() as i16 * pos.cube as i16;
            pos.resigned = 0;
            settle(pos, *side, value);
        }
        Action::RejectResign(_) => {
            pos.resigned = 0;
        }
        Action::Setup(snapshot) => {
            *pos = (**snapshot).clone();
        }
    }
}

fn settle(pos: &mut Position, winner: Side, value: i16) {
    pos.score = match winner {
        Side::White => value,
        Side::Black => -value,
    };
    pos.scores[winner.index()] = pos.scores[winner.index()].saturating_add(value as u8);
    pos.dice = [0, 0];
    pos.unused_dice = [0, 0];
    pos.turn = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MoveStatus, Movement};
    use pretty_assertions::assert_eq;

    fn test_match() -> Match {
        let mut m = Match::new("alice", "bob", 5, true);
        m.start_time_us = 1_306_865_048_000_000;
        m
    }

    #[test]
    fn empty_match_derives_opening() {
        let m = test_match();
        let pos = m.current_position();
        assert!(pos.equals_checkers(&Position::initial()));
        assert_eq!(pos.turn, None);
        assert_eq!(pos.match_length, 5);
        assert_eq!(m.winner(), None);
    }

    #[test]
    fn roll_and_move_fold() {
        let mut m = test_match();
        m.append(Action::Roll(Side::White, 3, 1));
        let mut expected = m.current_position();
        assert_eq!(expected.dice, [3, 1]);
        assert_eq!(expected.turn, Some(Side::White));

        let mv = Move::new(
            [Movement::new(8, 5), Movement::new(6, 5)],
            MoveStatus::Legal,
        );
        assert_eq!(expected.validate_movements(&mv.movements, Side::White), MoveStatus::Legal);
        m.append(Action::Move(Side::White, mv.clone()));
        expected.apply_move(&mv, Side::White);
        assert_eq!(m.current_position(), expected);
        assert_eq!(m.current_position().turn, Some(Side::Black));
    }

    #[test]
    fn double_take_raises_cube() {
        let mut m = test_match();
        m.append(Action::Roll(Side::White, 3, 1));
        m.append(Action::Double(Side::White));
        assert_eq!(m.current_position().cube_turned, Some(Side::White));
        m.append(Action::Take(Side::Black));
        let pos = m.current_position();
        assert_eq!(pos.cube, 2);
        assert_eq!(pos.cube_turned, None);
        assert_eq!(pos.may_double, [false, true]);
    }

    #[test]
    fn drop_concedes_cube_value() {
        let mut m = test_match();
        m.append(Action::Roll(Side::White, 3, 1));
        m.append(Action::Double(Side::White));
        m.append(Action::Drop(Side::Black));
        let pos = m.current_position();
        assert_eq!(pos.score, 1);
        assert_eq!(pos.scores, [1, 0]);
        assert_eq!(pos.turn, None);
        assert_eq!(m.winner(), None);
    }

    #[test]
    fn accepted_resignation_scores() {
        let mut m = test_match();
        m.append(Action::Roll(Side::Black, 6, 2));
        m.append(Action::Resign(Side::Black, 2));
        assert_eq!(m.current_position().resigned, 2);
        m.append(Action::AcceptResign(Side::White));
        let pos = m.current_position();
        assert_eq!(pos.score, 2);
        assert_eq!(pos.scores, [2, 0]);
        assert_eq!(pos.resigned, 0);
    }

    #[test]
    fn rejected_resignation_continues() {
        let mut m = test_match();
        m.append(Action::Roll(Side::Black, 6, 2));
        m.append(Action::Resign(Side::Black, 1));
        m.append(Action::RejectResign(Side::White));
        let pos = m.current_position();
        assert_eq!(pos.resigned, 0);
        assert_eq!(pos.score, 0);
    }

    #[test]
    fn next_game_restarts_board_and_keeps_scores() {
        let mut m = test_match();
        m.append(Action::Roll(Side::White, 3, 1));
        m.append(Action::Double(Side::White));
        m.append(Action::Drop(Side::Black));
        m.start_game();
        m.append(Action::Roll(Side::Black, 5, 2));
        let pos = m.current_position();
        assert!(pos.equals_checkers(&Position::initial()));
        assert_eq!(pos.scores, [1, 0]);
        assert_eq!(pos.turn, Some(Side::Black));
    }

    #[test]
    fn match_winner_when_score_reached() {
        let mut m = Match::new("alice", "bob", 1, true);
        m.append(Action::Roll(Side::White, 3, 1));
        m.append(Action::Resign(Side::White, 1));
        m.append(Action::AcceptResign(Side::Black));
        assert_eq!(m.winner(), Some(Side::Black));
    }

    #[test]
    fn setup_snapshot_replaces_state() {
        let mut m = test_match();
        let mut snap = Position::initial_for(5);
        snap.players = m.players.clone();
        snap.scores = [2, 3];
        snap.turn = Some(Side::Black);
        m.append(Action::Setup(Box::new(snap.clone())));
        assert_eq!(m.current_position(), snap);
    }
}
