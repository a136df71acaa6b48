use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use crate::{
    Move, MoveStatus, Movement, PositionError, Side, CHECKERS_PER_SIDE, NUM_POINTS, WHITE_BAR,
    WHITE_OFF,
};

/// A backgammon position as reported by the server or produced locally.
///
/// Point indices run from white's ace point (index 0) to white's 24-point
/// (index 23). Positive occupancies are white checkers, negative are black.
/// White moves towards the low indices and bears off into tray `0` on the
/// FIBS movement scale; black moves towards the high indices and bears off
/// into `25`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Player names, white first. Opaque identifiers.
    pub players: [String; 2],
    /// Signed checker occupancy per point.
    pub points: [i8; NUM_POINTS],
    /// Checkers on the bar, white first.
    pub bar: [u8; 2],
    /// Current dice; zero when not shown. Negative values report the
    /// opponent's roll in a cannot-move situation.
    pub dice: [i8; 2],
    /// Remaining pips after partial play; see [`Position::reset_unused_dice`].
    pub unused_dice: [u8; 2],
    /// Doubling cube face; a power of two.
    pub cube: u32,
    /// Per-side cube ownership; both true iff the cube is centred.
    pub may_double: [bool; 2],
    /// Who just offered the cube, if anyone.
    pub cube_turned: Option<Side>,
    /// Side on roll; `None` only in fresh or terminal positions.
    pub turn: Option<Side>,
    /// Pending resignation: 0 none, +n offered by the side on turn,
    /// -n offered by the opponent. n is 1..3.
    pub resigned: i8,
    /// Match length; 0 denotes unlimited.
    pub match_length: u8,
    /// Match score, white first.
    pub scores: [u8; 2],
    /// Points just won in the last game; sign is the winner.
    pub score: i16,
    /// Transient annotation: "Crawford game" or "Post-Crawford game".
    pub game_info: Option<String>,
    /// Narration of the most recent event.
    pub status: Option<String>,
    /// Presentation hint: draw the lower die on the left.
    pub dice_swapped: bool,
}

impl Default for Position {
    fn default() -> Self {
        Self {
            players: [String::new(), String::new()],
            points: [0; NUM_POINTS],
            bar: [0, 0],
            dice: [0, 0],
            unused_dice: [0, 0],
            cube: 1,
            may_double: [true, true],
            cube_turned: None,
            turn: None,
            resigned: 0,
            match_length: 0,
            scores: [0, 0],
            score: 0,
            game_info: None,
            status: None,
            dice_swapped: false,
        }
    }
}

impl Position {
    /// The standard fifteen-checker opening position. Both sides may
    /// double and nobody is on roll yet.
    pub fn initial() -> Self {
        let mut pos = Self::default();
        // White: 24-point, 13-point, 8-point, 6-point.
        pos.points[23] = 2;
        pos.points[12] = 5;
        pos.points[7] = 3;
        pos.points[5] = 5;
        // Black mirrors.
        pos.points[0] = -2;
        pos.points[11] = -5;
        pos.points[16] = -3;
        pos.points[18] = -5;
        pos
    }

    /// Opening position for a match of the given length (0 = unlimited).
    pub fn initial_for(match_length: u8) -> Self {
        let mut pos = Self::initial();
        pos.match_length = match_length;
        pos
    }

    /// Checkers the side still has on the board, bar included.
    pub fn on_board(&self, side: Side) -> u8 {
        let mut total = self.bar[side.index()] as i16;
        for p in self.points {
            if Side::of_occupancy(p) == Some(side) {
                total += p.unsigned_abs() as i16;
            }
        }
        total as u8
    }

    /// Checkers already borne off, derived from conservation.
    pub fn borne_off(&self, side: Side) -> u8 {
        CHECKERS_PER_SIDE.saturating_sub(self.on_board(side))
    }

    /// Check the conservation laws and cube invariants.
    pub fn validate(&self) -> Result<(), PositionError> {
        for (i, &p) in self.points.iter().enumerate() {
            if p.unsigned_abs() > CHECKERS_PER_SIDE {
                return Err(PositionError::PointOverflow(i, p));
            }
        }
        for side in [Side::White, Side::Black] {
            let total = self.on_board(side) as i16;
            if total > CHECKERS_PER_SIDE as i16 {
                return Err(PositionError::ConservationViolated(side, total));
            }
        }
        if !self.cube.is_power_of_two() {
            return Err(PositionError::BadCube(self.cube));
        }
        for &d in &self.dice {
            if d.unsigned_abs() > 6 {
                return Err(PositionError::BadDie(d));
            }
        }
        if self.resigned.unsigned_abs() > 3 {
            return Err(PositionError::BadResignation(self.resigned));
        }
        Ok(())
    }

    /// Board-level equality, ignoring the presentation fields
    /// (`status`, `game_info`, `dice_swapped`, `unused_dice`).
    pub fn equals_board(&self, other: &Position) -> bool {
        self.players == other.players
            && self.points == other.points
            && self.bar == other.bar
            && self.dice == other.dice
            && self.cube == other.cube
            && self.may_double == other.may_double
            && self.cube_turned == other.cube_turned
            && self.turn == other.turn
            && self.resigned == other.resigned
            && self.match_length == other.match_length
            && self.scores == other.scores
    }

    /// Checker-layout equality only: points and bars.
    pub fn equals_checkers(&self, other: &Position) -> bool {
        self.points == other.points && self.bar == other.bar
    }

    /// Populate `unused_dice` from the current roll. Doubles yield four
    /// opportunities, two otherwise; callers track partial consumption by
    /// zeroing entries.
    pub fn reset_unused_dice(&mut self) {
        let d0 = self.dice[0].unsigned_abs();
        let d1 = self.dice[1].unsigned_abs();
        self.unused_dice = [d0, d1];
    }

    /// Rotate the dice so that white's larger die sits at index 0. The
    /// opening-roll convention clients expect.
    pub fn normalize_opening_roll(&mut self) {
        if self.dice[0] != 0 && self.dice[0].abs() < self.dice[1].abs() {
            self.dice.swap(0, 1);
            self.unused_dice.swap(0, 1);
        }
    }

    /// Presentation-only dice swap hint: lower die drawn on the left.
    pub fn auto_swap_dice(&mut self, prefer_swap: bool) {
        self.dice_swapped = prefer_swap && self.dice[0].abs() > self.dice[1].abs();
    }

    fn dice_values(&self) -> ArrayVec<u8, 4> {
        let mut dice = ArrayVec::new();
        let d0 = self.dice[0].unsigned_abs();
        let d1 = self.dice[1].unsigned_abs();
        if d0 == 0 || d1 == 0 {
            return dice;
        }
        if d0 == d1 {
            for _ in 0..4 {
                dice.push(d0);
            }
        } else {
            dice.push(d0);
            dice.push(d1);
        }
        dice
    }

    /// Bar entry value for a side on the FIBS scale.
    fn bar_point(side: Side) -> u8 {
        match side {
            Side::White => WHITE_BAR,
            Side::Black => WHITE_OFF,
        }
    }

    /// Bearoff tray value for a side on the FIBS scale.
    fn off_point(side: Side) -> u8 {
        match side {
            Side::White => WHITE_OFF,
            Side::Black => WHITE_BAR,
        }
    }

    fn is_bar_entry(mv: &Movement, side: Side) -> bool {
        mv.from == Self::bar_point(side)
    }

    fn is_bear_off(mv: &Movement, side: Side) -> bool {
        mv.to == Self::off_point(side)
    }

    /// Exact pip distance from a point to the side's tray.
    fn off_distance(from: u8, side: Side) -> u8 {
        match side {
            Side::White => from,
            Side::Black => WHITE_BAR - from,
        }
    }

    /// Total pips a side still has to travel; bar checkers count the
    /// full 25.
    pub fn pip_count(&self, side: Side) -> u32 {
        let mut pips = u32::from(self.bar[side.index()]) * u32::from(WHITE_BAR);
        for i in 0..NUM_POINTS {
            if Side::of_occupancy(self.points[i]) == Some(side) {
                let from = Self::point_to_fibs(i);
                pips += u32::from(Self::off_distance(from, side))
                    * u32::from(self.points[i].unsigned_abs());
            }
        }
        pips
    }

    fn home_range(side: Side) -> std::ops::Range<usize> {
        match side {
            Side::White => 0..6,
            Side::Black => 18..24,
        }
    }

    fn all_in_home(&self, side: Side) -> bool {
        if self.bar[side.index()] > 0 {
            return false;
        }
        let home = Self::home_range(side);
        for (i, &p) in self.points.iter().enumerate() {
            if Side::of_occupancy(p) == Some(side) && !home.contains(&i) {
                return false;
            }
        }
        true
    }

    /// Whether a higher home point than `from` still holds one of the
    /// side's checkers. "Higher" is measured in remaining pips.
    fn higher_point_occupied(&self, from: u8, side: Side) -> bool {
        let dist = Self::off_distance(from, side);
        for i in Self::home_range(side) {
            if Side::of_occupancy(self.points[i]) != Some(side) {
                continue;
            }
            let point_dist = Self::off_distance(Self::point_to_fibs(i), side);
            if point_dist > dist {
                return true;
            }
        }
        false
    }

    fn point_to_fibs(index: usize) -> u8 {
        index as u8 + 1
    }

    fn fibs_to_point(fibs: u8) -> Option<usize> {
        if (1..=24).contains(&fibs) {
            Some(fibs as usize - 1)
        } else {
            None
        }
    }

    fn occupancy_at(&self, fibs: u8) -> i8 {
        Self::fibs_to_point(fibs).map_or(0, |i| self.points[i])
    }

    fn opponent_checkers_at(&self, fibs: u8, side: Side) -> u8 {
        let occ = self.occupancy_at(fibs);
        if Side::of_occupancy(occ) == Some(side.other()) {
            occ.unsigned_abs()
        } else {
            0
        }
    }

    /// Apply one movement with no legality checks; blots are hit.
    fn apply_raw(&mut self, mv: &Movement, side: Side) {
        let sign = side.sign();
        if Self::is_bar_entry(mv, side) {
            self.bar[side.index()] -= 1;
        } else if let Some(i) = Self::fibs_to_point(mv.from) {
            self.points[i] -= sign;
        }
        if Self::is_bear_off(mv, side) {
            return;
        }
        if let Some(i) = Self::fibs_to_point(mv.to) {
            if self.points[i] == -sign {
                // A single opposing checker is hit and sent to the bar.
                self.points[i] = 0;
                self.bar[side.other().index()] += 1;
            }
            self.points[i] += sign;
        }
    }

    /// All legal single movements for one die from this position.
    fn legal_single_movements(&self, side: Side, die: u8) -> Vec<Movement> {
        let mut result = Vec::new();
        if self.bar[side.index()] > 0 {
            let to = match side {
                Side::White => WHITE_BAR - die,
                Side::Black => WHITE_OFF + die,
            };
            if self.opponent_checkers_at(to, side) < 2 {
                result.push(Movement::new(Self::bar_point(side), to));
            }
            return result;
        }
        let all_home = self.all_in_home(side);
        for i in 0..NUM_POINTS {
            if Side::of_occupancy(self.points[i]) != Some(side) {
                continue;
            }
            let from = Self::point_to_fibs(i);
            let dist = Self::off_distance(from, side);
            if die < dist {
                let to = match side {
                    Side::White => from - die,
                    Side::Black => from + die,
                };
                if self.opponent_checkers_at(to, side) < 2 {
                    result.push(Movement::new(from, to));
                }
            } else if all_home {
                // Exact bear-off, or an overshoot with nothing higher.
                if die == dist || !self.higher_point_occupied(from, side) {
                    result.push(Movement::new(from, Self::off_point(side)));
                }
            }
        }
        result
    }

    /// Longest sequence of legal movements playable with the dice in the
    /// given order.
    fn max_playable_with(&self, side: Side, dice: &[u8]) -> usize {
        let Some((&die, rest)) = dice.split_first() else {
            return 0;
        };
        let mut best = 0;
        for mv in self.legal_single_movements(side, die) {
            let mut sim = self.clone();
            sim.apply_raw(&mv, side);
            let played = 1 + sim.max_playable_with(side, rest);
            best = best.max(played);
            if best == dice.len() {
                break;
            }
        }
        best
    }

    /// Longest legal movement sequence over every die ordering.
    fn max_playable(&self, side: Side) -> usize {
        let dice = self.dice_values();
        if dice.is_empty() {
            return 0;
        }
        if dice[0] == dice[1] {
            self.max_playable_with(side, &dice)
        } else {
            let forward = self.max_playable_with(side, &dice);
            let swapped = [dice[1], dice[0]];
            forward.max(self.max_playable_with(side, &swapped))
        }
    }

    /// Validate an explicit ordered movement sequence against this
    /// position, running the rule cascade in order. `self` is the position
    /// the player saw; the dice must be present.
    pub fn validate_movements(&self, movements: &[Movement], side: Side) -> MoveStatus {
        let dice = self.dice_values();
        if movements.len() > dice.len() {
            return MoveStatus::TooManyMoves;
        }

        let mut sim = self.clone();
        let mut remaining: Vec<u8> = dice.to_vec();
        let mut consumed: Vec<u8> = Vec::new();

        for mv in movements {
            if sim.bar[side.index()] > 0 && !Self::is_bar_entry(mv, side) {
                return MoveStatus::Dancing;
            }
            if Self::is_bar_entry(mv, side) && sim.bar[side.index()] == 0 {
                return MoveStatus::Illegal;
            }
            if Self::is_bear_off(mv, side) {
                if !sim.all_in_home(side) {
                    return MoveStatus::PrematureBearOff;
                }
                let exact = Self::off_distance(mv.from, side);
                if let Some(i) = remaining.iter().position(|&d| d == exact) {
                    consumed.push(remaining.remove(i));
                } else {
                    // No exact die: the smallest larger die may be used,
                    // but only if nothing sits on a higher point.
                    let larger = remaining
                        .iter()
                        .enumerate()
                        .filter(|(_, &d)| d > exact)
                        .min_by_key(|(_, &d)| d)
                        .map(|(i, _)| i);
                    match larger {
                        Some(i) => {
                            if sim.higher_point_occupied(mv.from, side) {
                                return MoveStatus::IllegalWaste;
                            }
                            consumed.push(remaining.remove(i));
                        }
                        None => return MoveStatus::Illegal,
                    }
                }
            } else {
                let dist = mv.distance();
                let Some(i) = remaining.iter().position(|&d| d == dist) else {
                    return MoveStatus::Illegal;
                };
                if sim.opponent_checkers_at(mv.to, side) >= 2 {
                    return MoveStatus::Blocked;
                }
                if Side::of_occupancy(sim.occupancy_at(mv.from)) != Some(side)
                    && !Self::is_bar_entry(mv, side)
                {
                    return MoveStatus::Illegal;
                }
                consumed.push(remaining.remove(i));
            }
            sim.apply_raw(mv, side);
        }

        let max_play = self.max_playable(side);
        let played = movements.len();
        if played < max_play {
            if dice.len() == 2 && dice[0] != dice[1] && played == 1 {
                let used = consumed[0];
                let other = if used == dice[0] { dice[1] } else { dice[0] };
                if self.max_playable_with(side, &[used, other]) == 2 {
                    return MoveStatus::UseAll;
                }
                if self.max_playable_with(side, &[other, used]) == 2 {
                    return MoveStatus::TrySwap;
                }
                return MoveStatus::UseAll;
            }
            return MoveStatus::UseAll;
        }

        // With only one playable die, the higher must be preferred when
        // either would play singly.
        if dice.len() == 2 && dice[0] != dice[1] && max_play == 1 && played == 1 {
            let (lo, hi) = if dice[0] < dice[1] {
                (dice[0], dice[1])
            } else {
                (dice[1], dice[0])
            };
            if consumed[0] == lo
                && !self.legal_single_movements(side, hi).is_empty()
                && !self.legal_single_movements(side, lo).is_empty()
            {
                return MoveStatus::UseHigher;
            }
        }

        MoveStatus::Legal
    }

    /// Search for an ordered movement sequence that transforms this
    /// position's checker layout into `after`'s, consuming the current
    /// dice geometrically (no legality applied; blots are hit).
    fn recover_movements(&self, after: &Position, side: Side) -> Option<ArrayVec<Movement, 4>> {
        let dice = self.dice_values();
        let mut orders: Vec<Vec<u8>> = Vec::new();
        if dice.is_empty() {
            orders.push(Vec::new());
        } else if dice[0] == dice[1] {
            for len in (0..=4).rev() {
                orders.push(vec![dice[0]; len]);
            }
        } else {
            orders.push(vec![dice[0], dice[1]]);
            orders.push(vec![dice[1], dice[0]]);
            orders.push(vec![dice[0]]);
            orders.push(vec![dice[1]]);
            orders.push(Vec::new());
        }
        // Prefer sequences that are legal as played; a raw pass afterwards
        // recovers the illegal ones so they can be diagnosed.
        for order in &orders {
            let mut acc = ArrayVec::new();
            if self.recover_with(after, side, order, true, &mut acc) {
                return Some(acc);
            }
        }
        for order in &orders {
            let mut acc = ArrayVec::new();
            if self.recover_with(after, side, order, false, &mut acc) {
                return Some(acc);
            }
        }
        None
    }

    fn recover_with(
        &self,
        after: &Position,
        side: Side,
        dice: &[u8],
        legal_only: bool,
        acc: &mut ArrayVec<Movement, 4>,
    ) -> bool {
        let Some((&die, rest)) = dice.split_first() else {
            return self.equals_checkers(after);
        };
        let candidates = if legal_only {
            self.legal_single_movements(side, die)
        } else {
            self.raw_single_movements(side, die)
        };
        for mv in candidates {
            let mut sim = self.clone();
            sim.apply_raw(&mv, side);
            acc.push(mv);
            if sim.recover_with(after, side, rest, legal_only, acc) {
                return true;
            }
            acc.pop();
        }
        false
    }

    /// Geometrically possible movements for one die, legality ignored.
    fn raw_single_movements(&self, side: Side, die: u8) -> Vec<Movement> {
        let mut result = Vec::new();
        if self.bar[side.index()] > 0 {
            let to = match side {
                Side::White => WHITE_BAR - die,
                Side::Black => WHITE_OFF + die,
            };
            result.push(Movement::new(Self::bar_point(side), to));
        }
        for i in 0..NUM_POINTS {
            if Side::of_occupancy(self.points[i]) != Some(side) {
                continue;
            }
            let from = Self::point_to_fibs(i);
            let dist = Self::off_distance(from, side);
            if die < dist {
                let to = match side {
                    Side::White => from - die,
                    Side::Black => from + die,
                };
                result.push(Movement::new(from, to));
            } else {
                result.push(Movement::new(from, Self::off_point(side)));
            }
        }
        result
    }

    /// Diff this position against the one the player proposes and return
    /// the recovered move with its verdict. Only `Legal` results may be
    /// applied.
    pub fn check_move(&self, after: &Position, side: Side) -> Move {
        if self.players != after.players || self.match_length != after.match_length {
            return Move::new([], MoveStatus::Illegal);
        }
        match self.recover_movements(after, side) {
            Some(movements) => {
                let status = self.validate_movements(&movements, side);
                Move { movements, status }
            }
            None => Move::new([], MoveStatus::Illegal),
        }
    }

    /// Apply a legal move. Scores update when the game-ending checker is
    /// borne off; dice are cleared. Movements are always in the canonical
    /// frame; display direction only affects narration.
    pub fn apply_move(&mut self, m: &Move, side: Side) {
        debug_assert!(m.is_legal());
        for mv in &m.movements {
            self.apply_raw(mv, side);
        }
        self.dice = [0, 0];
        self.unused_dice = [0, 0];
        self.resigned = 0;
        if self.borne_off(side) == CHECKERS_PER_SIDE {
            let value = self.game_value(side) * self.cube as i16;
            self.score = match side {
                Side::White => value,
                Side::Black => -value,
            };
            self.scores[side.index()] = self.scores[side.index()].saturating_add(value as u8);
            self.turn = None;
        } else {
            self.turn = Some(side.other());
        }
    }

    /// Plain, gammon or backgammon multiplier for a win by `side`.
    fn game_value(&self, side: Side) -> i16 {
        let loser = side.other();
        if self.borne_off(loser) > 0 {
            return 1;
        }
        let winner_home = Self::home_range(side);
        let in_winner_home = self
            .points
            .iter()
            .enumerate()
            .any(|(i, &p)| winner_home.contains(&i) && Side::of_occupancy(p) == Some(loser));
        if self.bar[loser.index()] > 0 || in_winner_home {
            3
        } else {
            2
        }
    }

    /// Wire encoding of a move: space-separated `from-to` pairs with
    /// `bar`/`off` sentinels, in decreasing `from` order from the moving
    /// side's viewpoint.
    pub fn fibs_move(&self, m: &Move, side: Side, reverse: bool) -> String {
        let mut movements: Vec<Movement> = m
            .movements
            .iter()
            .map(|mv| if reverse { mirror_movement(mv) } else { *mv })
            .collect();
        movements.sort_by_key(|mv| std::cmp::Reverse(viewpoint(mv.from, side)));
        movements
            .iter()
            .map(|mv| {
                let from = if Self::is_bar_entry(mv, side) {
                    "bar".to_string()
                } else {
                    mv.from.to_string()
                };
                let to = if Self::is_bear_off(mv, side) {
                    "off".to_string()
                } else {
                    mv.to.to_string()
                };
                format!("{}-{}", from, to)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Human narration of a move ("8/5 6/5"), numbered from the moving
    /// side's own viewpoint.
    pub fn format_move(&self, m: &Move, side: Side, reverse: bool) -> String {
        let mut movements: Vec<Movement> = m
            .movements
            .iter()
            .map(|mv| if reverse { mirror_movement(mv) } else { *mv })
            .collect();
        movements.sort_by_key(|mv| std::cmp::Reverse(viewpoint(mv.from, side)));
        movements
            .iter()
            .map(|mv| {
                let from = if Self::is_bar_entry(mv, side) {
                    "bar".to_string()
                } else {
                    viewpoint(mv.from, side).to_string()
                };
                let to = if Self::is_bear_off(mv, side) {
                    "off".to_string()
                } else {
                    viewpoint(mv.to, side).to_string()
                };
                format!("{}/{}", from, to)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// A point number as seen from the given side (black counts from the
/// other end of the board).
fn viewpoint(fibs: u8, side: Side) -> u8 {
    match side {
        Side::White => fibs,
        Side::Black => WHITE_BAR - fibs,
    }
}

fn mirror_movement(mv: &Movement) -> Movement {
    Movement::new(WHITE_BAR - mv.from, WHITE_BAR - mv.to)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rolled(mut pos: Position, side: Side, d1: i8, d2: i8) -> Position {
        pos.turn = Some(side);
        pos.dice = [d1, d2];
        pos.reset_unused_dice();
        pos
    }

    #[test]
    fn initial_conserves_checkers() {
        let pos = Position::initial();
        assert_eq!(pos.on_board(Side::White), 15);
        assert_eq!(pos.on_board(Side::Black), 15);
        assert_eq!(pos.borne_off(Side::White), 0);
        assert!(pos.validate().is_ok());
        assert_eq!(pos.turn, None);
        assert_eq!(pos.may_double, [true, true]);
    }

    #[test]
    fn reset_unused_dice_doubles() {
        let mut pos = Position::initial();
        pos.dice = [4, 4];
        pos.reset_unused_dice();
        assert_eq!(pos.unused_dice, [4, 4]);
        pos.dice = [-3, -1];
        pos.reset_unused_dice();
        assert_eq!(pos.unused_dice, [3, 1]);
    }

    #[test]
    fn opening_roll_rotates_larger_die_first() {
        let mut pos = Position::initial();
        pos.dice = [2, 5];
        pos.normalize_opening_roll();
        assert_eq!(pos.dice, [5, 2]);
        pos.normalize_opening_roll();
        assert_eq!(pos.dice, [5, 2]);
    }

    #[test]
    fn legal_point_move_white() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let mut after = before.clone();
        // The classic 8/5 6/5.
        after.points[7] -= 1;
        after.points[5] -= 1;
        after.points[4] += 2;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
        assert_eq!(m.movements.len(), 2);
    }

    #[test]
    fn legal_point_move_black() {
        let before = rolled(Position::initial(), Side::Black, 6, 5);
        let mut after = before.clone();
        // Lover's leap: black 24/18 18/13 is fibs 1-7 7-12.
        after.points[0] += 1;
        after.points[11] -= 1;
        let m = before.check_move(&after, Side::Black);
        assert_eq!(m.status, MoveStatus::Legal);
        assert_eq!(m.movements.len(), 2);
    }

    #[test]
    fn hit_sends_blot_to_bar() {
        let mut before = rolled(Position::initial(), Side::White, 4, 2);
        before.points[3] = -1; // black blot on white's 4 point
        before.points[0] = -1;
        let mut after = before.clone();
        // 8/4 hits.
        after.points[7] -= 1;
        after.points[3] = 1;
        after.points[5] -= 1;
        after.points[3] += 1;
        after.bar[1] += 1;
        // 8/4* 6/4.
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
        let mut applied = before.clone();
        applied.apply_move(&m, Side::White);
        assert!(applied.equals_checkers(&after));
        assert_eq!(applied.bar[1], 1);
    }

    #[test]
    fn blocked_landing_rejected() {
        let before = rolled(Position::initial(), Side::White, 5, 6);
        let mut after = before.clone();
        // 24/19 in white numbering lands on black's anchor-rich zone:
        // black owns index 18 with five checkers.
        after.points[23] -= 1;
        after.points[18] += 1;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Blocked);
    }

    #[test]
    fn dancing_when_bar_ignored() {
        let mut before = rolled(Position::initial(), Side::White, 3, 1);
        before.bar[0] = 1;
        before.points[23] -= 1;
        let mut after = before.clone();
        after.points[7] -= 1;
        after.points[4] += 1;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Dancing);
    }

    #[test]
    fn bar_entry_is_legal() {
        let mut before = rolled(Position::initial(), Side::White, 3, 1);
        before.bar[0] = 1;
        before.points[23] -= 1;
        let mut after = before.clone();
        // bar/22 then 8/7 (dice 3 and 1).
        after.bar[0] = 0;
        after.points[21] += 1;
        after.points[7] -= 1;
        after.points[6] += 1;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
    }

    #[test]
    fn premature_bear_off_rejected() {
        let before = rolled(Position::initial(), Side::White, 6, 5);
        let mut after = before.clone();
        after.points[5] -= 1; // 6/off with checkers still outside
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::PrematureBearOff);
    }

    fn bearoff_position(side: Side) -> Position {
        let mut pos = Position::default();
        match side {
            Side::White => {
                pos.points[0] = 2;
                pos.points[2] = 2;
                pos.points[4] = 2;
                // Opponent far away.
                pos.points[23] = -2;
            }
            Side::Black => {
                pos.points[23] = -2;
                pos.points[21] = -2;
                pos.points[19] = -2;
                pos.points[0] = 2;
            }
        }
        pos
    }

    #[test]
    fn exact_bear_off_legal() {
        let before = rolled(bearoff_position(Side::White), Side::White, 5, 3);
        let mut after = before.clone();
        after.points[4] -= 1; // 5/off
        after.points[2] -= 1; // 3/off
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
        let mut applied = before.clone();
        applied.apply_move(&m, Side::White);
        assert_eq!(applied.borne_off(Side::White), 11);
    }

    #[test]
    fn wasteful_bear_off_rejected() {
        let before = rolled(bearoff_position(Side::White), Side::White, 6, 2);
        let mut after = before.clone();
        // Bearing the 3-point checker off with the 6 while the 5 point is
        // still occupied wastes pips.
        after.points[2] -= 1;
        after.points[0] += 1; // played the 2 as 3/1
        after.points[2] -= 1;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::IllegalWaste);
    }

    #[test]
    fn overshoot_bear_off_legal_from_highest() {
        let before = rolled(bearoff_position(Side::White), Side::White, 6, 6);
        let mut after = before.clone();
        // 5/off four times is impossible; 5-point pair and 3-point pair
        // all come off with sixes.
        after.points[4] = 0;
        after.points[2] = 0;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
        assert_eq!(m.movements.len(), 4);
    }

    #[test]
    fn use_all_when_both_dice_playable() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let mut after = before.clone();
        after.points[7] -= 1;
        after.points[4] += 1; // 8/5 only
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::UseAll);
    }

    #[test]
    fn game_ending_bear_off_scores() {
        let mut before = Position::default();
        before.players = [String::from("alice"), String::from("bob")];
        before.points[0] = 1;
        before.points[23] = -10;
        before.points[20] = -5;
        before.match_length = 5;
        before.cube = 2;
        let before = rolled(before, Side::White, 1, 1);
        let mut after = before.clone();
        after.points[0] = 0;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
        let mut applied = before.clone();
        applied.apply_move(&m, Side::White);
        assert_eq!(applied.borne_off(Side::White), 15);
        // Black never bore off and has nothing in white's home or on the
        // bar: a gammon, doubled by the cube.
        assert_eq!(applied.score, 4);
        assert_eq!(applied.scores, [4, 0]);
        assert_eq!(applied.turn, None);
    }

    #[test]
    fn fibs_move_rendering() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let m = Move::legal([Movement::new(6, 5), Movement::new(8, 5)]);
        assert_eq!(before.fibs_move(&m, Side::White, false), "8-5 6-5");
        assert_eq!(before.format_move(&m, Side::White, false), "8/5 6/5");
    }

    #[test]
    fn opening_pip_counts() {
        let pos = Position::initial();
        assert_eq!(pos.pip_count(Side::White), 167);
        assert_eq!(pos.pip_count(Side::Black), 167);
        let mut on_bar = pos.clone();
        on_bar.points[23] -= 1;
        on_bar.bar[0] += 1;
        assert_eq!(on_bar.pip_count(Side::White), 168);
    }

    #[test]
    fn mirrored_narration_leaves_board_canonical() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let mut after = before.clone();
        // 8/5 6/5.
        after.points[7] -= 1;
        after.points[4] += 1;
        after.points[5] -= 1;
        after.points[4] += 1;
        let m = before.check_move(&after, Side::White);
        assert_eq!(m.status, MoveStatus::Legal);
        // Display direction flips the rendered numbers only.
        assert_eq!(before.format_move(&m, Side::White, true), "19/20 17/20");
        let mut applied = before.clone();
        applied.apply_move(&m, Side::White);
        assert!(applied.equals_checkers(&after));
        assert!(applied.validate().is_ok());
    }

    #[test]
    fn lower_die_alone_demands_the_higher() {
        let mut pos = Position::default();
        pos.points[23] = 1; // lone white checker on 24
        pos.points[12] = -2; // black holds 13, cutting off both follow-ups
        let pos = rolled(pos, Side::White, 6, 5);
        let status = pos.validate_movements(&[Movement::new(24, 19)], Side::White);
        assert_eq!(status, MoveStatus::UseHigher);
    }

    #[test]
    fn both_dice_only_play_in_the_other_order() {
        let mut pos = Position::default();
        pos.bar[0] = 1;
        pos.points[17] = 1; // white on 18
        pos.points[13] = -2; // black holds 14
        pos.points[11] = -2; // black holds 12
        let pos = rolled(pos, Side::White, 6, 5);
        // Entering with the 5 strands the 6; entering with the 6 frees 18/13.
        let status = pos.validate_movements(&[Movement::new(25, 20)], Side::White);
        assert_eq!(status, MoveStatus::TrySwap);
    }

    #[test]
    fn fibs_move_black_sentinels() {
        let mut pos = Position::default();
        pos.points[19] = -1;
        pos.bar[1] = 1;
        pos.points[0] = 2;
        let pos = rolled(pos, Side::Black, 5, 5);
        let m = Move::legal([Movement::new(0, 5), Movement::new(20, 25)]);
        assert_eq!(pos.fibs_move(&m, Side::Black, false), "bar-5 20-off");
        assert_eq!(pos.format_move(&m, Side::Black, false), "bar/20 5/off");
    }

    #[test]
    fn too_many_movements_rejected() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let movements = [
            Movement::new(8, 5),
            Movement::new(6, 5),
            Movement::new(13, 10),
        ];
        assert_eq!(
            before.validate_movements(&movements, Side::White),
            MoveStatus::TooManyMoves
        );
    }

    #[test]
    fn wrong_die_rejected() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let movements = [Movement::new(13, 8)];
        assert_eq!(
            before.validate_movements(&movements, Side::White),
            MoveStatus::Illegal
        );
    }

    #[test]
    fn foreign_position_rejected() {
        let before = rolled(Position::initial(), Side::White, 3, 1);
        let mut after = before.clone();
        after.players = [String::from("x"), String::from("y")];
        assert_eq!(
            before.check_move(&after, Side::White).status,
            MoveStatus::Illegal
        );
    }
}
