use gammon_core::{Position, Side, NUM_POINTS};

/// Number of colon-separated fields following the `board:` label.
const BOARD_FIELDS: usize = 52;

/// Decode a FIBS `board:` line into a canonical [`Position`] plus the
/// direction flag from field 39.
///
/// Field 0/1 name the reporting (white) and opposing (black) player. The
/// 24 occupancies of fields 5..28 arrive in the reporter's frame; the
/// colour multiplier (field 38) and direction (field 39) map them into
/// white-origin indexing. Any out-of-range value aborts the decode.
pub fn decode_board(line: &str) -> Option<(Position, bool)> {
    let rest = line.strip_prefix("board:")?;
    let fields: Vec<&str> = rest.split(':').collect();
    if fields.len() != BOARD_FIELDS {
        return None;
    }

    let num = |i: usize| -> Option<i64> { fields[i].parse().ok() };

    let mut pos = Position::default();
    pos.players = [fields[0].to_string(), fields[1].to_string()];
    if pos.players[0].is_empty() || pos.players[1].is_empty() {
        return None;
    }

    let raw_length = num(2)?;
    pos.match_length = if raw_length >= 9999 {
        0
    } else {
        u8::try_from(raw_length).ok()?
    };
    pos.scores = [
        u8::try_from(num(3)?).ok()?,
        u8::try_from(num(4)?).ok()?,
    ];

    let colour = match num(38)? {
        1 => 1i8,
        -1 => -1i8,
        _ => return None,
    };
    let direction = match num(39)? {
        1 => 1i8,
        -1 => -1i8,
        _ => return None,
    };

    for i in 0..NUM_POINTS {
        let raw = i8::try_from(num(5 + i)?).ok()?;
        if raw.unsigned_abs() > 15 {
            return None;
        }
        let index = if direction == -1 { NUM_POINTS - 1 - i } else { i };
        pos.points[index] = raw * colour;
    }

    pos.turn = match num(29)? {
        0 => None,
        t @ (1 | -1) => {
            if t as i8 == colour {
                Some(Side::White)
            } else {
                Some(Side::Black)
            }
        }
        _ => return None,
    };

    let die = |i: usize| -> Option<i8> {
        let d = num(i)?;
        if (0..=6).contains(&d) {
            Some(d as i8)
        } else {
            None
        }
    };
    let white_dice = [die(30)?, die(31)?];
    let black_dice = [die(32)?, die(33)?];
    pos.dice = match pos.turn {
        Some(Side::White) => white_dice,
        Some(Side::Black) => black_dice,
        None => [0, 0],
    };
    pos.reset_unused_dice();

    let cube = u32::try_from(num(34)?).ok()?;
    if !cube.is_power_of_two() {
        return None;
    }
    pos.cube = cube;
    pos.may_double = [num(35)? == 1, num(36)? == 1];
    pos.cube_turned = match num(37)? {
        0 => None,
        t @ (1 | -1) => {
            if t as i8 == colour {
                Some(Side::White)
            } else {
                Some(Side::Black)
            }
        }
        _ => return None,
    };

    pos.bar = [
        u8::try_from(num(42)?).ok()?,
        u8::try_from(num(43)?).ok()?,
    ];

    annotate_crawford(&mut pos, num(45)? != 0, num(46)? != 0);

    pos.validate().ok()?;

    Some((pos, direction == -1))
}

/// Derive the Crawford annotation from the two flag fields and the score.
/// During the Crawford game itself, doubling is disabled for both sides.
fn annotate_crawford(pos: &mut Position, no_crawford: bool, post_crawford: bool) {
    if pos.match_length == 0 || no_crawford {
        return;
    }
    let one_away = pos
        .scores
        .iter()
        .any(|&s| u16::from(s) + 1 == u16::from(pos.match_length));
    if !one_away {
        return;
    }
    if post_crawford {
        pos.game_info = Some("Post-Crawford game".to_string());
    } else {
        pos.game_info = Some("Crawford game".to_string());
        pos.may_double = [false, false];
    }
}
