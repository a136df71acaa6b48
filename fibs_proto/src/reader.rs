//! Stateful classifier turning framed server lines into [`ClipEvent`]s.
//!
//! Lines numbered 1..20 carry their own CLIP code and are parsed
//! field-wise. Everything else is matched by pattern: `board:` lines go
//! through the board decoder, `** ` lines try the specific error shapes
//! before falling back to the generic error event, and two multi-line
//! regions (the message of the day and the saved-match list) are tracked
//! with an explicit state so their member lines classify correctly.

use gammon_core::Movement;

use crate::board::decode_board;
use crate::event::ClipEvent;

const SETTING_NAMES: &[&str] = &[
    "boardstyle",
    "linelength",
    "pagelength",
    "redoubles",
    "sortwho",
    "timezone",
];

const TOGGLE_NAMES: &[&str] = &[
    "allowpip",
    "autoboard",
    "autodouble",
    "automove",
    "away",
    "bell",
    "crawford",
    "double",
    "greedy",
    "moreboards",
    "moves",
    "notify",
    "ratings",
    "ready",
    "report",
    "silent",
    "telnet",
    "wrap",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    Normal,
    /// Between CLIP 3 and CLIP 4; every line is a MOTD line.
    Motd,
    /// After `saved matches:`; rows until a line that is not a row.
    SavedList { saw_row: bool },
}

/// The line classifier. One instance per connection; [`ClipReader::reset`]
/// returns it to the ground state after a reconnect.
#[derive(Debug)]
pub struct ClipReader {
    state: ReaderState,
}

impl Default for ClipReader {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipReader {
    pub fn new() -> Self {
        ClipReader {
            state: ReaderState::Normal,
        }
    }

    pub fn reset(&mut self) {
        self.state = ReaderState::Normal;
    }

    /// Classify one complete line. Usually zero or one event; leaving the
    /// saved-list region re-classifies the terminating line in the same
    /// call, which can yield the terminator's own event as well.
    pub fn parse(&mut self, line: &str) -> Vec<ClipEvent> {
        match self.state {
            ReaderState::Normal => self.classify(line).into_iter().collect(),
            ReaderState::Motd => {
                if line.trim() == "4" {
                    self.state = ReaderState::Normal;
                    vec![ClipEvent::MotdEnd]
                } else {
                    vec![ClipEvent::MotdLine {
                        text: line.to_string(),
                    }]
                }
            }
            ReaderState::SavedList { saw_row } => {
                if let Some(row) = parse_saved_row(line) {
                    self.state = ReaderState::SavedList { saw_row: true };
                    return vec![row];
                }
                if !saw_row && is_saved_header(line) {
                    return Vec::new();
                }
                self.state = ReaderState::Normal;
                self.classify(line).into_iter().collect()
            }
        }
    }

    fn classify(&mut self, line: &str) -> Option<ClipEvent> {
        if line.is_empty() {
            return Some(ClipEvent::Empty);
        }
        if line.starts_with("board:") {
            let Some((position, reversed)) = decode_board(line) else {
                tracing::debug!(?line, "discarding malformed board line");
                return None;
            };
            return Some(ClipEvent::Board {
                position: Box::new(position),
                reversed,
            });
        }
        if let Some(rest) = line.strip_prefix("** ") {
            return Some(classify_starred(rest));
        }
        if let Some((code, rest)) = split_clip_code(line) {
            if let Some(event) = self.classify_numbered(code, rest) {
                return Some(event);
            }
        }
        let event = self.classify_unnumbered(line);
        if event.is_none() {
            tracing::trace!(?line, "unclassified server line");
        }
        event
    }

    fn classify_numbered(&mut self, code: u32, rest: &str) -> Option<ClipEvent> {
        match code {
            1 => {
                let f: Vec<&str> = rest.split_whitespace().collect();
                if f.len() != 3 {
                    return None;
                }
                Some(ClipEvent::Welcome {
                    name: user_token(f[0])?,
                    last_login: f[1].parse().ok()?,
                    last_host: f[2].to_string(),
                })
            }
            2 => parse_own_info(rest),
            3 => {
                self.state = ReaderState::Motd;
                Some(ClipEvent::MotdStart)
            }
            4 => Some(ClipEvent::MotdEnd),
            5 => parse_who_info(rest),
            6 => Some(ClipEvent::WhoInfoEnd),
            7 => {
                let (name, message) = name_and_text(rest)?;
                Some(ClipEvent::Login { name, message })
            }
            8 => {
                let (name, message) = name_and_text(rest)?;
                Some(ClipEvent::Logout { name, message })
            }
            9 => {
                let (from, rest) = rest.split_once(' ')?;
                let (time, text) = rest.split_once(' ')?;
                Some(ClipEvent::Message {
                    from: user_token(from)?,
                    time: time.parse().ok()?,
                    text: text.to_string(),
                })
            }
            10 => Some(ClipEvent::MessageDelivered {
                name: user_token(rest.trim())?,
            }),
            11 => Some(ClipEvent::MessageSaved {
                name: user_token(rest.trim())?,
            }),
            12 => {
                let (name, text) = name_and_text(rest)?;
                Some(ClipEvent::Says { name, text })
            }
            13 => {
                let (name, text) = name_and_text(rest)?;
                Some(ClipEvent::Shouts { name, text })
            }
            14 => {
                let (name, text) = name_and_text(rest)?;
                Some(ClipEvent::Whispers { name, text })
            }
            15 => {
                let (name, text) = name_and_text(rest)?;
                Some(ClipEvent::Kibitzes { name, text })
            }
            16 => {
                let (name, text) = name_and_text(rest)?;
                Some(ClipEvent::YouSay { name, text })
            }
            17 => Some(ClipEvent::YouShout {
                text: rest.to_string(),
            }),
            18 => Some(ClipEvent::YouWhisper {
                text: rest.to_string(),
            }),
            19 => Some(ClipEvent::YouKibitz {
                text: rest.to_string(),
            }),
            20 => {
                let (name, text) = name_and_text(rest)?;
                Some(ClipEvent::Alerts { name, text })
            }
            _ => None,
        }
    }

    fn classify_unnumbered(&mut self, line: &str) -> Option<ClipEvent> {
        match line {
            "Type 'join' if you want to play the next game, type 'leave' if you don't." => {
                return Some(ClipEvent::JoinOrLeave);
            }
            "Settings of variables:" => return Some(ClipEvent::SettingsStart),
            "The current settings are:" => return Some(ClipEvent::TogglesStart),
            "saved matches:" => {
                self.state = ReaderState::SavedList { saw_row: false };
                return Some(ClipEvent::SavedStart);
            }
            "no saved games." => return Some(ClipEvent::SavedNone),
            _ => {}
        }

        if let Some(rest) = line.strip_prefix("turn: ") {
            return Some(ClipEvent::ResumeInfoTurn {
                name: rest.trim_end_matches('.').to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("match length: ") {
            return Some(ClipEvent::ResumeInfoLength {
                length: rest.trim_end_matches('.').parse().ok()?,
            });
        }
        if let Some(rest) = line.strip_prefix("points for ") {
            let (name, points) = rest.split_once(": ")?;
            return Some(ClipEvent::ResumeInfoPoints {
                name: name.to_string(),
                points: points.trim_end_matches('.').parse().ok()?,
            });
        }
        if let Some(rest) = line.strip_prefix("score in ") {
            return parse_game_score(rest);
        }
        if let Some(rest) = line.strip_prefix("Type 'join ") {
            let name = rest.strip_suffix("' to accept.")?;
            return Some(ClipEvent::TypeJoin {
                name: name.to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("You're now watching ") {
            return Some(ClipEvent::YoureWatching {
                name: rest.trim_end_matches('.').to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("You stop watching ") {
            return Some(ClipEvent::StopWatching {
                name: rest.trim_end_matches('.').to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("Starting a new game with ") {
            return Some(ClipEvent::StartGame {
                name: rest.trim_end_matches('.').to_string(),
            });
        }
        if let Some(rest) = line.strip_prefix("Your email address is '") {
            return Some(ClipEvent::ShowAddress {
                address: rest.trim_end_matches("'.").to_string(),
            });
        }

        if let Some(event) = parse_setting_row(line) {
            return Some(event);
        }
        if let Some(event) = parse_toggle_row(line) {
            return Some(event);
        }

        parse_name_led(line)
    }
}

/// Lines that begin with a player name, dispatched on the verb.
fn parse_name_led(line: &str) -> Option<ClipEvent> {
    let (name, rest) = line.split_once(' ')?;
    let name = name.to_string();

    if rest == "rolls" || rest == "roll" {
        return None;
    }
    if let Some(dice) = rest.strip_prefix("rolls ").or_else(|| rest.strip_prefix("roll ")) {
        let (d1, d2) = dice.split_once(" and ")?;
        return Some(ClipEvent::Rolls {
            name,
            d1: d1.parse().ok()?,
            d2: d2.trim_end_matches('.').parse().ok()?,
        });
    }
    if let Some(moves) = rest.strip_prefix("moves ").or_else(|| rest.strip_prefix("move ")) {
        let movements = parse_movements(moves)?;
        return Some(ClipEvent::Moves { name, movements });
    }
    match rest {
        "has left the game." | "has left the game" => {
            return Some(ClipEvent::LeftGame { name });
        }
        "can't move." => return Some(ClipEvent::CannotMove { name }),
        "doubles." | "doubles. Type 'accept' or 'reject'." => {
            return Some(ClipEvent::Doubles { name });
        }
        "rejects. The game continues." => {
            return Some(ClipEvent::RejectsResignation { name });
        }
        "has joined you. Your running match was loaded." => {
            return Some(ClipEvent::Resume { name });
        }
        _ => {}
    }
    if let Some(cube) = rest
        .strip_prefix("accepts the double. The cube shows ")
        .or_else(|| rest.strip_prefix("accept the double. The cube shows "))
    {
        return Some(ClipEvent::AcceptsDouble {
            name,
            cube: cube.trim_end_matches('.').parse().ok()?,
        });
    }
    if let Some(points) = rest.strip_prefix("wants to resign. You will win ") {
        let points = points
            .strip_suffix(" points. Type 'accept' or 'reject'.")
            .or_else(|| points.strip_suffix(" point. Type 'accept' or 'reject'."))?;
        return Some(ClipEvent::Resigns {
            name,
            points: points.parse().ok()?,
        });
    }
    if let Some(points) = rest.strip_prefix("gives up. You win ") {
        let points = strip_points(points)?;
        return Some(ClipEvent::DropsGame {
            name,
            points: points.parse().ok()?,
        });
    }
    if let Some(spec) = rest.strip_prefix("wants to play a") {
        // "a N point match with you." or "an unlimited match with you."
        let spec = spec.strip_suffix(" with you.")?;
        let length = parse_match_spec(spec)?;
        return Some(ClipEvent::Invitation { name, length });
    }
    if rest == "wants to resume a saved match with you." {
        return Some(ClipEvent::Invitation { name, length: -1 });
    }
    if name == "You" && rest.starts_with("accept and win ") {
        let points = strip_points(rest.strip_prefix("accept and win ")?)?;
        return Some(ClipEvent::WinGame {
            name,
            points: points.parse().ok()?,
        });
    }
    if let Some(points) = rest
        .strip_prefix("win the game and get ")
        .or_else(|| rest.strip_prefix("wins the game and gets "))
    {
        let points = points
            .strip_suffix(" points. Congratulations!")
            .or_else(|| points.strip_suffix(" point. Congratulations!"))
            .or_else(|| points.strip_suffix(" points. Sorry."))
            .or_else(|| points.strip_suffix(" point. Sorry."))?;
        return Some(ClipEvent::WinGame {
            name,
            points: points.parse().ok()?,
        });
    }
    if let Some(spec) = rest
        .strip_prefix("win the ")
        .or_else(|| rest.strip_prefix("wins the "))
    {
        // "5 point match 5-2 ." with a stray space before the period.
        let spec = spec.trim_end_matches(" .").trim_end_matches('.');
        let (spec, score) = spec.rsplit_once(' ')?;
        let spec = spec.strip_suffix(" match")?;
        let length = parse_match_spec(&format!(" {spec} match"))?;
        let (s1, s2) = score.split_once('-')?;
        return Some(ClipEvent::WinMatch {
            name,
            length: u64::try_from(length).ok()?,
            score1: s1.parse().ok()?,
            score2: s2.parse().ok()?,
        });
    }
    if let Some(spec) = rest.strip_prefix("has joined you for a") {
        let spec = spec.strip_suffix(" match.")?;
        let length = match spec.strip_prefix("n unlimited") {
            Some("") => 0,
            Some(_) => return None,
            None => spec.strip_suffix(" point")?.trim().parse().ok()?,
        };
        return Some(ClipEvent::StartMatch { name, length });
    }
    if let Some(rest) = rest.strip_prefix("wins a ").map(|r| ("a", r)).or_else(|| {
        rest.strip_prefix("wins an unlimited match against ")
            .map(|r| ("u", r))
    }) {
        return parse_async_win(name, rest.0, rest.1);
    }
    if let Some(rest) = rest.strip_prefix("and ") {
        // "X and Y are resuming their 7-point match."
        let (other, rest) = rest.split_once(' ')?;
        let spec = rest.strip_prefix("are resuming their ")?;
        let spec = spec.strip_suffix(" match.")?;
        let length = if spec == "unlimited" {
            0
        } else {
            spec.strip_suffix("-point")?.parse().ok()?
        };
        return Some(ClipEvent::ResumeMatch {
            name1: name,
            name2: other.to_string(),
            length,
        });
    }
    if let Some(count) = rest.strip_prefix("has ") {
        let count = count
            .strip_suffix(" saved games.")
            .or_else(|| count.strip_suffix(" saved game."))?;
        let count = if count == "no" { 0 } else { count.parse().ok()? };
        return Some(ClipEvent::SavedCount { name, count });
    }
    None
}

/// "X wins a 5 point match against Y 5-2 ." and the unlimited variant.
fn parse_async_win(winner: String, kind: &str, rest: &str) -> Option<ClipEvent> {
    let (length, rest) = if kind == "u" {
        (0, rest)
    } else {
        let (len, rest) = rest.split_once(" point match against ")?;
        (len.parse().ok()?, rest)
    };
    let rest = rest.trim_end_matches(" .").trim_end_matches('.');
    let (loser, score) = rest.rsplit_once(' ')?;
    let (s1, s2) = score.split_once('-')?;
    Some(ClipEvent::AsyncWinMatch {
        winner,
        loser: loser.trim().to_string(),
        length,
        score1: s1.parse().ok()?,
        score2: s2.parse().ok()?,
    })
}

/// The specific `** ` shapes, tried before the generic error fallback.
fn classify_starred(rest: &str) -> ClipEvent {
    if rest == "I heard you." {
        return ClipEvent::HeardYou;
    }
    if let Some(name) = rest
        .strip_prefix("There is no one called ")
        .and_then(|r| r.strip_suffix('.'))
    {
        return ClipEvent::NoSuchUser {
            name: name.to_string(),
        };
    }
    if let Some(address) = rest
        .strip_prefix('\'')
        .and_then(|r| r.strip_suffix("' is not an email address."))
    {
        return ClipEvent::InvalidAddress {
            address: address.to_string(),
        };
    }
    if let Some(name) = rest
        .strip_prefix("Please wait for ")
        .and_then(|r| r.strip_suffix(" to join too."))
    {
        return ClipEvent::WaitJoinToo {
            name: name.to_string(),
        };
    }
    if let Some(spec) = rest.strip_prefix("You are now playing a") {
        // "a 5 point match with X" or "n unlimited match with X".
        if let Some((spec, name)) = spec.split_once(" match with ") {
            let length = if spec == "n unlimited" {
                Some(0)
            } else {
                spec.strip_suffix(" point").and_then(|l| l.trim().parse().ok())
            };
            if let Some(length) = length {
                return ClipEvent::NowPlaying {
                    name: name.trim_end_matches('.').to_string(),
                    length,
                };
            }
        }
    }
    if let Some(spec) = rest.strip_prefix("You invited ") {
        if let Some(name) = spec.strip_suffix(" to resume a saved match.") {
            return ClipEvent::InviteConfirm {
                name: name.to_string(),
                length: -1,
            };
        }
        if let Some((name, spec)) = spec.split_once(" to a") {
            if let Some(spec) = spec.strip_suffix(" match.") {
                let length = if spec == "n unlimited" {
                    Some(0)
                } else {
                    spec.strip_suffix(" point").and_then(|l| l.trim().parse().ok())
                };
                if let Some(length) = length {
                    return ClipEvent::InviteConfirm {
                        name: name.to_string(),
                        length,
                    };
                }
            }
        }
    }
    if let Some((name, value)) = rest
        .strip_prefix("Value of '")
        .and_then(|r| r.strip_suffix('.'))
        .and_then(|r| r.split_once("' set to "))
    {
        return ClipEvent::Setting {
            name: name.to_string(),
            value: value.to_string(),
        };
    }
    if let Some(event) = starred_toggle(rest) {
        return event;
    }
    if rest.starts_with("There's no saved match with ")
        || rest == "You can't invite yourself."
        || rest.ends_with("is already playing with someone else.")
    {
        return ClipEvent::InviteError {
            text: rest.to_string(),
        };
    }
    ClipEvent::Error {
        code: 0,
        text: rest.to_string(),
    }
}

/// Toggle confirmations the session reconciles against.
fn starred_toggle(rest: &str) -> Option<ClipEvent> {
    let (name, value) = match rest {
        "You'll be notified when new players log in." => ("notify", true),
        "You won't be notified when new players log in." => ("notify", false),
        "The board will be refreshed after every move." => ("autoboard", true),
        "The board won't be refreshed after every move." => ("autoboard", false),
        "You're now ready to invite or join someone." => ("ready", true),
        "You're now refusing to play with someone." => ("ready", false),
        _ => return None,
    };
    Some(ClipEvent::Toggle {
        name: name.to_string(),
        value,
    })
}

/// " N point" -> N, " unlimited" / "n unlimited" -> 0.
fn parse_match_spec(spec: &str) -> Option<i64> {
    let spec = spec.strip_suffix(" match").unwrap_or(spec);
    if spec == "n unlimited" || spec == " unlimited" {
        return Some(0);
    }
    spec.strip_suffix(" point")?.trim().parse().ok()
}

fn strip_points(s: &str) -> Option<&str> {
    s.strip_suffix(" points.").or_else(|| s.strip_suffix(" point."))
}

/// "5 point match: alice-2 bob-1" (length already stripped of "score in ").
fn parse_game_score(rest: &str) -> Option<ClipEvent> {
    let (spec, scores) = rest.split_once(" match: ")?;
    let length = if spec == "unlimited" {
        0
    } else {
        spec.strip_suffix(" point")?.parse().ok()?
    };
    let (a, b) = scores.split_once(' ')?;
    let (name1, score1) = a.rsplit_once('-')?;
    let (name2, score2) = b.trim_end_matches('.').rsplit_once('-')?;
    Some(ClipEvent::GameScore {
        length,
        name1: name1.to_string(),
        score1: score1.parse().ok()?,
        name2: name2.to_string(),
        score2: score2.parse().ok()?,
    })
}

fn parse_setting_row(line: &str) -> Option<ClipEvent> {
    let (name, value) = line.split_once(':')?;
    if !SETTING_NAMES.contains(&name) {
        return None;
    }
    Some(ClipEvent::Setting {
        name: name.to_string(),
        value: value.trim().to_string(),
    })
}

fn parse_toggle_row(line: &str) -> Option<ClipEvent> {
    let mut parts = line.split_whitespace();
    let name = parts.next()?;
    let value = parts.next()?;
    if parts.next().is_some() || !TOGGLE_NAMES.contains(&name) {
        return None;
    }
    let value = match value {
        "YES" => true,
        "NO" => false,
        _ => return None,
    };
    Some(ClipEvent::Toggle {
        name: name.to_string(),
        value,
    })
}

/// "  opponent          3                0 -  0", optionally marked with
/// a leading `*` when the opponent is online.
fn parse_saved_row(line: &str) -> Option<ClipEvent> {
    let f: Vec<&str> = line.split_whitespace().collect();
    if f.len() != 5 || f[3] != "-" {
        return None;
    }
    let opponent = f[0].trim_start_matches('*');
    if opponent.is_empty() {
        return None;
    }
    let length = if f[1] == "unlimited" {
        0
    } else {
        f[1].parse().ok()?
    };
    Some(ClipEvent::SavedRow {
        opponent: opponent.to_string(),
        length,
        score1: f[2].parse().ok()?,
        score2: f[4].parse().ok()?,
    })
}

fn is_saved_header(line: &str) -> bool {
    let f: Vec<&str> = line.split_whitespace().collect();
    f.first() == Some(&"opponent") && f.get(1) == Some(&"matchlength")
}

/// "2 GibbonTestA 1 1 0 ..." with the login-time toggle block.
fn parse_own_info(rest: &str) -> Option<ClipEvent> {
    let f: Vec<&str> = rest.split_whitespace().collect();
    if f.len() != 21 {
        return None;
    }
    let flag = |i: usize| -> Option<bool> {
        match f[i] {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        }
    };
    let redoubles = match f[17] {
        "none" => 0,
        "unlimited" => -1,
        n => n.parse().ok()?,
    };
    Some(ClipEvent::OwnInfo {
        name: user_token(f[0])?,
        allowpip: flag(1)?,
        autoboard: flag(2)?,
        autodouble: flag(3)?,
        automove: flag(4)?,
        away: flag(5)?,
        bell: flag(6)?,
        crawford: flag(7)?,
        double: flag(8)?,
        experience: f[9].parse().ok()?,
        greedy: flag(10)?,
        moreboards: flag(11)?,
        moves: flag(12)?,
        notify: flag(13)?,
        rating: f[14].parse().ok()?,
        ratings: flag(15)?,
        ready: flag(16)?,
        redoubles,
        report: flag(18)?,
        silent: flag(19)?,
        timezone: f[20].to_string(),
    })
}

fn parse_who_info(rest: &str) -> Option<ClipEvent> {
    let f: Vec<&str> = rest.split_whitespace().collect();
    if f.len() != 12 {
        return None;
    }
    let flag = |i: usize| -> Option<bool> {
        match f[i] {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        }
    };
    Some(ClipEvent::WhoInfo {
        name: user_token(f[0])?,
        opponent: dash_empty(f[1]),
        watching: dash_empty(f[2]),
        ready: flag(3)?,
        away: flag(4)?,
        rating: f[5].parse().ok()?,
        experience: f[6].parse().ok()?,
        idle: f[7].parse().ok()?,
        login: f[8].parse().ok()?,
        hostname: f[9].trim_end_matches('*').to_string(),
        client: dash_empty(f[10]),
        email: dash_empty(f[11]),
    })
}

fn split_clip_code(line: &str) -> Option<(u32, &str)> {
    let (code, rest) = line.split_once(' ').unwrap_or((line, ""));
    let code: u32 = code.parse().ok()?;
    if (1..=20).contains(&code) {
        Some((code, rest))
    } else {
        None
    }
}

fn name_and_text(rest: &str) -> Option<(String, String)> {
    let (name, text) = rest.split_once(' ').unwrap_or((rest, ""));
    Some((user_token(name)?, text.to_string()))
}

/// CLIP user fields never carry the literal `You`.
fn user_token(tok: &str) -> Option<String> {
    if tok.is_empty() || tok == "You" {
        None
    } else {
        Some(tok.to_string())
    }
}

fn dash_empty(tok: &str) -> String {
    if tok == "-" {
        String::new()
    } else {
        tok.to_string()
    }
}

/// "8-5", "bar-20", "3-off". The bar and tray sentinels are resolved
/// from the numeric endpoint: moves near 25 belong to the side whose bar
/// is 25 and whose tray is 0, and symmetrically for the other side.
fn parse_movement(tok: &str) -> Option<Movement> {
    let (from, to) = tok.split_once('-')?;
    let movement = match (from, to) {
        ("bar", n) => {
            let to: u8 = n.parse().ok()?;
            let from = if to >= 13 { 25 } else { 0 };
            Movement { from, to }
        }
        (n, "off") => {
            let from: u8 = n.parse().ok()?;
            let to = if from >= 13 { 25 } else { 0 };
            Movement { from, to }
        }
        (f, t) => Movement {
            from: f.parse().ok()?,
            to: t.parse().ok()?,
        },
    };
    if movement.from > 25 || movement.to > 25 {
        return None;
    }
    Some(movement)
}

fn parse_movements(rest: &str) -> Option<Vec<Movement>> {
    let mut movements = Vec::new();
    for tok in rest.split_whitespace() {
        if tok == "." {
            break;
        }
        movements.push(parse_movement(tok.trim_end_matches('.'))?);
    }
    if movements.is_empty() || movements.len() > 4 {
        return None;
    }
    Some(movements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn one(reader: &mut ClipReader, line: &str) -> ClipEvent {
        let mut events = reader.parse(line);
        assert_eq!(events.len(), 1, "expected one event for {line:?}");
        events.pop().unwrap()
    }

    #[test]
    fn welcome_line() {
        let mut r = ClipReader::new();
        let ev = one(&mut r, "1 GibbonTestA 1306865048 gibbon.example.com");
        assert_eq!(
            ev,
            ClipEvent::Welcome {
                name: "GibbonTestA".into(),
                last_login: 1306865048,
                last_host: "gibbon.example.com".into(),
            }
        );
        assert_eq!(ev.code(), 1);
    }

    #[test]
    fn own_info_line() {
        let mut r = ClipReader::new();
        let line = "2 GibbonTestA 1 1 0 0 0 0 1 1 2396 0 0 0 1 3457.85 0 0 none 1 0 Australia/Melbourne";
        match one(&mut r, line) {
            ClipEvent::OwnInfo {
                name,
                autoboard,
                experience,
                notify,
                rating,
                ready,
                redoubles,
                timezone,
                ..
            } => {
                assert_eq!(name, "GibbonTestA");
                assert!(autoboard);
                assert_eq!(experience, 2396);
                assert!(notify);
                assert_eq!(rating, 3457.85);
                assert!(!ready);
                assert_eq!(redoubles, 0);
                assert_eq!(timezone, "Australia/Melbourne");
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn motd_region() {
        let mut r = ClipReader::new();
        assert_eq!(r.parse("3"), vec![ClipEvent::MotdStart]);
        assert_eq!(
            r.parse("+--- Welcome ---+"),
            vec![ClipEvent::MotdLine {
                text: "+--- Welcome ---+".into()
            }]
        );
        // Numbered-looking lines inside the MOTD stay MOTD lines.
        assert_eq!(
            r.parse("1 is the loneliest number"),
            vec![ClipEvent::MotdLine {
                text: "1 is the loneliest number".into()
            }]
        );
        assert_eq!(r.parse("4"), vec![ClipEvent::MotdEnd]);
        assert_eq!(
            r.parse(""),
            vec![ClipEvent::Empty],
            "back to normal classification"
        );
    }

    #[test]
    fn who_info_placeholders() {
        let mut r = ClipReader::new();
        let line = "5 someplayer - - 1 0 1418.61 23 1914 1041253132 somehost.example.com* Gibbon_0.1 -";
        match one(&mut r, line) {
            ClipEvent::WhoInfo {
                name,
                opponent,
                watching,
                ready,
                rating,
                hostname,
                client,
                email,
                ..
            } => {
                assert_eq!(name, "someplayer");
                assert_eq!(opponent, "");
                assert_eq!(watching, "");
                assert!(ready);
                assert_eq!(rating, 1418.61);
                assert_eq!(hostname, "somehost.example.com");
                assert_eq!(client, "Gibbon_0.1");
                assert_eq!(email, "");
            }
            other => panic!("wrong event: {other:?}"),
        }
        assert_eq!(one(&mut r, "6"), ClipEvent::WhoInfoEnd);
    }

    #[test]
    fn you_is_not_a_user() {
        let mut r = ClipReader::new();
        assert!(r.parse("7 You logs in.").is_empty());
        assert!(r.parse("1 You 1306865048 host").is_empty());
    }

    #[test]
    fn chat_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "7 someplayer someplayer logs in."),
            ClipEvent::Login {
                name: "someplayer".into(),
                message: "someplayer logs in.".into(),
            }
        );
        assert_eq!(
            one(&mut r, "8 someplayer someplayer drops connection."),
            ClipEvent::Logout {
                name: "someplayer".into(),
                message: "someplayer drops connection.".into(),
            }
        );
        assert_eq!(
            one(&mut r, "9 someplayer 1041253132 I'll log in at 10pm."),
            ClipEvent::Message {
                from: "someplayer".into(),
                time: 1041253132,
                text: "I'll log in at 10pm.".into(),
            }
        );
        assert_eq!(
            one(&mut r, "12 someplayer Hello there"),
            ClipEvent::Says {
                name: "someplayer".into(),
                text: "Hello there".into(),
            }
        );
        assert_eq!(
            one(&mut r, "13 someplayer Anyone for a 5 pointer?"),
            ClipEvent::Shouts {
                name: "someplayer".into(),
                text: "Anyone for a 5 pointer?".into(),
            }
        );
        assert_eq!(
            one(&mut r, "17 Anyone for a 5 pointer?"),
            ClipEvent::YouShout {
                text: "Anyone for a 5 pointer?".into(),
            }
        );
        assert_eq!(
            one(&mut r, "16 someplayer Good luck!"),
            ClipEvent::YouSay {
                name: "someplayer".into(),
                text: "Good luck!".into(),
            }
        );
    }

    #[test]
    fn generic_error_fallback() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "** Funny new message!"),
            ClipEvent::Error {
                code: 0,
                text: "Funny new message!".into(),
            }
        );
        assert_eq!(one(&mut r, "** I heard you."), ClipEvent::HeardYou);
    }

    #[test]
    fn specific_starred_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "** There is no one called nonexistent."),
            ClipEvent::NoSuchUser {
                name: "nonexistent".into()
            }
        );
        assert_eq!(
            one(&mut r, "** 'not-an-address' is not an email address."),
            ClipEvent::InvalidAddress {
                address: "not-an-address".into()
            }
        );
        assert_eq!(
            one(&mut r, "** Please wait for someplayer to join too."),
            ClipEvent::WaitJoinToo {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "** You are now playing a 5 point match with someplayer"),
            ClipEvent::NowPlaying {
                name: "someplayer".into(),
                length: 5,
            }
        );
        assert_eq!(
            one(&mut r, "** You invited someplayer to a 5 point match."),
            ClipEvent::InviteConfirm {
                name: "someplayer".into(),
                length: 5,
            }
        );
        assert_eq!(
            one(&mut r, "** You invited someplayer to resume a saved match."),
            ClipEvent::InviteConfirm {
                name: "someplayer".into(),
                length: -1,
            }
        );
        assert_eq!(
            one(&mut r, "** Value of 'boardstyle' set to 3."),
            ClipEvent::Setting {
                name: "boardstyle".into(),
                value: "3".into(),
            }
        );
        assert_eq!(
            one(&mut r, "** You'll be notified when new players log in."),
            ClipEvent::Toggle {
                name: "notify".into(),
                value: true,
            }
        );
        assert_eq!(
            one(&mut r, "** You can't invite yourself."),
            ClipEvent::InviteError {
                text: "You can't invite yourself.".into()
            }
        );
    }

    #[test]
    fn board_line_classifies() {
        let mut r = ClipReader::new();
        let line = "board:GibbonTestA:GibbonTestB:5:0:0:-2:0:0:0:0:5:0:3:0:0:0:-5:5:0:0:0:-3:0:-5:0:0:0:0:2:-1:0:0:6:6:1:1:1:0:1:1:0:25:0:0:0:0:0:0:0:0:0:0";
        let ev = one(&mut r, line);
        assert_eq!(ev.code(), 200);
        match ev {
            ClipEvent::Board { position, reversed } => {
                assert_eq!(position.dice, [6, 6]);
                assert!(!reversed);
            }
            other => panic!("wrong event: {other:?}"),
        }
        // A malformed board line yields nothing, not an error event.
        assert!(r.parse("board:a:b:garbage").is_empty());
    }

    #[test]
    fn roll_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "someplayer rolls 3 and 1."),
            ClipEvent::Rolls {
                name: "someplayer".into(),
                d1: 3,
                d2: 1,
            }
        );
        assert_eq!(
            one(&mut r, "You roll 6 and 6."),
            ClipEvent::Rolls {
                name: "You".into(),
                d1: 6,
                d2: 6,
            }
        );
    }

    #[test]
    fn move_lines_canonicalize_sentinels() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "someplayer moves 8-5 6-5 ."),
            ClipEvent::Moves {
                name: "someplayer".into(),
                movements: vec![
                    Movement { from: 8, to: 5 },
                    Movement { from: 6, to: 5 },
                ],
            }
        );
        assert_eq!(
            one(&mut r, "someplayer moves bar-20 5-off ."),
            ClipEvent::Moves {
                name: "someplayer".into(),
                movements: vec![
                    Movement { from: 25, to: 20 },
                    Movement { from: 5, to: 0 },
                ],
            }
        );
        assert_eq!(
            one(&mut r, "someplayer moves bar-3 18-off ."),
            ClipEvent::Moves {
                name: "someplayer".into(),
                movements: vec![
                    Movement { from: 0, to: 3 },
                    Movement { from: 18, to: 25 },
                ],
            }
        );
    }

    #[test]
    fn game_flow_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "Starting a new game with someplayer."),
            ClipEvent::StartGame {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "someplayer has left the game."),
            ClipEvent::LeftGame {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "someplayer can't move."),
            ClipEvent::CannotMove {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "someplayer doubles. Type 'accept' or 'reject'."),
            ClipEvent::Doubles {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "someplayer accepts the double. The cube shows 2."),
            ClipEvent::AcceptsDouble {
                name: "someplayer".into(),
                cube: 2,
            }
        );
        assert_eq!(
            one(
                &mut r,
                "someplayer wants to resign. You will win 2 points. Type 'accept' or 'reject'."
            ),
            ClipEvent::Resigns {
                name: "someplayer".into(),
                points: 2,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer rejects. The game continues."),
            ClipEvent::RejectsResignation {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "someplayer gives up. You win 1 point."),
            ClipEvent::DropsGame {
                name: "someplayer".into(),
                points: 1,
            }
        );
    }

    #[test]
    fn invitation_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "someplayer wants to play a 5 point match with you."),
            ClipEvent::Invitation {
                name: "someplayer".into(),
                length: 5,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer wants to play an unlimited match with you."),
            ClipEvent::Invitation {
                name: "someplayer".into(),
                length: 0,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer wants to resume a saved match with you."),
            ClipEvent::Invitation {
                name: "someplayer".into(),
                length: -1,
            }
        );
        assert_eq!(
            one(&mut r, "Type 'join someplayer' to accept."),
            ClipEvent::TypeJoin {
                name: "someplayer".into()
            }
        );
    }

    #[test]
    fn match_lifecycle_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "someplayer has joined you for a 5 point match."),
            ClipEvent::StartMatch {
                name: "someplayer".into(),
                length: 5,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer has joined you for an unlimited match."),
            ClipEvent::StartMatch {
                name: "someplayer".into(),
                length: 0,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer has joined you. Your running match was loaded."),
            ClipEvent::Resume {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "turn: someplayer"),
            ClipEvent::ResumeInfoTurn {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "match length: 7"),
            ClipEvent::ResumeInfoLength { length: 7 }
        );
        assert_eq!(
            one(&mut r, "points for someplayer: 3"),
            ClipEvent::ResumeInfoPoints {
                name: "someplayer".into(),
                points: 3,
            }
        );
        assert_eq!(
            one(
                &mut r,
                "Type 'join' if you want to play the next game, type 'leave' if you don't."
            ),
            ClipEvent::JoinOrLeave
        );
        assert_eq!(
            one(&mut r, "You win the game and get 4 points. Congratulations!"),
            ClipEvent::WinGame {
                name: "You".into(),
                points: 4,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer wins the game and gets 1 point. Sorry."),
            ClipEvent::WinGame {
                name: "someplayer".into(),
                points: 1,
            }
        );
        assert_eq!(
            one(&mut r, "You accept and win 2 points."),
            ClipEvent::WinGame {
                name: "You".into(),
                points: 2,
            }
        );
        assert_eq!(
            one(&mut r, "score in 5 point match: GibbonTestA-2 someplayer-1"),
            ClipEvent::GameScore {
                length: 5,
                name1: "GibbonTestA".into(),
                score1: 2,
                name2: "someplayer".into(),
                score2: 1,
            }
        );
        assert_eq!(
            one(&mut r, "You win the 5 point match 5-2 ."),
            ClipEvent::WinMatch {
                name: "You".into(),
                length: 5,
                score1: 5,
                score2: 2,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer wins a 5 point match against otherplayer 5-2 ."),
            ClipEvent::AsyncWinMatch {
                winner: "someplayer".into(),
                loser: "otherplayer".into(),
                length: 5,
                score1: 5,
                score2: 2,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer and otherplayer are resuming their 7-point match."),
            ClipEvent::ResumeMatch {
                name1: "someplayer".into(),
                name2: "otherplayer".into(),
                length: 7,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer and otherplayer are resuming their unlimited match."),
            ClipEvent::ResumeMatch {
                name1: "someplayer".into(),
                name2: "otherplayer".into(),
                length: 0,
            }
        );
    }

    #[test]
    fn watching_lines() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "You're now watching someplayer."),
            ClipEvent::YoureWatching {
                name: "someplayer".into()
            }
        );
        assert_eq!(
            one(&mut r, "You stop watching someplayer."),
            ClipEvent::StopWatching {
                name: "someplayer".into()
            }
        );
    }

    #[test]
    fn settings_and_toggles() {
        let mut r = ClipReader::new();
        assert_eq!(one(&mut r, "Settings of variables:"), ClipEvent::SettingsStart);
        assert_eq!(
            one(&mut r, "boardstyle: 3"),
            ClipEvent::Setting {
                name: "boardstyle".into(),
                value: "3".into(),
            }
        );
        assert_eq!(one(&mut r, "The current settings are:"), ClipEvent::TogglesStart);
        assert_eq!(
            one(&mut r, "notify          YES"),
            ClipEvent::Toggle {
                name: "notify".into(),
                value: true,
            }
        );
        assert_eq!(
            one(&mut r, "autoboard       NO"),
            ClipEvent::Toggle {
                name: "autoboard".into(),
                value: false,
            }
        );
        // Not one of the known names; quietly ignored.
        assert!(r.parse("frobnicate YES").is_empty());
    }

    #[test]
    fn saved_list_region() {
        let mut r = ClipReader::new();
        assert_eq!(r.parse("saved matches:"), vec![ClipEvent::SavedStart]);
        assert!(
            r.parse("  opponent          matchlength   score (your points first)")
                .is_empty(),
            "header row is skipped"
        );
        assert_eq!(
            r.parse("  someplayer            5                2 -  3"),
            vec![ClipEvent::SavedRow {
                opponent: "someplayer".into(),
                length: 5,
                score1: 2,
                score2: 3,
            }]
        );
        assert_eq!(
            r.parse(" *otherplayer           unlimited        1 -  0"),
            vec![ClipEvent::SavedRow {
                opponent: "otherplayer".into(),
                length: 0,
                score1: 1,
                score2: 0,
            }]
        );
        // A non-row line leaves the region and classifies normally.
        assert_eq!(
            r.parse("The current settings are:"),
            vec![ClipEvent::TogglesStart]
        );
        assert_eq!(r.parse("no saved games."), vec![ClipEvent::SavedNone]);
    }

    #[test]
    fn saved_counts_and_address() {
        let mut r = ClipReader::new();
        assert_eq!(
            one(&mut r, "someplayer has 3 saved games."),
            ClipEvent::SavedCount {
                name: "someplayer".into(),
                count: 3,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer has no saved games."),
            ClipEvent::SavedCount {
                name: "someplayer".into(),
                count: 0,
            }
        );
        assert_eq!(
            one(&mut r, "someplayer has 1 saved game."),
            ClipEvent::SavedCount {
                name: "someplayer".into(),
                count: 1,
            }
        );
        assert_eq!(
            one(&mut r, "Your email address is 'player@example.com'."),
            ClipEvent::ShowAddress {
                address: "player@example.com".into()
            }
        );
    }

    #[test]
    fn reset_leaves_regions() {
        let mut r = ClipReader::new();
        r.parse("3");
        r.reset();
        assert_eq!(r.parse(""), vec![ClipEvent::Empty]);
    }
}
