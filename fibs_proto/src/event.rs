use gammon_core::{Movement, Position};

/// A classified server line.
///
/// The numeric code carried by [`ClipEvent::code`] is part of the protocol
/// contract: the session dispatches on it, and for the CLIP-numbered lines
/// (1..20) it is the number the server itself sent. The higher codes tag
/// the unnumbered lines the reader classifies by pattern.
#[derive(Debug, Clone, PartialEq)]
pub enum ClipEvent {
    /// 1: login confirmed: name, last login time, last host.
    Welcome {
        name: String,
        last_login: i64,
        last_host: String,
    },
    /// 2: own settings as reported at login.
    OwnInfo {
        name: String,
        allowpip: bool,
        autoboard: bool,
        autodouble: bool,
        automove: bool,
        away: bool,
        bell: bool,
        crawford: bool,
        double: bool,
        experience: u64,
        greedy: bool,
        moreboards: bool,
        moves: bool,
        notify: bool,
        rating: f64,
        ratings: bool,
        ready: bool,
        redoubles: i64,
        report: bool,
        silent: bool,
        timezone: String,
    },
    /// 3
    MotdStart,
    /// 4
    MotdEnd,
    /// 5: one roster line.
    WhoInfo {
        name: String,
        opponent: String,
        watching: String,
        ready: bool,
        away: bool,
        rating: f64,
        experience: u64,
        idle: u64,
        login: u64,
        hostname: String,
        client: String,
        email: String,
    },
    /// 6
    WhoInfoEnd,
    /// 7
    Login { name: String, message: String },
    /// 8
    Logout { name: String, message: String },
    /// 9: an offline message, with the time it was left.
    Message {
        from: String,
        time: u64,
        text: String,
    },
    /// 10
    MessageDelivered { name: String },
    /// 11
    MessageSaved { name: String },
    /// 12
    Says { name: String, text: String },
    /// 13
    Shouts { name: String, text: String },
    /// 14
    Whispers { name: String, text: String },
    /// 15
    Kibitzes { name: String, text: String },
    /// 16
    YouSay { name: String, text: String },
    /// 17
    YouShout { text: String },
    /// 18
    YouWhisper { text: String },
    /// 19
    YouKibitz { text: String },
    /// 20
    Alerts { name: String, text: String },
    /// 100: an error line. `code` 0 is the generic `** ` fallback.
    Error { code: i64, text: String },
    /// 200: a decoded board. `reversed` reflects the direction field.
    Board {
        position: Box<Position>,
        reversed: bool,
    },
    /// 202
    Rolls { name: String, d1: u8, d2: u8 },
    /// 203: movements with `bar`/`off` already canonicalized to 25/0.
    Moves {
        name: String,
        movements: Vec<Movement>,
    },
    /// 204
    StartGame { name: String },
    /// 205
    LeftGame { name: String },
    /// 206
    CannotMove { name: String },
    /// 207
    Doubles { name: String },
    /// 208
    AcceptsDouble { name: String, cube: u64 },
    /// 209
    Resigns { name: String, points: u64 },
    /// 210
    RejectsResignation { name: String },
    /// 211
    DropsGame { name: String, points: u64 },
    /// 300: match invitation. Length 0 is unlimited, -1 a saved resume.
    Invitation { name: String, length: i64 },
    /// 301
    TypeJoin { name: String },
    /// 302
    YoureWatching { name: String },
    /// 303
    NowPlaying { name: String, length: u64 },
    /// 304
    InviteError { text: String },
    /// 305
    Resume { name: String },
    /// 306
    ResumeInfoTurn { name: String },
    /// 307
    ResumeInfoLength { length: u64 },
    /// 308
    ResumeInfoPoints { name: String, points: u64 },
    /// 309
    JoinOrLeave,
    /// 310
    WinGame { name: String, points: u64 },
    /// 311
    GameScore {
        length: u64,
        name1: String,
        score1: u64,
        name2: String,
        score2: u64,
    },
    /// 312
    WaitJoinToo { name: String },
    /// 313: invitation confirmed back to us; length -1 is a resume.
    InviteConfirm { name: String, length: i64 },
    /// 314
    WinMatch {
        name: String,
        length: u64,
        score1: u64,
        score2: u64,
    },
    /// 315
    StopWatching { name: String },
    /// 400
    StartMatch { name: String, length: u64 },
    /// 401: a third-party match result.
    AsyncWinMatch {
        winner: String,
        loser: String,
        length: u64,
        score1: u64,
        score2: u64,
    },
    /// 402
    ResumeMatch {
        name1: String,
        name2: String,
        length: u64,
    },
    /// 403
    Empty,
    /// 404
    SettingsStart,
    /// 405
    Setting { name: String, value: String },
    /// 406
    TogglesStart,
    /// 407
    Toggle { name: String, value: bool },
    /// 408
    SavedStart,
    /// 409
    SavedRow {
        opponent: String,
        length: u64,
        score1: u64,
        score2: u64,
    },
    /// 410
    SavedNone,
    /// 411
    SavedCount { name: String, count: u64 },
    /// 412
    ShowAddress { address: String },
    /// 413
    MotdLine { text: String },
    /// 414
    NoSuchUser { name: String },
    /// 415
    InvalidAddress { address: String },
    /// 500
    HeardYou,
}

impl ClipEvent {
    /// The numeric event code the session dispatches on.
    pub fn code(&self) -> i64 {
        match self {
            ClipEvent::Welcome { .. } => 1,
            ClipEvent::OwnInfo { .. } => 2,
            ClipEvent::MotdStart => 3,
            ClipEvent::MotdEnd => 4,
            ClipEvent::WhoInfo { .. } => 5,
            ClipEvent::WhoInfoEnd => 6,
            ClipEvent::Login { .. } => 7,
            ClipEvent::Logout { .. } => 8,
            ClipEvent::Message { .. } => 9,
            ClipEvent::MessageDelivered { .. } => 10,
            ClipEvent::MessageSaved { .. } => 11,
            ClipEvent::Says { .. } => 12,
            ClipEvent::Shouts { .. } => 13,
            ClipEvent::Whispers { .. } => 14,
            ClipEvent::Kibitzes { .. } => 15,
            ClipEvent::YouSay { .. } => 16,
            ClipEvent::YouShout { .. } => 17,
            ClipEvent::YouWhisper { .. } => 18,
            ClipEvent::YouKibitz { .. } => 19,
            ClipEvent::Alerts { .. } => 20,
            ClipEvent::Error { .. } => 100,
            ClipEvent::Board { .. } => 200,
            ClipEvent::Rolls { .. } => 202,
            ClipEvent::Moves { .. } => 203,
            ClipEvent::StartGame { .. } => 204,
            ClipEvent::LeftGame { .. } => 205,
            ClipEvent::CannotMove { .. } => 206,
            ClipEvent::Doubles { .. } => 207,
            ClipEvent::AcceptsDouble { .. } => 208,
            ClipEvent::Resigns { .. } => 209,
            ClipEvent::RejectsResignation { .. } => 210,
            ClipEvent::DropsGame { .. } => 211,
            ClipEvent::Invitation { .. } => 300,
            ClipEvent::TypeJoin { .. } => 301,
            ClipEvent::YoureWatching { .. } => 302,
            ClipEvent::NowPlaying { .. } => 303,
            ClipEvent::InviteError { .. } => 304,
            ClipEvent::Resume { .. } => 305,
            ClipEvent::ResumeInfoTurn { .. } => 306,
            ClipEvent::ResumeInfoLength { .. } => 307,
            ClipEvent::ResumeInfoPoints { .. } => 308,
            ClipEvent::JoinOrLeave => 309,
            ClipEvent::WinGame { .. } => 310,
            ClipEvent::GameScore { .. } => 311,
            ClipEvent::WaitJoinToo { .. } => 312,
            ClipEvent::InviteConfirm { .. } => 313,
            ClipEvent::WinMatch { .. } => 314,
            ClipEvent::StopWatching { .. } => 315,
            ClipEvent::StartMatch { .. } => 400,
            ClipEvent::AsyncWinMatch { .. } => 401,
            ClipEvent::ResumeMatch { .. } => 402,
            ClipEvent::Empty => 403,
            ClipEvent::SettingsStart => 404,
            ClipEvent::Setting { .. } => 405,
            ClipEvent::TogglesStart => 406,
            ClipEvent::Toggle { .. } => 407,
            ClipEvent::SavedStart => 408,
            ClipEvent::SavedRow { .. } => 409,
            ClipEvent::SavedNone => 410,
            ClipEvent::SavedCount { .. } => 411,
            ClipEvent::ShowAddress { .. } => 412,
            ClipEvent::MotdLine { .. } => 413,
            ClipEvent::NoSuchUser { .. } => 414,
            ClipEvent::InvalidAddress { .. } => 415,
            ClipEvent::HeardYou => 500,
        }
    }
}
