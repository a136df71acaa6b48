//! The session state machine.
//!
//! One [`Session`] owns everything a connected client knows: the line
//! reader, the player and inviter registries, the saved-match table, the
//! dropper set, the current position, and the match log tracker. A single
//! [`Session::handle_event`] dispatch folds every classified server line
//! into that state and publishes [`SessionEvent`]s for the UI.
//!
//! After login the session reconciles a handful of server-side settings
//! (boardstyle, notify, autoboard, the saved list, the email address)
//! with the local configuration. At most one such command is outstanding
//! at a time, retried on a fixed deadline; see [`Session::pump`].

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{Duration, Instant};

use fibs_proto::{ClipEvent, ClipReader};
use gammon_core::{MatchTracker, Position, Side};

use crate::archive::Archive;
use crate::command_queue::CommandQueue;
use crate::config::ClientConfig;
use crate::connection::ConnectionEvent;
use crate::error::{ConfigError, SessionError};
use crate::events::SessionEvent;
use crate::registry::{Inviter, InviterList, Player, PlayerList, SavedInfo};
use crate::droppers::DropperSet;

/// Client identification sent in the CLIP login line.
pub const CLIENT_NAME: &str = "gammonet";
const CLIP_VERSION: &str = "1008";

/// How long a reconciliation command may stay unanswered before the
/// pump re-issues it. Registration steps use the same deadline.
pub const SYNC_TIMEOUT: Duration = Duration::from_millis(2500);

/// Post-login reconciliation bookkeeping. Each `expect_` flag stands for
/// one outstanding question; the pump turns the highest-priority one
/// into a command and arms the retry deadline.
#[derive(Debug, Default)]
struct SyncState {
    expect_boardstyle: bool,
    expect_saved: bool,
    saved_collecting: bool,
    expect_notify: bool,
    expect_autoboard: bool,
    expect_address: bool,
    /// Names awaiting a rawwho answer, in arrival order.
    who_infos: Vec<String>,
    /// Names awaiting a savedcount answer.
    saved_counts: VecDeque<String>,
    deadline: Option<Instant>,
}

impl SyncState {
    fn push_who(&mut self, name: &str) {
        if !self.who_infos.iter().any(|n| n == name) {
            self.who_infos.push(name.to_string());
        }
    }
}

/// Steps of the guest account registration dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegisterState {
    Idle,
    AwaitingNamePrompt,
    AwaitingPassword,
    AwaitingRetype,
    AwaitingConfirmation,
}

/// Partial state gathered from the resume report lines (306..308)
/// before the first board of a resumed match arrives.
#[derive(Debug, Default)]
struct ResumeInfo {
    length: Option<u64>,
    turn: Option<String>,
    points: HashMap<String, u64>,
}

impl ResumeInfo {
    fn clear(&mut self) {
        self.length = None;
        self.turn = None;
        self.points.clear();
    }
}

pub struct Session<A: Archive> {
    config: ClientConfig,
    host: String,
    port: u16,
    archive: Arc<A>,
    queue: Arc<CommandQueue>,
    events: UnboundedSender<SessionEvent>,
    reader: ClipReader,
    players: PlayerList,
    inviters: InviterList,
    saved: HashMap<String, SavedInfo>,
    droppers: DropperSet,
    tracker: Option<MatchTracker>,
    position: Position,
    reversed: bool,
    sync: SyncState,
    register: RegisterState,
    register_deadline: Option<Instant>,
    guest_login: Option<String>,
    /// Name of the opponent while playing; empty otherwise.
    opponent: String,
    /// Name of the watched player; empty unless watching. At most one
    /// of `opponent` and `watching` is non-empty.
    watching: String,
    available: bool,
    own_name: String,
    email_checked: bool,
    who_complete: bool,
    resume_info: ResumeInfo,
}

impl<A: Archive> Session<A> {
    pub fn new(
        config: ClientConfig,
        archive: Arc<A>,
        queue: Arc<CommandQueue>,
        events: UnboundedSender<SessionEvent>,
    ) -> Result<Self, ConfigError> {
        let port = config.port_number()?;
        let host = config.host.clone();
        let own_name = config.login.clone();
        Ok(Session {
            config,
            host,
            port,
            archive,
            queue,
            events,
            reader: ClipReader::new(),
            players: PlayerList::new(),
            inviters: InviterList::new(),
            saved: HashMap::new(),
            droppers: DropperSet::new(),
            tracker: None,
            position: Position::default(),
            reversed: false,
            sync: SyncState::default(),
            register: RegisterState::Idle,
            register_deadline: None,
            guest_login: None,
            opponent: String::new(),
            watching: String::new(),
            available: false,
            own_name,
            email_checked: false,
            who_complete: false,
            resume_info: ResumeInfo::default(),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn players(&self) -> &PlayerList {
        &self.players
    }

    pub fn inviters(&self) -> &InviterList {
        &self.inviters
    }

    pub fn saved(&self) -> &HashMap<String, SavedInfo> {
        &self.saved
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn is_playing(&self) -> bool {
        !self.opponent.is_empty()
    }

    pub fn is_watching(&self) -> bool {
        !self.watching.is_empty()
    }

    /// Whether the server currently lists us as ready to play.
    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Switch the next login prompt into the guest registration
    /// dialogue, registering `login` with `password`.
    pub fn start_registration(&mut self, login: &str, password: &str) {
        self.guest_login = Some(login.to_string());
        self.config.password = password.to_string();
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Conversation lines carry a clock prefix when the user asked for
    /// timestamps.
    fn chat(&self, text: String) {
        if self.config.timestamps {
            let now = chrono::Local::now().format("%H:%M:%S");
            self.emit(SessionEvent::Info(format!("[{}] {}", now, text)));
        } else {
            self.emit(SessionEvent::Info(text));
        }
    }

    fn send(&mut self, command: impl Into<String>) {
        let command = command.into();
        if self.config.server_communication {
            tracing::trace!(command = %command, "queueing");
        }
        if self.queue.add(command).is_err() {
            self.emit(SessionEvent::Error(
                SessionError::QueueFull.to_string(),
            ));
        }
    }

    // ---- transport plumbing -------------------------------------------

    pub async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Line(line) => self.handle_line(&line).await,
            ConnectionEvent::Prompt(prompt) => self.handle_prompt(&prompt).await,
            ConnectionEvent::Error(e) => {
                self.emit(SessionEvent::NetworkError(e.to_string()));
                self.disconnected().await;
            }
        }
    }

    /// Reset connection-scoped state after the link is gone. The match
    /// log, if any, is drained to the archive first.
    pub async fn disconnected(&mut self) {
        self.drain_tracker().await;
        self.queue.clear();
        self.reader.reset();
        self.sync = SyncState::default();
        self.register = RegisterState::Idle;
        self.register_deadline = None;
        self.who_complete = false;
        self.email_checked = false;
        self.emit(SessionEvent::Disconnected);
    }

    pub async fn handle_line(&mut self, line: &str) {
        if self.config.server_communication {
            tracing::trace!(line = %line, "received");
        }
        self.queue.mark_ready();
        if self.register != RegisterState::Idle {
            self.handle_register_line(line);
            return;
        }
        for event in self.reader.parse(line) {
            self.handle_event(event).await;
        }
    }

    pub async fn handle_prompt(&mut self, prompt: &str) {
        self.queue.mark_ready();
        if self.register != RegisterState::Idle {
            self.handle_register_prompt(prompt);
            return;
        }
        match prompt {
            "login:" => {
                self.emit(SessionEvent::LoginPrompt);
                if self.guest_login.is_some() {
                    self.send("guest");
                    self.register = RegisterState::AwaitingNamePrompt;
                    self.arm_register();
                } else {
                    let login = format!(
                        "{}_{} {} {} {}",
                        CLIENT_NAME,
                        env!("CARGO_PKG_VERSION"),
                        CLIP_VERSION,
                        self.config.login,
                        self.config.password
                    );
                    self.send(login);
                }
            }
            "password:" => {
                let password = self.config.password.clone();
                self.send(password);
            }
            _ => {}
        }
    }

    // ---- guest registration -------------------------------------------

    fn arm_register(&mut self) {
        self.register_deadline = Some(Instant::now() + SYNC_TIMEOUT);
    }

    fn handle_register_prompt(&mut self, prompt: &str) {
        match self.register {
            RegisterState::Idle => {}
            RegisterState::AwaitingNamePrompt => {
                let name = self.guest_login.clone().unwrap_or_default();
                self.send(format!("name {}", name));
                self.register = RegisterState::AwaitingPassword;
                self.arm_register();
            }
            RegisterState::AwaitingPassword => {
                if prompt == "Please give your password:" {
                    let password = self.config.password.clone();
                    self.send(password);
                    self.register = RegisterState::AwaitingRetype;
                    self.arm_register();
                } else {
                    self.abort_registration("unexpected server prompt");
                }
            }
            RegisterState::AwaitingRetype => {
                if prompt == "Please retype your password:" {
                    let password = self.config.password.clone();
                    self.send(password);
                    self.register = RegisterState::AwaitingConfirmation;
                    self.arm_register();
                } else {
                    self.abort_registration("unexpected server prompt");
                }
            }
            RegisterState::AwaitingConfirmation => {
                self.abort_registration("unexpected server prompt");
            }
        }
    }

    fn handle_register_line(&mut self, line: &str) {
        match self.register {
            RegisterState::AwaitingNamePrompt if line.contains("Please tell me your name") => {
                // Some server builds send the name request as a full line.
                let name = self.guest_login.clone().unwrap_or_default();
                self.send(format!("name {}", name));
                self.register = RegisterState::AwaitingPassword;
                self.arm_register();
            }
            RegisterState::AwaitingConfirmation if line.contains("You are registered") => {
                self.register = RegisterState::Idle;
                self.register_deadline = None;
                if let Some(login) = self.guest_login.take() {
                    self.config.login = login.clone();
                    self.own_name = login;
                }
                self.emit(SessionEvent::Info(
                    "Account registered; reconnect with the new login.".to_string(),
                ));
                self.send("bye");
            }
            _ if line.starts_with("** ") => {
                let reason = line[3..].to_string();
                self.abort_registration(&reason);
            }
            // Banner chatter between steps is expected; ignore it.
            _ => {}
        }
    }

    fn abort_registration(&mut self, reason: &str) {
        self.register = RegisterState::Idle;
        self.register_deadline = None;
        self.guest_login = None;
        self.emit(SessionEvent::Error(
            SessionError::Registration(reason.to_string()).to_string(),
        ));
        self.send("bye");
    }

    // ---- reconciliation pump ------------------------------------------

    /// Issue the highest-priority outstanding reconciliation command,
    /// unless one is already in flight. `force` restarts after a timeout.
    fn pump(&mut self, force: bool) {
        if !force && self.sync.deadline.is_some() {
            return;
        }
        let command = if self.sync.expect_saved {
            Some("show saved".to_string())
        } else if self.sync.expect_boardstyle {
            Some("set boardstyle 3".to_string())
        } else if self.sync.expect_notify {
            Some("toggle notify".to_string())
        } else if self.sync.expect_autoboard {
            Some("toggle autoboard".to_string())
        } else if let Some(name) = self.sync.saved_counts.front() {
            Some(format!("show savedcount {}", name))
        } else if let Some(name) = self.sync.who_infos.first() {
            Some(format!("rawwho {}", name))
        } else if self.sync.expect_address {
            Some(format!("address {}", self.config.address))
        } else {
            None
        };
        match command {
            Some(command) => {
                self.send(command);
                self.sync.deadline = Some(Instant::now() + SYNC_TIMEOUT);
            }
            None => self.sync.deadline = None,
        }
    }

    /// The in-flight reconciliation command was answered.
    fn sync_done(&mut self) {
        self.sync.deadline = None;
        self.pump(false);
    }

    /// The next moment [`Session::on_deadline`] should run, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.sync.deadline, self.register_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn on_deadline(&mut self, now: Instant) {
        if self.register_deadline.map_or(false, |d| d <= now) {
            self.abort_registration("timed out waiting for the server");
        }
        if self.sync.deadline.map_or(false, |d| d <= now) {
            self.pump(true);
        }
    }

    // ---- event dispatch -----------------------------------------------

    pub async fn handle_event(&mut self, event: ClipEvent) {
        // A saved list is terminated by any non-row line.
        if self.sync.saved_collecting
            && !matches!(event, ClipEvent::SavedRow { .. } | ClipEvent::SavedStart)
        {
            self.finish_saved();
        }

        match event {
            ClipEvent::Welcome { name, .. } => {
                self.own_name = name.clone();
                self.emit(SessionEvent::LoggedIn(name));
            }
            ClipEvent::OwnInfo {
                notify,
                autoboard,
                ready,
                ..
            } => {
                self.available = ready;
                if !notify {
                    self.sync.expect_notify = true;
                }
                if !autoboard {
                    self.sync.expect_autoboard = true;
                }
            }
            ClipEvent::MotdStart | ClipEvent::MotdEnd => {}
            ClipEvent::MotdLine { text } => self.emit(SessionEvent::MotdLine(text)),
            ClipEvent::WhoInfo {
                name,
                opponent,
                watching,
                ready,
                away,
                rating,
                experience,
                hostname,
                client,
                email,
                ..
            } => {
                self.on_who_info(
                    name, opponent, watching, ready, away, rating, experience, hostname,
                    client, email,
                )
                .await;
            }
            ClipEvent::WhoInfoEnd => {
                if !self.who_complete {
                    self.who_complete = true;
                    self.sync.expect_boardstyle = true;
                    self.sync.expect_saved = true;
                    self.pump(true);
                }
            }
            ClipEvent::Login { name, message } => {
                self.sync.push_who(&name);
                self.pump(false);
                self.emit(SessionEvent::Info(message));
            }
            ClipEvent::Logout { name, message } => {
                if self.is_playing() && name == self.opponent {
                    self.record_drop(&name.clone()).await;
                }
                if self.players.remove(&name).is_some() {
                    self.emit(SessionEvent::PlayerRemoved(name.clone()));
                }
                if self.inviters.remove(&name).is_some() {
                    self.emit(SessionEvent::InviterRemoved(name));
                }
                self.emit(SessionEvent::Info(message));
            }
            ClipEvent::Message { from, text, .. } => {
                self.chat(format!("Message from {}: {}", from, text));
            }
            ClipEvent::MessageDelivered { name } => {
                self.emit(SessionEvent::Info(format!("{} received your message.", name)));
            }
            ClipEvent::MessageSaved { name } => {
                self.emit(SessionEvent::Info(format!(
                    "{} is not logged in; your message was saved.",
                    name
                )));
            }
            ClipEvent::Says { name, text } => {
                self.chat(format!("{}: {}", name, text));
            }
            ClipEvent::Shouts { name, text } => {
                self.chat(format!("{} shouts: {}", name, text));
            }
            ClipEvent::Whispers { name, text } => {
                self.chat(format!("{} whispers: {}", name, text));
            }
            ClipEvent::Kibitzes { name, text } => {
                self.chat(format!("{} kibitzes: {}", name, text));
            }
            ClipEvent::YouSay { name, text } => {
                self.chat(format!("You tell {}: {}", name, text));
            }
            ClipEvent::YouShout { text } => {
                self.chat(format!("You shout: {}", text));
            }
            ClipEvent::YouWhisper { text } => {
                self.chat(format!("You whisper: {}", text));
            }
            ClipEvent::YouKibitz { text } => {
                self.chat(format!("You kibitz: {}", text));
            }
            ClipEvent::Alerts { name, text } => {
                self.chat(format!("{}: {}", name, text));
            }
            ClipEvent::Error { text, .. } => self.emit(SessionEvent::Error(text)),
            ClipEvent::Board { position, reversed } => {
                self.on_board(*position, reversed).await;
            }
            ClipEvent::Rolls { name, d1, d2 } => self.on_rolls(&name, d1, d2).await,
            ClipEvent::Moves { name, movements } => self.on_moves(&name, &movements).await,
            ClipEvent::StartGame { name } => {
                self.position.game_info = None;
                self.position.status =
                    Some(format!("Starting a new game with {}.", name));
                self.publish_position();
            }
            ClipEvent::LeftGame { name } => {
                self.emit(SessionEvent::Info(format!("{} has left the game.", name)));
                self.record_drop(&name).await;
            }
            ClipEvent::CannotMove { name } => {
                let display = self.display_name(&name);
                self.position.unused_dice = [0, 0];
                self.position.status = Some(format!("{} can't move.", display));
                self.publish_position();
            }
            ClipEvent::Doubles { name } => self.on_doubles(&name).await,
            ClipEvent::AcceptsDouble { name, cube } => {
                self.on_accepts_double(&name, cube).await;
            }
            ClipEvent::Resigns { name, points } => self.on_resigns(&name, points).await,
            ClipEvent::RejectsResignation { name } => {
                let display = self.display_name(&name);
                self.position.resigned = 0;
                self.position.status =
                    Some(format!("{} rejects. The game continues.", display));
                self.publish_position();
                self.track_position().await;
            }
            ClipEvent::DropsGame { name, points } => {
                self.emit(SessionEvent::Info(format!(
                    "{} gives up. You win {} point{}.",
                    name,
                    points,
                    if points == 1 { "" } else { "s" }
                )));
            }
            ClipEvent::Invitation { name, length } => self.on_invitation(name, length),
            ClipEvent::TypeJoin { name } => {
                self.emit(SessionEvent::Info(format!("Type 'join {}' to accept.", name)));
            }
            ClipEvent::YoureWatching { name } => {
                self.drain_tracker().await;
                self.watching = name.clone();
                self.emit(SessionEvent::Info(format!("You're now watching {}.", name)));
            }
            ClipEvent::NowPlaying { name, length } => {
                self.watching.clear();
                self.opponent = name.clone();
                self.resume_info.clear();
                self.tracker = Some(MatchTracker::new(
                    &self.own_name,
                    &name,
                    length as u16,
                    false,
                ));
                if self.inviters.remove(&name).is_some() {
                    self.emit(SessionEvent::InviterRemoved(name.clone()));
                }
                let about = if length == 0 {
                    "an unlimited match".to_string()
                } else {
                    format!("a {} point match", length)
                };
                self.emit(SessionEvent::Info(format!(
                    "You are now playing {} with {}.",
                    about, name
                )));
            }
            ClipEvent::InviteError { text } => self.emit(SessionEvent::Error(text)),
            ClipEvent::Resume { name } => {
                self.watching.clear();
                self.opponent = name.clone();
                self.tracker = None;
                let own = self.own_name.clone();
                if let Some((dropper, victim)) =
                    self.droppers.take_pair(&self.host, self.port, &name, &own)
                {
                    self.archive
                        .save_resume(&self.host, self.port, &dropper, &victim)
                        .await;
                }
                self.emit(SessionEvent::Info(format!(
                    "{} has joined you. Your running match was loaded.",
                    name
                )));
            }
            ClipEvent::ResumeInfoTurn { name } => {
                self.resume_info.turn = Some(name);
            }
            ClipEvent::ResumeInfoLength { length } => {
                self.resume_info.length = Some(length);
            }
            ClipEvent::ResumeInfoPoints { name, points } => {
                self.resume_info.points.insert(name, points);
            }
            ClipEvent::JoinOrLeave => {
                self.emit(SessionEvent::Info(
                    "Type 'join' to play the next game, 'leave' to stop.".to_string(),
                ));
            }
            ClipEvent::WinGame { name, points } => self.on_win_game(&name, points),
            ClipEvent::GameScore {
                name1,
                score1,
                name2,
                score2,
                ..
            } => {
                self.on_game_score(&name1, score1, &name2, score2);
            }
            ClipEvent::WaitJoinToo { name } => {
                self.emit(SessionEvent::Info(format!(
                    "Please wait for {} to join too.",
                    name
                )));
            }
            ClipEvent::InviteConfirm { name, length } => {
                let about = match length {
                    -1 => "to resume a saved match".to_string(),
                    0 => "to an unlimited match".to_string(),
                    n => format!("to a {} point match", n),
                };
                self.emit(SessionEvent::Info(format!("You invited {} {}.", name, about)));
            }
            ClipEvent::WinMatch {
                name,
                score1,
                score2,
                ..
            } => {
                self.on_win_match(&name, score1, score2).await;
            }
            ClipEvent::StopWatching { name } => {
                self.drain_tracker().await;
                self.emit(SessionEvent::Info(format!("You stop watching {}.", name)));
            }
            ClipEvent::StartMatch { name, length } => {
                self.watching.clear();
                self.opponent = name.clone();
                self.resume_info.clear();
                self.tracker = Some(MatchTracker::new(
                    &self.own_name,
                    &name,
                    length as u16,
                    false,
                ));
                self.emit(SessionEvent::Info(format!(
                    "{} has joined you for a match.",
                    name
                )));
            }
            ClipEvent::AsyncWinMatch { winner, loser, .. } => {
                self.droppers
                    .remove_pair(&self.host, self.port, &winner, &loser);
                self.emit(SessionEvent::Info(format!(
                    "{} wins a match against {}.",
                    winner, loser
                )));
            }
            ClipEvent::ResumeMatch { name1, name2, .. } => {
                if let Some((dropper, victim)) =
                    self.droppers.take_pair(&self.host, self.port, &name1, &name2)
                {
                    self.archive
                        .save_resume(&self.host, self.port, &dropper, &victim)
                        .await;
                }
                self.emit(SessionEvent::Info(format!(
                    "{} and {} are resuming their match.",
                    name1, name2
                )));
            }
            ClipEvent::Empty => {}
            ClipEvent::SettingsStart | ClipEvent::TogglesStart => {}
            ClipEvent::Setting { name, value } => self.on_setting(&name, &value),
            ClipEvent::Toggle { name, value } => self.on_toggle(&name, value),
            ClipEvent::SavedStart => {
                self.saved.clear();
                self.sync.saved_collecting = true;
            }
            ClipEvent::SavedRow {
                opponent,
                length,
                score1,
                score2,
            } => {
                self.saved.insert(
                    opponent.clone(),
                    SavedInfo {
                        opponent: opponent.clone(),
                        match_length: length,
                        scores: [score1 as u8, score2 as u8],
                    },
                );
                if let Some(player) = self.players.get_mut(&opponent) {
                    player.has_saved = true;
                }
            }
            ClipEvent::SavedNone => self.finish_saved(),
            ClipEvent::SavedCount { name, count } => self.on_saved_count(&name, count),
            ClipEvent::ShowAddress { address } => {
                if self.sync.expect_address {
                    self.sync.expect_address = false;
                    self.sync_done();
                }
                self.config.address = address.clone();
                self.emit(SessionEvent::Info(format!(
                    "Your email address is '{}'.",
                    address
                )));
            }
            ClipEvent::NoSuchUser { name } => self.on_no_such_user(&name),
            ClipEvent::InvalidAddress { address } => {
                if self.sync.expect_address {
                    self.sync.expect_address = false;
                    self.sync.deadline = None;
                    self.pump(false);
                }
                self.emit(SessionEvent::Error(format!(
                    "'{}' is not an email address.",
                    address
                )));
            }
            ClipEvent::HeardYou => {}
        }
    }

    // ---- per-event workers --------------------------------------------

    #[allow(clippy::too_many_arguments)]
    async fn on_who_info(
        &mut self,
        name: String,
        opponent: String,
        watching: String,
        ready: bool,
        away: bool,
        rating: f64,
        experience: u64,
        hostname: String,
        client: String,
        email: String,
    ) {
        let reliability = self
            .archive
            .get_reliability(&self.host, self.port, &name)
            .await;
        let country = self.archive.get_country(&self.host, &hostname).await;
        let player = Player {
            name: name.clone(),
            opponent,
            watching,
            available: ready,
            away,
            rating,
            experience,
            reliability,
            client,
            hostname,
            country,
            email,
            has_saved: self.saved.contains_key(&name),
        };
        let player = self.players.upsert(player).clone();
        if let Some(inviter) = self.inviters.refresh(&player) {
            let inviter = inviter.clone();
            self.emit(SessionEvent::InviterUpdated(Box::new(inviter)));
        }
        self.emit(SessionEvent::PlayerUpdated(Box::new(player.clone())));
        self.archive
            .update_user(&self.host, self.port, &name, rating, experience)
            .await;

        if let Some(pos) = self.sync.who_infos.iter().position(|n| *n == name) {
            self.sync.who_infos.remove(pos);
            if pos == 0 {
                self.sync_done();
            }
        }

        if name == self.own_name {
            self.available = player.available;
            if !self.email_checked {
                self.email_checked = true;
                if !self.config.address.is_empty() && player.email != self.config.address {
                    self.sync.expect_address = true;
                    self.pump(false);
                }
            }
        }
    }

    async fn on_board(&mut self, mut position: Position, reversed: bool) {
        if position.equals_checkers(&Position::initial()) {
            position.normalize_opening_roll();
        }
        position.auto_swap_dice(self.config.auto_swap);

        // Fill in what the resume report announced ahead of the board.
        if let Some(length) = self.resume_info.length {
            if position.match_length == 0 && length > 0 {
                position.match_length = length as u8;
            }
        }
        for (name, points) in &self.resume_info.points {
            for i in 0..2 {
                if position.players[i] == *name && position.scores[i] == 0 {
                    position.scores[i] = *points as u8;
                }
            }
        }
        if position.turn.is_none() {
            if let Some(turn) = &self.resume_info.turn {
                if position.players[0] == *turn {
                    position.turn = Some(Side::White);
                } else if position.players[1] == *turn {
                    position.turn = Some(Side::Black);
                }
            }
        }

        if self.opponent.is_empty() && self.watching.is_empty() {
            if position.players[0] == self.own_name {
                self.opponent = position.players[1].clone();
            } else {
                self.watching = position.players[0].clone();
            }
        }
        if self.tracker.is_none() {
            // A board with history we did not see means a resumption.
            let resumption = position.scores != [0, 0]
                || self.resume_info.length.is_some()
                || !position.equals_checkers(&Position::initial());
            self.tracker = Some(MatchTracker::new(
                &position.players[0],
                &position.players[1],
                position.match_length as u16,
                resumption,
            ));
        }

        self.reversed = reversed;
        self.position = position;
        self.resume_info.clear();
        self.publish_position();
        self.track_position().await;
    }

    async fn on_rolls(&mut self, name: &str, d1: u8, d2: u8) {
        let display = self.display_name(name);
        if let Some(side) = self.side_of(name) {
            self.position.turn = Some(side);
            self.position.dice = [d1 as i8, d2 as i8];
            self.position.reset_unused_dice();
            if self.position.equals_checkers(&Position::initial()) {
                self.position.normalize_opening_roll();
            }
            self.position.auto_swap_dice(self.config.auto_swap);
            let verb = if name == "You" { "roll" } else { "rolls" };
            self.position.status =
                Some(format!("{} {} {} and {}.", display, verb, d1, d2));
            self.publish_position();
            self.track_position().await;
        } else {
            self.emit(SessionEvent::Info(format!(
                "{} rolls {} and {}.",
                display, d1, d2
            )));
        }
    }

    async fn on_moves(&mut self, name: &str, movements: &[gammon_core::Movement]) {
        let display = self.display_name(name);
        let side = match self.side_of(name) {
            Some(side) => side,
            None => return,
        };
        let status = self.position.validate_movements(movements, side);
        let m = gammon_core::Move::new(movements.iter().copied(), status);
        if m.is_legal() {
            let narration = self.position.format_move(&m, side, self.reversed);
            self.position.apply_move(&m, side);
            self.position.status = Some(format!("{} moves {}.", display, narration));
            self.publish_position();
            self.track_position().await;
        } else {
            tracing::warn!(%status, "reported move does not fit the current position");
            self.position.reset_unused_dice();
            self.publish_position();
        }
    }

    async fn on_doubles(&mut self, name: &str) {
        let display = self.display_name(name);
        if let Some(side) = self.side_of(name) {
            self.position.cube_turned = Some(side);
            self.position.status = Some(format!("{} doubles.", display));
            self.publish_position();
            self.track_position().await;
        }
    }

    async fn on_accepts_double(&mut self, name: &str, cube: u64) {
        let display = self.display_name(name);
        if let Some(side) = self.side_of(name) {
            self.position.cube = cube as u32;
            self.position.cube_turned = None;
            // The accepting side owns the cube now.
            self.position.may_double = [side == Side::White, side == Side::Black];
            self.position.status = Some(format!(
                "{} accepts the double. The cube shows {}.",
                display, cube
            ));
            self.publish_position();
            self.track_position().await;
        }
    }

    async fn on_resigns(&mut self, name: &str, points: u64) {
        let display = self.display_name(name);
        if let Some(side) = self.side_of(name) {
            let cube = self.position.cube.max(1) as u64;
            let n = (points / cube).clamp(1, 3) as i8;
            // Positive when the side to move resigns.
            self.position.resigned = if self.position.turn == Some(side) { n } else { -n };
            self.position.status = Some(format!(
                "{} wants to resign. You will win {} points.",
                display, points
            ));
            self.publish_position();
            self.track_position().await;
        }
    }

    fn on_invitation(&mut self, name: String, length: i64) {
        let player = match self.players.get(&name) {
            Some(player) => player.clone(),
            None => {
                self.sync.push_who(&name);
                Player {
                    name: name.clone(),
                    ..Player::default()
                }
            }
        };
        self.sync.saved_counts.push_back(name.clone());
        self.pump(false);
        let inviter = Inviter { player, length };
        self.inviters.upsert(inviter.clone());
        self.emit(SessionEvent::InviterUpdated(Box::new(inviter)));
    }

    fn on_win_game(&mut self, name: &str, points: u64) {
        if let Some((p1, p2)) = self.match_pair() {
            self.droppers.remove_pair(&self.host, self.port, &p1, &p2);
        }
        let display = self.display_name(name);
        let verb = if name == "You" { "win" } else { "wins" };
        self.emit(SessionEvent::Info(format!(
            "{} {} the game and gets {} point{}.",
            display,
            verb,
            points,
            if points == 1 { "" } else { "s" }
        )));
    }

    fn on_game_score(&mut self, name1: &str, score1: u64, name2: &str, score2: u64) {
        let resolved1 = self.display_name(name1);
        let resolved2 = self.display_name(name2);
        for (name, score) in [(resolved1, score1), (resolved2, score2)] {
            if self.position.players[0] == name {
                self.position.scores[0] = score as u8;
            } else if self.position.players[1] == name {
                self.position.scores[1] = score as u8;
            }
        }
        self.publish_position();
    }

    async fn on_win_match(&mut self, name: &str, score1: u64, score2: u64) {
        let winner = self.display_name(name);
        let loser = if let Some((p1, p2)) = self.match_pair() {
            if winner == p1 {
                p2
            } else {
                p1
            }
        } else if winner == self.own_name {
            self.opponent.clone()
        } else {
            self.own_name.clone()
        };
        self.droppers
            .remove_pair(&self.host, self.port, &winner, &loser);
        // The tracker path may already have settled this match.
        if self.tracker.is_some() {
            self.archive
                .save_win(&self.host, self.port, &winner, &loser)
                .await;
            self.emit(SessionEvent::MatchOver {
                winner: winner.clone(),
                loser: loser.clone(),
            });
            self.drain_tracker().await;
        }
        self.emit(SessionEvent::Info(format!(
            "{} wins the match {}-{}.",
            winner, score1, score2
        )));
    }

    fn on_setting(&mut self, name: &str, value: &str) {
        if name == "boardstyle" {
            if value == "3" {
                if self.sync.expect_boardstyle {
                    self.sync.expect_boardstyle = false;
                    self.sync_done();
                }
            } else {
                // The server reports a different style; set ours.
                self.sync.expect_boardstyle = true;
                self.pump(false);
            }
        }
    }

    fn on_toggle(&mut self, name: &str, value: bool) {
        match name {
            "notify" => {
                if value {
                    if self.sync.expect_notify {
                        self.sync.expect_notify = false;
                        self.sync_done();
                    }
                } else {
                    self.sync.expect_notify = true;
                    self.pump(false);
                }
            }
            "autoboard" => {
                if value {
                    if self.sync.expect_autoboard {
                        self.sync.expect_autoboard = false;
                        self.sync_done();
                    }
                } else {
                    self.sync.expect_autoboard = true;
                    self.pump(false);
                }
            }
            "ready" => self.available = value,
            _ => {}
        }
    }

    fn on_saved_count(&mut self, name: &str, count: u64) {
        if self.sync.saved_counts.front().map(String::as_str) == Some(name) {
            self.sync.saved_counts.pop_front();
            self.sync_done();
        }
        if let Some(player) = self.players.get_mut(name) {
            player.has_saved = count > 0;
            let player = player.clone();
            if let Some(inviter) = self.inviters.refresh(&player) {
                let inviter = inviter.clone();
                self.emit(SessionEvent::InviterUpdated(Box::new(inviter)));
            }
            self.emit(SessionEvent::PlayerUpdated(Box::new(player)));
        }
    }

    fn on_no_such_user(&mut self, name: &str) {
        if let Some(pos) = self.sync.who_infos.iter().position(|n| n.as_str() == name) {
            self.sync.who_infos.remove(pos);
            if pos == 0 {
                self.sync_done();
            }
        }
        if self.sync.saved_counts.front().map(String::as_str) == Some(name) {
            self.sync.saved_counts.pop_front();
            self.sync_done();
        }
        if self.players.remove(name).is_some() {
            self.emit(SessionEvent::PlayerRemoved(name.to_string()));
        }
        if self.inviters.remove(name).is_some() {
            self.emit(SessionEvent::InviterRemoved(name.to_string()));
        }
        self.emit(SessionEvent::Error(format!("There is no one called {}.", name)));
    }

    fn finish_saved(&mut self) {
        if !self.sync.saved_collecting && !self.sync.expect_saved {
            return;
        }
        self.sync.saved_collecting = false;
        if self.sync.expect_saved {
            self.sync.expect_saved = false;
            self.sync_done();
        }
        self.emit(SessionEvent::SavedListChanged);
    }

    // ---- match bookkeeping --------------------------------------------

    fn display_name(&self, name: &str) -> String {
        if name == "You" {
            self.own_name.clone()
        } else {
            name.to_string()
        }
    }

    fn side_of(&self, name: &str) -> Option<Side> {
        let resolved = self.display_name(name);
        if self.position.players[0] == resolved {
            Some(Side::White)
        } else if self.position.players[1] == resolved {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// The two players of the current match, if a board arrived.
    fn match_pair(&self) -> Option<(String, String)> {
        if self.position.players[0].is_empty() || self.position.players[1].is_empty() {
            return None;
        }
        Some((
            self.position.players[0].clone(),
            self.position.players[1].clone(),
        ))
    }

    fn publish_position(&self) {
        let mut position = self.position.clone();
        if self.config.show_equity && self.is_playing() {
            let pips = format!(
                "pips: {}-{}",
                position.pip_count(Side::White),
                position.pip_count(Side::Black)
            );
            position.game_info = Some(match position.game_info.take() {
                Some(info) => format!("{}, {}", info, pips),
                None => pips,
            });
        }
        self.emit(SessionEvent::PositionChanged(Box::new(position)));
    }

    async fn track_position(&mut self) {
        let winner = match &mut self.tracker {
            Some(tracker) => tracker.update(&self.position),
            None => return,
        };
        if let Some(winner) = winner {
            let winner_name = self.position.players[winner.index()].clone();
            let loser_name = self.position.players[winner.other().index()].clone();
            self.droppers
                .remove_pair(&self.host, self.port, &winner_name, &loser_name);
            self.archive
                .save_win(&self.host, self.port, &winner_name, &loser_name)
                .await;
            self.emit(SessionEvent::MatchOver {
                winner: winner_name,
                loser: loser_name,
            });
            self.drain_tracker().await;
        }
    }

    /// Record an opponent dropping the running match.
    async fn record_drop(&mut self, dropper: &str) {
        let victim = if self.watching.is_empty() {
            self.own_name.clone()
        } else {
            self.players
                .get(dropper)
                .map(|p| p.opponent.clone())
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| self.watching.clone())
        };
        if self.droppers.insert(&self.host, self.port, dropper, &victim) {
            self.archive
                .save_drop(&self.host, self.port, dropper, &victim)
                .await;
        }
        self.drain_tracker().await;
    }

    /// Hand the match log to the archive and leave the match.
    async fn drain_tracker(&mut self) {
        if let Some(tracker) = self.tracker.take() {
            let m = tracker.into_match();
            if m.games.iter().any(|g| !g.is_empty()) {
                if let Err(e) = self
                    .archive
                    .save_match(&self.host, self.port, &self.own_name, &m)
                    .await
                {
                    self.emit(SessionEvent::Error(format!("couldn't archive match: {}", e)));
                }
            }
        }
        self.opponent.clear();
        self.watching.clear();
        self.resume_info.clear();
    }

    // ---- user actions -------------------------------------------------

    pub fn send_command(&mut self, command: &str) {
        self.config.remember_command(command);
        self.send(command.to_string());
    }

    pub fn invite(&mut self, name: &str, length: u8) {
        let spec = if length == 0 {
            "unlimited".to_string()
        } else {
            length.to_string()
        };
        self.send(format!("invite {} {}", name, spec));
    }

    pub fn accept_invitation(&mut self, name: &str) -> Result<(), SessionError> {
        let inviter = self
            .inviters
            .get(name)
            .ok_or_else(|| SessionError::UnknownInviter(name.to_string()))?;
        // An unlimited invitation while an unlimited saved match exists
        // would silently resume it; the caller must resume explicitly.
        if inviter.length == 0 {
            if let Some(saved) = self.saved.get(name) {
                if saved.match_length == 0 {
                    return Err(SessionError::SavedMatchConflict(name.to_string()));
                }
            }
        }
        self.send(format!("join {}", name));
        Ok(())
    }

    /// Decline an invitation. Without a message nothing is sent; the
    /// invitation is dropped locally and times out server-side.
    pub fn decline_invitation(&mut self, name: &str, message: Option<&str>) {
        if let Some(message) = message {
            self.send(format!("tellx {} {}", name, message));
        }
        if self.inviters.remove(name).is_some() {
            self.emit(SessionEvent::InviterRemoved(name.to_string()));
        }
    }

    pub fn watch(&mut self, name: &str) {
        self.send(format!("watch {}", name));
    }

    pub fn stop_watching(&mut self) {
        self.send("unwatch");
    }

    /// Validate and submit a move, given the intended resulting position.
    pub async fn submit_move(&mut self, after: &Position) -> Result<(), SessionError> {
        if self.is_watching() {
            return Err(SessionError::Watching);
        }
        if !self.is_playing() {
            return Err(SessionError::NotPlaying);
        }
        let side = self
            .side_of(&self.own_name.clone())
            .ok_or(SessionError::NotPlaying)?;
        let m = self.position.check_move(after, side);
        if !m.is_legal() {
            return Err(SessionError::IllegalMove(m.status));
        }
        let encoded = self.position.fibs_move(&m, side, self.reversed);
        self.send(format!("move {}", encoded));
        self.position.apply_move(&m, side);
        self.publish_position();
        self.track_position().await;
        Ok(())
    }

    pub fn offer_double(&mut self) -> Result<(), SessionError> {
        self.playing_action("double")
    }

    pub fn accept_double(&mut self) -> Result<(), SessionError> {
        self.playing_action("accept")
    }

    pub fn reject_double(&mut self) -> Result<(), SessionError> {
        self.playing_action("reject")
    }

    /// Offer to resign: 1 plain, 2 gammon, 3 backgammon.
    pub fn resign(&mut self, value: u8) -> Result<(), SessionError> {
        let kind = match value {
            2 => "gammon",
            3 => "backgammon",
            _ => "normal",
        };
        self.playing_action(&format!("resign {}", kind))
    }

    pub fn accept_resignation(&mut self) -> Result<(), SessionError> {
        self.playing_action("accept")
    }

    pub fn reject_resignation(&mut self) -> Result<(), SessionError> {
        self.playing_action("reject")
    }

    fn playing_action(&mut self, command: &str) -> Result<(), SessionError> {
        if self.is_watching() {
            return Err(SessionError::Watching);
        }
        if !self.is_playing() {
            return Err(SessionError::NotPlaying);
        }
        self.send(command.to_string());
        Ok(())
    }
}
