//! Client configuration, loaded from a JSON file.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub const DEFAULT_PORT: &str = "4321";

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClientConfig {
    pub host: String,
    /// Kept in string form as entered; validated by [`ClientConfig::port_number`].
    pub port: String,
    pub login: String,
    pub password: String,
    pub save_password: bool,
    /// Email address to reconcile with the server-side record.
    pub address: String,
    /// Log raw protocol traffic at trace level.
    pub server_communication: bool,
    pub timestamps: bool,
    pub logfile: Option<PathBuf>,
    /// Draw the lower die on the left when it was rolled second.
    pub auto_swap: bool,
    /// Preferred match length for outgoing invitations.
    pub length: u8,
    pub show_equity: bool,
    /// Recent command history, most recent last.
    pub commands: Vec<String>,
    pub max_commands: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: "fibs.com".to_string(),
            port: DEFAULT_PORT.to_string(),
            login: String::new(),
            password: String::new(),
            save_password: false,
            address: String::new(),
            server_communication: false,
            timestamps: true,
            logfile: None,
            auto_swap: true,
            length: 5,
            show_equity: false,
            commands: Vec::new(),
            max_commands: 40,
        }
    }
}

impl ClientConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn port_number(&self) -> Result<u16, ConfigError> {
        match self.port.trim().parse::<u16>() {
            Ok(0) | Err(_) => Err(ConfigError::InvalidPort(self.port.clone())),
            Ok(port) => Ok(port),
        }
    }

    /// Record a command in the history, keeping at most `max_commands`.
    pub fn remember_command(&mut self, command: &str) {
        self.commands.retain(|c| c != command);
        self.commands.push(command.to_string());
        while self.commands.len() > self.max_commands {
            self.commands.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn port_validation() {
        let mut config = ClientConfig::default();
        assert_eq!(config.port_number().unwrap(), 4321);
        config.port = "0".to_string();
        assert!(config.port_number().is_err());
        config.port = "65536".to_string();
        assert!(config.port_number().is_err());
        config.port = "nonsense".to_string();
        assert!(config.port_number().is_err());
        config.port = "65535".to_string();
        assert_eq!(config.port_number().unwrap(), 65535);
    }

    #[test]
    fn kebab_case_keys() {
        let config: ClientConfig = serde_json::from_str(
            r#"{ "host": "example.com", "save-password": true, "auto-swap": false }"#,
        )
        .unwrap();
        assert_eq!(config.host, "example.com");
        assert!(config.save_password);
        assert!(!config.auto_swap);
        assert_eq!(config.port, "4321");
    }

    #[test]
    fn command_history_caps() {
        let mut config = ClientConfig {
            max_commands: 2,
            ..Default::default()
        };
        config.remember_command("who");
        config.remember_command("shout hi");
        config.remember_command("who");
        assert_eq!(config.commands, vec!["shout hi", "who"]);
        config.remember_command("board");
        assert_eq!(config.commands, vec!["who", "board"]);
    }
}
