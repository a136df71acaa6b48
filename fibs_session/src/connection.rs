//! The socket task: one tokio task per connection, multiplexing the
//! control channel and the byte stream, pushing received bytes through
//! the line framer and emitting complete lines and login prompts.

use fibs_proto::{FramedItem, LineFramer};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::mpsc::{Receiver, UnboundedSender};

use crate::error::ConnectionError;

#[derive(Debug)]
pub enum ConnectionControl {
    /// Transmit a command; the CR+LF terminator is appended here.
    Send(String),
    Close,
}

#[derive(Debug)]
pub enum ConnectionEvent {
    Line(String),
    Prompt(String),
    Error(ConnectionError),
}

pub struct ConnectionTask<S> {
    conn: S,
    control_channel: Receiver<ConnectionControl>,
    event_channel: UnboundedSender<ConnectionEvent>,
}

impl ConnectionTask<TcpStream> {
    pub async fn connect(
        host: &str,
        port: u16,
        control: Receiver<ConnectionControl>,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Result<Self, ConnectionError> {
        let conn = TcpStream::connect((host, port)).await?;
        Ok(Self::new(conn, control, events))
    }
}

impl<S> ConnectionTask<S>
where
    S: AsyncRead + AsyncWrite,
{
    pub fn new(
        stream: S,
        control: Receiver<ConnectionControl>,
        events: UnboundedSender<ConnectionEvent>,
    ) -> Self {
        Self {
            conn: stream,
            control_channel: control,
            event_channel: events,
        }
    }

    pub async fn run(mut self) {
        let (mut reader, mut writer) = tokio::io::split(self.conn);
        let mut framer = LineFramer::new();
        let mut buf = [0u8; 4096];
        loop {
            select! {
                control = self.control_channel.recv() => match control {
                    None | Some(ConnectionControl::Close) => { break; },
                    Some(ConnectionControl::Send(command)) => {
                        tracing::trace!(?command, "sending");
                        if writer.write_all(format!("{command}\r\n").as_bytes()).await.is_err() {
                            break;
                        }
                    }
                },
                read = reader.read(&mut buf) => match read {
                    Ok(0) => { break; },
                    Ok(n) => {
                        for item in framer.push(&buf[..n]) {
                            let event = match item {
                                FramedItem::Line(line) => ConnectionEvent::Line(line),
                                FramedItem::Prompt(prompt) => ConnectionEvent::Prompt(prompt),
                            };
                            if self.event_channel.send(event).is_err() {
                                tracing::error!("event receiver dropped; closing connection");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        let _ = self.event_channel.send(
                            ConnectionEvent::Error(ConnectionError::from(e)));
                        return;
                    }
                }
            }
        }
        tracing::info!("connection closed");
        let _ = self
            .event_channel
            .send(ConnectionEvent::Error(ConnectionError::Closed));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn lines_and_prompts_are_framed() {
        let (client, server) = tokio::io::duplex(1024);
        let (control_tx, control_rx) = mpsc::channel(8);
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        let task = ConnectionTask::new(client, control_rx, event_tx);
        let handle = tokio::spawn(task.run());

        let (mut server_read, mut server_write) = tokio::io::split(server);
        server_write
            .write_all(b"** Funny new message!\r\nlogin: ")
            .await
            .unwrap();

        match event_rx.recv().await.unwrap() {
            ConnectionEvent::Line(line) => assert_eq!(line, "** Funny new message!"),
            other => panic!("wrong event: {other:?}"),
        }
        match event_rx.recv().await.unwrap() {
            ConnectionEvent::Prompt(prompt) => assert_eq!(prompt, "login:"),
            other => panic!("wrong event: {other:?}"),
        }

        control_tx
            .send(ConnectionControl::Send("who".to_string()))
            .await
            .unwrap();
        let mut buf = [0u8; 16];
        let n = server_read.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"who\r\n");

        control_tx.send(ConnectionControl::Close).await.unwrap();
        handle.await.unwrap();
        match event_rx.recv().await.unwrap() {
            ConnectionEvent::Error(ConnectionError::Closed) => {}
            other => panic!("wrong event: {other:?}"),
        }
    }
}
