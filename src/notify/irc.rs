//! Minimal IRC client used as the chat transport.
//!
//! The client registers, joins the configured channels, answers server pings,
//! and keeps the set of channels it is actually in up to date from the
//! server's JOIN/PART/KICK messages. Notices are queued by [`IrcTransport`]
//! and written by the [`IrcSession`] task that owns the socket.

use crate::notify::transport::{Transport, TransportError};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

/// Queued outbound lines before `send_notice` starts waiting.
const OUTBOUND_CAPACITY: usize = 256;

/// IRC lines are limited to 512 bytes including the trailing CR LF.
const MAX_LINE_BYTES: usize = 510;

const QUIT_MESSAGE: &str = "Shutting down";

/// Connection settings for [`connect`].
pub struct IrcSettings {
    /// `host:port` of the server
    pub server: String,
    pub nick: String,
    pub user: String,
    pub realname: String,
    pub password: Option<SecretString>,
    /// Channels joined after registration
    pub channels: Vec<String>,
}

impl std::fmt::Debug for IrcSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IrcSettings")
            .field("server", &self.server)
            .field("nick", &self.nick)
            .field("user", &self.user)
            .field("realname", &self.realname)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("channels", &self.channels)
            .finish()
    }
}

/// A parsed IRC protocol line.
#[derive(Debug, PartialEq, Eq)]
struct Message<'a> {
    prefix: Option<&'a str>,
    command: &'a str,
    params: Vec<&'a str>,
}

impl Message<'_> {
    /// Nick portion of the prefix (`nick!user@host`).
    fn source_nick(&self) -> Option<&str> {
        self.prefix.and_then(|p| p.split('!').next())
    }

    fn param(&self, idx: usize) -> Option<&str> {
        self.params.get(idx).copied()
    }
}

fn parse_message(line: &str) -> Option<Message<'_>> {
    let mut rest = line.trim_end_matches(['\r', '\n']);

    // Message tags are not used
    if rest.starts_with('@') {
        rest = rest.split_once(' ')?.1.trim_start();
    }

    let prefix = match rest.strip_prefix(':') {
        Some(tail) => {
            let (prefix, tail) = tail.split_once(' ')?;
            rest = tail.trim_start();
            Some(prefix)
        }
        None => None,
    };

    let (head, trailing) = match rest.split_once(" :") {
        Some((head, trailing)) => (head, Some(trailing)),
        None => (rest, None),
    };

    let mut words = head.split(' ').filter(|w| !w.is_empty());
    let command = words.next()?;
    let mut params: Vec<&str> = words.collect();
    params.extend(trailing);

    Some(Message {
        prefix,
        command,
        params,
    })
}

/// Replaces line breaks so feed text cannot inject extra protocol lines.
fn sanitize(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Cuts `line` to at most `max` bytes on a character boundary.
fn truncate_line(line: &str, max: usize) -> &str {
    if line.len() <= max {
        return line;
    }
    let mut end = max;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    &line[..end]
}

/// Cheap handle for sending notices; clones share one connection.
#[derive(Clone)]
pub struct IrcTransport {
    outbound: mpsc::Sender<String>,
    joined: Arc<RwLock<Vec<String>>>,
}

#[async_trait]
impl Transport for IrcTransport {
    async fn channels(&self) -> Vec<String> {
        self.joined.read().await.clone()
    }

    async fn send_notice(&self, channel: &str, text: &str) -> Result<(), TransportError> {
        let line = format!("NOTICE {} :{}", channel, sanitize(text));
        self.outbound
            .send(truncate_line(&line, MAX_LINE_BYTES).to_string())
            .await
            .map_err(|_| TransportError::Closed)
    }
}

/// Owns the socket; must be driven with [`IrcSession::run`].
pub struct IrcSession {
    settings: IrcSettings,
    nick: String,
    registered: bool,
    reader: BufReader<OwnedReadHalf>,
    buf: Vec<u8>,
    writer: OwnedWriteHalf,
    outbound_rx: mpsc::Receiver<String>,
    joined: Arc<RwLock<Vec<String>>>,
}

/// Connects to the server and sends the registration lines.
///
/// Channels are joined once the server confirms registration, which happens
/// inside [`IrcSession::run`].
pub async fn connect(settings: IrcSettings) -> Result<(IrcTransport, IrcSession), TransportError> {
    let stream = TcpStream::connect(&settings.server).await?;
    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let joined = Arc::new(RwLock::new(Vec::new()));

    let mut session = IrcSession {
        nick: settings.nick.clone(),
        settings,
        registered: false,
        reader: BufReader::new(read_half),
        buf: Vec::new(),
        writer: write_half,
        outbound_rx,
        joined: Arc::clone(&joined),
    };
    session.register().await?;

    tracing::info!(server = %session.settings.server, nick = %session.nick, "Connected to IRC server");

    let transport = IrcTransport {
        outbound: outbound_tx,
        joined,
    };
    Ok((transport, session))
}

impl IrcSession {
    /// Reads server lines and writes queued notices until shutdown.
    ///
    /// Returns `Ok(())` after sending QUIT on shutdown, or an error when the
    /// server closes the connection.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<(), TransportError> {
        let result = self.drive(&shutdown).await;
        self.joined.write().await.clear();
        result
    }

    async fn drive(&mut self, shutdown: &CancellationToken) -> Result<(), TransportError> {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    self.write_line(&format!("QUIT :{QUIT_MESSAGE}")).await?;
                    self.writer.shutdown().await?;
                    return Ok(());
                }
                read = self.reader.read_until(b'\n', &mut self.buf) => {
                    if read? == 0 {
                        tracing::warn!(server = %self.settings.server, "IRC server closed the connection");
                        return Err(TransportError::Closed);
                    }
                    // Only whole lines reach here; read_until keeps partial data in buf
                    let line = String::from_utf8_lossy(&self.buf).into_owned();
                    self.buf.clear();
                    self.handle_line(&line).await?;
                }
                Some(line) = self.outbound_rx.recv() => {
                    self.write_line(&line).await?;
                }
            }
        }
    }

    async fn register(&mut self) -> Result<(), TransportError> {
        let pass_line = self
            .settings
            .password
            .as_ref()
            .map(|p| format!("PASS {}", p.expose_secret()));
        if let Some(line) = pass_line {
            self.write_line(&line).await?;
        }
        self.write_line(&format!("NICK {}", self.nick)).await?;
        self.write_line(&format!(
            "USER {} 0 * :{}",
            self.settings.user, self.settings.realname
        ))
        .await
    }

    async fn handle_line(&mut self, line: &str) -> Result<(), TransportError> {
        let Some(msg) = parse_message(line) else {
            return Ok(());
        };
        let from_self = msg
            .source_nick()
            .is_some_and(|n| n.eq_ignore_ascii_case(&self.nick));

        match msg.command {
            "PING" => {
                let token = msg.param(0).unwrap_or_default();
                self.write_line(&format!("PONG :{token}")).await?;
            }
            // RPL_WELCOME
            "001" => {
                if let Some(nick) = msg.param(0) {
                    self.nick = nick.to_string();
                }
                self.registered = true;
                tracing::info!(nick = %self.nick, "Registered with IRC server");
                for channel in self.settings.channels.clone() {
                    self.write_line(&format!("JOIN {channel}")).await?;
                }
            }
            // ERR_NICKNAMEINUSE
            "433" if !self.registered => {
                self.nick.push('_');
                tracing::warn!(nick = %self.nick, "Nickname in use, retrying");
                self.write_line(&format!("NICK {}", self.nick)).await?;
            }
            "NICK" if from_self => {
                if let Some(nick) = msg.param(0) {
                    self.nick = nick.to_string();
                }
            }
            "JOIN" if from_self => {
                if let Some(channel) = msg.param(0) {
                    let mut joined = self.joined.write().await;
                    if !joined.iter().any(|c| c.eq_ignore_ascii_case(channel)) {
                        joined.push(channel.to_string());
                    }
                    tracing::info!(channel = %channel, "Joined channel");
                }
            }
            "PART" if from_self => {
                if let Some(channel) = msg.param(0) {
                    self.leave(channel).await;
                }
            }
            "KICK" => {
                if let (Some(channel), Some(target)) = (msg.param(0), msg.param(1)) {
                    if target.eq_ignore_ascii_case(&self.nick) {
                        tracing::warn!(channel = %channel, "Kicked from channel");
                        self.leave(channel).await;
                    }
                }
            }
            "ERROR" => {
                return Err(TransportError::Server(msg.params.join(" ")));
            }
            _ => {}
        }
        Ok(())
    }

    async fn leave(&self, channel: &str) {
        self.joined
            .write()
            .await
            .retain(|c| !c.eq_ignore_ascii_case(channel));
    }

    async fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let line = truncate_line(line, MAX_LINE_BYTES);
        if !line.starts_with("PASS ") {
            tracing::trace!(line = %line, "IRC >>");
        }
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        Ok(())
    }
}
