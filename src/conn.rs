use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::broadcast::{announce, broadcast};
use crate::protocol::{self, Input};
use crate::room::Outbound;
use crate::state::ServerState;

/// Lifecycle of one connection. `Active` and `Closing` carry the name the
/// session holds in the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Connecting,
    Naming,
    Active(String),
    Closing(String),
    Closed,
}

pub async fn handle(state: ServerState, socket: TcpStream, peer: SocketAddr) -> Result<()> {
    let (reader, writer) = socket.into_split();

    info!(%peer, "connected");
    let name = run(state, BufReader::new(reader), writer).await?;
    info!(%peer, name = name.as_deref().unwrap_or("-"), "disconnected");

    Ok(())
}

/// Drives one client from the naming prompt to teardown over any line
/// transport. Returns the name it held, if it was ever admitted.
pub async fn run<R, W>(state: ServerState, reader: R, writer: W) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(state.config.outbound_capacity());
    let writer = tokio::spawn(write_outbound(rx, writer, state.config.write_timeout()));

    let mut session = Session {
        state,
        reader,
        outbound: tx,
        buf: String::new(),
    };

    let mut admitted = None;
    let mut phase = Phase::Connecting;
    loop {
        phase = match phase {
            Phase::Connecting => session.connect().await,
            Phase::Naming => session.choose_name().await,
            Phase::Active(name) => session.listen(name).await,
            Phase::Closing(name) => {
                session.leave(&name).await;
                admitted = Some(name);
                Phase::Closed
            }
            Phase::Closed => break,
        };
    }

    // Dropping the last sender lets the writer drain and shut the stream down.
    drop(session);
    writer.await?;

    Ok(admitted)
}

struct Session<R> {
    state: ServerState,
    reader: R,
    outbound: Outbound,
    buf: String,
}

impl<R: AsyncBufRead + Unpin> Session<R> {
    async fn connect(&mut self) -> Phase {
        self.send(protocol::NAME_PROMPT.to_string()).await;
        Phase::Naming
    }

    async fn choose_name(&mut self) -> Phase {
        let candidate = match self.read_line().await {
            Some(line) if !line.is_empty() => line,
            _ => return Phase::Closed,
        };

        let room = &self.state.room;
        if candidate == room.server_name() || !room.reserve(&candidate, self.outbound.clone()) {
            debug!(name = %candidate, "name already in use");
            self.send(protocol::name_taken_prompt(&candidate)).await;
            return Phase::Naming;
        }

        self.admit(&candidate).await;
        Phase::Active(candidate)
    }

    async fn admit(&mut self, name: &str) {
        info!(%name, "joined the room");

        self.tell(protocol::HELP_HINT).await;

        let room = &self.state.room;
        announce(room, &protocol::joined(name));
        announce(room, &protocol::roster(&room.members()));
    }

    async fn listen(&mut self, name: String) -> Phase {
        // A failed read is an implicit exit.
        let Some(line) = self.read_line().await else {
            return Phase::Closing(name);
        };

        match protocol::parse_input(&line) {
            Input::Exit => Phase::Closing(name),
            Input::Help => {
                self.tell(protocol::HELP_TEXT).await;
                Phase::Active(name)
            }
            Input::Message(body) => {
                broadcast(&self.state.room, &name, body);
                Phase::Active(name)
            }
        }
    }

    async fn leave(&mut self, name: &str) {
        self.tell(protocol::GOODBYE).await;

        let room = &self.state.room;
        room.remove(name);
        announce(room, &protocol::left(name));
        announce(room, &protocol::roster(&room.members()));

        info!(%name, "left the room");
    }

    /// `None` once the client can no longer be read from or written to.
    async fn read_line(&mut self) -> Option<String> {
        self.buf.clear();
        tokio::select! {
            read = self.reader.read_line(&mut self.buf) => match read {
                Ok(0) => None,
                Ok(_) => Some(protocol::strip_line_ending(&self.buf).to_string()),
                Err(err) => {
                    debug!(error = %err, "client read failed");
                    None
                }
            },
            // the writer only drops its receiver early after a failed write
            _ = self.outbound.closed() => {
                debug!("client writer gave up");
                None
            }
        }
    }

    async fn tell(&self, line: &str) {
        self.send(format!("{}\n", line)).await;
    }

    /// Best effort: once the writer is gone the client is too.
    async fn send(&self, frame: String) {
        if self.outbound.send(frame).await.is_err() {
            debug!("client writer already closed");
        }
    }
}

async fn write_outbound<W>(mut rx: mpsc::Receiver<String>, mut writer: W, limit: Duration)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        match timeout(limit, write_frame(&mut writer, &frame)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                debug!(error = %err, "client write failed");
                return;
            }
            Err(_) => {
                warn!(?limit, "client stopped reading, closing its writer");
                return;
            }
        }
    }

    if let Ok(Err(err)) = timeout(limit, writer.shutdown()).await {
        debug!(error = %err, "client shutdown failed");
    }
}

async fn write_frame<W>(writer: &mut W, frame: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame.as_bytes()).await?;
    writer.flush().await
}
