use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::config::Config;
use crate::state::ServerState;

/// Accept loop: one task per connection, no admission limit.
pub struct Server {
    listener: TcpListener,
    state: ServerState,
}

impl Server {
    pub async fn bind(config: Config) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to listen on {}", addr))?;

        Ok(Self {
            listener,
            state: ServerState::new(config),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn state(&self) -> &ServerState {
        &self.state
    }

    /// Accepts until `shutdown` resolves. Sessions already running are left
    /// to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Server { listener, state } = self;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => spawn_session(&state, socket, peer),
                    Err(err) => warn!(error = %err, "failed to accept connection"),
                }
            }
        }

        Ok(())
    }

    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "failed to install ctrl-c handler");
                std::future::pending::<()>().await;
            }
        })
        .await
    }
}

fn spawn_session(state: &ServerState, socket: TcpStream, peer: SocketAddr) {
    let state = state.clone();

    tokio::spawn(async move {
        if let Err(err) = crate::conn::handle(state, socket, peer).await {
            warn!(%peer, error = ?err, "connection error");
        }
    });
}
