use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Result;
use chatroom::{Config, Server, ServerState};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinSet,
    time::timeout,
};

const WAIT: Duration = Duration::from_secs(2);

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let (reader, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(reader),
            writer,
        };
        client.expect_raw("Your username: ").await?;
        Ok(client)
    }

    async fn join(addr: SocketAddr, name: &str) -> Result<Self> {
        let mut client = Self::connect(addr).await?;
        client.send(name).await?;
        client.expect_line("type '/help' for help").await?;
        Ok(client)
    }

    async fn send(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(format!("{line}\n").as_bytes()).await?;
        Ok(())
    }

    async fn line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = timeout(WAIT, self.reader.read_line(&mut line)).await??;
        anyhow::ensure!(read > 0, "server closed the connection");
        Ok(line.trim_end_matches('\n').to_string())
    }

    async fn expect_line(&mut self, expected: &str) -> Result<()> {
        assert_eq!(self.line().await?, expected);
        Ok(())
    }

    async fn expect_raw(&mut self, expected: &str) -> Result<()> {
        let mut buf = vec![0u8; expected.len()];
        timeout(WAIT, self.reader.read_exact(&mut buf)).await??;
        assert_eq!(String::from_utf8(buf)?, expected);
        Ok(())
    }

    async fn expect_eof(&mut self) -> Result<()> {
        let mut rest = String::new();
        timeout(WAIT, self.reader.read_to_string(&mut rest)).await??;
        assert_eq!(rest, "");
        Ok(())
    }
}

async fn start_server() -> Result<(SocketAddr, ServerState, oneshot::Sender<()>)> {
    let config = Config::default()
        .with_host(Ipv4Addr::LOCALHOST.into())
        .with_port(0);
    let server = Server::bind(config).await?;
    let addr = server.local_addr()?;
    let state = server.state().clone();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        let _ = server.run_until(shutdown).await;
    });

    Ok((addr, state, shutdown_tx))
}

async fn wait_until(mut done: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition never held");
}

#[tokio::test]
async fn two_members_chat_and_one_drops() -> Result<()> {
    let (addr, state, _shutdown) = start_server().await?;

    let mut alice = Client::join(addr, "alice").await?;
    alice.expect_line("ChatServ: alice has entered the room.").await?;
    alice.expect_line("ChatServ: In this room are: alice").await?;

    let mut bob = Client::connect(addr).await?;
    bob.send("alice").await?;
    bob.expect_raw("'alice' is already in use.\nPlease choose a different username: ")
        .await?;
    bob.send("bob").await?;
    bob.expect_line("type '/help' for help").await?;
    bob.expect_line("ChatServ: bob has entered the room.").await?;
    bob.expect_line("ChatServ: In this room are: alice, bob").await?;

    alice.expect_line("ChatServ: bob has entered the room.").await?;
    alice.expect_line("ChatServ: In this room are: alice, bob").await?;
    assert_eq!(state.room.members(), vec!["alice", "bob"]);

    bob.send("hello there").await?;
    alice.expect_line("bob: hello there").await?;

    alice.send("/help").await?;
    alice.expect_line("type '/exit' to exit").await?;

    // bob sees neither his own line nor alice's help
    alice.send("ping").await?;
    bob.expect_line("alice: ping").await?;

    drop(bob);
    alice.expect_line("ChatServ: bob has left the room.").await?;
    alice.expect_line("ChatServ: In this room are: alice").await?;
    assert_eq!(state.room.members(), vec!["alice"]);

    Ok(())
}

#[tokio::test]
async fn quit_directive_says_goodbye_and_closes() -> Result<()> {
    let (addr, state, _shutdown) = start_server().await?;

    let mut alice = Client::join(addr, "alice").await?;
    alice.expect_line("ChatServ: alice has entered the room.").await?;
    alice.expect_line("ChatServ: In this room are: alice").await?;
    let mut carol = Client::join(addr, "carol").await?;
    carol.expect_line("ChatServ: carol has entered the room.").await?;
    carol.expect_line("ChatServ: In this room are: alice, carol").await?;
    alice.expect_line("ChatServ: carol has entered the room.").await?;
    alice.expect_line("ChatServ: In this room are: alice, carol").await?;

    carol.send("/q").await?;
    carol.expect_line("Goodbye.").await?;
    carol.expect_eof().await?;

    alice.expect_line("ChatServ: carol has left the room.").await?;
    alice.expect_line("ChatServ: In this room are: alice").await?;

    // the name is free again
    let mut again = Client::join(addr, "carol").await?;
    again.expect_line("ChatServ: carol has entered the room.").await?;
    assert!(state.room.contains("carol"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_clients_get_one_name() -> Result<()> {
    let (addr, state, _shutdown) = start_server().await?;

    let mut clients = JoinSet::new();
    for _ in 0..16 {
        clients.spawn(async move {
            let mut client = Client::connect(addr).await?;
            client.send("zed").await?;
            let reply = client.line().await?;
            Ok::<_, anyhow::Error>((reply == "type '/help' for help", client))
        });
    }

    let mut winners = 0;
    let mut keep = Vec::new();
    while let Some(result) = clients.join_next().await {
        let (won, client) = result??;
        if won {
            winners += 1;
        }
        keep.push(client);
    }

    assert_eq!(winners, 1);
    assert_eq!(state.room.members(), vec!["zed"]);

    drop(keep);
    wait_until(|| state.room.is_empty()).await;

    Ok(())
}

#[tokio::test]
async fn server_name_cannot_be_claimed() -> Result<()> {
    let (addr, state, _shutdown) = start_server().await?;

    let mut client = Client::connect(addr).await?;
    client.send("ChatServ").await?;
    client
        .expect_raw("'ChatServ' is already in use.\nPlease choose a different username: ")
        .await?;
    assert!(state.room.is_empty());

    // an empty name ends the session without joining
    client.send("").await?;
    client.expect_eof().await?;
    assert!(state.room.is_empty());

    Ok(())
}
