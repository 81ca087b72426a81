use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_chat::client::IncomingMessage;
use relay_chat::config::{ClientConfig, ServerConfig};
use relay_chat::error::{ClientError, ErrorKind};
use relay_chat::protocol::{Command, Request};
use relay_chat::storage::JsonFileStore;
use relay_chat::{ClientSession, Server, UserRegistry};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    registry: Arc<UserRegistry>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(registry: UserRegistry) -> Self {
        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        let server = Server::bind(config, Arc::new(registry)).await.unwrap();
        let addr = server.local_addr().unwrap();
        let registry = server.registry();

        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.run_until(async {
            let _ = stopped.await;
        }));

        Self {
            addr,
            registry,
            stop: Some(stop),
            task,
        }
    }

    async fn connect(&self) -> (ClientSession, mpsc::UnboundedReceiver<IncomingMessage>) {
        let config = ClientConfig {
            server_address: self.addr.to_string(),
            reply_timeout_secs: 5,
        };
        ClientSession::connect(&config).await.unwrap()
    }

    async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        timeout(WAIT, self.task).await.unwrap().unwrap();
    }
}

async fn wait_for_online(registry: &UserRegistry, expected: &[&str]) {
    let result = timeout(WAIT, async {
        loop {
            if registry.online_nicknames().await == expected {
                return;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(result.is_ok(), "online set never became {:?}", expected);
}

#[tokio::test]
async fn test_client_server_interactions() {
    let server = TestServer::start(UserRegistry::in_memory()).await;

    let (mut cl, _cl_rx) = server.connect().await;
    assert!(cl.clear().await.unwrap().is_ok());

    assert!(cl.register("a", "md5").await.unwrap().is_ok());
    assert!(cl.login("a", "md5").await.unwrap().is_ok());
    assert_eq!(cl.nickname(), "a");
    assert!(cl.logout().await.unwrap().is_ok());
    assert!(!cl.is_authenticated());
    cl.close().await;

    let (mut cl, _cl_rx) = server.connect().await;

    let reply = cl.login("a", "pass").await.unwrap();
    assert_eq!(reply.text, "Invalid password");
    assert!(reply.is_failure());
    assert_eq!(reply.error, Some(ErrorKind::BadCredential));

    assert!(cl.login("a", "md5").await.unwrap().is_ok());

    let reply = cl.login("a", "md5").await.unwrap();
    assert_eq!(reply.text, "User 'a' is already online");

    let reply = cl.register("a", "md5").await.unwrap();
    assert_eq!(reply.text, "User 'a' already exists");
    assert_eq!(reply.error, Some(ErrorKind::AlreadyExists));

    let (mut cl2, mut cl2_rx) = server.connect().await;
    assert!(cl2.register("b", "md5").await.unwrap().is_ok());
    assert!(cl2.login("b", "md5").await.unwrap().is_ok());

    let reply = cl2
        .send_request(&Request::bare(Command::GetOnlineUserList))
        .await
        .unwrap();
    assert_eq!(reply.text, "online users: a,b");
    assert_eq!(cl2.online_users().await.unwrap(), vec!["a", "b"]);

    assert!(cl.message_to("b", "Msg").await.unwrap().is_ok());
    let message = timeout(WAIT, cl2_rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        message,
        IncomingMessage {
            sender: "a".into(),
            body: "Msg".into()
        }
    );

    assert!(cl.clear().await.unwrap().is_ok());
    assert!(cl.check_unique_nickname("a").await.unwrap().is_ok());
    assert!(cl.check_unique_nickname("b").await.unwrap().is_ok());
    assert!(!server.registry.exists("a").await);
    assert!(!server.registry.exists("b").await);

    server.shutdown().await;
}

#[tokio::test]
async fn incoming_messages_never_answer_a_request() {
    let server = TestServer::start(UserRegistry::in_memory()).await;
    let (mut a, mut a_rx) = server.connect().await;
    let (mut b, _b_rx) = server.connect().await;

    for (session, name) in [(&mut a, "a"), (&mut b, "b")] {
        assert!(session.register(name, "pw").await.unwrap().is_ok());
        assert!(session.login(name, "pw").await.unwrap().is_ok());
    }

    for i in 0..3 {
        assert!(b.message_to("a", &format!("m{}", i)).await.unwrap().is_ok());
    }

    // Relayed frames are already queued ahead of this reply on a's socket
    assert_eq!(a.online_users().await.unwrap(), vec!["a", "b"]);

    for i in 0..3 {
        let message = timeout(WAIT, a_rx.recv()).await.unwrap().unwrap();
        assert_eq!(message.sender, "b");
        assert_eq!(message.body, format!("m{}", i));
    }

    server.shutdown().await;
}

#[tokio::test]
async fn messages_to_offline_or_unknown_users_fail() {
    let server = TestServer::start(UserRegistry::in_memory()).await;
    let (mut a, _a_rx) = server.connect().await;
    let (mut b, mut b_rx) = server.connect().await;

    let reply = a.message_to("b", "early").await.unwrap();
    assert_eq!(reply.text, "You are not logged in");
    assert_eq!(reply.error, Some(ErrorKind::NotAuthenticated));

    a.register("a", "pw").await.unwrap();
    a.login("a", "pw").await.unwrap();
    b.register("b", "pw").await.unwrap();

    let reply = a.message_to("b", "hello").await.unwrap();
    assert_eq!(reply.text, "User 'b' is offline");
    let reply = a.message_to("zed", "hello").await.unwrap();
    assert_eq!(reply.text, "User 'zed' does not exist");

    b.login("b", "pw").await.unwrap();
    assert!(a.message_to("b", "now").await.unwrap().is_ok());
    let message = timeout(WAIT, b_rx.recv()).await.unwrap().unwrap();
    assert_eq!(message.body, "now");
    assert!(b_rx.try_recv().is_err());

    server.shutdown().await;
}

#[tokio::test]
async fn dropped_connection_goes_offline() {
    let server = TestServer::start(UserRegistry::in_memory()).await;
    let (mut a, _a_rx) = server.connect().await;
    a.register("a", "pw").await.unwrap();
    a.login("a", "pw").await.unwrap();
    wait_for_online(&server.registry, &["a"]).await;

    drop(a);
    wait_for_online(&server.registry, &[]).await;

    let (mut again, _rx) = server.connect().await;
    assert!(again.login("a", "pw").await.unwrap().is_ok());

    server.shutdown().await;
}

#[tokio::test]
async fn change_password_round_trip() {
    let server = TestServer::start(UserRegistry::in_memory()).await;
    let (mut cl, _rx) = server.connect().await;

    let reply = cl.change_password("new").await.unwrap();
    assert_eq!(reply.text, "You are not logged in");

    cl.register("a", "old").await.unwrap();
    cl.login("a", "old").await.unwrap();
    assert!(cl.change_password("new").await.unwrap().is_ok());
    cl.logout().await.unwrap();

    assert_eq!(cl.login("a", "old").await.unwrap().text, "Invalid password");
    assert!(cl.login("a", "new").await.unwrap().is_ok());

    server.shutdown().await;
}

#[tokio::test]
async fn accounts_survive_restart_with_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("local_db.json");

    let registry = UserRegistry::load(Arc::new(JsonFileStore::new(&path))).unwrap();
    let server = TestServer::start(registry).await;
    let (mut cl, _rx) = server.connect().await;
    cl.register("a", "pw").await.unwrap();
    cl.login("a", "pw").await.unwrap();
    server.shutdown().await;

    let registry = UserRegistry::load(Arc::new(JsonFileStore::new(&path))).unwrap();
    let server = TestServer::start(registry).await;
    assert!(server.registry.online_nicknames().await.is_empty());

    let (mut cl, _rx) = server.connect().await;
    assert_eq!(
        cl.register("a", "pw").await.unwrap().text,
        "User 'a' already exists"
    );
    assert!(cl.login("a", "pw").await.unwrap().is_ok());

    server.shutdown().await;
}

#[tokio::test]
async fn shutdown_disconnects_clients() {
    let server = TestServer::start(UserRegistry::in_memory()).await;
    let (mut cl, _rx) = server.connect().await;
    cl.register("a", "pw").await.unwrap();
    cl.login("a", "pw").await.unwrap();

    let registry = Arc::clone(&server.registry);
    server.shutdown().await;
    assert!(registry.online_nicknames().await.is_empty());

    let result = cl.online_users().await;
    assert!(matches!(
        result,
        Err(ClientError::NotConnected) | Err(ClientError::Transport(_))
    ));
}
