use log::{error, info, warn};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::config::ServerConfig;
use crate::connection::{ConnectionContext, PeerTable, handle_connection};
use crate::error::ChatServerError;
use crate::registry::UserRegistry;

pub struct Server {
    listener: TcpListener,
    ctx: ConnectionContext,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Binds the listener. The registry is owned by the caller, so several
    /// servers can run side by side with independent state.
    pub async fn bind(
        config: ServerConfig,
        registry: Arc<UserRegistry>,
    ) -> Result<Self, ChatServerError> {
        let address = config.listen_address();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => {
                info!("Server bound to {}", listener.local_addr()?);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", address, e);
                return Err(e.into());
            }
        };

        let peers = Arc::new(PeerTable::new(config.write_timeout()));
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            listener,
            ctx: ConnectionContext {
                registry,
                peers,
                config: Arc::new(config),
            },
            shutdown,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn registry(&self) -> Arc<UserRegistry> {
        Arc::clone(&self.ctx.registry)
    }

    /// Serves until Ctrl-C
    pub async fn start(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Accepts connections until `shutdown` resolves, then tells every worker
    /// to stop and waits for them to log their users out.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let Server {
            listener,
            ctx,
            shutdown: stop,
        } = self;
        tokio::pin!(shutdown);

        info!("Starting chat server on {:?}", listener.local_addr());

        let mut workers = JoinSet::new();
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, addr)) => spawn_worker(&mut workers, stream, addr, &ctx, &stop),
                    Err(e) => error!("Error accepting connection: {}", e),
                },
                Some(joined) = workers.join_next(), if !workers.is_empty() => {
                    if let Err(e) = joined {
                        error!("Connection worker panicked: {}", e);
                    }
                }
            }
        }

        info!("Shutting down, closing {} connection(s)", workers.len());
        let _ = stop.send(true);
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!("Connection worker panicked: {}", e);
            }
        }
        info!("Chat server stopped");
    }
}

fn spawn_worker(
    workers: &mut JoinSet<()>,
    stream: TcpStream,
    addr: SocketAddr,
    ctx: &ConnectionContext,
    stop: &watch::Sender<bool>,
) {
    let ctx = ctx.clone();
    let shutdown = stop.subscribe();

    // One task per connection so the accept loop never blocks
    workers.spawn(async move {
        let (read_half, write_half) = stream.into_split();
        if let Err(e) = handle_connection(read_half, write_half, addr, ctx, shutdown).await {
            warn!("Connection from {} ended with error: {}", addr, e);
        }
    });
}
