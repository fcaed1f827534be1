use log::{error, info};
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::server::router::build_router;
use crate::storage::{FileStore, LocalFs};

pub struct Server {
    listener: TcpListener,
    storage_root: PathBuf,
    config: Arc<ServerConfig>,
}

impl Server {
    /// Prepares the storage root and binds the listener.
    ///
    /// The root is created if absent and canonicalized, so every resolved
    /// path is absolute.
    pub async fn new(config: ServerConfig) -> io::Result<Self> {
        let config = Arc::new(config);
        let storage_root = prepare_storage_root(&config.storage_root_path()).await?;

        let addr = config
            .socket_addr()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!("Server bound to {}", addr);
                listener
            }
            Err(e) => {
                error!("Failed to bind to {}: {}", addr, e);
                return Err(e);
            }
        };

        Ok(Self {
            listener,
            storage_root,
            config,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    /// Serves requests until Ctrl-C
    pub async fn start(self) -> io::Result<()> {
        let store = Arc::new(FileStore::new(
            self.storage_root.clone(),
            self.config.max_upload_size,
            LocalFs,
        ));
        let app = build_router(store);

        let port = self.local_addr()?.port();
        info!("Server starting on {}...", self.local_addr()?);
        info!("Web interface: http://localhost:{}", port);
        info!("Upload directory: {}", self.storage_root.display());
        info!("Maximum upload size: {} bytes", self.config.max_upload_size);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn prepare_storage_root(root: &Path) -> io::Result<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(root).await {
        error!("Failed to create storage root {}: {}", root.display(), e);
        return Err(e);
    }
    tokio::fs::canonicalize(root).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, stopping server");
}
