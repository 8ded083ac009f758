//! Loopback transit slot.
//!
//! The page side binds `127.0.0.1:<port>` and writes the payload as a single
//! JSON line to the first client that connects, then closes the listener. The
//! capture side polls by connecting; a refused connection means the slot is
//! empty.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    sync::{Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::timeout,
};
use tracing::{debug, warn};

use crate::{errors::BridgeError, payload::TransferPayload, transit::TransitSlot};

/// Port used when none is configured.
pub const DEFAULT_TRANSIT_PORT: u16 = 47_615;

const HOLD_FOR: Duration = Duration::from_secs(15);
const IO_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct LoopbackSlot {
    addr: Mutex<SocketAddr>,
    server: Mutex<Option<JoinHandle<()>>>,
    hold_for: Duration,
}

impl LoopbackSlot {
    /// Slot on `127.0.0.1:port`. Port `0` picks a free port on first `place`.
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            addr: Mutex::new(SocketAddr::from((Ipv4Addr::LOCALHOST, port))),
            server: Mutex::new(None),
            hold_for: HOLD_FOR,
        }
    }

    /// How long an unclaimed payload is offered before it is dropped.
    #[must_use]
    pub fn with_hold_for(mut self, hold_for: Duration) -> Self {
        self.hold_for = hold_for;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        *self.addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn stop_server(&self) {
        let previous = self
            .server
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(handle) = previous {
            handle.abort();

            if let Err(source) = handle.await
                && !source.is_cancelled()
            {
                warn!("transit server task failed: {source}");
            }
        }
    }
}

impl Drop for LoopbackSlot {
    fn drop(&mut self) {
        if let Some(handle) = self
            .server
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

async fn serve_once(listener: TcpListener, line: Vec<u8>, hold_for: Duration) {
    let accepted = timeout(hold_for, listener.accept()).await;

    drop(listener);

    let (mut stream, peer) = match accepted {
        Ok(Ok(accepted)) => accepted,
        Ok(Err(source)) => {
            warn!("transit slot failed to accept: {source}");
            return;
        }
        Err(_elapsed) => {
            debug!("transit payload expired unclaimed");
            return;
        }
    };

    if let Err(source) = stream.write_all(&line).await {
        warn!(%peer, "failed to hand over transit payload: {source}");
        return;
    }

    if let Err(source) = stream.shutdown().await {
        debug!(%peer, "transit stream shutdown failed: {source}");
    }

    debug!(%peer, "transit payload handed over");
}

fn is_empty_slot(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::UnexpectedEof
    )
}

#[async_trait]
impl TransitSlot for LoopbackSlot {
    async fn place(&self, payload: TransferPayload) -> Result<(), BridgeError> {
        self.stop_server().await;

        let mut line = serde_json::to_vec(&payload).map_err(BridgeError::TransitPayload)?;
        line.push(b'\n');

        let listener = TcpListener::bind(self.local_addr())
            .await
            .map_err(BridgeError::Transit)?;

        let bound = listener.local_addr().map_err(BridgeError::Transit)?;

        *self.addr.lock().unwrap_or_else(PoisonError::into_inner) = bound;

        let handle = tokio::spawn(serve_once(listener, line, self.hold_for));

        *self.server.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        debug!(%bound, "transit payload placed");

        Ok(())
    }

    async fn take(&self) -> Result<Option<TransferPayload>, BridgeError> {
        let stream = match timeout(IO_TIMEOUT, TcpStream::connect(self.local_addr())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) if is_empty_slot(&source) => return Ok(None),
            Ok(Err(source)) => return Err(BridgeError::Transit(source)),
            Err(_elapsed) => return Ok(None),
        };

        let mut line = String::new();

        match timeout(IO_TIMEOUT, BufReader::new(stream).read_line(&mut line)).await {
            Ok(Ok(_read)) => {}
            Ok(Err(source)) if is_empty_slot(&source) => return Ok(None),
            Ok(Err(source)) => return Err(BridgeError::Transit(source)),
            Err(_elapsed) => return Ok(None),
        }

        let line = line.trim();

        if line.is_empty() {
            return Ok(None);
        }

        serde_json::from_str(line)
            .map(Some)
            .map_err(BridgeError::TransitPayload)
    }
}
