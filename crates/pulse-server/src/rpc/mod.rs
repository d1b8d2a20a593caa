mod protocol;
mod session;

pub use protocol::{Request, Response, RpcMetric, RpcValue};
pub use session::Session;

use std::io;
use std::sync::Arc;

use pulse_store::Store;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Accept loop for the binary protocol. Each connection gets its own task;
/// cancelling the token stops accepting and lets in-flight connections
/// finish their current exchange.
pub async fn serve(
    listener: TcpListener,
    store: Arc<dyn Store>,
    cancel: CancellationToken,
) -> io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "rpc listening");
    }
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(error = %e, "rpc accept failed");
                        continue;
                    }
                };
                let session = Session::new(Arc::clone(&store));
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, session, cancel).await {
                        debug!(peer = %peer, error = %e, "rpc connection closed");
                    }
                });
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    session: Session,
    cancel: CancellationToken,
) -> io::Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);

    loop {
        // Length-prefixed frames: u32 big-endian, then the rmp-serde message.
        let mut len_buf = [0u8; 4];
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            read = reader.read_exact(&mut len_buf) => match read {
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e),
            },
        }
        let len = u32::from_be_bytes(len_buf) as usize;

        let mut msg_buf = vec![0u8; len];
        reader.read_exact(&mut msg_buf).await?;

        let request: Request = rmp_serde::from_slice(&msg_buf).map_err(io::Error::other)?;
        let response = session.handle(request).await;

        let response_bytes = rmp_serde::to_vec(&response).map_err(io::Error::other)?;
        writer
            .write_all(&(response_bytes.len() as u32).to_be_bytes())
            .await?;
        writer.write_all(&response_bytes).await?;
        writer.flush().await?;
    }
}
