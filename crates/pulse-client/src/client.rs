use std::io::{BufReader, BufWriter, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use pulse_core::{Metric, MetricKind};
use pulse_server::rpc::{Request, Response, RpcMetric};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("server error: {0}")]
    Server(String),
}

impl From<rmp_serde::encode::Error> for ClientError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for ClientError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

impl From<pulse_core::MetricError> for ClientError {
    fn from(e: pulse_core::MetricError) -> Self {
        ClientError::Serialization(e.to_string())
    }
}

/// Blocking client for the binary RPC surface. Frames are a u32 big-endian
/// length followed by an rmp-serde message, both directions.
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        let reader = BufReader::new(stream.try_clone()?);
        let writer = BufWriter::new(stream);
        Ok(Self { reader, writer })
    }

    fn request(&mut self, request: Request) -> Result<Response, ClientError> {
        let bytes = rmp_serde::to_vec(&request)?;
        self.writer.write_all(&(bytes.len() as u32).to_be_bytes())?;
        self.writer.write_all(&bytes)?;
        self.writer.flush()?;

        let mut len_buf = [0u8; 4];
        self.reader.read_exact(&mut len_buf)?;
        let len = u32::from_be_bytes(len_buf) as usize;

        let mut msg_buf = vec![0u8; len];
        self.reader.read_exact(&mut msg_buf)?;

        Ok(rmp_serde::from_slice(&msg_buf)?)
    }

    fn expect_metric(&mut self, request: Request) -> Result<Metric, ClientError> {
        match self.request(request)? {
            Response::Metric(wire) => Ok(Metric::try_from(wire)?),
            Response::Error(e) => Err(ClientError::Server(e)),
            other => Err(ClientError::Server(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }

    fn expect_metrics(&mut self, request: Request) -> Result<Vec<Metric>, ClientError> {
        match self.request(request)? {
            Response::Metrics(wires) => {
                let mut metrics = Vec::with_capacity(wires.len());
                for wire in wires {
                    metrics.push(Metric::try_from(wire)?);
                }
                Ok(metrics)
            }
            Response::Error(e) => Err(ClientError::Server(e)),
            other => Err(ClientError::Server(format!(
                "unexpected response: {other:?}"
            ))),
        }
    }

    /// Read one metric by kind and name.
    pub fn get_metric(&mut self, kind: MetricKind, name: &str) -> Result<Metric, ClientError> {
        self.expect_metric(Request::GetMetric {
            kind: kind.as_str().to_string(),
            name: name.to_string(),
        })
    }

    /// Read the full store snapshot.
    pub fn get_metrics(&mut self) -> Result<Vec<Metric>, ClientError> {
        self.expect_metrics(Request::GetMetrics)
    }

    /// Write one metric; the returned record carries the stored value
    /// (post-increment for counters).
    pub fn add_metric(&mut self, metric: &Metric) -> Result<Metric, ClientError> {
        self.expect_metric(Request::AddMetric(RpcMetric::from(metric)))
    }

    /// Write a batch atomically; the response is the resulting snapshot.
    pub fn add_metrics(&mut self, metrics: &[Metric]) -> Result<Vec<Metric>, ClientError> {
        self.expect_metrics(Request::AddMetrics(
            metrics.iter().map(RpcMetric::from).collect(),
        ))
    }
}
