//! Line-delimited JSON gateway over a child process (or any byte stream).
//!
//! Wire format, one JSON document per line:
//! - request:  `{"id":1,"command":"get_game_info","args":{}}`
//! - response: `{"id":1,"result":{...}}` or `{"id":1,"error":"message"}`
//!
//! Responses are matched to requests by id, so several commands may be in
//! flight at once and the backend may answer them in any order.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use super::CommandGateway;
use crate::error::{Error, Result};

#[derive(Serialize)]
struct Request<'a> {
    id: u64,
    command: &'a str,
    args: &'a Value,
}

#[derive(Debug, Deserialize)]
struct Response {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Default)]
struct Pending {
    closed: bool,
    waiters: HashMap<u64, oneshot::Sender<Response>>,
}

type SharedPending = Arc<Mutex<Pending>>;

pub struct ProcessGateway {
    writer: tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>,
    pending: SharedPending,
    next_id: AtomicU64,
    reader: JoinHandle<()>,
    child: Option<Mutex<Child>>,
}

impl ProcessGateway {
    /// Spawn the backend from `argv` (program followed by its arguments).
    ///
    /// The child is killed when the gateway is dropped. Must be called
    /// inside a tokio runtime.
    pub fn spawn(argv: &[String]) -> Result<Self> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "backend command is empty",
            ))
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("backend stdin unavailable")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Io(std::io::Error::other("backend stdout unavailable")))?;

        tracing::info!("Started backend process {program} (pid {:?})", child.id());

        let mut gateway = Self::from_io(stdout, stdin);
        gateway.child = Some(Mutex::new(child));
        Ok(gateway)
    }

    /// Build a gateway over an arbitrary stream pair. Must be called inside a
    /// tokio runtime.
    pub fn from_io<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending = SharedPending::default();
        let reader = tokio::spawn(read_responses(reader, Arc::clone(&pending)));

        Self {
            writer: tokio::sync::Mutex::new(Box::new(writer)),
            pending,
            next_id: AtomicU64::new(1),
            reader,
            child: None,
        }
    }

    async fn send(&self, id: u64, command: &str, args: &Value) -> Result<()> {
        let mut line = serde_json::to_vec(&Request { id, command, args })?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }

    fn forget(&self, id: u64) {
        lock(&self.pending).waiters.remove(&id);
    }
}

#[async_trait]
impl CommandGateway for ProcessGateway {
    async fn invoke(&self, command: &str, args: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.pending);
            if pending.closed {
                return Err(Error::GatewayClosed);
            }
            pending.waiters.insert(id, tx);
        }

        tracing::debug!("-> {command} #{id}");
        if let Err(e) = self.send(id, command, &args).await {
            self.forget(id);
            return Err(e);
        }

        let response = rx.await.map_err(|_| Error::GatewayClosed)?;
        match response.error {
            Some(message) => {
                tracing::debug!("<- {command} #{id} failed: {message}");
                Err(Error::Command {
                    command: command.to_string(),
                    message,
                })
            }
            None => {
                tracing::debug!("<- {command} #{id}");
                Ok(response.result)
            }
        }
    }
}

impl Drop for ProcessGateway {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(child) = &self.child {
            let child = child.lock().unwrap_or_else(PoisonError::into_inner);
            tracing::debug!("Stopping backend process (pid {:?})", child.id());
        }
    }
}

fn lock(pending: &SharedPending) -> std::sync::MutexGuard<'_, Pending> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn read_responses<R: AsyncRead + Unpin>(reader: R, pending: SharedPending) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                let response: Response = match serde_json::from_str(&line) {
                    Ok(response) => response,
                    Err(e) => {
                        tracing::warn!("Ignoring malformed backend line: {e}");
                        continue;
                    }
                };
                let waiter = lock(&pending).waiters.remove(&response.id);
                match waiter {
                    Some(tx) => {
                        // The caller may have given up; nothing to do then.
                        let _ = tx.send(response);
                    }
                    None => tracing::warn!("Backend answered unknown request #{}", response.id),
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::error!("Backend stream read error: {e}");
                break;
            }
        }
    }

    // Dropping the senders wakes every waiter with GatewayClosed.
    let mut pending = lock(&pending);
    pending.closed = true;
    pending.waiters.clear();
    tracing::info!("Backend stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{DuplexStream, ReadHalf, WriteHalf};

    /// Backend side of a duplex pipe.
    struct FakeBackend {
        lines: tokio::io::Lines<BufReader<ReadHalf<DuplexStream>>>,
        writer: WriteHalf<DuplexStream>,
    }

    impl FakeBackend {
        async fn next_request(&mut self) -> Value {
            let line = self.lines.next_line().await.unwrap().unwrap();
            serde_json::from_str(&line).unwrap()
        }

        async fn reply(&mut self, body: Value) {
            let mut line = serde_json::to_vec(&body).unwrap();
            line.push(b'\n');
            self.writer.write_all(&line).await.unwrap();
        }
    }

    fn pair() -> (ProcessGateway, FakeBackend) {
        let (client, backend) = tokio::io::duplex(16 * 1024);
        let (client_read, client_write) = tokio::io::split(client);
        let (backend_read, backend_write) = tokio::io::split(backend);
        let gateway = ProcessGateway::from_io(client_read, client_write);
        let backend = FakeBackend {
            lines: BufReader::new(backend_read).lines(),
            writer: backend_write,
        };
        (gateway, backend)
    }

    #[tokio::test]
    async fn test_request_and_result() {
        let (gateway, mut backend) = pair();

        let server = tokio::spawn(async move {
            let request = backend.next_request().await;
            assert_eq!(request["command"], "set_active_profile");
            assert_eq!(request["args"]["index"], 2);
            backend
                .reply(serde_json::json!({ "id": request["id"], "result": null }))
                .await;
            backend
        });

        let result = gateway
            .invoke("set_active_profile", serde_json::json!({ "index": 2 }))
            .await
            .unwrap();
        assert!(result.is_null());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_out_of_order_responses() {
        let (gateway, mut backend) = pair();

        let server = tokio::spawn(async move {
            let first = backend.next_request().await;
            let second = backend.next_request().await;
            backend
                .reply(serde_json::json!({ "id": second["id"], "result": second["command"] }))
                .await;
            backend
                .reply(serde_json::json!({ "id": first["id"], "result": first["command"] }))
                .await;
            backend
        });

        let (a, b) = tokio::join!(
            gateway.invoke("get_game_info", Value::Null),
            gateway.invoke("get_profile_info", Value::Null)
        );
        assert_eq!(a.unwrap(), "get_game_info");
        assert_eq!(b.unwrap(), "get_profile_info");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_response() {
        let (gateway, mut backend) = pair();

        let server = tokio::spawn(async move {
            let request = backend.next_request().await;
            backend
                .reply(serde_json::json!({ "id": request["id"], "error": "game not found" }))
                .await;
            backend
        });

        let err = gateway
            .invoke("set_active_game", serde_json::json!({ "slug": "nope" }))
            .await
            .unwrap_err();
        match err {
            Error::Command { command, message } => {
                assert_eq!(command, "set_active_game");
                assert_eq!(message, "game not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_exit_fails_pending_call() {
        let (gateway, mut backend) = pair();

        let server = tokio::spawn(async move {
            backend.next_request().await;
            // Dropping both halves closes the stream without answering.
            drop(backend);
        });

        let err = gateway.invoke("get_game_info", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::GatewayClosed), "got {err:?}");
        server.await.unwrap();

        let err = gateway.invoke("get_game_info", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::GatewayClosed | Error::Io(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_spawn_empty_command() {
        assert!(matches!(ProcessGateway::spawn(&[]), Err(Error::Io(_))));
    }
}
