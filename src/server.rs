//! Control channel server.
//!
//! Strictly sequential: accept one connection, read one request frame,
//! dispatch it, write the one response, close, repeat. The skeleton is only
//! ever mutated from this loop, so no locking is needed around it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::protocol::{self, Response};
use crate::skeleton::Skeleton;

pub struct ControlServer<S> {
    skeleton: S,
    dispatcher: Dispatcher,
    config: ServerConfig,
    running: Arc<AtomicBool>,
}

impl<S: Skeleton> ControlServer<S> {
    pub fn new(skeleton: S, dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            skeleton,
            dispatcher,
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Handle for clearing the keep-running flag from outside the loop.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn skeleton(&self) -> &S {
        &self.skeleton
    }

    /// Accept loop; runs until the keep-running flag clears or Ctrl-C.
    /// Per-connection failures are logged and the loop keeps accepting.
    pub async fn run(&mut self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.listen_addr))?;
        println!("Listening on {}", self.config.listen_addr);

        while self.running.load(Ordering::Relaxed) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.running.store(false, Ordering::Relaxed);
                    println!("Shutting down");
                }
                accepted = listener.accept() => {
                    let (socket, peer) = match accepted {
                        Ok(pair) => pair,
                        Err(e) => {
                            eprintln!("Accept failed: {e}");
                            continue;
                        }
                    };
                    if self.config.verbose {
                        println!("Connection from {peer}");
                    }
                    if let Err(e) = self.serve_connection(socket).await {
                        eprintln!("Request from {peer} failed: {e:#}");
                    }
                }
            }
        }
        Ok(())
    }

    /// One full request/response cycle on an established channel.
    pub async fn serve_connection<C>(&mut self, channel: C) -> Result<()>
    where
        C: AsyncRead + AsyncWrite + Unpin,
    {
        let mut stream = protocol::message_stream(channel, self.config.max_frame_len);
        let payload = match stream.next().await {
            Some(Ok(bytes)) => bytes,
            Some(Err(e)) => {
                // frame-level failure (oversized, truncated): reply
                // best-effort, then surface the error
                let reply = Response::error(format!("Failed to read request frame: {e}"));
                let _ = protocol::send_message(&mut stream, &reply).await;
                return Err(e).context("Failed to read request frame");
            }
            // peer connected and left without sending a request
            None => return Ok(()),
        };
        let response = self.dispatcher.dispatch(&mut self.skeleton, &payload);
        protocol::send_message(&mut stream, &response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    use crate::rig::{MappingTable, PoseMapper};
    use crate::skeleton::BoneGraph;

    fn test_server() -> ControlServer<BoneGraph> {
        let graph = BoneGraph::standard_figure().unwrap();
        let dispatcher = Dispatcher::new(PoseMapper::new(MappingTable::standard()));
        ControlServer::new(graph, dispatcher, ServerConfig::default())
    }

    async fn roundtrip(server: &mut ControlServer<BoneGraph>, request: Value) -> Value {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let mut client = protocol::message_stream(client_io, 64 * 1024);
        let (reply, served) = tokio::join!(
            async {
                protocol::send_message(&mut client, &request).await.unwrap();
                protocol::recv_message::<_, Value>(&mut client).await.unwrap()
            },
            server.serve_connection(server_io),
        );
        served.unwrap();
        reply
    }

    #[tokio::test]
    async fn test_single_request_response_cycle() {
        let mut server = test_server();
        let reply = roundtrip(&mut server, json!({"CommandType": "get_structure"})).await;
        assert_eq!(reply["status"], "success");
        assert_eq!(reply["data"]["Bones"]["torso"]["Parent"], "root");
    }

    #[tokio::test]
    async fn test_state_persists_across_connections() {
        let mut server = test_server();
        let reply = roundtrip(
            &mut server,
            json!({"CommandType": "set_skin", "SkinName": "casual"}),
        )
        .await;
        assert_eq!(reply["status"], "success");
        assert_eq!(server.skeleton().active_skin(), Some("casual"));

        // a later connection sees the same skeleton
        let reply = roundtrip(&mut server, json!({"CommandType": "get_structure"})).await;
        assert_eq!(reply["status"], "success");
    }

    #[tokio::test]
    async fn test_bad_request_then_good_request() {
        let mut server = test_server();
        let reply = roundtrip(&mut server, json!({"CommandType": "teleport"})).await;
        assert_eq!(reply["status"], "error");
        assert_eq!(reply["message"], "Unknown command type: teleport");

        // the loop survives a failed request
        let reply = roundtrip(&mut server, json!({"CommandType": "get_structure"})).await;
        assert_eq!(reply["status"], "success");
    }

    #[tokio::test]
    async fn test_connection_without_request_is_clean() {
        let mut server = test_server();
        let (client_io, server_io) = tokio::io::duplex(1024);
        drop(client_io);
        server.serve_connection(server_io).await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_handle_clears_flag() {
        let server = test_server();
        let handle = server.shutdown_handle();
        assert!(handle.load(Ordering::Relaxed));
        handle.store(false, Ordering::Relaxed);
        assert!(!server.running.load(Ordering::Relaxed));
    }
}
