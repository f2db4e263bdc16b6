use std::sync::Arc;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, WebSocketStream};
use tokio_tungstenite::tungstenite::Message;
use log::{debug, error, info, warn};

use crate::broadcast::BroadcastHub;

/// One instance per accepted TCP connection. Subscribes the client to the
/// feed for the lifetime of the socket; the feed is one-way, so anything the
/// client sends besides control frames is ignored.
pub struct WebSocketHandler {
    hub: Arc<BroadcastHub>,
    peer_addr: String,
}

impl WebSocketHandler {
    pub fn new(hub: Arc<BroadcastHub>, peer_addr: String) -> Self {
        Self { hub, peer_addr }
    }

    pub async fn handle_connection(self, stream: TcpStream) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                error!("WebSocket handshake failed for {}: {:?}", self.peer_addr, e);
                return;
            }
        };

        let subscriber = match self.hub.attach() {
            Ok(subscriber) => subscriber,
            Err(e) => {
                error!("Failed to attach subscriber for {}: {}", self.peer_addr, e);
                return;
            }
        };
        let subscriber_id = subscriber.id;
        let label = subscriber_id.to_string()[..8].to_string();

        info!(
            "WebSocket connection established - Subscriber: {} from {}",
            label, self.peer_addr
        );

        let (write, read) = ws_stream.split();

        // Close signal lets the read task shut the write task down
        let (close_tx, close_rx) = mpsc::channel::<()>(1);

        let write_task = self.spawn_write_task(write, subscriber.rx, close_rx, label.clone());
        let read_task = self.spawn_read_task(read, close_tx, label.clone());

        tokio::select! {
            _ = write_task => {
                info!("Write task completed for subscriber {}", label);
            }
            _ = read_task => {
                info!("Read task completed for subscriber {}", label);
            }
        }

        self.hub.detach(subscriber_id);

        info!(
            "WebSocket connection closed - Subscriber: {} from {}",
            label, self.peer_addr
        );
    }

    fn spawn_write_task(
        &self,
        mut write: futures::stream::SplitSink<WebSocketStream<TcpStream>, Message>,
        mut feed_rx: mpsc::UnboundedReceiver<String>,
        mut close_rx: mpsc::Receiver<()>,
        label: String,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    maybe_message = feed_rx.recv() => {
                        match maybe_message {
                            Some(message) => {
                                if let Err(e) = write.send(Message::Text(message)).await {
                                    error!("Error sending message to subscriber {}: {:?}", label, e);
                                    break;
                                }
                            }
                            None => {
                                // Hub side is gone; tell the client the stream is over.
                                info!("Feed channel closed for subscriber {}", label);
                                if let Err(e) = write.send(Message::Close(None)).await {
                                    error!("Error sending close frame: {:?}", e);
                                }
                                break;
                            }
                        }
                    }
                    _ = close_rx.recv() => {
                        info!("Received close signal from read task for subscriber {}", label);
                        break;
                    }
                }
            }
        })
    }

    fn spawn_read_task(
        &self,
        mut read: futures::stream::SplitStream<WebSocketStream<TcpStream>>,
        close_tx: mpsc::Sender<()>,
        label: String,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(msg_result) = read.next().await {
                match msg_result {
                    Ok(msg) => {
                        match msg {
                            Message::Close(close_frame) => {
                                info!("Received close frame from subscriber {}: {:?}", label, close_frame);
                                if close_tx.send(()).await.is_err() {
                                    warn!("Failed to send close signal for subscriber {}", label);
                                }
                                break;
                            }
                            Message::Ping(_) => {
                                debug!("Received ping from subscriber {}", label);
                            }
                            Message::Pong(_) => {
                                debug!("Received pong from subscriber {}", label);
                            }
                            Message::Text(text) => {
                                debug!("Ignoring text message from subscriber {}: {}", label, text);
                            }
                            Message::Binary(data) => {
                                debug!("Ignoring binary message from subscriber {}: {} bytes", label, data.len());
                            }
                            Message::Frame(_) => {}
                        }
                    }
                    Err(e) => {
                        error!("Error reading message from subscriber {}: {:?}", label, e);
                        if close_tx.send(()).await.is_err() {
                            warn!("Failed to send close signal for subscriber {}", label);
                        }
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_websocket_handler_creation() {
        let hub = Arc::new(BroadcastHub::new());
        let handler = WebSocketHandler::new(hub, "127.0.0.1:4000".to_string());
        assert_eq!(handler.peer_addr, "127.0.0.1:4000");
    }
}
