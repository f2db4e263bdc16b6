use std::collections::HashMap;
use std::sync::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use log::{debug, info};
use uuid::Uuid;

use crate::companies::Company;

/// The one message shape every client receives. Before the first valuation
/// completes all three fields are null, and clients are expected to render
/// that as "loading".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedMessage {
    #[serde(rename = "cryptoCoinMarketCap")]
    pub crypto_market_cap: Option<f64>,
    #[serde(rename = "currentCompany")]
    pub current_company: Option<Company>,
    #[serde(rename = "nextUpCompany")]
    pub next_up_company: Option<Company>,
}

/// A registered client: its hub id plus the queue its connection drains.
pub struct Subscriber {
    pub id: Uuid,
    pub rx: mpsc::UnboundedReceiver<String>,
}

struct HubInner {
    latest: FeedMessage,
    subscribers: HashMap<Uuid, mpsc::UnboundedSender<String>>,
}

/// Fan-out point between the valuation pipeline and connected clients.
/// Holds the latest feed message so new subscribers catch up immediately.
pub struct BroadcastHub {
    inner: Mutex<HubInner>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HubInner {
                latest: FeedMessage::default(),
                subscribers: HashMap::new(),
            }),
        }
    }

    /// Registers a new subscriber. The current state is queued into the
    /// subscriber's channel before the sender joins the fan-out map, so the
    /// snapshot always arrives ahead of any live update.
    pub fn attach(&self) -> Result<Subscriber, String> {
        let mut inner = self.inner.lock()
            .map_err(|_| "Lock poisoned".to_string())?;

        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let snapshot = serde_json::to_string(&inner.latest)
            .map_err(|e| format!("Failed to serialize snapshot: {}", e))?;
        let _ = tx.send(snapshot);

        inner.subscribers.insert(id, tx);
        info!(
            "Subscriber {} attached ({} active)",
            &id.to_string()[..8],
            inner.subscribers.len()
        );

        Ok(Subscriber { id, rx })
    }

    /// Removes a subscriber. Safe to call more than once for the same id.
    pub fn detach(&self, id: Uuid) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.subscribers.remove(&id).is_some() {
                info!(
                    "Subscriber {} detached ({} active)",
                    &id.to_string()[..8],
                    inner.subscribers.len()
                );
            }
        }
    }

    /// Stores the message as the new snapshot and fans it out to every
    /// subscriber. Subscribers whose queue is gone are pruned here. Returns
    /// the number of subscribers that received the message.
    pub fn publish(&self, message: FeedMessage) -> Result<usize, String> {
        let mut inner = self.inner.lock()
            .map_err(|_| "Lock poisoned".to_string())?;

        let payload = serde_json::to_string(&message)
            .map_err(|e| format!("Failed to serialize feed message: {}", e))?;
        inner.latest = message;

        inner.subscribers.retain(|id, tx| {
            if tx.send(payload.clone()).is_ok() {
                true
            } else {
                info!("Dropping disconnected subscriber {}", &id.to_string()[..8]);
                false
            }
        });

        let delivered = inner.subscribers.len();
        if delivered > 0 {
            debug!("Broadcast feed update to {} subscribers", delivered);
        }
        Ok(delivered)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock()
            .map(|inner| inner.subscribers.len())
            .unwrap_or(0)
    }

    /// Latest published message, or the all-null default before the first
    /// valuation.
    pub fn snapshot(&self) -> FeedMessage {
        self.inner.lock()
            .map(|inner| inner.latest.clone())
            .unwrap_or_default()
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
