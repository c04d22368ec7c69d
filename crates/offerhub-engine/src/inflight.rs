use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use offerhub_core::SelectionResult;
use tokio::sync::broadcast;

type Channels = HashMap<String, broadcast::Sender<SelectionResult>>;

/// Coalesces concurrent cache misses for the same SKU into one in-flight
/// fetch. The first caller per SKU leads and runs the work; everyone else
/// subscribes and awaits the leader's broadcast. Different SKUs never wait
/// on each other.
pub(crate) struct InflightRequests {
    channels: Arc<Mutex<Channels>>,
}

pub(crate) enum Flight {
    Leader(FlightPermit),
    Follower(broadcast::Receiver<SelectionResult>),
}

/// Held by the leader for the duration of its fetch. Dropping it without
/// completing (a cancelled task) closes the channel, which tells followers
/// to run their own fetch instead of waiting forever.
pub(crate) struct FlightPermit {
    channels: Arc<Mutex<Channels>>,
    sku: String,
    completed: bool,
}

impl InflightRequests {
    pub(crate) fn new() -> Self {
        InflightRequests {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Join the flight for `sku`, leading it if nobody else is.
    pub(crate) fn join(&self, sku: &str) -> Flight {
        let mut channels = lock(&self.channels);
        if let Some(sender) = channels.get(sku) {
            return Flight::Follower(sender.subscribe());
        }
        let (sender, _) = broadcast::channel(1);
        channels.insert(sku.to_string(), sender);
        Flight::Leader(FlightPermit {
            channels: Arc::clone(&self.channels),
            sku: sku.to_string(),
            completed: false,
        })
    }
}

impl FlightPermit {
    /// Publish the leader's result to every follower and retire the flight.
    pub(crate) fn complete(mut self, result: &SelectionResult) {
        self.completed = true;
        if let Some(sender) = lock(&self.channels).remove(&self.sku) {
            let _ = sender.send(result.clone());
        }
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        // A completed flight already vacated the map; removing again could
        // evict a successor's channel.
        if !self.completed {
            lock(&self.channels).remove(&self.sku);
        }
    }
}

// The lock is only held for map operations, never across an await.
fn lock(channels: &Mutex<Channels>) -> MutexGuard<'_, Channels> {
    channels.lock().unwrap_or_else(PoisonError::into_inner)
}
