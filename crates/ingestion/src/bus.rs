//! Addressable in-process publish/subscribe bus
//!
//! Every subscriber owns a bounded queue; a publisher fans each two-part
//! frame out to all queues of its address, so delivery is atomic per frame.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use contracts::{ContractError, FrameTransport, RawFrame, TransportConnector};
use tracing::{debug, instrument, trace, warn};

use crate::config::{BackpressureConfig, DropPolicy, IngestionMetrics};
use crate::error::{IngestionError, Result};

type Endpoints = Arc<Mutex<HashMap<String, Vec<Sender<RawFrame>>>>>;
type Preconnected = Arc<Mutex<HashMap<String, Vec<BusSubscriber>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process frame bus
///
/// Cheap to clone; clones share the same endpoint table.
#[derive(Debug, Clone)]
pub struct LocalBus {
    endpoints: Endpoints,
    preconnected: Preconnected,
    config: BackpressureConfig,
    metrics: Arc<IngestionMetrics>,
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBus {
    /// Create a bus with default backpressure settings
    pub fn new() -> Self {
        Self::with_config(BackpressureConfig::default())
    }

    /// Create with custom backpressure configuration
    pub fn with_config(config: BackpressureConfig) -> Self {
        Self {
            endpoints: Arc::new(Mutex::new(HashMap::new())),
            preconnected: Arc::new(Mutex::new(HashMap::new())),
            config,
            metrics: Arc::new(IngestionMetrics::new()),
        }
    }

    /// Bind a publisher to an address
    #[instrument(name = "bus_bind", skip(self), fields(address = %address))]
    pub fn bind(&self, address: &str) -> Result<FramePublisher> {
        let mut endpoints = lock(&self.endpoints);
        if endpoints.contains_key(address) {
            return Err(IngestionError::AddressInUse {
                address: address.to_string(),
            });
        }
        endpoints.insert(address.to_string(), Vec::new());
        debug!(address = %address, "publisher bound");

        Ok(FramePublisher {
            address: address.to_string(),
            endpoints: self.endpoints.clone(),
            drop_policy: self.config.drop_policy,
            metrics: self.metrics.clone(),
        })
    }

    /// Subscribe to an address
    #[instrument(name = "bus_subscribe", skip(self), fields(address = %address))]
    pub fn subscribe(&self, address: &str) -> Result<BusSubscriber> {
        let mut endpoints = lock(&self.endpoints);
        let subscribers = endpoints
            .get_mut(address)
            .ok_or_else(|| IngestionError::EndpointNotFound {
                address: address.to_string(),
            })?;

        let (tx, rx) = bounded(self.config.channel_capacity.max(1));
        subscribers.push(tx);
        debug!(address = %address, subscribers = subscribers.len(), "subscriber attached");

        Ok(BusSubscriber {
            address: address.to_string(),
            rx,
            metrics: self.metrics.clone(),
        })
    }

    /// Attach a subscriber now and hand it to the next `connect`
    ///
    /// Frames published between this call and `connect` are queued for
    /// that subscriber instead of being lost.
    pub fn preconnect(&self, address: &str) -> Result<()> {
        let subscriber = self.subscribe(address)?;
        lock(&self.preconnected)
            .entry(address.to_string())
            .or_default()
            .push(subscriber);
        Ok(())
    }

    /// Whether a publisher is bound to the address
    pub fn is_bound(&self, address: &str) -> bool {
        lock(&self.endpoints).contains_key(address)
    }

    /// Shared bus metrics
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}

impl TransportConnector for LocalBus {
    type Transport = BusSubscriber;

    fn connect(&self, address: &str) -> std::result::Result<BusSubscriber, ContractError> {
        let waiting = lock(&self.preconnected)
            .get_mut(address)
            .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)));
        match waiting {
            Some(subscriber) => Ok(subscriber),
            None => self.subscribe(address).map_err(ContractError::from),
        }
    }
}

/// Publishing side of an endpoint
///
/// Dropping the publisher unbinds the address and disconnects subscribers.
#[derive(Debug)]
pub struct FramePublisher {
    address: String,
    endpoints: Endpoints,
    drop_policy: DropPolicy,
    metrics: Arc<IngestionMetrics>,
}

impl FramePublisher {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        lock(&self.endpoints)
            .get(&self.address)
            .map(|subs| subs.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    /// Publish one frame to every subscriber
    ///
    /// Returns the number of queues the frame was delivered to.
    pub fn publish(&self, frame: RawFrame) -> usize {
        self.metrics.record_published();

        let mut endpoints = lock(&self.endpoints);
        let Some(subscribers) = endpoints.get_mut(&self.address) else {
            return 0;
        };
        subscribers.retain(|tx| !tx.is_closed());

        let mut delivered = 0;
        for tx in subscribers.iter() {
            if self.send(tx, frame.clone()) {
                delivered += 1;
            }
        }
        trace!(address = %self.address, delivered, "frame published");
        delivered
    }

    fn send(&self, tx: &Sender<RawFrame>, frame: RawFrame) -> bool {
        match self.drop_policy {
            DropPolicy::DropNewest => match tx.try_send(frame) {
                Ok(()) => {
                    self.metrics.record_delivered();
                    true
                }
                Err(TrySendError::Full(_)) => {
                    self.metrics.record_dropped();
                    trace!(address = %self.address, "frame dropped (newest)");
                    false
                }
                Err(TrySendError::Closed(_)) => false,
            },
            DropPolicy::DropOldest => match tx.force_send(frame) {
                Ok(evicted) => {
                    if evicted.is_some() {
                        self.metrics.record_dropped();
                        trace!(address = %self.address, "frame dropped (oldest)");
                    }
                    self.metrics.record_delivered();
                    true
                }
                Err(_) => false,
            },
        }
    }
}

impl Drop for FramePublisher {
    fn drop(&mut self) {
        lock(&self.endpoints).remove(&self.address);
        debug!(address = %self.address, "publisher unbound");
    }
}

/// Subscribing side of an endpoint, implements `FrameTransport`
#[derive(Debug)]
pub struct BusSubscriber {
    address: String,
    rx: Receiver<RawFrame>,
    metrics: Arc<IngestionMetrics>,
}

impl BusSubscriber {
    /// Frames currently queued
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl FrameTransport for BusSubscriber {
    fn endpoint(&self) -> &str {
        &self.address
    }

    fn try_recv(&mut self) -> std::result::Result<Option<RawFrame>, ContractError> {
        match self.rx.try_recv() {
            Ok(frame) => {
                self.metrics.record_received();
                Ok(Some(frame))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(IngestionError::Disconnected {
                address: self.address.clone(),
            }
            .into()),
        }
    }

    fn recv_blocking(&mut self) -> std::result::Result<RawFrame, ContractError> {
        match self.rx.recv_blocking() {
            Ok(frame) => {
                self.metrics.record_received();
                Ok(frame)
            }
            Err(_) => {
                warn!(address = %self.address, "blocking receive on closed endpoint");
                Err(IngestionError::Disconnected {
                    address: self.address.clone(),
                }
                .into())
            }
        }
    }
}
