use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error};

use crate::coordinator::{SliceHandler, SliceReply};
use crate::err::Error;
use crate::slicer::ContextId;

/// A requested index for one slicer, as it arrives from the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceRequest {
    pub context: ContextId,
    pub index: i64,
}

/// Single-slot response channel. A newer reply replaces one that has not been read yet.
pub type ResponseCell = watch::Receiver<Option<SliceReply>>;

struct Route {
    handler: Arc<dyn SliceHandler>,
    cell: watch::Sender<Option<SliceReply>>,
}

/// Routes requests to the coordinator of each slicer and publishes the replies.
#[derive(Default)]
pub struct SlicerRegistry {
    routes: DashMap<ContextId, Route>,
}

impl SlicerRegistry {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
        }
    }

    /// Registers a slicer and returns its response cell. Re-registering a context
    /// replaces the previous route.
    pub fn register(&self, context: ContextId, handler: Arc<dyn SliceHandler>) -> ResponseCell {
        let (cell, rx) = watch::channel(None);
        self.routes.insert(context, Route { handler, cell });
        rx
    }

    pub fn subscribe(&self, context: &ContextId) -> Result<ResponseCell, Error> {
        self.routes
            .get(context)
            .map(|route| route.cell.subscribe())
            .ok_or_else(|| Error::UnknownContext(context.clone()))
    }

    pub fn unregister(&self, context: &ContextId) -> bool {
        self.routes.remove(context).is_some()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Answers one request synchronously. Exactly one reply is published per request.
    pub fn dispatch(&self, request: &SliceRequest) -> Result<(), Error> {
        let handler = self
            .routes
            .get(&request.context)
            .map(|route| route.handler.clone())
            .ok_or_else(|| Error::UnknownContext(request.context.clone()))?;

        // Produce outside of the map guard so slow encodes don't block other routes.
        let reply = handler.handle(request.index);

        let route = self
            .routes
            .get(&request.context)
            .ok_or_else(|| Error::UnknownContext(request.context.clone()))?;
        route.cell.send_replace(Some(reply));
        Ok(())
    }

    /// Serves requests until the sender side is dropped. Each request is handled on the
    /// blocking pool, independently of the others.
    pub async fn serve(self: Arc<Self>, mut requests: mpsc::UnboundedReceiver<SliceRequest>) {
        while let Some(request) = requests.recv().await {
            debug!(context = %request.context, index = request.index, "Received slice request");
            let registry = self.clone();
            tokio::task::spawn_blocking(move || {
                if let Err(err) = registry.dispatch(&request) {
                    error!(%err, "Dropping slice request");
                }
            });
        }
        debug!("Request channel closed, endpoint stopping");
    }
}
