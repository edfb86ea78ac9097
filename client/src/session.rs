use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::debug;
use volslicer_core::{ResponseCell, SliceIndex, SliceRequest, SlicerRegistry};

use crate::figure::Figure;
use crate::update::Update;
use crate::view::{Effects, Message, SlicerView};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("The slice endpoint has shut down")]
    Closed,
    #[error("Slice {index} was not displayed within {waited:?}")]
    Timeout { index: usize, waited: Duration },
    #[error(transparent)]
    Core(#[from] volslicer_core::Error),
}

/// Wires a [`SlicerView`] to a running endpoint: forwards its requests and feeds
/// replies from the response cell back into it.
pub struct Session {
    view: SlicerView,
    requests: mpsc::UnboundedSender<SliceRequest>,
    responses: ResponseCell,
    /// How long to wait for a reply before asking for the active index again. Off unless
    /// set with [`Session::with_retry`].
    retry: Option<Duration>,
}

impl Session {
    pub fn connect(
        view: SlicerView,
        registry: &SlicerRegistry,
        requests: mpsc::UnboundedSender<SliceRequest>,
    ) -> Result<Self, SessionError> {
        let responses = registry.subscribe(view.context_id())?;
        Ok(Self {
            view,
            requests,
            responses,
            retry: None,
        })
    }

    /// Re-requests the active index when no reply arrived for `interval`. Recovers
    /// replies that were overwritten in the response cell before being read.
    pub fn with_retry(mut self, interval: Duration) -> Self {
        self.retry = Some(interval);
        self
    }

    pub fn view(&self) -> &SlicerView {
        &self.view
    }

    pub fn into_view(self) -> SlicerView {
        self.view
    }

    /// Fires the initial slider value, like a page load does.
    pub fn start(&mut self) -> Result<Update<Figure>, SessionError> {
        let effects = self.view.start();
        self.apply(effects)
    }

    pub fn move_slider(&mut self, raw: i64) -> Result<Update<Figure>, SessionError> {
        let effects = self.view.update(Message::SliderMoved(raw));
        self.apply(effects)
    }

    pub fn refresh(&mut self) -> Result<Update<Figure>, SessionError> {
        let effects = self.view.update(Message::Refresh);
        self.apply(effects)
    }

    /// Waits for the next reply in the response cell and hands it to the view.
    pub async fn recv(&mut self) -> Result<Update<Figure>, SessionError> {
        self.responses
            .changed()
            .await
            .map_err(|_| SessionError::Closed)?;
        let reply = self.responses.borrow_and_update().clone();
        Ok(match reply {
            Some(reply) => self.view.update(Message::Received(reply)).figure,
            None => Update::NoUpdate,
        })
    }

    /// Processes replies until the active slice is on screen or a request for it is
    /// rejected. Without a retry interval a lost reply ends in [`SessionError::Timeout`].
    pub async fn settle(&mut self, deadline: Duration) -> Result<(), SessionError> {
        let started = Instant::now();
        while !self.view.is_current() {
            if self
                .view
                .last_rejection()
                .is_some_and(|r| r.index() == self.view.active().as_i64())
            {
                return Ok(());
            }
            let waited = started.elapsed();
            if waited >= deadline {
                return Err(SessionError::Timeout {
                    index: self.view.active().get(),
                    waited,
                });
            }
            let left = deadline - waited;
            let step = self.retry.map_or(left, |retry| retry.min(left));
            match timeout(step, self.recv()).await {
                Ok(received) => {
                    received?;
                }
                Err(_) if self.retry.is_some() => {
                    debug!(index = %self.view.active(), "No reply yet, retrying");
                    let request = self.view.on_retry();
                    self.send(request)?;
                }
                Err(_) => {}
            }
        }
        Ok(())
    }

    fn apply(&mut self, effects: Effects) -> Result<Update<Figure>, SessionError> {
        self.send(effects.request)?;
        Ok(effects.figure)
    }

    fn send(&self, request: Update<SliceIndex>) -> Result<(), SessionError> {
        if let Update::Set(index) = request {
            self.requests
                .send(SliceRequest {
                    context: self.view.context_id().clone(),
                    index: index.as_i64(),
                })
                .map_err(|_| SessionError::Closed)?;
        }
        Ok(())
    }
}
