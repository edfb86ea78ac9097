use tracing::{debug, warn};
use volslicer_core::{
    ContextId, EncodedSlice, Placeholder, Rejected, SceneId, SliceIndex, SliceInfo, SliceReply,
    SlicerLayout,
};

use crate::cache::SliceCache;
use crate::figure::{Figure, IndicatorTrace};
use crate::scene::ScenePosition;
use crate::sync::{Shown, ViewSynchronizer};
use crate::update::Update;

#[derive(Debug, Clone)]
pub enum Message {
    /// The slider moved. The position is clamped to the valid range.
    SliderMoved(i64),
    /// A reply arrived on the response channel.
    Received(SliceReply),
    /// Drop everything cached and fetch the active slice again.
    Refresh,
    /// The slicers on the page moved. Positions from other scenes are ignored.
    PositionsChanged(Vec<ScenePosition>),
}

/// Outputs of one reaction: a fetch request and a figure update, each possibly suppressed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Effects {
    pub request: Update<SliceIndex>,
    pub figure: Update<Figure>,
}

/// Client side state of one slicer instance. Handlers run to completion, one at a time.
#[derive(Debug)]
pub struct SlicerView {
    context_id: ContextId,
    scene_id: SceneId,
    info: SliceInfo,
    thumbnails: Vec<EncodedSlice>,
    placeholder: Placeholder,
    active: SliceIndex,
    cache: SliceCache,
    sync: ViewSynchronizer,
    requests_sent: u64,
    retries: u64,
    last_rejection: Option<Rejected>,
}

impl SlicerView {
    pub fn new(layout: SlicerLayout) -> Self {
        let len = layout.info.len();
        let sync = ViewSynchronizer::new(&layout.info, layout.reverse_y);
        Self {
            context_id: layout.context_id,
            scene_id: layout.scene_id,
            active: SliceIndex::clamped(layout.slider.value, len),
            info: layout.info,
            thumbnails: layout.thumbnails,
            placeholder: layout.placeholder,
            cache: SliceCache::new(layout.cache_capacity),
            sync,
            requests_sent: 0,
            retries: 0,
            last_rejection: None,
        }
    }

    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    pub fn scene_id(&self) -> &SceneId {
        &self.scene_id
    }

    pub fn info(&self) -> &SliceInfo {
        &self.info
    }

    pub fn active(&self) -> SliceIndex {
        self.active
    }

    /// Scene coordinate of the active slice.
    pub fn position(&self) -> f64 {
        self.info.position(self.active)
    }

    /// What this view publishes for the indicators of the other slicers.
    pub fn scene_position(&self) -> ScenePosition {
        ScenePosition {
            context: self.context_id.clone(),
            scene: self.scene_id.clone(),
            axis: self.info.axis,
            position: self.position(),
        }
    }

    pub fn figure(&self) -> &Figure {
        self.sync.figure()
    }

    pub fn shown(&self) -> Shown {
        self.sync.shown()
    }

    /// Whether the full resolution slice for the active index is on screen.
    pub fn is_current(&self) -> bool {
        self.sync.shown() == Shown::Slice(self.active)
    }

    pub fn cache(&self) -> &SliceCache {
        &self.cache
    }

    pub fn renders(&self) -> u64 {
        self.sync.renders()
    }

    /// Requests emitted by user actions, refreshes and page load.
    pub fn requests_sent(&self) -> u64 {
        self.requests_sent
    }

    /// Requests re-sent for an active index whose reply never showed up.
    pub fn retries(&self) -> u64 {
        self.retries
    }

    pub fn last_rejection(&self) -> Option<&Rejected> {
        self.last_rejection.as_ref()
    }

    pub fn update(&mut self, message: Message) -> Effects {
        match message {
            Message::SliderMoved(raw) => self.on_index_changed(raw),
            Message::Received(reply) => Effects {
                request: Update::NoUpdate,
                figure: self.on_response_received(reply),
            },
            Message::Refresh => self.on_refresh(),
            Message::PositionsChanged(positions) => Effects {
                request: Update::NoUpdate,
                figure: self.on_positions_changed(&positions),
            },
        }
    }

    /// The reaction to the initial slider value on page load.
    pub fn start(&mut self) -> Effects {
        self.on_index_changed(self.active.as_i64())
    }

    /// Requests `raw` unless it is cached, and renders what the cache has for it.
    pub fn on_index_changed(&mut self, raw: i64) -> Effects {
        self.active = SliceIndex::clamped(raw, self.info.len());
        let request = if self.cache.get(self.active).is_some() {
            debug!(context = %self.context_id, index = %self.active, "Cache hit, not requesting");
            Update::NoUpdate
        } else {
            debug!(context = %self.context_id, index = %self.active, "Requesting slice");
            self.requests_sent += 1;
            self.forget_rejection();
            Update::Set(self.active)
        };
        Effects {
            request,
            figure: self.synchronize(),
        }
    }

    /// Asks for the active index again if it is still missing. Counted as a retry, not as
    /// a request.
    pub fn on_retry(&mut self) -> Update<SliceIndex> {
        if self.cache.contains(self.active) {
            return Update::NoUpdate;
        }
        debug!(context = %self.context_id, index = %self.active, "Retrying slice request");
        self.retries += 1;
        self.forget_rejection();
        Update::Set(self.active)
    }

    /// Caches whatever arrives, then renders if it concerns the active index.
    pub fn on_response_received(&mut self, reply: SliceReply) -> Update<Figure> {
        match reply {
            Ok(response) => {
                debug!(context = %self.context_id, index = %response.index, "Received slice");
                self.cache.insert(response);
                self.synchronize()
            }
            Err(rejection) => {
                warn!(context = %self.context_id, %rejection, "Slice request rejected");
                self.last_rejection = Some(rejection);
                Update::NoUpdate
            }
        }
    }

    pub fn on_refresh(&mut self) -> Effects {
        debug!(context = %self.context_id, "Refreshing, clearing cache");
        self.cache.clear();
        self.requests_sent += 1;
        self.forget_rejection();
        Effects {
            request: Update::Set(self.active),
            figure: Update::NoUpdate,
        }
    }

    /// Redraws the indicators for slicers of the same scene cutting this slice.
    pub fn on_positions_changed(&mut self, positions: &[ScenePosition]) -> Update<Figure> {
        let [rows_axis, cols_axis] = self.info.axis.in_plane();
        let (mut rows, mut cols) = (Vec::new(), Vec::new());
        for other in positions
            .iter()
            .filter(|p| p.scene == self.scene_id && p.context != self.context_id)
        {
            if other.axis == rows_axis {
                rows.push(other.position);
            } else if other.axis == cols_axis {
                cols.push(other.position);
            }
        }
        let indicators = IndicatorTrace::for_positions(&self.info, &rows, &cols)
            .into_iter()
            .collect();
        self.sync.set_indicators(indicators)
    }

    /// A rejection only stands until its index is asked for again.
    fn forget_rejection(&mut self) {
        if self
            .last_rejection
            .as_ref()
            .is_some_and(|r| r.index() == self.active.as_i64())
        {
            self.last_rejection = None;
        }
    }

    fn synchronize(&mut self) -> Update<Figure> {
        let fallback = match self.placeholder {
            Placeholder::StaleFrame => None,
            Placeholder::Thumbnail => self.thumbnails.get(self.active.get()),
        };
        self.sync.synchronize(self.active, &self.cache, fallback)
    }
}
