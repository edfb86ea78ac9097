use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;
use volslicer_core::{geom::Axis, ContextId, SceneId};

use crate::figure::Figure;
use crate::update::Update;
use crate::view::{Message, SlicerView};

/// Where one slicer's plane sits in its scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePosition {
    pub context: ContextId,
    pub scene: SceneId,
    pub axis: Axis,
    pub position: f64,
}

/// Latest published position of every slicer on the page, keyed by instance.
#[derive(Debug, Default)]
pub struct SceneBoard {
    positions: HashMap<ContextId, ScenePosition>,
}

impl SceneBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a position. Returns whether it differs from the last one published for
    /// that instance.
    pub fn publish(&mut self, position: ScenePosition) -> bool {
        if self.positions.get(&position.context) == Some(&position) {
            return false;
        }
        debug!(context = %position.context, position = position.position, "Published slice position");
        self.positions.insert(position.context.clone(), position);
        true
    }

    pub fn remove(&mut self, context: &ContextId) -> Option<ScenePosition> {
        self.positions.remove(context)
    }

    /// All known positions, ordered by instance id.
    pub fn positions(&self) -> Vec<ScenePosition> {
        let mut positions: Vec<_> = self.positions.values().cloned().collect();
        positions.sort_by(|a, b| a.context.as_str().cmp(b.context.as_str()));
        positions
    }

    /// Publishes the position of every view, then hands each view the full set so it can
    /// redraw its indicators. One figure update per view, in order.
    pub fn synchronize(&mut self, views: &mut [SlicerView]) -> Vec<Update<Figure>> {
        for view in views.iter() {
            self.publish(view.scene_position());
        }
        let positions = self.positions();
        views
            .iter_mut()
            .map(|view| view.update(Message::PositionsChanged(positions.clone())).figure)
            .collect()
    }
}
