use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use derive_more::Display;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{Placeholder, SlicerConfig};
use crate::coordinator::SliceCoordinator;
use crate::encode::{self, EncodedSlice};
use crate::err::Error;
use crate::info::SliceInfo;
use crate::overlay::Overlay;
use crate::volume::{SliceIndex, Voxel, Volume, VolumeStore};

static SLICER_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Unique per slicer instance within the process. Scopes all client state and routing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(String);

impl ContextId {
    pub fn next() -> Self {
        let n = SLICER_COUNTER.fetch_add(1, Ordering::SeqCst) + 1;
        ContextId(format!("slicer{n}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Slicers with the same scene id look at the same volume.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        SceneId(id.into())
    }

    pub fn for_volume<T: Voxel>(volume: &Volume<T>) -> Self {
        SceneId(format!("volume_{:x}", volume.addr()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliderSpec {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub value: i64,
}

impl SliderSpec {
    pub fn for_len(len: usize) -> Self {
        Self {
            min: 0,
            max: len as i64 - 1,
            step: 1,
            value: (len / 2) as i64,
        }
    }
}

/// Everything the client needs to set up its side of one slicer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicerLayout {
    pub context_id: ContextId,
    pub scene_id: SceneId,
    pub info: SliceInfo,
    pub slider: SliderSpec,
    pub reverse_y: bool,
    /// One per index, empty when thumbnails are disabled.
    pub thumbnails: Vec<EncodedSlice>,
    pub cache_capacity: Option<usize>,
    pub placeholder: Placeholder,
}

/// A configured slicer: the server side coordinator plus the layout handed to the client.
pub struct VolumeSlicer<T> {
    coordinator: Arc<SliceCoordinator<T>>,
    layout: SlicerLayout,
}

impl<T: Voxel> VolumeSlicer<T> {
    /// Validates the configuration and pre-renders the thumbnails. Any misconfiguration
    /// fails here, never later.
    pub fn new(volume: Volume<T>, config: &SlicerConfig) -> Result<Self, Error> {
        let valid = config.validate()?;
        let scene_id = match &config.scene_id {
            Some(id) => SceneId::new(id.clone()),
            None => SceneId::for_volume(&volume),
        };
        let context_id = ContextId::next();

        let mut info = SliceInfo::new(volume.shape(), valid.axis, valid.origin, valid.spacing);
        let store = VolumeStore::new(volume, valid.axis);
        let coordinator = SliceCoordinator::new(store, config.quantization);

        let thumbnails = match valid.thumbnail_size {
            Some(max) => {
                info.lowres_size = Some(encode::thumbnail_size(
                    (info.size.x as u32, info.size.y as u32).into(),
                    max,
                ));
                (0..coordinator.store().len())
                    .map(|i| {
                        let index = SliceIndex::checked(i as i64, coordinator.store().len())?;
                        let quantized = coordinator.quantized(index)?;
                        Ok(encode::encode_thumbnail(quantized.view(), max)?)
                    })
                    .collect::<Result<Vec<_>, Error>>()?
            }
            None => Vec::new(),
        };
        debug!(count = thumbnails.len(), "Prepared thumbnails");

        let layout = SlicerLayout {
            context_id,
            scene_id,
            slider: SliderSpec::for_len(info.len()),
            info,
            reverse_y: config.reverse_y,
            thumbnails,
            cache_capacity: config.cache_capacity,
            placeholder: config.placeholder,
        };
        info!(
            context = %layout.context_id,
            scene = %layout.scene_id,
            axis = ?valid.axis,
            slices = layout.info.len(),
            "Created volume slicer"
        );

        Ok(Self {
            coordinator: Arc::new(coordinator),
            layout,
        })
    }

    /// Builds the slicer with an overlay mask attached from the start. Fails if the mask
    /// does not have the shape of the volume.
    pub fn with_overlay(self, overlay: Overlay) -> Result<Self, Error> {
        self.coordinator.set_overlay(Some(overlay))?;
        Ok(self)
    }

    pub fn context_id(&self) -> &ContextId {
        &self.layout.context_id
    }

    pub fn scene_id(&self) -> &SceneId {
        &self.layout.scene_id
    }

    pub fn info(&self) -> &SliceInfo {
        &self.layout.info
    }

    pub fn layout(&self) -> &SlicerLayout {
        &self.layout
    }

    pub fn coordinator(&self) -> Arc<SliceCoordinator<T>> {
        self.coordinator.clone()
    }
}
