use get_size::GetSize;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::encode::{self, EncodedSlice};
use crate::err::Error;
use crate::overlay::{Colormap, Overlay};
use crate::quantize::Quantization;
use crate::volume::{SliceIndex, Voxel, VolumeStore};

/// The unit sent from the server to the client: a slice and the index it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, GetSize)]
pub struct SliceResponse {
    pub index: SliceIndex,
    pub slice: EncodedSlice,
    pub overlay: Option<EncodedSlice>,
}

/// A request the server refused to answer with an image.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejected {
    #[error("Slice index {index} out of range 0..{len}")]
    OutOfRange { index: i64, len: usize },
    #[error("Slice {index} could not be produced: {reason}")]
    Failed { index: i64, reason: String },
}

impl Rejected {
    pub fn index(&self) -> i64 {
        match self {
            Rejected::OutOfRange { index, .. } | Rejected::Failed { index, .. } => *index,
        }
    }
}

pub type SliceReply = Result<SliceResponse, Rejected>;

/// Object-safe face of a coordinator, so slicers over different voxel types can share
/// one endpoint.
pub trait SliceHandler: Send + Sync {
    /// Number of valid indices.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Produces the response for an index that has already been validated.
    fn produce(&self, index: SliceIndex) -> Result<SliceResponse, Error>;

    /// Answers a raw request. Out-of-range indices never reach [`SliceHandler::produce`],
    /// and a failure yields a rejection instead of a partial payload.
    fn handle(&self, raw: i64) -> SliceReply {
        let len = self.len();
        let Ok(index) = SliceIndex::checked(raw, len) else {
            warn!(index = raw, len, "Rejecting out of range slice request");
            return Err(Rejected::OutOfRange { index: raw, len });
        };
        debug!(%index, "Producing slice");
        self.produce(index).map_err(|err| {
            warn!(%index, %err, "Failed to produce slice");
            Rejected::Failed {
                index: raw,
                reason: err.to_string(),
            }
        })
    }
}

/// Turns requested indices into encoded slices. Holds no per-request state.
pub struct SliceCoordinator<T> {
    store: VolumeStore<T>,
    quantization: Quantization,
    overlay: RwLock<Option<Overlay>>,
}

impl<T: Voxel> SliceCoordinator<T> {
    pub fn new(store: VolumeStore<T>, quantization: Quantization) -> Self {
        Self {
            store,
            quantization,
            overlay: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &VolumeStore<T> {
        &self.store
    }

    pub fn quantization(&self) -> Quantization {
        self.quantization
    }

    /// Replaces the overlay; `None` disables it. The client must refresh to see the change.
    ///
    /// The mask must have the same shape as the volume, otherwise the current overlay is
    /// kept and [`Error::OverlayShape`] is returned.
    pub fn set_overlay(&self, overlay: Option<Overlay>) -> Result<(), Error> {
        if let Some(overlay) = &overlay {
            let expected = self.store.volume().shape();
            if overlay.shape() != expected {
                return Err(Error::OverlayShape {
                    expected: expected.into(),
                    found: overlay.mask().shape().to_vec(),
                });
            }
        }
        *self.overlay.write() = overlay;
        Ok(())
    }

    /// Recolors the current overlay, if any.
    pub fn set_overlay_colormap(&self, colormap: Colormap) {
        if let Some(overlay) = self.overlay.write().as_mut() {
            overlay.set_colormap(colormap);
        }
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.read().is_some()
    }

    /// The quantized slice, ready for encoding.
    pub fn quantized(&self, index: SliceIndex) -> Result<ndarray::Array2<u8>, Error> {
        let slice = self.store.get_slice(index)?;
        Ok(self.quantization.apply(slice))
    }
}

impl<T: Voxel> SliceHandler for SliceCoordinator<T> {
    fn len(&self) -> usize {
        self.store.len()
    }

    #[instrument(skip(self), fields(axis = ?self.store.axis()))]
    fn produce(&self, index: SliceIndex) -> Result<SliceResponse, Error> {
        let slice = encode::encode(self.quantized(index)?.view())?;
        let overlay = match self.overlay.read().as_ref() {
            Some(overlay) => overlay
                .slice_rgba(self.store.axis(), index)
                .map(|rgba| encode::encode_rgba(rgba.view()))
                .transpose()?,
            None => None,
        };
        Ok(SliceResponse {
            index,
            slice,
            overlay,
        })
    }
}
