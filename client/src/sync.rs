use tracing::debug;
use volslicer_core::{EncodedSlice, SliceIndex, SliceInfo};

use crate::cache::SliceCache;
use crate::figure::{Figure, IndicatorTrace};
use crate::update::Update;

/// What the figure currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shown {
    Nothing,
    Slice(SliceIndex),
    Thumbnail(SliceIndex),
}

/// Reconciles the active index and the cache into the rendered figure, emitting an
/// update only when the visible payload actually changes.
#[derive(Debug)]
pub struct ViewSynchronizer {
    figure: Figure,
    shown: Shown,
    lowres_scale: Option<(f64, f64)>,
    renders: u64,
}

impl ViewSynchronizer {
    pub fn new(info: &SliceInfo, reverse_y: bool) -> Self {
        let lowres_scale = info.lowres_size.map(|lowres| {
            (
                info.size.x as f64 / f64::from(lowres.x.max(1)),
                info.size.y as f64 / f64::from(lowres.y.max(1)),
            )
        });
        Self {
            figure: Figure::new(info, reverse_y),
            shown: Shown::Nothing,
            lowres_scale,
            renders: 0,
        }
    }

    pub fn figure(&self) -> &Figure {
        &self.figure
    }

    pub fn shown(&self) -> Shown {
        self.shown
    }

    /// Number of updates emitted so far.
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Decides what to show for `active`.
    ///
    /// Cached: show it, unless it is already on screen. Not cached: show `fallback` if
    /// given, otherwise keep whatever is on screen.
    pub fn synchronize(
        &mut self,
        active: SliceIndex,
        cache: &SliceCache,
        fallback: Option<&EncodedSlice>,
    ) -> Update<Figure> {
        if let Some(cached) = cache.peek(active) {
            let overlay = cached.overlay.as_ref().map_or("", EncodedSlice::as_str);
            if self.figure.shows(cached.slice.as_str(), overlay) {
                // Same payload can be reached through a different index.
                self.shown = Shown::Slice(active);
                debug!(%active, "Slice already displayed");
                return Update::NoUpdate;
            }
            let (source, overlay) = (cached.slice.to_string(), overlay.to_string());
            self.show_full(source, overlay);
            self.shown = Shown::Slice(active);
            debug!(%active, "Showing cached slice");
            return self.render();
        }

        let Some(thumbnail) = fallback else {
            debug!(%active, "Slice not cached yet, keeping stale frame");
            return Update::NoUpdate;
        };
        if self.figure.shows(thumbnail.as_str(), "") {
            return Update::NoUpdate;
        }
        self.show_thumbnail(thumbnail.to_string());
        self.shown = Shown::Thumbnail(active);
        debug!(%active, "Showing thumbnail");
        self.render()
    }

    /// Replaces the position indicators. Redraws only if they moved.
    pub fn set_indicators(&mut self, indicators: Vec<IndicatorTrace>) -> Update<Figure> {
        if self.figure.indicators == indicators {
            return Update::NoUpdate;
        }
        self.figure.indicators = indicators;
        self.render()
    }

    fn render(&mut self) -> Update<Figure> {
        self.renders += 1;
        debug!(renders = self.renders, "Updating figure");
        Update::Set(self.figure.clone())
    }

    fn show_full(&mut self, source: String, overlay: String) {
        let img = &mut self.figure.image;
        // Undo any thumbnail scaling.
        if let Some((sx, sy)) = self.lowres_scale.filter(|_| matches!(self.shown, Shown::Thumbnail(_))) {
            let (dx, dy) = (img.dx / sx, img.dy / sy);
            img.x0 -= 0.5 * img.dx - 0.5 * dx;
            img.y0 -= 0.5 * img.dy - 0.5 * dy;
            img.dx = dx;
            img.dy = dy;
        }
        img.source = source;
        img.overlay = overlay;
    }

    /// Stretches the thumbnail over the same area the full slice covers.
    fn show_thumbnail(&mut self, source: String) {
        let img = &mut self.figure.image;
        if let Some((sx, sy)) = self.lowres_scale.filter(|_| !matches!(self.shown, Shown::Thumbnail(_))) {
            let (spacing_x, spacing_y) = (img.dx, img.dy);
            img.dx *= sx;
            img.dy *= sy;
            img.x0 += 0.5 * img.dx - 0.5 * spacing_x;
            img.y0 += 0.5 * img.dy - 0.5 * spacing_y;
        }
        img.source = source;
        img.overlay = String::new();
    }
}
