use std::sync::Arc;
use std::time::Duration;

use ndarray::Array3;
use tokio::sync::mpsc;
use volslicer_core::{
    Placeholder, Rejected, SliceHandler, SliceIndex, SliceReply, SlicerConfig, SlicerRegistry,
    Volume, VolumeSlicer,
};

use crate::test_util::idx;
use crate::{Effects, Message, SceneBoard, Session, SessionError, Shown, SlicerView, Update};

fn volume() -> Volume<u16> {
    Volume::new(Array3::from_shape_fn((10, 64, 64), |(z, y, x)| {
        (z * 80 + y + x) as u16
    }))
    .unwrap()
}

fn slicer(config: &SlicerConfig) -> VolumeSlicer<u16> {
    VolumeSlicer::new(volume(), config).unwrap()
}

fn reply(slicer: &VolumeSlicer<u16>, index: SliceIndex) -> SliceReply {
    slicer.coordinator().handle(index.as_i64())
}

#[test]
fn repeated_index_is_served_from_cache() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());

    let effects = view.update(Message::SliderMoved(5));
    assert_eq!(effects.request, Update::Set(idx(5)));
    assert!(effects.figure.is_no_update());
    assert!(view.figure().is_blank());

    let figure = view.update(Message::Received(reply(&s, idx(5)))).figure;
    let Update::Set(figure) = figure else {
        panic!("expected a render for the active slice");
    };
    assert!(figure.image.source.starts_with("data:image/png;base64,"));
    assert!(view.is_current());

    assert_eq!(view.update(Message::SliderMoved(5)), Effects::default());
    assert_eq!(view.renders(), 1);
    assert_eq!(view.requests_sent(), 1);
    assert_eq!(view.cache().stats().hits, 1);
}

#[test]
fn duplicate_reply_changes_nothing() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());
    view.update(Message::SliderMoved(2));

    let first = reply(&s, idx(2));
    assert!(view.update(Message::Received(first.clone())).figure.is_set());
    let figure = view.figure().clone();
    for _ in 0..3 {
        assert_eq!(view.update(Message::Received(first.clone())), Effects::default());
    }
    assert_eq!(view.figure(), &figure);
    assert_eq!(view.cache().len(), 1);
    assert_eq!(view.cache().stats().inserts, 1);
    assert_eq!(view.renders(), 1);
}

#[test]
fn stale_replies_are_cached_silently() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());

    for raw in [3, 4, 5] {
        let effects = view.update(Message::SliderMoved(raw));
        assert_eq!(effects.request, Update::Set(idx(raw)));
    }
    assert_eq!(view.requests_sent(), 3);

    // Replies for indices the user already moved past.
    for raw in [3, 4] {
        let effects = view.update(Message::Received(reply(&s, idx(raw))));
        assert!(effects.figure.is_no_update());
    }
    assert_eq!(view.renders(), 0);
    assert_eq!(view.cache().len(), 2);

    assert!(view
        .update(Message::Received(reply(&s, idx(5))))
        .figure
        .is_set());
    assert_eq!(view.shown(), Shown::Slice(idx(5)));

    // Going back needs no request and swaps the image in place.
    let effects = view.update(Message::SliderMoved(4));
    assert!(effects.request.is_no_update());
    let Update::Set(figure) = effects.figure else {
        panic!("expected the cached slice to render");
    };
    let cached = view.cache().peek(idx(4)).unwrap();
    assert_eq!(figure.image.source, cached.slice.as_str());
    assert_eq!(view.renders(), 2);
}

#[test]
fn out_of_order_reply_does_not_replace_active() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());
    view.update(Message::SliderMoved(2));
    view.update(Message::SliderMoved(7));

    assert!(view
        .update(Message::Received(reply(&s, idx(7))))
        .figure
        .is_set());
    assert!(view
        .update(Message::Received(reply(&s, idx(2))))
        .figure
        .is_no_update());
    assert_eq!(view.shown(), Shown::Slice(idx(7)));
}

#[test]
fn missing_slice_keeps_stale_frame() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());
    view.update(Message::SliderMoved(1));
    view.update(Message::Received(reply(&s, idx(1))));
    let shown = view.figure().clone();

    let effects = view.update(Message::SliderMoved(8));
    assert_eq!(effects.request, Update::Set(idx(8)));
    assert!(effects.figure.is_no_update());
    assert_eq!(view.figure(), &shown);
    assert!(!view.is_current());
}

#[test]
fn thumbnail_placeholder() {
    let config = SlicerConfig {
        placeholder: Placeholder::Thumbnail,
        ..Default::default()
    };
    let s = slicer(&config);
    let mut view = SlicerView::new(s.layout().clone());

    let effects = view.update(Message::SliderMoved(3));
    assert_eq!(effects.request, Update::Set(idx(3)));
    let Update::Set(figure) = effects.figure else {
        panic!("expected the thumbnail to render");
    };
    assert_eq!(figure.image.source, s.layout().thumbnails[3].as_str());
    assert_eq!(view.shown(), Shown::Thumbnail(idx(3)));
    // 64x64 slices with 32x32 thumbnails
    assert_eq!((figure.image.dx, figure.image.dy), (2.0, 2.0));

    let Update::Set(figure) = view.update(Message::Received(reply(&s, idx(3)))).figure else {
        panic!("expected the full slice to render");
    };
    assert_eq!((figure.image.dx, figure.image.dy), (1.0, 1.0));
    assert!(view.is_current());
}

#[test]
fn slider_is_clamped() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());

    assert_eq!(view.update(Message::SliderMoved(42)).request, Update::Set(idx(9)));
    assert_eq!(view.update(Message::SliderMoved(-3)).request, Update::Set(idx(0)));
    assert_eq!(view.active(), idx(0));
}

#[test]
fn rejection_is_recorded() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());

    let rejected = s.coordinator().handle(99);
    assert_eq!(rejected, Err(Rejected::OutOfRange { index: 99, len: 10 }));

    let effects = view.update(Message::Received(rejected));
    assert_eq!(effects, Effects::default());
    assert_eq!(view.last_rejection().map(Rejected::index), Some(99));
    assert!(view.cache().is_empty());
}

#[test]
fn rerequest_clears_rejection() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());
    view.update(Message::SliderMoved(4));
    view.update(Message::Received(Err(Rejected::Failed {
        index: 4,
        reason: "disk full".into(),
    })));
    assert_eq!(view.last_rejection().map(Rejected::index), Some(4));

    view.update(Message::SliderMoved(6));
    assert!(view.last_rejection().is_some());

    assert!(view.update(Message::SliderMoved(4)).request.is_set());
    assert!(view.last_rejection().is_none());
}

#[test]
fn refresh_refetches_active() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());
    view.update(Message::SliderMoved(5));
    view.update(Message::Received(reply(&s, idx(5))));
    view.update(Message::SliderMoved(6));
    view.update(Message::Received(reply(&s, idx(6))));

    let effects = view.update(Message::Refresh);
    assert_eq!(effects.request, Update::Set(idx(6)));
    assert!(effects.figure.is_no_update());
    assert!(view.cache().is_empty());

    // Same bytes come back, so nothing is redrawn.
    let renders = view.renders();
    assert!(view
        .update(Message::Received(reply(&s, idx(6))))
        .figure
        .is_no_update());
    assert_eq!(view.renders(), renders);
    assert!(view.is_current());

    assert!(view.update(Message::SliderMoved(5)).request.is_set());
}

#[test]
fn bounded_cache_evicts_oldest() {
    let config = SlicerConfig {
        cache_capacity: Some(2),
        ..Default::default()
    };
    let s = slicer(&config);
    let mut view = SlicerView::new(s.layout().clone());

    for raw in [1, 2, 3] {
        view.update(Message::SliderMoved(raw));
        view.update(Message::Received(reply(&s, idx(raw))));
    }
    assert_eq!(view.cache().len(), 2);
    assert_eq!(view.cache().stats().evictions, 1);

    assert!(view.update(Message::SliderMoved(1)).request.is_set());
    assert!(view.update(Message::SliderMoved(3)).request.is_no_update());
}

#[test]
fn initial_value_is_requested_on_start() {
    let s = slicer(&SlicerConfig::default());
    let mut view = SlicerView::new(s.layout().clone());
    assert_eq!(view.active(), idx(5));
    assert_eq!(view.start().request, Update::Set(idx(5)));
}

fn cube() -> Volume<u16> {
    Volume::new(Array3::from_shape_fn((64, 64, 64), |(z, y, x)| {
        (z + y + x) as u16
    }))
    .unwrap()
}

fn assert_ticks(line: &[Option<f64>], lo: f64, hi: f64) {
    // Ticks are 5% of the mean side long, which is 3.25 for a 64 cube.
    let close = |v: Option<f64>, want: f64| v.is_some_and(|v| (v - want).abs() < 1e-9);
    assert!(close(line[0], lo - 3.25), "{line:?}");
    assert_eq!(line[1..4], [Some(lo), None, Some(hi)]);
    assert!(close(line[4], hi + 3.25), "{line:?}");
    assert_eq!(line[5], None);
}

#[test]
fn slicers_in_a_scene_show_each_other() {
    let shared = cube();
    let mut views: Vec<SlicerView> = (0..3)
        .map(|axis| {
            let s = VolumeSlicer::new(shared.clone(), &SlicerConfig::default().with_axis(axis)).unwrap();
            SlicerView::new(s.layout().clone())
        })
        .collect();
    // Same axis as the first view, different volume.
    let elsewhere = VolumeSlicer::new(cube(), &SlicerConfig::default()).unwrap();
    views.push(SlicerView::new(elsewhere.layout().clone()));
    assert_eq!(views[0].scene_id(), views[2].scene_id());
    assert_ne!(views[0].scene_id(), views[3].scene_id());

    let mut board = SceneBoard::new();
    let updates = board.synchronize(&mut views);
    assert!(updates[..3].iter().all(Update::is_set));
    assert!(updates[3].is_no_update());
    assert!(views[3].figure().indicators.is_empty());

    // The z slicer sees the y slicer as a horizontal line and the x slicer as a
    // vertical one, both at the middle.
    let trace = &views[0].figure().indicators[0];
    assert_ticks(&trace.x[..6], -1.0, 64.0);
    assert_eq!(trace.y[..6], [Some(32.0); 6]);
    assert_eq!(trace.x[6..], [Some(32.0); 6]);
    assert_ticks(&trace.y[6..], -1.0, 64.0);

    // Moving the y slicer redraws the other two only.
    views[1].update(Message::SliderMoved(10));
    let updates = board.synchronize(&mut views);
    assert!(updates[0].is_set());
    assert!(updates[1].is_no_update());
    assert!(updates[2].is_set());
    assert!(updates[3].is_no_update());
    assert_eq!(views[0].figure().indicators[0].y[0], Some(10.0));
    // For the x slicer, rows are z and columns are y.
    assert_eq!(views[2].figure().indicators[0].y[0], Some(32.0));
    assert_eq!(views[2].figure().indicators[0].x[6], Some(10.0));

    assert!(board.synchronize(&mut views).iter().all(Update::is_no_update));
}

#[tokio::test]
async fn lost_reply_times_out_without_retry() {
    let registry = SlicerRegistry::new();
    let s = slicer(&SlicerConfig::default());
    registry.register(s.context_id().clone(), s.coordinator());
    // Nothing serves these requests.
    let (tx, _rx) = mpsc::unbounded_channel();

    let mut session = Session::connect(SlicerView::new(s.layout().clone()), &registry, tx).unwrap();
    session.start().unwrap();
    let err = session.settle(Duration::from_millis(50)).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout { index: 5, .. }));
    assert_eq!(session.view().requests_sent(), 1);
    assert_eq!(session.view().retries(), 0);
}

#[tokio::test]
async fn retry_recovers_a_lost_reply() {
    let registry = Arc::new(SlicerRegistry::new());
    let s = slicer(&SlicerConfig::default());
    registry.register(s.context_id().clone(), s.coordinator());
    let (tx, mut rx) = mpsc::unbounded_channel();

    let view = SlicerView::new(s.layout().clone());
    let mut session = Session::connect(view, &registry, tx)
        .unwrap()
        .with_retry(Duration::from_millis(20));
    session.start().unwrap();
    // The first request is dropped before the endpoint starts.
    assert!(rx.recv().await.is_some());
    let server = tokio::spawn(registry.clone().serve(rx));

    session.settle(Duration::from_secs(5)).await.unwrap();
    assert!(session.view().is_current());
    assert_eq!(session.view().requests_sent(), 1);
    assert!(session.view().retries() >= 1);

    drop(session);
    server.await.unwrap();
}

#[tokio::test]
async fn session_round_trip() {
    let registry = Arc::new(SlicerRegistry::new());
    let s = slicer(&SlicerConfig::default());
    registry.register(s.context_id().clone(), s.coordinator());

    let (tx, rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(registry.clone().serve(rx));

    let view = SlicerView::new(s.layout().clone());
    let mut session = Session::connect(view, &registry, tx).unwrap();
    let deadline = Duration::from_secs(5);

    session.start().unwrap();
    session.settle(deadline).await.unwrap();
    assert_eq!(session.view().shown(), Shown::Slice(idx(5)));

    session.move_slider(2).unwrap();
    session.settle(deadline).await.unwrap();
    assert_eq!(session.view().shown(), Shown::Slice(idx(2)));

    // Cached, so no request goes out.
    let sent = session.view().requests_sent();
    session.move_slider(5).unwrap();
    assert_eq!(session.view().requests_sent(), sent);
    assert!(session.view().is_current());

    drop(session);
    server.await.unwrap();
}

#[tokio::test]
async fn sessions_are_isolated() {
    let registry = Arc::new(SlicerRegistry::new());
    let a = slicer(&SlicerConfig::default());
    let b = slicer(&SlicerConfig::default().with_axis(2));
    registry.register(a.context_id().clone(), a.coordinator());
    registry.register(b.context_id().clone(), b.coordinator());

    let (tx, rx) = mpsc::unbounded_channel();
    let server = tokio::spawn(registry.clone().serve(rx));

    let mut sa = Session::connect(SlicerView::new(a.layout().clone()), &registry, tx.clone()).unwrap();
    let mut sb = Session::connect(SlicerView::new(b.layout().clone()), &registry, tx).unwrap();
    let deadline = Duration::from_secs(5);

    sa.move_slider(1).unwrap();
    sb.move_slider(40).unwrap();
    sa.settle(deadline).await.unwrap();
    sb.settle(deadline).await.unwrap();

    assert_eq!(sa.view().shown(), Shown::Slice(idx(1)));
    assert_eq!(sb.view().shown(), Shown::Slice(idx(40)));
    assert_eq!(sa.view().cache().len(), 1);
    assert_eq!(sb.view().cache().len(), 1);

    drop((sa, sb));
    server.await.unwrap();
}

#[tokio::test]
async fn unknown_context_cannot_connect() {
    let registry = SlicerRegistry::new();
    let s = slicer(&SlicerConfig::default());
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(Session::connect(SlicerView::new(s.layout().clone()), &registry, tx).is_err());
}
