// Capture coordinator.
//
// A capture is requested by bumping a `CaptureRequest` counter. The
// coordinator remembers the last value it acted on and renders exactly one
// snapshot for each newer value it observes.

use std::io::Cursor;

use image::{ImageFormat, RgbaImage};

use crate::frame::{self, DrawItem};
use crate::scene::Scene;

/// Something that can rasterize a draw list once, synchronously.
pub trait RenderSurface {
    /// Renders `items` into a fresh frame. `None` when no surface is available.
    fn render_frame(&mut self, items: &[DrawItem]) -> Option<RgbaImage>;
}

/// Edge-triggered capture counter. Zero means nothing was ever requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct CaptureRequest(u64);

impl CaptureRequest {
    pub fn new() -> Self {
        Self(0)
    }

    /// Registers one new capture intent and returns its value.
    pub fn bump(&mut self) -> u64 {
        self.0 += 1;
        self.0
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// One PNG-encoded frame of the scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Counter value that triggered this capture.
    pub request: u64,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

/// What observing the counter led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// Counter unchanged since the last observation.
    Idle,
    Delivered { request: u64 },
    /// The surface produced nothing; no consumer was called.
    NoImage { request: u64 },
    /// A snapshot was rendered but no consumer is registered.
    Unclaimed { request: u64 },
}

pub type SnapshotConsumer = Box<dyn FnMut(Snapshot)>;

#[derive(Default)]
pub struct CaptureCoordinator {
    last_observed: u64,
    consumer: Option<SnapshotConsumer>,
}

impl CaptureCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_consumer(&mut self, consumer: impl FnMut(Snapshot) + 'static) {
        self.consumer = Some(Box::new(consumer));
    }

    pub fn last_observed(&self) -> u64 {
        self.last_observed
    }

    /// Acts on a new counter value at most once. The value counts as consumed
    /// even when the surface yields nothing.
    pub fn observe(
        &mut self,
        request: CaptureRequest,
        scene: &Scene,
        surface: &mut dyn RenderSurface,
    ) -> CaptureOutcome {
        let value = request.value();
        if value <= self.last_observed {
            return CaptureOutcome::Idle;
        }
        self.last_observed = value;

        let items = frame::capture_items(scene);
        let Some(image) = surface.render_frame(&items) else {
            return CaptureOutcome::NoImage { request: value };
        };
        if image.width() == 0 || image.height() == 0 {
            return CaptureOutcome::NoImage { request: value };
        }

        let png = match encode_png(&image) {
            Ok(png) => png,
            Err(err) => {
                log::error!("Failed to encode capture {}: {}", value, err);
                return CaptureOutcome::NoImage { request: value };
            }
        };
        let snapshot = Snapshot {
            request: value,
            width: image.width(),
            height: image.height(),
            png,
        };

        match self.consumer.as_mut() {
            Some(consumer) => {
                log::info!(
                    "Capture {} delivered ({}x{}, {} bytes)",
                    value,
                    snapshot.width,
                    snapshot.height,
                    snapshot.png.len()
                );
                consumer(snapshot);
                CaptureOutcome::Delivered { request: value }
            }
            None => CaptureOutcome::Unclaimed { request: value },
        }
    }
}

pub fn encode_png(image: &RgbaImage) -> image::ImageResult<Vec<u8>> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, ImageFormat::Png)?;
    Ok(bytes.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::PrimitiveKind;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FlatSurface {
        renders: usize,
    }

    impl RenderSurface for FlatSurface {
        fn render_frame(&mut self, _items: &[DrawItem]) -> Option<RgbaImage> {
            self.renders += 1;
            Some(RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255])))
        }
    }

    fn collecting(coordinator: &mut CaptureCoordinator) -> Rc<RefCell<Vec<Snapshot>>> {
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&received);
        coordinator.set_consumer(move |snapshot| sink.borrow_mut().push(snapshot));
        received
    }

    #[test]
    fn unchanged_counter_is_idle() {
        let mut coordinator = CaptureCoordinator::new();
        let received = collecting(&mut coordinator);
        let mut surface = FlatSurface { renders: 0 };
        let scene = Scene::new();

        let outcome = coordinator.observe(CaptureRequest::new(), &scene, &mut surface);
        assert_eq!(outcome, CaptureOutcome::Idle);
        assert_eq!(surface.renders, 0);
        assert!(received.borrow().is_empty());
    }

    #[test]
    fn each_bump_renders_once() {
        let mut coordinator = CaptureCoordinator::new();
        let received = collecting(&mut coordinator);
        let mut surface = FlatSurface { renders: 0 };
        let mut scene = Scene::new();
        scene.add(PrimitiveKind::Box);
        let mut request = CaptureRequest::new();

        request.bump();
        assert_eq!(
            coordinator.observe(request, &scene, &mut surface),
            CaptureOutcome::Delivered { request: 1 }
        );
        assert_eq!(coordinator.observe(request, &scene, &mut surface), CaptureOutcome::Idle);
        assert_eq!(surface.renders, 1);
        assert_eq!(coordinator.last_observed(), 1);

        let received = received.borrow();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].request, 1);
        assert_eq!(&received[0].png[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn missing_consumer_is_reported() {
        let mut coordinator = CaptureCoordinator::new();
        let mut surface = FlatSurface { renders: 0 };
        let mut request = CaptureRequest::new();
        request.bump();
        assert_eq!(
            coordinator.observe(request, &Scene::new(), &mut surface),
            CaptureOutcome::Unclaimed { request: 1 }
        );
    }
}
