//! Layer stack: one effect instance per mounted surface, ticked in lockstep
//! and composited back to front into a single half-block frame.

use crate::canvas::Canvas;
use crate::color::Rgb;
use crate::config::EffectKind;
use crate::effects::ripple::RippleEffect;
use crate::effects::spiral::SpiralEffect;
use crate::effects::starfield::StarfieldEffect;
use crate::effects::trail::TrailEffect;
use crate::effects::{Effect, PointerEvent};
use crate::render::HalfBlockPresenter;
use crossterm::event::{Event, MouseButton, MouseEvent, MouseEventKind};
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation handle for a running loop or a mounted layer. Clones share
/// the same flag; the owner checks it before every tick.
#[derive(Clone, Debug)]
pub struct RunHandle(Arc<AtomicBool>);

impl RunHandle {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Where a layer's surface sits, in device pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfaceRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Placement {
    Viewport,
    /// Centered container taking `fraction` of each viewport dimension.
    Panel { fraction: f32 },
}

impl Placement {
    /// `None` when the surface would be empty. Such layers are not mounted,
    /// and mounted ones sit out until a resize gives them room again.
    pub fn resolve(&self, width: usize, height: usize) -> Option<SurfaceRect> {
        let rect = match *self {
            Placement::Viewport => SurfaceRect {
                x: 0,
                y: 0,
                width,
                height,
            },
            Placement::Panel { fraction } => {
                let fraction = fraction.clamp(0.0, 1.0);
                let w = (width as f32 * fraction).round() as usize;
                let h = (height as f32 * fraction).round() as usize;
                SurfaceRect {
                    x: (width - w.min(width)) / 2,
                    y: (height - h.min(height)) / 2,
                    width: w.min(width),
                    height: h.min(height),
                }
            }
        };
        (rect.width > 0 && rect.height > 0).then_some(rect)
    }
}

struct Layer {
    kind: EffectKind,
    effect: Box<dyn Effect>,
    canvas: Canvas,
    placement: Placement,
    rect: SurfaceRect,
    handle: RunHandle,
}

impl Layer {
    fn contains(&self, x: f32, y: f32, scale: f32) -> bool {
        let left = self.rect.x as f32 * scale;
        let top = self.rect.y as f32 * scale;
        x >= left
            && y >= top
            && x < left + self.rect.width as f32 * scale
            && y < top + self.rect.height as f32 * scale
    }

    fn is_visible(&self) -> bool {
        self.rect.width > 0 && self.rect.height > 0
    }

    fn local(&self, x: f32, y: f32, scale: f32) -> (f32, f32) {
        (x - self.rect.x as f32 * scale, y - self.rect.y as f32 * scale)
    }
}

pub struct Stage {
    width: usize,
    height: usize,
    scale: f32,
    panel: f32,
    bg_color: Rgb,
    layers: Vec<Layer>,
    presenter: HalfBlockPresenter,
    handle: RunHandle,
}

impl Stage {
    /// Builds an empty stage for a `cols` x `rows` terminal.
    pub fn new(cols: u16, rows: u16, scale: f32, panel: f32, bg_color: Rgb) -> Self {
        let width = cols as usize;
        let height = rows as usize * 2;
        Self {
            width,
            height,
            scale: if scale > 0.0 { scale } else { 1.0 },
            panel,
            bg_color,
            layers: Vec::new(),
            presenter: HalfBlockPresenter::new(width, height),
            handle: RunHandle::new(),
        }
    }

    /// Handle for the frame loop; stopping it ends `run`.
    pub fn start(&self) -> RunHandle {
        self.handle.clone()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    fn placement(&self, kind: EffectKind) -> Placement {
        match kind {
            EffectKind::Spiral => Placement::Panel { fraction: self.panel },
            _ => Placement::Viewport,
        }
    }

    /// Creates a fresh instance of `kind` on its own surface. Returns `None`
    /// without complaint if the surface would be empty.
    pub fn mount(&mut self, kind: EffectKind) -> Option<RunHandle> {
        let placement = self.placement(kind);
        let Some(rect) = placement.resolve(self.width, self.height) else {
            tracing::debug!(?kind, "surface is empty, skipping layer");
            return None;
        };

        let (w, h) = (rect.width as f32 * self.scale, rect.height as f32 * self.scale);
        let effect: Box<dyn Effect> = match kind {
            EffectKind::Starfield => Box::new(StarfieldEffect::new(w, h)),
            EffectKind::Spiral => Box::new(SpiralEffect::new(w, h)),
            EffectKind::Trail => Box::new(TrailEffect::new()),
            EffectKind::Ripple => Box::new(RippleEffect::new(w, h)),
        };
        let handle = RunHandle::new();
        tracing::debug!(layer = effect.name(), ?rect, "mounted layer");

        self.layers.push(Layer {
            kind,
            effect,
            canvas: Canvas::new(rect.width, rect.height, self.scale),
            placement,
            rect,
            handle: handle.clone(),
        });
        self.layers.sort_by_key(|layer| layer.kind);
        Some(handle)
    }

    /// Stops `kind` if it is running, otherwise mounts a new instance.
    pub fn toggle(&mut self, kind: EffectKind) {
        let running = self
            .layers
            .iter()
            .find(|layer| layer.kind == kind && layer.handle.is_running());
        match running {
            Some(layer) => {
                tracing::info!(?kind, "stopping layer");
                layer.handle.stop();
            }
            None => {
                tracing::info!(?kind, "starting layer");
                self.mount(kind);
            }
        }
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.width = cols as usize;
        self.height = rows as usize * 2;
        self.presenter.resize(self.width, self.height);
        tracing::debug!(cols, rows, "resizing stage");

        let (width, height, scale) = (self.width, self.height, self.scale);
        for layer in &mut self.layers {
            match layer.placement.resolve(width, height) {
                Some(rect) => {
                    layer.rect = rect;
                    layer.canvas.resize(rect.width, rect.height);
                    layer
                        .effect
                        .resize(rect.width as f32 * scale, rect.height as f32 * scale);
                }
                None => {
                    tracing::debug!(layer = layer.effect.name(), "surface collapsed, suspending layer");
                    layer.rect = SurfaceRect {
                        x: 0,
                        y: 0,
                        width: 0,
                        height: 0,
                    };
                    layer.canvas.resize(0, 0);
                }
            }
        }
    }

    /// Routes terminal input to every live layer in its own coordinates.
    pub fn dispatch(&mut self, event: &Event) {
        match event {
            Event::Mouse(MouseEvent {
                kind, column, row, ..
            }) => {
                // Cell center; each row holds two device pixels
                let x = (*column as f32 + 0.5) * self.scale;
                let y = (*row as f32 * 2.0 + 1.0) * self.scale;
                self.dispatch_mouse(*kind, x, y);
            }
            Event::FocusLost => self.broadcast(|_| Some(PointerEvent::Leave)),
            Event::Resize(cols, rows) => self.resize(*cols, *rows),
            _ => {}
        }
    }

    fn dispatch_mouse(&mut self, kind: MouseEventKind, x: f32, y: f32) {
        let scale = self.scale;
        match kind {
            MouseEventKind::Down(MouseButton::Left) => self.broadcast(|layer| {
                let (lx, ly) = layer.local(x, y, scale);
                layer
                    .contains(x, y, scale)
                    .then_some(PointerEvent::Down { x: lx, y: ly })
            }),
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                self.broadcast(|layer| {
                    let (lx, ly) = layer.local(x, y, scale);
                    Some(if layer.contains(x, y, scale) {
                        PointerEvent::Move { x: lx, y: ly }
                    } else {
                        PointerEvent::Leave
                    })
                })
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.broadcast(|layer| {
                    let (lx, ly) = layer.local(x, y, scale);
                    layer
                        .contains(x, y, scale)
                        .then_some(PointerEvent::Up { x: lx, y: ly })
                });
                // A press and release is a click
                self.broadcast(|layer| {
                    let (lx, ly) = layer.local(x, y, scale);
                    layer
                        .contains(x, y, scale)
                        .then_some(PointerEvent::Click { x: lx, y: ly })
                });
            }
            _ => {}
        }
    }

    fn broadcast(&mut self, event_for: impl Fn(&Layer) -> Option<PointerEvent>) {
        for layer in &mut self.layers {
            if !layer.handle.is_running() || !layer.is_visible() {
                continue;
            }
            if let Some(event) = event_for(layer) {
                layer.effect.handle_event(&event);
            }
        }
    }

    /// Drops stopped layers, then advances the visible ones by one tick.
    pub fn update(&mut self, dt: f32) {
        self.layers.retain(|layer| {
            let running = layer.handle.is_running();
            if !running {
                tracing::debug!(layer = layer.effect.name(), "tearing down layer");
            }
            running
        });
        for layer in self.layers.iter_mut().filter(|layer| layer.is_visible()) {
            layer.effect.update(dt);
        }
    }

    pub fn render<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.compose();
        self.presenter.present(out)
    }

    fn compose(&mut self) {
        self.presenter.begin(self.bg_color);
        for layer in &mut self.layers {
            if !layer.handle.is_running() || !layer.is_visible() {
                continue;
            }
            layer.effect.draw(&mut layer.canvas);
            self.presenter
                .composite(&layer.canvas, (layer.rect.x, layer.rect.y));
        }
    }

    pub fn layer_names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|layer| layer.effect.name()).collect()
    }

    pub fn layer_rect(&self, kind: EffectKind) -> Option<SurfaceRect> {
        self.layers
            .iter()
            .find(|layer| layer.kind == kind && layer.is_visible())
            .map(|layer| layer.rect)
    }
}
