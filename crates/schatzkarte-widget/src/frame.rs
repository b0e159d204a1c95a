//! Drag and resize handling for the floating frame.
//!
//! Geometry never touches the connection: the controller only copies the
//! resulting [`Frame`] into its view state.

use schatzkarte_core::{Frame, Point, Size, Viewport};

use crate::config::GeometrySettings;

/// An in-progress pointer gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Drag { pointer_start: Point, frame_start: Point },
    Resize { pointer_start: Point, size_start: Size },
}

/// Tracks pointer gestures and computes frame geometry.
#[derive(Debug, Clone)]
pub struct FrameController {
    settings: GeometrySettings,
    viewport: Viewport,
    gesture: Option<Gesture>,
    last_small: Option<Frame>,
}

impl FrameController {
    pub fn new(settings: GeometrySettings) -> Self {
        let viewport = settings.initial_viewport;
        Self {
            settings,
            viewport,
            gesture: None,
            last_small: None,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Records a new viewport and returns `frame` clamped into it.
    pub fn set_viewport(&mut self, viewport: Viewport, frame: Frame) -> Frame {
        self.viewport = viewport;
        frame.clamped(viewport, self.settings.min_visible)
    }

    /// Default small geometry: fixed size, bottom-right corner.
    pub fn small_frame(&self) -> Frame {
        Frame::anchored_bottom_right(self.settings.small_size, self.viewport, self.settings.margin)
    }

    /// Large geometry: a share of the viewport, centred.
    pub fn large_frame(&self) -> Frame {
        let size = self
            .viewport
            .scaled(self.settings.large_fraction, self.settings.min_size);
        Frame::centered(size, self.viewport)
    }

    /// Remembers where the small frame was before minimizing.
    pub fn remember_small(&mut self, frame: Frame) {
        self.last_small = Some(frame);
    }

    /// Geometry to restore from minimized: the remembered small frame, else the default.
    pub fn restored_frame(&mut self) -> Frame {
        match self.last_small.take() {
            Some(frame) => frame.clamped(self.viewport, self.settings.min_visible),
            None => self.small_frame(),
        }
    }

    /// Starts dragging from the title bar. Presses on title-bar controls are ignored.
    pub fn begin_drag(&mut self, pointer: Point, frame: Frame, over_control: bool) -> bool {
        if over_control || self.gesture.is_some() {
            return false;
        }
        self.gesture = Some(Gesture::Drag {
            pointer_start: pointer,
            frame_start: frame.position,
        });
        true
    }

    /// Starts resizing from the resize handle.
    pub fn begin_resize(&mut self, pointer: Point, frame: Frame) -> bool {
        if self.gesture.is_some() {
            return false;
        }
        self.gesture = Some(Gesture::Resize {
            pointer_start: pointer,
            size_start: frame.size,
        });
        true
    }

    /// Returns the frame for the current pointer position, if a gesture is active.
    pub fn track(&self, pointer: Point, frame: Frame) -> Option<Frame> {
        match self.gesture? {
            Gesture::Drag {
                pointer_start,
                frame_start,
            } => {
                let wanted = frame_start.offset(pointer.delta_from(pointer_start));
                let position =
                    Frame::clamp_position(wanted, frame.size, self.viewport, self.settings.min_visible);
                Some(Frame::new(position, frame.size))
            }
            Gesture::Resize {
                pointer_start,
                size_start,
            } => {
                let size = size_start.resized(pointer.delta_from(pointer_start), self.settings.min_size);
                Some(Frame::new(frame.position, size))
            }
        }
    }

    /// Ends the active gesture. Returns false if none was active.
    pub fn finish(&mut self) -> bool {
        self.gesture.take().is_some()
    }

    /// Returns true while a drag or resize is in progress.
    pub fn is_active(&self) -> bool {
        self.gesture.is_some()
    }

    pub fn gesture(&self) -> Option<Gesture> {
        self.gesture
    }
}
