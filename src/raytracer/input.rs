use minifb::{Key, Window};

/// Discrete events the display loop forwards to the render pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputEvent {
    /// Tear down the session without persisting anything.
    Close,
    /// Stop the preview and persist its current state as the final image.
    FinalizeNow,
}

/// Turns a held key into a single press event.
#[derive(Default)]
pub struct KeyLatch {
    was_down: bool,
}

impl KeyLatch {
    pub fn pressed(&mut self, down: bool) -> bool {
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

#[derive(Default)]
pub struct InputHandler {
    escape: KeyLatch,
    enter: KeyLatch,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// At most one event per recognized key per frame.
    pub fn poll(&mut self, window: &Window) -> Vec<InputEvent> {
        self.events(
            window.is_open(),
            window.is_key_down(Key::Escape),
            window.is_key_down(Key::Enter) || window.is_key_down(Key::NumPadEnter),
        )
    }

    fn events(&mut self, window_open: bool, escape_down: bool, enter_down: bool) -> Vec<InputEvent> {
        let mut events = Vec::new();
        if self.escape.pressed(escape_down) || !window_open {
            events.push(InputEvent::Close);
        }
        if self.enter.pressed(enter_down) {
            events.push(InputEvent::FinalizeNow);
        }
        events
    }
}
