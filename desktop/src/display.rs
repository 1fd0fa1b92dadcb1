use log::warn;
use zxart_core::{
    display::{HEIGHT, WIDTH},
    framebuffer::FrameBuffer,
    input::{ButtonState, Buttons},
};

pub struct MinifbDisplay {
    window: minifb::Window,
    buttons: ButtonState,
    // Interrupt keys as last seen, so only a fresh press stops a transfer.
    interrupt_held: bool,
}

const INTERRUPT_KEYS: [minifb::Key; 3] = [minifb::Key::Space, minifb::Key::B, minifb::Key::Escape];

impl MinifbDisplay {
    pub fn new(window: minifb::Window) -> Self {
        Self {
            window,
            buttons: ButtonState::new(),
            interrupt_held: false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(minifb::Key::Escape)
    }

    pub fn update(&mut self) {
        self.window.update();
        let mut current: u8 = 0;
        if self.any_down(&[minifb::Key::Left, minifb::Key::A]) {
            current |= 1 << (Buttons::Back as u8);
        }
        if self.any_down(&[minifb::Key::Space, minifb::Key::B]) {
            current |= 1 << (Buttons::Reload as u8);
        }
        if self.any_down(&[minifb::Key::Right, minifb::Key::C]) {
            current |= 1 << (Buttons::Forward as u8);
        }
        self.buttons.update(current);
        self.interrupt_held = self.any_down(&INTERRUPT_KEYS);
    }

    /// Pumps window events without touching the button state, reporting a
    /// fresh press of Reload or Escape. Used while a transfer blocks the
    /// main loop.
    pub fn interrupt_requested(&mut self) -> bool {
        self.window.update();
        let down = self.any_down(&INTERRUPT_KEYS);
        let pressed = down && !self.interrupt_held;
        self.interrupt_held = down;
        pressed || !self.window.is_open()
    }

    pub fn get_buttons(&self) -> ButtonState {
        self.buttons
    }

    fn any_down(&self, keys: &[minifb::Key]) -> bool {
        keys.iter().any(|key| self.window.is_key_down(*key))
    }
}

impl zxart_core::display::Display for MinifbDisplay {
    fn display(&mut self, buffers: &FrameBuffer) {
        if let Err(err) = self
            .window
            .update_with_buffer(buffers.pixels(), WIDTH, HEIGHT)
        {
            warn!("display: unable to present frame: {}", err);
        }
    }
}
