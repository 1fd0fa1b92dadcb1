#[repr(C)]
pub enum Buttons {
    /// Previous screen (button A).
    Back,
    /// Cancel and reload the current screen (button B).
    Reload,
    /// Next screen (button C).
    Forward,
}

#[derive(Clone, Copy, Default)]
pub struct ButtonState {
    current: u8,
    previous: u8,
}

impl ButtonState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, current: u8) {
        self.previous = self.current;
        self.current = current;
    }

    fn pressed(&self) -> u8 {
        self.current & !self.previous
    }

    pub fn is_pressed(&self, button: Buttons) -> bool {
        let mask = 1 << (button as u8);
        (self.pressed() & mask) != 0
    }

    pub fn any_pressed(&self) -> bool {
        self.pressed() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_is_reported_once() {
        let mut state = ButtonState::new();
        state.update(1 << Buttons::Forward as u8);
        assert!(state.is_pressed(Buttons::Forward));
        assert!(!state.is_pressed(Buttons::Back));
        state.update(1 << Buttons::Forward as u8);
        assert!(!state.is_pressed(Buttons::Forward));
        assert!(!state.any_pressed());
    }

    #[test]
    fn release_then_press_fires_again() {
        let mut state = ButtonState::new();
        state.update(1 << Buttons::Reload as u8);
        state.update(0);
        state.update(1 << Buttons::Reload as u8);
        assert!(state.is_pressed(Buttons::Reload));
    }
}
