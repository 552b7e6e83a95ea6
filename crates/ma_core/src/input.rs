//! Keyboard and mouse state with held (level) and pressed/released (edge) queries.
//!
//! Movement reads held keys every step. Jumps, clicks and debug toggles read
//! the edge sets, which survive until `end_frame()`. The main loop only calls
//! `end_frame()` after a fixed step has run, so a press landing on a frame with
//! zero simulation steps is still seen by the next step.

use std::collections::HashSet;

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Space,
    Escape,
    F3,
    F4,
    A,
    D,
    W,
    R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
    Right,
}

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,

    mouse_held: HashSet<MouseBtn>,
    mouse_just_pressed: HashSet<MouseBtn>,

    /// Cursor position in physical window pixels, y pointing down.
    pub cursor: Vec2,
    /// Cursor position captured at the most recent left press.
    last_click: Option<Vec2>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        if self.mouse_held.insert(btn) {
            self.mouse_just_pressed.insert(btn);
            if btn == MouseBtn::Left {
                self.last_click = Some(self.cursor);
            }
        }
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        self.mouse_held.remove(&btn);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn is_any_just_pressed(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.just_pressed.contains(k))
    }

    /// -1.0, 0.0 or 1.0 from two sets of held keys. Opposing keys cancel.
    pub fn axis(&self, negative: &[Key], positive: &[Key]) -> f32 {
        let neg = negative.iter().any(|k| self.held.contains(k));
        let pos = positive.iter().any(|k| self.held.contains(k));
        match (neg, pos) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }

    pub fn is_mouse_just_pressed(&self, btn: MouseBtn) -> bool {
        self.mouse_just_pressed.contains(&btn)
    }

    /// Window-space position of a left click that happened this frame.
    pub fn left_click(&self) -> Option<Vec2> {
        if self.mouse_just_pressed.contains(&MouseBtn::Left) {
            self.last_click
        } else {
            None
        }
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.mouse_just_pressed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        assert!(input.is_held(Key::Space));
        assert!(input.is_just_pressed(Key::Space));
    }

    #[test]
    fn key_repeat_does_not_retrigger_after_end_frame() {
        let mut input = InputState::new();
        input.key_down(Key::Space);
        input.end_frame();
        // OS key repeat delivers another press while the key is still held.
        input.key_down(Key::Space);
        assert!(input.is_held(Key::Space));
        assert!(!input.is_just_pressed(Key::Space));
    }

    #[test]
    fn key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::Left);
        assert!(!input.is_just_released(Key::Left));
        assert!(!input.is_held(Key::Left));
    }

    #[test]
    fn end_frame_keeps_held_and_clears_edges() {
        let mut input = InputState::new();
        input.key_down(Key::Right);
        input.key_down(Key::F3);
        input.key_up(Key::F3);
        input.end_frame();
        assert!(input.is_held(Key::Right));
        assert!(!input.is_just_pressed(Key::Right));
        assert!(!input.is_just_released(Key::F3));
    }

    #[test]
    fn axis_combines_held_keys() {
        let mut input = InputState::new();
        let left = [Key::Left, Key::A];
        let right = [Key::Right, Key::D];
        assert_eq!(input.axis(&left, &right), 0.0);

        input.key_down(Key::A);
        assert_eq!(input.axis(&left, &right), -1.0);

        input.key_down(Key::Right);
        assert_eq!(input.axis(&left, &right), 0.0, "opposing keys cancel");

        input.key_up(Key::A);
        assert_eq!(input.axis(&left, &right), 1.0);
    }

    #[test]
    fn left_click_reports_press_position_for_one_frame() {
        let mut input = InputState::new();
        input.cursor = Vec2::new(100.0, 200.0);
        input.mouse_down(MouseBtn::Left);
        input.cursor = Vec2::new(300.0, 50.0);
        assert_eq!(input.left_click(), Some(Vec2::new(100.0, 200.0)));

        input.end_frame();
        assert_eq!(input.left_click(), None);
        assert!(input.is_mouse_held(MouseBtn::Left));
    }

    #[test]
    fn right_click_is_not_a_left_click() {
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Right);
        assert!(input.is_mouse_just_pressed(MouseBtn::Right));
        assert_eq!(input.left_click(), None);
    }
}
