use std::collections::HashSet;

/// Keys the game reacts to. Mapping physical keys onto these is left to the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    ArrowUp,
    ArrowRight,
    Space,
    W,
    D,
    LeftShift,
    R,
    T,
    Escape,
}

/// InputState is the set of keys held down during the current tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputState {
    pressed: HashSet<Key>,
}

impl InputState {
    pub fn new() -> InputState {
        InputState::default()
    }

    pub fn from_keys<I: IntoIterator<Item = Key>>(keys: I) -> InputState {
        InputState {
            pressed: keys.into_iter().collect(),
        }
    }

    pub fn press(&mut self, key: Key) {
        self.pressed.insert(key);
    }

    pub fn release(&mut self, key: Key) {
        self.pressed.remove(&key);
    }

    pub fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    pub fn any_pressed(&self, keys: &[Key]) -> bool {
        keys.iter().any(|k| self.is_pressed(*k))
    }
}
