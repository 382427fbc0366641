//! Texture picking for override editors.
//!
//! During a tick every drawn instance records the texture hash it sampled.
//! A pick request is answered at the end of the tick by asking the backend
//! which raytraced instance lies under the cursor and looking that instance
//! up.

use std::collections::HashMap;

use crate::backend::{InstanceHandle, RenderBackend};

/// Pending pick request, highlight toggle and the picked texture.
#[derive(Debug, Default)]
pub struct TexturePicker {
    requested: Option<(i32, i32)>,
    highlight: bool,
    picked_hash: u64,
    instance_hashes: HashMap<InstanceHandle, u64>,
}

impl TexturePicker {
    /// Creates an idle picker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks for a pick at the end of this tick.
    pub fn request(&mut self, x: i32, y: i32) {
        self.requested = Some((x, y));
    }

    /// Toggles highlighting of the picked texture.
    pub fn set_highlight(&mut self, highlight: bool) {
        self.highlight = highlight;
    }

    /// Remembers which texture `instance` drew with.
    pub fn record(&mut self, instance: InstanceHandle, texture_hash: u64) {
        self.instance_hashes.insert(instance, texture_hash);
    }

    /// Returns true if draws with `texture_hash` should be highlighted.
    #[must_use]
    pub fn should_highlight(&self, texture_hash: u64) -> bool {
        self.highlight && self.picked_hash != 0 && texture_hash == self.picked_hash
    }

    /// Answers a pending request, then forgets this tick's instances.
    /// Returns the picked hash if a request was answered.
    pub fn resolve<B: RenderBackend>(&mut self, backend: &mut B) -> Option<u64> {
        let answered = self.requested.take().map(|(x, y)| {
            match backend.raytraced_instance_at(x, y) {
                // A hit on an instance that recorded nothing keeps the old pick.
                Some(instance) => {
                    if let Some(&hash) = self.instance_hashes.get(&instance) {
                        self.picked_hash = hash;
                    }
                }
                None => self.picked_hash = 0,
            }
            self.picked_hash
        });
        self.instance_hashes.clear();
        answered
    }

    /// Picked texture hash, 0 for none.
    #[inline]
    #[must_use]
    pub const fn picked(&self) -> u64 {
        self.picked_hash
    }

    /// Returns true if highlighting is on.
    #[inline]
    #[must_use]
    pub const fn highlight(&self) -> bool {
        self.highlight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::HeadlessBackend;

    #[test]
    fn test_pick_hit_and_miss() {
        let mut backend = HeadlessBackend::new();
        let instance = backend.create_instance();
        let mut picker = TexturePicker::new();

        picker.record(instance, 77);
        picker.request(10, 20);
        backend.set_pick_result(Some(instance));
        assert_eq!(picker.resolve(&mut backend), Some(77));
        assert_eq!(backend.last_pick_query(), Some((10, 20)));
        assert_eq!(picker.picked(), 77);

        picker.request(0, 0);
        backend.set_pick_result(None);
        assert_eq!(picker.resolve(&mut backend), Some(0));
        assert_eq!(picker.picked(), 0);
    }

    #[test]
    fn test_no_request_keeps_pick() {
        let mut backend = HeadlessBackend::new();
        let instance = backend.create_instance();
        let mut picker = TexturePicker::new();
        picker.record(instance, 5);
        picker.request(1, 1);
        backend.set_pick_result(Some(instance));
        picker.resolve(&mut backend);

        assert_eq!(picker.resolve(&mut backend), None);
        assert_eq!(picker.picked(), 5);
    }

    #[test]
    fn test_unrecorded_hit_keeps_pick() {
        let mut backend = HeadlessBackend::new();
        let known = backend.create_instance();
        let unknown = backend.create_instance();
        let mut picker = TexturePicker::new();
        picker.record(known, 9);
        picker.request(1, 1);
        backend.set_pick_result(Some(known));
        picker.resolve(&mut backend);

        picker.request(2, 2);
        backend.set_pick_result(Some(unknown));
        assert_eq!(picker.resolve(&mut backend), Some(9));
    }

    #[test]
    fn test_highlight_requires_toggle() {
        let mut backend = HeadlessBackend::new();
        let instance = backend.create_instance();
        let mut picker = TexturePicker::new();
        picker.record(instance, 5);
        picker.request(1, 1);
        backend.set_pick_result(Some(instance));
        picker.resolve(&mut backend);

        assert!(!picker.should_highlight(5));
        picker.set_highlight(true);
        assert!(picker.should_highlight(5));
        assert!(!picker.should_highlight(6));
    }
}
