//! Ordered, owning element registry.
//!
//! Slots are recycled through a free list with a generation bump, so removal
//! is O(1) and identity-checked. Draw order is insertion order; removed
//! entries are skipped during iteration and compacted away lazily.

mod id;

pub use id::ElementId;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct Scene<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    /// Insertion order; may contain ids of removed entries until compaction.
    order: Vec<ElementId>,
    dead_in_order: usize,
    live: usize,
}

impl<T> Default for Scene<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scene<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            order: Vec::new(),
            dead_in_order: 0,
            live: 0,
        }
    }

    /// Appends `value` at the end of the draw order.
    pub fn insert(&mut self, value: T) -> ElementId {
        let id = if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            ElementId { index, generation: slot.generation }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot { generation: 0, value: Some(value) });
            ElementId { index, generation: 0 }
        };
        self.order.push(id);
        self.live += 1;
        id
    }

    /// Removes and returns the entry. A stale or already-removed id is a no-op.
    pub fn remove(&mut self, id: ElementId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;

        // Bump generation so old handles immediately fail validation.
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.live -= 1;
        self.dead_in_order += 1;
        if self.dead_in_order > self.order.len() / 2 {
            self.compact();
        }
        Some(value)
    }

    #[must_use]
    pub fn contains(&self, id: ElementId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: ElementId) -> Option<&T> {
        let slot = self.slots.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_ref()
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live ids in draw order.
    pub fn ids(&self) -> Vec<ElementId> {
        self.iter().map(|(id, _)| id).collect()
    }

    /// Live entries in draw order.
    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &T)> + '_ {
        self.order
            .iter()
            .filter_map(move |&id| self.get(id).map(|v| (id, v)))
    }

    /// Removes every entry, yielding them in draw order.
    pub fn drain(&mut self) -> Vec<T> {
        let ids = self.ids();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    fn compact(&mut self) {
        let slots = &self.slots;
        self.order.retain(|id| {
            slots
                .get(id.index as usize)
                .is_some_and(|s| s.generation == id.generation && s.value.is_some())
        });
        self.dead_in_order = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insertion_order_is_draw_order() {
        let mut scene = Scene::new();
        let a = scene.insert("a");
        let b = scene.insert("b");
        let c = scene.insert("c");
        assert_eq!(scene.ids(), vec![a, b, c]);
        assert_eq!(scene.len(), 3);
    }

    #[test]
    fn removal_is_identity_checked_and_idempotent() {
        let mut scene = Scene::new();
        let a = scene.insert("a");
        let b = scene.insert("b");
        let c = scene.insert("c");

        assert_eq!(scene.remove(a), Some("a"));
        assert_eq!(scene.remove(a), None);
        let order: Vec<_> = scene.iter().map(|(_, v)| *v).collect();
        assert_eq!(order, vec!["b", "c"]);
        assert!(scene.contains(b) && scene.contains(c));
    }

    #[test]
    fn reused_slot_does_not_resurrect_old_handle() {
        let mut scene = Scene::new();
        let a = scene.insert(1);
        scene.remove(a);
        let d = scene.insert(4);

        assert_eq!(d.index(), a.index());
        assert_ne!(d.generation(), a.generation());
        assert_eq!(scene.get(a), None);
        assert_eq!(scene.remove(a), None);
        assert_eq!(scene.get(d), Some(&4));
    }

    #[test]
    fn reinserted_slot_goes_to_the_end() {
        let mut scene = Scene::new();
        let a = scene.insert('a');
        let b = scene.insert('b');
        scene.remove(a);
        let c = scene.insert('c');
        assert_eq!(scene.ids(), vec![b, c]);
    }

    #[test]
    fn compaction_keeps_order() {
        let mut scene = Scene::new();
        let ids: Vec<_> = (0..10).map(|i| scene.insert(i)).collect();
        for id in ids.iter().step_by(2) {
            scene.remove(*id);
        }
        scene.remove(ids[1]);
        let left: Vec<_> = scene.iter().map(|(_, v)| *v).collect();
        assert_eq!(left, vec![3, 5, 7, 9]);
        assert_eq!(scene.len(), 4);
    }

    #[test]
    fn drain_empties_in_order() {
        let mut scene = Scene::new();
        scene.insert("x");
        scene.insert("y");
        assert_eq!(scene.drain(), vec!["x", "y"]);
        assert!(scene.is_empty());
    }
}
