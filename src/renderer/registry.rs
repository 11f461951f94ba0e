use std::rc::Rc;

use crate::error::{LightingError, Result};
use crate::renderer::light::SharedLight;

/// Insertion-ordered set of lights drawn by the engine.
///
/// The same handle may be added more than once; it is then drawn once per
/// registration and `remove` drops the first registration only.
#[derive(Default)]
pub struct LightRegistry {
    lights: Vec<SharedLight>,
}

impl LightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, light: SharedLight) {
        self.lights.push(light);
        log::debug!("light added, {} registered", self.lights.len());
    }

    /// Removes the first registration of `light`. Returns whether anything was
    /// removed; an unknown light is not an error.
    pub fn remove(&mut self, light: &SharedLight) -> bool {
        match self.lights.iter().position(|l| Rc::ptr_eq(l, light)) {
            Some(index) => {
                self.lights.remove(index);
                log::debug!("light removed, {} registered", self.lights.len());
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }

    pub fn get(&self, index: usize) -> Result<&SharedLight> {
        self.lights.get(index).ok_or(LightingError::LightIndexOutOfBounds {
            index,
            count: self.lights.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SharedLight> {
        self.lights.iter()
    }
}

impl<'a> IntoIterator for &'a LightRegistry {
    type Item = &'a SharedLight;
    type IntoIter = std::slice::Iter<'a, SharedLight>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::light::Light;

    fn lights(n: usize) -> Vec<SharedLight> {
        (0..n).map(|i| Light::point().with_power(i as f32).shared()).collect()
    }

    #[test]
    fn test_insertion_order() {
        let mut registry = LightRegistry::new();
        let handles = lights(4);
        for light in &handles {
            registry.add(light.clone());
        }
        assert_eq!(registry.len(), 4);
        for (i, light) in handles.iter().enumerate() {
            assert!(Rc::ptr_eq(registry.get(i).unwrap(), light));
        }
    }

    #[test]
    fn test_remove_keeps_order_of_remaining() {
        let mut registry = LightRegistry::new();
        let handles = lights(4);
        for light in &handles {
            registry.add(light.clone());
        }
        assert!(registry.remove(&handles[1]));
        assert_eq!(registry.len(), 3);
        assert!(Rc::ptr_eq(registry.get(0).unwrap(), &handles[0]));
        assert!(Rc::ptr_eq(registry.get(1).unwrap(), &handles[2]));
        assert!(Rc::ptr_eq(registry.get(2).unwrap(), &handles[3]));
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut registry = LightRegistry::new();
        let handles = lights(2);
        registry.add(handles[0].clone());
        assert!(!registry.remove(&handles[1]));
        assert_eq!(registry.len(), 1);

        // Identity, not equality: an identical light is still a different light.
        let twin = Light::point().with_power(0.0).shared();
        assert_eq!(*twin.borrow(), *handles[0].borrow());
        assert!(!registry.remove(&twin));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_add_then_remove_same_handle() {
        let mut registry = LightRegistry::new();
        let light = Light::point().shared();
        registry.add(light.clone());
        registry.remove(&light);
        assert_eq!(registry.len(), 0);
        assert!(registry.is_empty());
        // The host still owns a usable light.
        light.borrow_mut().power = 2.0;
        assert_eq!(light.borrow().power, 2.0);
    }

    #[test]
    fn test_duplicates_are_counted_and_removed_one_at_a_time() {
        let mut registry = LightRegistry::new();
        let light = Light::point().shared();
        registry.add(light.clone());
        registry.add(light.clone());
        assert_eq!(registry.len(), 2);
        registry.remove(&light);
        assert_eq!(registry.len(), 1);
        registry.remove(&light);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut registry = LightRegistry::new();
        assert!(matches!(
            registry.get(0),
            Err(LightingError::LightIndexOutOfBounds { index: 0, count: 0 })
        ));
        for light in lights(3) {
            registry.add(light);
        }
        assert!(registry.get(2).is_ok());
        assert!(matches!(
            registry.get(3),
            Err(LightingError::LightIndexOutOfBounds { index: 3, count: 3 })
        ));
        assert!(registry.get(usize::MAX).is_err());
    }

    #[test]
    fn test_clear() {
        let mut registry = LightRegistry::new();
        for light in lights(5) {
            registry.add(light);
        }
        registry.clear();
        assert_eq!(registry.len(), 0);
        assert!(registry.get(0).is_err());
    }
}
