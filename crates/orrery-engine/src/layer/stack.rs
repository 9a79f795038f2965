use super::contract::LayerHandle;

/// Ordered layers with overlays kept above every regular layer.
///
/// Update traversal walks `iter()` front to back; event dispatch walks it
/// back to front.
#[derive(Debug, Default)]
pub struct LayerStack {
    layers: Vec<LayerHandle>,
    /// Index of the first overlay.
    insert_index: usize,
}

impl LayerStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts below every overlay, above every previously pushed layer.
    pub fn push_layer(&mut self, layer: LayerHandle) {
        self.layers.insert(self.insert_index, layer);
        self.insert_index += 1;
    }

    pub fn push_overlay(&mut self, overlay: LayerHandle) {
        self.layers.push(overlay);
    }

    /// Removes `layer` from the regular section. Returns whether it was there.
    pub fn pop_layer(&mut self, layer: &LayerHandle) -> bool {
        match self.layers[..self.insert_index]
            .iter()
            .position(|l| l.ptr_eq(layer))
        {
            Some(i) => {
                self.layers.remove(i);
                self.insert_index -= 1;
                true
            }
            None => false,
        }
    }

    /// Removes `overlay` from the overlay section. Returns whether it was there.
    pub fn pop_overlay(&mut self, overlay: &LayerHandle) -> bool {
        match self.layers[self.insert_index..]
            .iter()
            .position(|l| l.ptr_eq(overlay))
        {
            Some(i) => {
                self.layers.remove(self.insert_index + i);
                true
            }
            None => false,
        }
    }

    /// Front to back: regular layers in push order, then overlays.
    pub fn iter(&self) -> std::slice::Iter<'_, LayerHandle> {
        self.layers.iter()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Empties the stack, returning the layers front to back.
    pub fn drain(&mut self) -> Vec<LayerHandle> {
        self.insert_index = 0;
        std::mem::take(&mut self.layers)
    }
}

impl<'a> IntoIterator for &'a LayerStack {
    type Item = &'a LayerHandle;
    type IntoIter = std::slice::Iter<'a, LayerHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;

    struct Named(&'static str);

    impl Layer for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    fn names(stack: &LayerStack) -> Vec<String> {
        stack.iter().map(|l| l.name()).collect()
    }

    #[test]
    fn overlays_stay_on_top() {
        let mut stack = LayerStack::new();
        stack.push_layer(Named("L1").into());
        stack.push_overlay(Named("O1").into());
        stack.push_layer(Named("L2").into());
        assert_eq!(names(&stack), ["L1", "L2", "O1"]);

        let reversed: Vec<String> = stack.iter().rev().map(|l| l.name()).collect();
        assert_eq!(reversed, ["O1", "L2", "L1"]);
    }

    #[test]
    fn pop_by_identity() {
        let mut stack = LayerStack::new();
        let a = LayerHandle::from(Named("same"));
        let b = LayerHandle::from(Named("same"));
        stack.push_layer(a.clone());
        stack.push_layer(b.clone());

        assert!(stack.pop_layer(&b));
        assert!(!stack.pop_layer(&b));
        assert_eq!(stack.len(), 1);
        assert!(stack.iter().next().is_some_and(|l| l.ptr_eq(&a)));
    }

    #[test]
    fn popping_a_layer_moves_the_boundary() {
        let mut stack = LayerStack::new();
        let l1 = LayerHandle::from(Named("L1"));
        let o1 = LayerHandle::from(Named("O1"));
        stack.push_layer(l1.clone());
        stack.push_overlay(o1.clone());

        assert!(stack.pop_layer(&l1));
        stack.push_layer(Named("L2").into());
        assert_eq!(names(&stack), ["L2", "O1"]);
    }

    #[test]
    fn overlays_and_layers_pop_from_their_own_section() {
        let mut stack = LayerStack::new();
        let l1 = LayerHandle::from(Named("L1"));
        let o1 = LayerHandle::from(Named("O1"));
        stack.push_layer(l1.clone());
        stack.push_overlay(o1.clone());

        assert!(!stack.pop_overlay(&l1));
        assert!(!stack.pop_layer(&o1));
        assert!(stack.pop_overlay(&o1));
        assert_eq!(names(&stack), ["L1"]);
    }
}
