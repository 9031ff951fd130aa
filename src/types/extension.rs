//! Nested models keyed by namespace
//!
//! An [`Extensions`] field holds models of other schemas inside a record,
//! for example vendor-specific blocks below a common container property.

use crate::model::Model;
use std::fmt;

/// Ordered collection of nested models, at most one per primary namespace
#[derive(Default)]
pub struct Extensions {
    models: Vec<Box<dyn Model>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model that handles a prefix or URI
    pub fn get(&self, name: &str) -> Option<&dyn Model> {
        self.models.iter().find(|m| m.can(name)).map(|m| m.as_ref())
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut (dyn Model + 'static)> {
        self.models.iter_mut().find(|m| m.can(name)).map(|m| m.as_mut())
    }

    /// Typed access by model type
    pub fn find<T: Model>(&self) -> Option<&T> {
        self.models.iter().find_map(|m| m.as_any().downcast_ref::<T>())
    }

    /// Insert a model, replacing one with the same primary namespace
    pub fn insert(&mut self, model: Box<dyn Model>) {
        let primary = model
            .namespaces()
            .first()
            .map(|ns| ns.uri().to_string())
            .unwrap_or_default();
        match self.models.iter().position(|m| m.can(&primary)) {
            Some(pos) => self.models[pos] = model,
            None => self.models.push(model),
        }
    }

    /// Remove the model handling `name`
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Model>> {
        let pos = self.models.iter().position(|m| m.can(name))?;
        Some(self.models.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Model> {
        self.models.iter().map(|m| m.as_ref())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.models.iter().map(|m| m.type_name()))
            .finish()
    }
}
