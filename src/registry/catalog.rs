//! Generic keyed catalog shared by the tool, resource, template and prompt
//! registries.

use crate::error::{Category, RegistryError, RegistryResult};
use crate::protocol::{Prompt, Resource, ResourceTemplate, Tool};
use std::collections::HashMap;
use std::sync::Arc;

/// Descriptor types that carry their own registry key.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Tool {
    fn key(&self) -> &str {
        &self.name
    }
}

impl Keyed for Resource {
    fn key(&self) -> &str {
        &self.uri
    }
}

impl Keyed for ResourceTemplate {
    fn key(&self) -> &str {
        &self.uri_template
    }
}

impl Keyed for Prompt {
    fn key(&self) -> &str {
        &self.name
    }
}

/// A descriptor together with the handler bound to it.
pub struct Binding<D, H: ?Sized> {
    pub descriptor: D,
    pub handler: Arc<H>,
}

/// Insertion-ordered map from key to binding.
///
/// Keys are unique; listing order is registration order so repeated listings
/// are identical.
pub struct Catalog<D, H: ?Sized> {
    category: Category,
    entries: Vec<Binding<D, H>>,
    index: HashMap<String, usize>,
}

impl<D: Keyed, H: ?Sized> Catalog<D, H> {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn insert(&mut self, descriptor: D, handler: Arc<H>) -> RegistryResult<()> {
        let key = descriptor.key().to_string();
        if self.index.contains_key(&key) {
            return Err(RegistryError::DuplicateKey {
                category: self.category,
                key,
            });
        }

        self.index.insert(key, self.entries.len());
        self.entries.push(Binding {
            descriptor,
            handler,
        });
        Ok(())
    }

    pub fn get(&self, key: &str) -> RegistryResult<&Binding<D, H>> {
        self.index
            .get(key)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| RegistryError::NotFound {
                category: self.category,
                key: key.to_string(),
            })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &D> {
        self.entries.iter().map(|b| &b.descriptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
