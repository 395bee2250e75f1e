//! Explicit registry of classified effect types.
//!
//! A host binding creates one [`Registry`] at startup, registers every effect
//! type it exposes, and drops (or [`shutdown`](Registry::shutdown)s) it when
//! unloading. Layouts are classified once per type and shared by every
//! instance.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register::<Gain>()?;
//!
//! let mut processor = registry.instantiate(Gain::default())?;
//! processor.configure(512, 48000.0);
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::classify::{classify, EffectLayout};
use crate::effect::Effect;
use crate::error::{ClassifyResult, RegistryError};
use crate::processor::Processor;

#[derive(Debug)]
struct Entry {
    name: &'static str,
    layout: Arc<EffectLayout>,
}

/// Classified layouts keyed by effect type.
#[derive(Debug, Default)]
pub struct Registry {
    entries: HashMap<TypeId, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `E` and cache its layout.
    ///
    /// Registering a type twice returns the cached layout. A type that fails
    /// classification is not cached.
    pub fn register<E: Effect>(&mut self) -> ClassifyResult<Arc<EffectLayout>> {
        if let Some(entry) = self.entries.get(&TypeId::of::<E>()) {
            return Ok(Arc::clone(&entry.layout));
        }
        let layout = match classify::<E>() {
            Ok(layout) => Arc::new(layout),
            Err(err) => {
                log::error!("Cannot register `{}`: {}", E::NAME, err);
                return Err(err);
            }
        };
        log::info!("Registered `{}` as {}", E::NAME, layout.variant);
        self.entries.insert(
            TypeId::of::<E>(),
            Entry {
                name: E::NAME,
                layout: Arc::clone(&layout),
            },
        );
        Ok(layout)
    }

    /// Cached layout of `E`, if registered.
    pub fn layout<E: Effect>(&self) -> Option<Arc<EffectLayout>> {
        self.entries
            .get(&TypeId::of::<E>())
            .map(|entry| Arc::clone(&entry.layout))
    }

    /// Whether `E` has been registered.
    pub fn contains<E: Effect>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<E>())
    }

    /// Wrap `effect` in a processor sharing the registered layout.
    pub fn instantiate<E: Effect>(&self, effect: E) -> Result<Processor<E>, RegistryError> {
        let layout = self
            .layout::<E>()
            .ok_or(RegistryError::NotRegistered { effect: E::NAME })?;
        Ok(Processor::with_layout(effect, layout))
    }

    /// Names of the registered effects, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.values().map(|entry| entry.name).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every cached layout.
    ///
    /// Processors already created keep their layout alive. The registry can
    /// be used again afterwards.
    pub fn shutdown(&mut self) {
        if !self.entries.is_empty() {
            log::debug!("Registry shutdown: dropping {} layouts", self.entries.len());
        }
        self.entries.clear();
    }
}
