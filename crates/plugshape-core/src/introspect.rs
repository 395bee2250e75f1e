//! Field introspection for effect input/output records.
//!
//! `#[derive(Ports)]` turns a struct into a [`Record`]: a static
//! [`RecordDescriptor`] listing every field in declaration order, plus
//! mutable access to the audio port fields by position.
//!
//! Callers select subsets of fields with [`RecordDescriptor::filter`], which
//! precomputes both directions of the filtered ↔ unfiltered index mapping so
//! either lookup is O(1).
//!
//! ```ignore
//! #[derive(Default, Ports)]
//! struct Inputs {
//!     gain: f32,                  // field 0, not audio
//!     #[port(channels = 2)]
//!     main: BusPort<f32>,         // field 1, audio port 0
//!     sidechain: BusPort<f32>,    // field 2, audio port 1
//! }
//!
//! let ports = Inputs::DESCRIPTOR.audio_ports();
//! assert_eq!(ports.nth_unfiltered(1), 2);
//! assert_eq!(ports.filtered_index(0), None);
//! ```

use crate::port::{AudioPortType, PortMut};

/// What a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// An audio port; see [`crate::port`].
    Audio(AudioPortType),
    /// Anything else (controls, state). Carries the type as written.
    Value(&'static str),
}

/// One field of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name as declared.
    pub name: &'static str,
    /// Declaration position (unfiltered index).
    pub index: usize,
    pub kind: FieldKind,
    /// Fixed channel count from `#[port(channels = N)]`.
    pub channels: Option<usize>,
    /// Input field named by `#[port(mirror = "...")]`.
    pub mirror: Option<&'static str>,
}

impl FieldInfo {
    /// Port type if this field is an audio port.
    #[inline]
    pub fn audio(&self) -> Option<AudioPortType> {
        match self.kind {
            FieldKind::Audio(ty) => Some(ty),
            FieldKind::Value(_) => None,
        }
    }

    #[inline]
    pub fn is_audio(&self) -> bool {
        self.audio().is_some()
    }
}

/// Ordered description of a record's fields. Immutable and `'static`.
#[derive(Debug, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub name: &'static str,
    pub fields: &'static [FieldInfo],
}

impl RecordDescriptor {
    /// Descriptor of a record with no fields.
    pub const EMPTY: RecordDescriptor = RecordDescriptor {
        name: "()",
        fields: &[],
    };

    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every field as `(name, unfiltered index)`, in declaration order.
    pub fn enumerate(&self) -> impl Iterator<Item = (&'static str, usize)> + '_ {
        self.fields.iter().map(|f| (f.name, f.index))
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Restrict to fields matching `predicate`, keeping declaration order.
    pub fn filter<P>(&self, predicate: P) -> FieldIndex
    where
        P: Fn(&FieldInfo) -> bool,
    {
        let mut to_unfiltered = Vec::new();
        let mut to_filtered = vec![None; self.fields.len()];
        for (position, field) in self.fields.iter().enumerate() {
            if predicate(field) {
                to_filtered[position] = Some(to_unfiltered.len());
                to_unfiltered.push(position);
            }
        }
        FieldIndex {
            fields: self.fields,
            to_unfiltered,
            to_filtered,
        }
    }

    /// Shorthand for filtering to audio port fields.
    pub fn audio_ports(&self) -> FieldIndex {
        self.filter(FieldInfo::is_audio)
    }
}

/// Filtered view of a record with precomputed index tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIndex {
    fields: &'static [FieldInfo],
    to_unfiltered: Vec<usize>,
    to_filtered: Vec<Option<usize>>,
}

impl FieldIndex {
    /// Number of matching fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.to_unfiltered.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.to_unfiltered.is_empty()
    }

    /// Unfiltered index of the `filtered`-th match.
    ///
    /// # Panics
    ///
    /// Panics if `filtered >= self.len()`. Indices derived from this same
    /// view never trip this.
    #[inline]
    pub fn nth_unfiltered(&self, filtered: usize) -> usize {
        match self.to_unfiltered.get(filtered) {
            Some(&index) => index,
            None => panic!(
                "filtered field index {filtered} out of range ({} matches)",
                self.to_unfiltered.len()
            ),
        }
    }

    /// Filtered index of a field, or `None` if it doesn't match.
    #[inline]
    pub fn filtered_index(&self, unfiltered: usize) -> Option<usize> {
        self.to_filtered.get(unfiltered).copied().flatten()
    }

    /// The `filtered`-th matching field.
    ///
    /// # Panics
    ///
    /// Same as [`nth_unfiltered`](Self::nth_unfiltered).
    #[inline]
    pub fn nth(&self, filtered: usize) -> &'static FieldInfo {
        &self.fields[self.nth_unfiltered(filtered)]
    }

    /// Matches as `(name, unfiltered index, filtered index)`.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, usize, usize)> + '_ {
        let fields = self.fields;
        self.to_unfiltered
            .iter()
            .enumerate()
            .map(move |(filtered, &unfiltered)| (fields[unfiltered].name, unfiltered, filtered))
    }

    /// Run `f` on the port backing the `filtered`-th match of `record`.
    ///
    /// Returns `None` if that field isn't an audio port.
    pub fn for_nth<R, T, F>(&self, record: &mut R, filtered: usize, f: F) -> Option<T>
    where
        R: Record,
        F: FnOnce(PortMut<'_>) -> T,
    {
        record.port_mut(self.nth_unfiltered(filtered)).map(f)
    }
}

/// A struct whose fields can be enumerated and whose audio ports can be
/// reached by position. Usually derived with `#[derive(Ports)]`.
pub trait Record {
    /// Field descriptions in declaration order.
    const DESCRIPTOR: &'static RecordDescriptor;

    /// The audio port at unfiltered field position `index`, if that field is
    /// one.
    fn port_mut(&mut self, index: usize) -> Option<PortMut<'_>>;
}

impl Record for () {
    const DESCRIPTOR: &'static RecordDescriptor = &RecordDescriptor::EMPTY;

    fn port_mut(&mut self, _index: usize) -> Option<PortMut<'_>> {
        None
    }
}
