//! Channel negotiation.
//!
//! A [`ChannelPlan`] holds the accepted channel count of every bus of one
//! effect instance. Hosts propose counts bus by bus; each proposal is checked
//! against the bus's [`Arity`] and either applied in full or rejected with no
//! change.
//!
//! | Arity          | Accepts                                   |
//! |----------------|-------------------------------------------|
//! | `Fixed(n)`     | exactly `n`                               |
//! | `Dynamic`      | any count                                 |
//! | `Mirrors(bus)` | only the current count of that input bus  |
//!
//! Accepting a new input count immediately updates every output mirroring
//! that input.

use std::fmt;
use std::sync::Arc;

use crate::classify::{Arity, EffectLayout};

/// Input or output side of an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Negotiation state of a single bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusState {
    /// No count accepted yet; the arity's default applies.
    #[default]
    Unconfigured,
    /// First accepted count.
    Configured(usize),
    /// A later accepted count.
    Reconfigured(usize),
}

impl BusState {
    /// Accepted count, if any.
    #[inline]
    pub fn count(self) -> Option<usize> {
        match self {
            BusState::Unconfigured => None,
            BusState::Configured(n) | BusState::Reconfigured(n) => Some(n),
        }
    }

    #[inline]
    fn advance(self, count: usize) -> Self {
        match self {
            BusState::Unconfigured => BusState::Configured(count),
            BusState::Configured(_) | BusState::Reconfigured(_) => BusState::Reconfigured(count),
        }
    }
}

/// Per-bus channel counts of one effect instance.
#[derive(Debug, Clone)]
pub struct ChannelPlan {
    layout: Arc<EffectLayout>,
    inputs: Vec<BusState>,
    outputs: Vec<BusState>,
    epoch: u64,
}

impl ChannelPlan {
    /// Fresh plan with every bus unconfigured.
    ///
    /// Fixed buses report their fixed count, dynamic buses report 0, and
    /// mirrors report their input's count.
    pub fn new(layout: Arc<EffectLayout>) -> Self {
        let inputs = vec![BusState::Unconfigured; layout.inputs.len()];
        let outputs = vec![BusState::Unconfigured; layout.outputs.len()];
        Self {
            layout,
            inputs,
            outputs,
            epoch: 0,
        }
    }

    /// The classified layout this plan negotiates for.
    #[inline]
    pub fn layout(&self) -> &Arc<EffectLayout> {
        &self.layout
    }

    /// Counter bumped on every accepted change.
    #[inline]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    #[inline]
    pub fn input_bus_count(&self) -> usize {
        self.inputs.len()
    }

    #[inline]
    pub fn output_bus_count(&self) -> usize {
        self.outputs.len()
    }

    #[inline]
    pub fn input_state(&self, bus: usize) -> Option<BusState> {
        self.inputs.get(bus).copied()
    }

    #[inline]
    pub fn output_state(&self, bus: usize) -> Option<BusState> {
        self.outputs.get(bus).copied()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Channel count of an input bus; 0 if the bus doesn't exist.
    pub fn input_channels(&self, bus: usize) -> usize {
        let (Some(state), Some(desc)) = (self.inputs.get(bus), self.layout.input_bus(bus)) else {
            return 0;
        };
        state.count().unwrap_or_else(|| self.default_count(desc.arity))
    }

    /// Channel count of an output bus; 0 if the bus doesn't exist.
    pub fn output_channels(&self, bus: usize) -> usize {
        let (Some(state), Some(desc)) = (self.outputs.get(bus), self.layout.output_bus(bus)) else {
            return 0;
        };
        state.count().unwrap_or_else(|| self.default_count(desc.arity))
    }

    fn default_count(&self, arity: Arity) -> usize {
        match arity {
            Arity::Fixed(n) => n,
            Arity::Dynamic => 0,
            Arity::Mirrors(source) => self.input_channels(source),
        }
    }

    /// Channel counts of every input bus, in bus order.
    pub fn input_counts(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.inputs.len()).map(move |bus| self.input_channels(bus))
    }

    /// Channel counts of every output bus, in bus order.
    pub fn output_counts(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.outputs.len()).map(move |bus| self.output_channels(bus))
    }

    /// Sum of all input bus channel counts.
    pub fn total_input_channels(&self) -> usize {
        self.input_counts().sum()
    }

    /// Sum of all output bus channel counts.
    pub fn total_output_channels(&self) -> usize {
        self.output_counts().sum()
    }

    /// Total for one direction.
    pub fn total_channels(&self, direction: Direction) -> usize {
        match direction {
            Direction::Input => self.total_input_channels(),
            Direction::Output => self.total_output_channels(),
        }
    }

    /// Whether input bus 0 and output bus 0 would accept `inputs` and
    /// `outputs` channels proposed together.
    ///
    /// An output mirroring input bus 0 is checked against `inputs`, not the
    /// current count. A direction without buses admits only 0. Nothing is
    /// changed.
    pub fn admits_main(&self, inputs: usize, outputs: usize) -> bool {
        let inputs_ok = match self.layout.input_bus(0) {
            None => inputs == 0,
            Some(desc) => match desc.arity {
                Arity::Fixed(n) => inputs == n,
                Arity::Dynamic => true,
                Arity::Mirrors(_) => false,
            },
        };
        let outputs_ok = match self.layout.output_bus(0) {
            None => outputs == 0,
            Some(desc) => match desc.arity {
                Arity::Fixed(n) => outputs == n,
                Arity::Dynamic => true,
                Arity::Mirrors(0) => outputs == inputs,
                Arity::Mirrors(source) => outputs == self.input_channels(source),
            },
        };
        inputs_ok && outputs_ok
    }

    // =========================================================================
    // Negotiation
    // =========================================================================

    /// Propose a channel count for an input bus.
    ///
    /// Returns whether it was accepted. Rejection leaves the plan unchanged.
    pub fn set_input_channels(&mut self, bus: usize, requested: usize) -> bool {
        let Some(desc) = self.layout.input_bus(bus) else {
            log::warn!("`{}`: no input bus {}", self.layout.name, bus);
            return false;
        };
        let accepted = match desc.arity {
            Arity::Fixed(n) => requested == n,
            Arity::Dynamic => true,
            Arity::Mirrors(_) => false,
        };
        if !accepted {
            log::warn!(
                "`{}`: input bus {} ({}) rejects {} channels",
                self.layout.name,
                bus,
                desc.name,
                requested
            );
            return false;
        }

        self.inputs[bus] = self.inputs[bus].advance(requested);
        for (out, desc) in self.layout.outputs.iter().enumerate() {
            if desc.arity == Arity::Mirrors(bus) {
                self.outputs[out] = self.outputs[out].advance(requested);
            }
        }
        self.epoch += 1;
        log::debug!(
            "`{}`: input bus {} -> {} channels (epoch {})",
            self.layout.name,
            bus,
            requested,
            self.epoch
        );
        true
    }

    /// Propose a channel count for an output bus.
    ///
    /// Mirroring outputs accept only their input's current count.
    pub fn set_output_channels(&mut self, bus: usize, requested: usize) -> bool {
        let Some(desc) = self.layout.output_bus(bus) else {
            log::warn!("`{}`: no output bus {}", self.layout.name, bus);
            return false;
        };
        let accepted = match desc.arity {
            Arity::Fixed(n) => requested == n,
            Arity::Dynamic => true,
            Arity::Mirrors(source) => requested == self.input_channels(source),
        };
        if !accepted {
            log::warn!(
                "`{}`: output bus {} ({}) rejects {} channels",
                self.layout.name,
                bus,
                desc.name,
                requested
            );
            return false;
        }

        self.outputs[bus] = self.outputs[bus].advance(requested);
        self.epoch += 1;
        log::debug!(
            "`{}`: output bus {} -> {} channels (epoch {})",
            self.layout.name,
            bus,
            requested,
            self.epoch
        );
        true
    }
}
