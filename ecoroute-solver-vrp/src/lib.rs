//! Multi-stop sequencing for the eco-route engine.
//!
//! This crate provides [`VrpSequencer`], the default implementation of the
//! [`Sequencer`](ecoroute_core::Sequencer) trait. Each run is modelled as a
//! capacitated vehicle routing problem with time windows and solved with the
//! `vrp-core` metaheuristics. Arc costs are the engine's integer eco-cost,
//! priced per vehicle, and routes are open: a vehicle's tour ends at its last
//! delivery, so no return leg is ever charged.

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod sequencer;
mod vrp;

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-support")))]
pub mod test_support;

pub use sequencer::{VrpSequencer, VrpSequencerConfig};
