//! evfilter-core: Core types for streaming event classification.
//!
//! This crate provides the record model shared by the trigger scanner and the
//! pair engine: cluster and particle records keyed by collision, trigger flags
//! and decisions, four-vector kinematics, mass hypotheses and configuration.
//!

pub mod config;
pub mod error;
pub mod kinematics;
pub mod mass;
pub mod pair;
pub mod record;
pub mod trigger;

pub use config::{
    KinematicCuts, PairConfig, PartitionSelection, ShapeCuts, TriggerConfig, VertexCut,
};
pub use error::{ConfigError, DataError, Error, Result};
pub use kinematics::{FourMomentum, LorentzVector};
pub use mass::{MassLookup, MassTable};
pub use pair::{PairCombinationPolicy, PairMetric, PairMetricValue};
pub use record::{ClusterRecord, GroupKey, ParticleRecord, Record};
pub use trigger::{TriggerDecision, TriggerFlags, TriggerKind};
