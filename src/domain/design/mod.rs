//! Design module - The project being designed and its flow position.
//!
//! A project moves through three working stages (Ideation, Journey,
//! Deliverables) and ends in Complete. Each stage owns three steps, and
//! every step captures one slot of [`StructuredData`].

mod data;
mod outcome;
mod project;
mod stage;
mod step;
mod turn;

pub use data::{
    split_items, DeliverablesData, IdeationData, JourneyData, Milestone, Phase, SlotError,
    StructuredData, WriteMode,
};
pub use outcome::{Mutation, SlotValue, StrategyKind, StrategyOutcome};
pub use project::{ApplyResult, DesignContext, Project, RefinementOffer, TransitionError};
pub use stage::Stage;
pub use step::StepId;
pub use turn::{ConversationTurn, TurnRole, TurnWindow};
