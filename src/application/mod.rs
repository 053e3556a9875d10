//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Turns that change a project (start, utterance, edit) are commands; the
//! design context is a query.

pub mod engine;
pub mod handlers;
pub mod presentation;
pub mod session;

pub use engine::{DesignFlowEngine, EngineBuildError};
pub use handlers::{
    GetDesignContextHandler, GetDesignContextQuery, ProcessUtteranceCommand,
    ProcessUtteranceError, ProcessUtteranceHandler, RequestEditCommand, RequestEditError,
    RequestEditHandler, StartDesignCommand, StartDesignHandler, StartDesignResult,
};
pub use presentation::{EngineWarning, TurnRecord};
pub use session::{Session, SessionError, SessionRegistry, SessionSlot, Ticket};
