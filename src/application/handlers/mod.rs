//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

mod get_design_context;
mod process_utterance;
mod request_edit;
mod start_design;

pub use get_design_context::{GetDesignContextHandler, GetDesignContextQuery};
pub use process_utterance::{
    ProcessUtteranceCommand, ProcessUtteranceError, ProcessUtteranceHandler,
};
pub use request_edit::{RequestEditCommand, RequestEditError, RequestEditHandler};
pub use start_design::{StartDesignCommand, StartDesignHandler, StartDesignResult};
