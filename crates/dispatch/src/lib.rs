//! Reachability resolution, eligibility, fan-out dispatch, reporting, and sinks.

pub mod dispatcher;
pub mod eligibility;
pub mod pipeline;
pub mod reporter;
pub mod resolver;
pub mod sink;

pub use dispatcher::Dispatcher;
pub use pipeline::trigger;
pub use reporter::Report;
pub use resolver::DirectoryIndex;
