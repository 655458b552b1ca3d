pub mod adapters;
pub mod error;
pub mod events;
pub mod memory;
pub mod orchestrator;
pub mod outcome;
pub mod records;
pub mod stages;
pub mod types;

pub use adapters::{CitationFormatter, ClaimVerifier, PaperSource, ReportPackage, ReportWriter};
pub use events::{RunLog, StageEvent};
pub use memory::MemorySnapshot;
pub use orchestrator::{Collaborators, ResearchWorkflow, WorkflowOptions, WorkflowRun};
pub use outcome::RunSummary;
pub use records::*;
