//! Persistence: candidate workspace, score history, accepted store.

pub mod accepted;
pub mod error;
pub mod fakes;
pub mod history;
pub mod workspace;

pub use accepted::{accepted_file_name, AcceptedStore, FsAcceptedStore};
pub use error::{StoreError, StoreResult};
pub use history::{FileScoreHistory, ScoreHistory};
pub use workspace::CandidateWorkspace;
