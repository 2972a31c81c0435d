pub mod case;
pub mod cnj;
pub mod error;
pub mod extract;
pub mod history;

pub use case::{CaseRecord, CaseStatus, Court, NewCase};
pub use cnj::CaseNumber;
pub use error::CoreError;
pub use extract::{Extraction, Marker, MissReason, extract, extract_or};
pub use history::{HistoryEvent, HistoryRecord};
