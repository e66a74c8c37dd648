pub mod horizon;
pub mod level;
pub mod leveled;
pub mod report;
pub mod review_record;
pub mod review_session;
pub mod theme;

pub use horizon::{DueReminder, ReviewHorizon};
pub use level::{LevelCap, MAX_LEVEL, MIN_LEVEL};
pub use report::{EnrollSummary, SweepFailure, SweepReport};
pub use review_record::{CardId, ReviewRecord, UserId};
pub use review_session::ReviewSession;
pub use theme::{CatalogCard, ThemeProgress, ThemeSnapshot};
