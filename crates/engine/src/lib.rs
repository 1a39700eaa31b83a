//! Trading pipeline stages.
//!
//! - `poller`: samples the instrument price on a fixed interval
//! - `evaluator`: sliding-window change detection with a sample-count cooldown
//! - `trader`: contract resolution, bracket math, execution gate, notification
//! - `pipeline`: spawns the stages and connects them with unbounded queues

pub mod bracket;
pub mod contract;
pub mod error;
pub mod evaluator;
pub mod pipeline;
pub mod poller;
pub mod trader;
pub mod window;

pub use bracket::Bracket;
pub use error::TradeError;
pub use evaluator::{Evaluator, EvaluatorState};
pub use pipeline::{Capabilities, Pipeline};
pub use poller::{PollOutcome, Poller};
pub use trader::{Execution, TradeContext, TradeReport, Trader};
pub use window::{percent_change, EvalWindow};
