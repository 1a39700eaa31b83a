pub mod chain;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod events;
pub mod order;
pub mod traits;

pub use chain::{ContractQuote, ExpirationKey, OptionChain};
pub use config::{EvaluatorConfig, NotifyConfig, RjConfig, TraderConfig};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, ValidationError};
pub use events::{Direction, Sample, Trigger};
pub use order::{BracketOrder, OrderAck, CONTRACT_MULTIPLIER};
pub use traits::{ChainProvider, Notifier, OrderSubmitter, QuoteProvider};
