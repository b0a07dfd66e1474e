pub mod cursor;
pub mod decoder;
pub mod dedup;
pub mod pipeline;
pub mod poller;
pub mod side;

pub use cursor::ChainCursor;
pub use decoder::{DecodeError, EventDecoder, ORDER_FILLED_TOPIC};
pub use dedup::SeenTxSet;
pub use pipeline::{LogOutcome, Pipeline, PipelineConfig};
pub use poller::{backoff_delay, PollSettings, Poller, PollerState, TickOutcome};
pub use side::{
    FillContext, PriceThresholdResolver, SideResolver, TokenMapResolver, TokenParityResolver,
};
