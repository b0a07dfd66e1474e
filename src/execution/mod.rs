pub mod paper_trader;
pub mod position_sizer;

pub use paper_trader::{ExitReason, PaperConfig, PaperEvent, PaperTrader};
pub use position_sizer::{calculate_size, SizingStrategy};
