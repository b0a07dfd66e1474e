pub mod notifier;
pub mod wallet_seeder;

pub use notifier::{AlertSink, LogSink, Notifier, SignalSink};
pub use wallet_seeder::{SeedCriteria, WalletSeeder};
