pub mod classifier;
pub mod cluster;
pub mod scorer;
pub mod window;

pub use classifier::WalletRegistry;
pub use cluster::{cluster_score, ClusterDetector, ClusterRules};
pub use scorer::{score_profile, ScoreWeights, ScoringParams};
pub use window::{ClusterStore, WindowEntry};
