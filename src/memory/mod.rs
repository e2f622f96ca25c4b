pub mod audit;
pub mod episodic;
pub mod forget;
pub mod preference;
pub mod recall;
pub mod stats;
pub mod summarize;
pub mod types;
