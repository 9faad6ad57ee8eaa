pub mod chain;
pub mod processor;

pub use chain::DataProcessingChain;
pub use processor::DataProcessor;
