// Bounded feature history: circular buffer plus delayed labeling
pub mod buffer;
pub mod labeler;

pub use buffer::FeatureHistoryBuffer;
pub use labeler::DelayedLabeler;
