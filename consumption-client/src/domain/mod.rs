pub mod bucket;
pub mod client;
pub mod consumption_event;

pub use bucket::{bucketize, BucketQuery, ConsumptionBucket, DEFAULT_BUCKET_LIMIT};
pub use client::ClientRecord;
pub use consumption_event::ConsumptionEvent;
