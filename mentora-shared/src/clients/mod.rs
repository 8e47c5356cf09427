pub mod functions;
pub mod realtime;
pub mod rest;
pub mod storage;

pub use functions::FunctionsClient;
pub use realtime::{RealtimeClient, Subscription, SubscriptionCloser};
pub use rest::RestClient;
pub use storage::{BucketSpec, StorageClient};
