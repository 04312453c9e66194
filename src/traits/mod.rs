pub mod publisher;
pub mod step;
pub mod subscription;

pub use publisher::{PublishResult, Publisher};
pub use step::{StageHandle, StageSummary, Step};
pub use subscription::{MessageSink, Subscription};
