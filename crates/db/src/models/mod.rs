pub mod subscription;

pub use subscription::{ContentEncoding, Subscription};
