pub mod cursor;
pub mod dispatcher;
pub mod queue;

pub use cursor::RoundRobinCursor;
pub use dispatcher::Dispatcher;
pub use queue::WorkQueue;
