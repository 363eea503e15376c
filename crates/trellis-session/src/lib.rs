mod page;
mod session;

pub use page::{PageHost, RetryPolicy};
pub use session::{Confirmed, OutlineRow, Session};
