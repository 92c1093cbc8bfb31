pub mod gnews;
pub mod mock;
pub mod newsdata;
pub mod source;

pub use gnews::GnewsSource;
pub use mock::MockSource;
pub use newsdata::NewsDataSource;
pub use source::{FetchResult, NewsSource};
