pub use colored;
pub use dirs;
pub use lexical;
pub use log;
pub use reqwest;
pub use serde_json;
pub use tokio;
pub use url;
