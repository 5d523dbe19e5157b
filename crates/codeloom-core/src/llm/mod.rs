mod http;
mod session;
mod traits;

pub use http::HttpTransport;
pub use session::{GenerationOutcome, GenerationSession, PreparedRequest};
pub use traits::*;
