pub mod invoker;
pub mod parser;
pub mod prompt;
pub mod providers;
pub mod ranker;
pub mod recommendations;
pub mod validator;

pub use invoker::{InvocationError, ModelInvoker, RetryPolicy};
pub use parser::ParseError;
pub use providers::{BackendError, ModelBackend};
pub use recommendations::{RecommendError, Recommender};
pub use validator::ValidationError;
