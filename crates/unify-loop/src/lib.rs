//! Loop driver (spec C4): executes a compiled [`unify_plan::Plan`] against
//! a [`unify_backend::Backend`], driving stage `04` to convergence (spec
//! §4.3.3, §4.4).

pub mod driver;
pub mod error;
pub mod options;
pub mod outcome;
pub mod sim;

pub use driver::LoopDriver;
pub use error::UnifyError;
pub use options::{ErrorPolicy, LoopOptions};
pub use outcome::LoopOutcome;
