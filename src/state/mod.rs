pub mod error;
pub mod event;
pub mod machine;
pub mod model;

pub use error::{StateError, StateResult};
pub use event::{LifecycleEvent, StateTransition};
pub use machine::LifecycleMachine;
pub use model::{Lifecycle, LifecyclePhase};
