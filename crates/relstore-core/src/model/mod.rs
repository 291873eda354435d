pub mod assertion;
pub mod authorization_model;
pub mod store;
pub mod tuple;

pub use assertion::Assertion;
pub use authorization_model::{AuthorizationModel, TypeDefinition};
pub use store::{LifecycleFilter, Store, StoreLifecycle};
pub use tuple::{
    conditions_equal, RelationshipCondition, Tuple, TupleChange, TupleKey, TupleOperation,
    UserType,
};
