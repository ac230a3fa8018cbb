//! Transactional persistence for questions, tags, votes, answers, and saved
//! questions, plus the user directory.
//!
//! Every workflow runs against one [`UnitOfWork`] obtained from
//! [`Store::begin`]. The unit of work is threaded explicitly through each
//! repository call and must end in `commit` or `rollback`; dropping it without
//! committing rolls back.

#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod postgres;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub use memory::{Fault, MemoryState, MemoryStore};
pub use postgres::{PgStore, PgUnitOfWork};
pub use traits::{
    AnswerRepo, CollectionRepo, QuestionRepo, Store, TagRepo, UnitOfWork, UserRepo, VoteRepo,
};
