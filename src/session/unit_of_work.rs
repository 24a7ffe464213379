use std::ops::{Deref, DerefMut};

use tracing::{debug, warn};

use crate::{
    session::{QueryError, Session},
    storage::Storage,
};

/// Scoped transaction over a session. Dropped without `commit()` it rolls
/// back, on error paths and unwinding alike.
pub struct UnitOfWork<'s, S: Storage> {
    session: &'s mut Session<S>,
    done: bool,
}

impl<'s, S: Storage> UnitOfWork<'s, S> {
    pub(crate) fn new(session: &'s mut Session<S>) -> Self {
        Self { session, done: false }
    }

    pub fn commit(mut self) -> Result<(), QueryError> {
        self.done = true;
        self.session.commit_work()
    }

    pub fn rollback(mut self) -> Result<(), QueryError> {
        self.done = true;
        debug!("rolling back unit of work");
        self.session.rollback_work()
    }
}

impl<S: Storage> Deref for UnitOfWork<'_, S> {
    type Target = Session<S>;

    fn deref(&self) -> &Session<S> { self.session }
}

impl<S: Storage> DerefMut for UnitOfWork<'_, S> {
    fn deref_mut(&mut self) -> &mut Session<S> { self.session }
}

impl<S: Storage> Drop for UnitOfWork<'_, S> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        debug!("unit of work dropped without commit; rolling back");
        if let Err(err) = self.session.rollback_work() {
            warn!(error = %err, "rollback failed");
        }
    }
}
