//! Session creation seam.
//!
//! The coordinator asks the factory for one [`Session`] per wizard run and
//! owns it until the run is torn down.
use super::errors::BoxError;
use crate::session::Session;

pub trait SessionFactory: Send + Sync {
    fn create_session(&self) -> std::result::Result<Session, BoxError>;
}

impl<F> SessionFactory for F
where
    F: Fn() -> std::result::Result<Session, BoxError> + Send + Sync,
{
    fn create_session(&self) -> std::result::Result<Session, BoxError> {
        self()
    }
}

/// Factory producing sessions with the default snapshot.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSessionFactory;

impl SessionFactory for DefaultSessionFactory {
    fn create_session(&self) -> std::result::Result<Session, BoxError> {
        Ok(Session::new())
    }
}
