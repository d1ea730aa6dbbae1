use std::ops::Deref;

use sqlx::PgPool;

/// Shared handle to the application's Postgres pool. The repository traits in
/// [`crate::repos`] are implemented on this type.
#[derive(Clone)]
pub struct PostgresConnection(PgPool);

impl PostgresConnection {
    pub fn new(pool: PgPool) -> Self {
        Self(pool)
    }
}

impl Deref for PostgresConnection {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
