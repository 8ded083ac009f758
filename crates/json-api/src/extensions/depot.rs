//! Depot helper extensions.

use std::any::Any;

use replygate_app::users::UserUuid;
use salvo::prelude::Depot;

use crate::errors::ApiError;

const USER_UUID_DEPOT_KEY: &str = "user_uuid";

/// Helpers for mapping depot extraction failures to HTTP errors.
pub(crate) trait DepotExt {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, ApiError>;

    fn insert_user_uuid(&mut self, user: UserUuid);

    /// The user resolved by the bearer middleware.
    fn user_uuid_or_401(&self) -> Result<UserUuid, ApiError>;
}

impl DepotExt for Depot {
    fn obtain_or_500<T: Any + Send + Sync>(&self) -> Result<&T, ApiError> {
        self.obtain::<T>().map_err(|_ignored| ApiError::internal())
    }

    fn insert_user_uuid(&mut self, user: UserUuid) {
        self.insert(USER_UUID_DEPOT_KEY, user);
    }

    fn user_uuid_or_401(&self) -> Result<UserUuid, ApiError> {
        self.get::<UserUuid>(USER_UUID_DEPOT_KEY)
            .copied()
            .map_err(|_ignored| ApiError::unauthenticated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_uuid_round_trips_through_depot() {
        let mut depot = Depot::new();
        let user = UserUuid::new();

        assert!(depot.user_uuid_or_401().is_err());

        depot.insert_user_uuid(user);

        assert_eq!(depot.user_uuid_or_401().ok(), Some(user));
    }
}
