use crate::{PostgresClinicStore, storage};
use clinic_core::providers::IdentityResolver;
use clinic_core::{ClientId, Identity, ProviderId, Result, SchedulingError, UserId};

impl IdentityResolver for PostgresClinicStore {
    async fn resolve_user(&self, user_id: UserId) -> Result<Identity> {
        let row: Option<(Option<i64>, Option<i64>)> = sqlx::query_as(
            r"
            SELECT c.id, p.id
            FROM users u
            LEFT JOIN clients c ON c.user_id = u.id
            LEFT JOIN providers p ON p.user_id = u.id
            WHERE u.id = $1
            ",
        )
        .bind(user_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to resolve user"))?;

        match row {
            Some((Some(client_id), _)) => Ok(Identity::Client {
                client_id: ClientId(client_id),
            }),
            Some((None, Some(provider_id))) => Ok(Identity::Provider {
                provider_id: ProviderId(provider_id),
            }),
            _ => Err(SchedulingError::UserNotFound),
        }
    }

    async fn client_email(&self, client_id: ClientId) -> Result<Option<String>> {
        sqlx::query_scalar(
            r"
            SELECT u.email
            FROM clients c
            JOIN users u ON u.id = c.user_id
            WHERE c.id = $1
            ",
        )
        .bind(client_id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage("Failed to look up client email"))
    }
}
