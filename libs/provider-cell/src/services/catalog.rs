use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use shared_database::AppState;

use crate::models::{Bookable, BookableKind, BookableRef, Package, ProviderError, Service};
use crate::services::schedule;

/// Read access to the offerings a provider can be booked for.
pub struct CatalogService {
    db: PgPool,
}

impl CatalogService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    /// Active services for a provider, in their configured display order.
    pub async fn services_for_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<Service>, ProviderError> {
        self.ensure_provider(provider_id).await?;

        let services = sqlx::query_as::<_, Service>(
            "SELECT id, provider_id, name, description, price_min, price_max, is_active, sort_order \
             FROM services WHERE provider_id = $1 AND is_active \
             ORDER BY sort_order, name",
        )
        .bind(provider_id)
        .fetch_all(&self.db)
        .await?;
        Ok(services)
    }

    /// Active packages for a provider.
    pub async fn packages_for_provider(
        &self,
        provider_id: Uuid,
    ) -> Result<Vec<Package>, ProviderError> {
        self.ensure_provider(provider_id).await?;

        let packages = sqlx::query_as::<_, Package>(
            "SELECT id, provider_id, name, description, price, is_active \
             FROM packages WHERE provider_id = $1 AND is_active \
             ORDER BY name",
        )
        .bind(provider_id)
        .fetch_all(&self.db)
        .await?;
        Ok(packages)
    }

    async fn ensure_provider(&self, provider_id: Uuid) -> Result<(), ProviderError> {
        schedule::fetch_provider(&self.db, provider_id)
            .await?
            .ok_or(ProviderError::NotFound)?;
        Ok(())
    }
}

/// Resolves a booking reference to the live catalog row it points at.
///
/// Returns `None` when the offering does not exist, is inactive, or belongs
/// to a different provider. Generic over the executor so the booking
/// transaction can resolve line items under its advisory lock.
pub async fn resolve_bookable<'e, E>(
    executor: E,
    provider_id: Uuid,
    reference: BookableRef,
) -> Result<Option<Bookable>, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    match reference.kind {
        BookableKind::Service => {
            let service = sqlx::query_as::<_, Service>(
                "SELECT id, provider_id, name, description, price_min, price_max, is_active, sort_order \
                 FROM services WHERE id = $1 AND provider_id = $2 AND is_active",
            )
            .bind(reference.id)
            .bind(provider_id)
            .fetch_optional(executor)
            .await?;
            Ok(service.map(Bookable::Service))
        }
        BookableKind::Package => {
            let package = sqlx::query_as::<_, Package>(
                "SELECT id, provider_id, name, description, price, is_active \
                 FROM packages WHERE id = $1 AND provider_id = $2 AND is_active",
            )
            .bind(reference.id)
            .bind(provider_id)
            .fetch_optional(executor)
            .await?;
            Ok(package.map(Bookable::Package))
        }
    }
}
