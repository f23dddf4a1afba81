use crate::traits::StoreService;
use crate::{KbError, StoreReference};
use tracing::info;

/// How a store reference was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedStore {
    Existing(StoreReference),
    Created(StoreReference),
}

impl ResolvedStore {
    pub fn reference(&self) -> &StoreReference {
        match self {
            ResolvedStore::Existing(store) | ResolvedStore::Created(store) => store,
        }
    }

    pub fn into_reference(self) -> StoreReference {
        match self {
            ResolvedStore::Existing(store) | ResolvedStore::Created(store) => store,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, ResolvedStore::Created(_))
    }
}

/// Reuses `store` when non-empty, otherwise creates a store named `display_name`.
///
/// With `verify_existing` set, a given store is looked up first so a stale
/// name surfaces as a resolution error instead of failing later uploads.
pub async fn resolve_store<S>(
    service: &S,
    store: &str,
    display_name: &str,
    verify_existing: bool,
) -> Result<ResolvedStore, KbError>
where
    S: StoreService + Sync + ?Sized,
{
    if !store.trim().is_empty() {
        let reference = StoreReference::parse(store)?;
        if verify_existing {
            service
                .get_store(&reference)
                .await
                .map_err(KbError::StoreResolution)?;
        }
        info!(store = %reference, "using existing store");
        return Ok(ResolvedStore::Existing(reference));
    }

    let created = service
        .create_store(display_name)
        .await
        .map_err(KbError::StoreResolution)?;
    info!(store = %created, display_name, "created new store");
    Ok(ResolvedStore::Created(created))
}
