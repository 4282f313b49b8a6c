//! Batched entity loading

use std::collections::HashMap;

use acdc_common::datamodel::{EntityId, EntityRecord};
use tracing::debug;

use crate::mediawiki::{WikiApi, WikiError, PAGE_SIZE_LIMIT};

/// Facets requested when loading entities for reconciliation
pub const STATEMENT_PROPS: &[&str] = &["info", "claims"];

/// Load entities in chunks and merge them into one map
///
/// Every requested ID gets an entry. IDs the store reports as missing (or
/// does not mention at all) map to an empty record: newly uploaded files
/// simply have no statements yet.
pub async fn load_entities(
    api: &dyn WikiApi,
    ids: &[EntityId],
    props: &[&str],
    mut on_request: impl FnMut() + Send,
) -> Result<HashMap<EntityId, EntityRecord>, WikiError> {
    let mut entities = HashMap::with_capacity(ids.len());

    for chunk in ids.chunks(PAGE_SIZE_LIMIT) {
        let records = api.get_entities(chunk, props).await?;
        on_request();

        for record in records {
            let record = if record.missing {
                debug!(entity_id = %record.id, "Entity missing, treating as empty");
                EntityRecord::empty(record.id)
            } else {
                record
            };
            entities.insert(record.id.clone(), record);
        }

        for id in chunk {
            entities
                .entry(id.clone())
                .or_insert_with(|| EntityRecord::empty(id.clone()));
        }
    }

    Ok(entities)
}
