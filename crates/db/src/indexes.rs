use mongodb::{Database, IndexModel, options::IndexOptions};
use tracing::info;

/// The unique endpoint index is what serializes concurrent upserts
/// for the same browser registration.
pub async fn ensure_indexes(
    db: &Database,
    subscriptions: &str,
) -> Result<(), mongodb::error::Error> {
    create_indexes(
        db,
        subscriptions,
        vec![
            index_unique(bson::doc! { "endpoint": 1 }),
            index(bson::doc! { "subject_type": 1, "subject_id": 1 }),
        ],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    db.collection::<bson::Document>(collection)
        .create_indexes(indexes)
        .await?;
    info!(collection, "Indexes created");
    Ok(())
}
