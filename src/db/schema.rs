//! Creates the monitoring tables from the entity definitions.
//!
//! Statements are `IF NOT EXISTS`, so this runs on every startup against
//! Postgres in production and against in-memory SQLite in tests.

use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::{check_log, endpoint, notification};

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    stmt
}

fn check_log_lookup_index() -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_check_logs_endpoint_checked_at")
        .table(check_log::Entity)
        .col(check_log::Column::EndpointId)
        .col(check_log::Column::CheckedAt)
        .to_owned()
}

fn due_selection_index() -> IndexCreateStatement {
    Index::create()
        .if_not_exists()
        .name("idx_endpoints_next_check_at")
        .table(endpoint::Entity)
        .col(endpoint::Column::NextCheckAt)
        .to_owned()
}

pub async fn create_tables(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    // Parents first so foreign keys resolve.
    let tables = [
        table_for(&schema, endpoint::Entity),
        table_for(&schema, check_log::Entity),
        table_for(&schema, notification::Entity),
    ];
    for table in &tables {
        db.execute(backend.build(table)).await?;
    }
    for index in [check_log_lookup_index(), due_selection_index()] {
        db.execute(backend.build(&index)).await?;
    }

    info!("Monitoring tables are in place.");
    Ok(())
}
