//! Schema bootstrap from entity definitions

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::sea_query::{Index, TableCreateStatement};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Schema};
use tracing::debug;

/// Create all tables and indexes that do not exist yet
pub async fn ensure_schema(conn: &DatabaseConnection) -> Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);

    // accounts must exist before uploaded_files references it
    let tables: Vec<TableCreateStatement> = vec![
        table_for(&schema, AccountEntity),
        table_for(&schema, StudentEntity),
        table_for(&schema, UploadedFileEntity),
        table_for(&schema, ChatLogEntity),
        table_for(&schema, SessionEntity),
    ];

    for table in tables {
        conn.execute(backend.build(&table)).await?;
    }

    let natural_key = Index::create()
        .name("unique_student")
        .table(StudentEntity)
        .col(StudentColumn::SerialNo)
        .col(StudentColumn::RollNo)
        .unique()
        .if_not_exists()
        .to_owned();
    conn.execute(backend.build(&natural_key)).await?;

    debug!("Schema ensured");
    Ok(())
}

fn table_for<E: EntityTrait>(schema: &Schema, entity: E) -> TableCreateStatement {
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    table
}
