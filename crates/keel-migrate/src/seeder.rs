//! Seeding: inserting a blueprint's seed rows through an accessor.

use keel_core::Renderer;
use keel_dao::{Accessor, Driver, Metadata};
use tracing::info;

use crate::blueprint::{SchemaBlueprint, TableBlueprint};
use crate::error::Result;

/// Inserts seed rows with the accessor's insert path, so generated keys,
/// escaping and logging behave as for application writes.
///
/// The seeder does not commit. Call [`Accessor::flush`] afterwards to make
/// the rows durable and drop cached reads.
pub struct Seeder<'a, D, R> {
    accessor: &'a mut Accessor<D, R>,
}

impl<'a, D: Driver + Metadata, R: Renderer> Seeder<'a, D, R> {
    pub fn new(accessor: &'a mut Accessor<D, R>) -> Self {
        Self { accessor }
    }

    /// Inserts every seed row of `table` and returns how many were written.
    pub async fn seed_table(&mut self, table: &TableBlueprint) -> Result<usize> {
        for seed in &table.seeds {
            let mut row = seed.clone();
            self.accessor.start_operation(table.name.as_str()).insert(&mut row).await?;
        }
        if !table.seeds.is_empty() {
            info!(table = %table.name, rows = table.seeds.len(), "seeded table");
        }
        Ok(table.seeds.len())
    }

    /// Seeds every table of `schema` in declaration order.
    pub async fn seed_schema(&mut self, schema: &SchemaBlueprint) -> Result<usize> {
        let mut total = 0;
        for table in &schema.tables {
            total += self.seed_table(table).await?;
        }
        Ok(total)
    }
}
