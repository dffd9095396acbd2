pub use sea_orm_migration::prelude::*;

mod m20261001_090000_bookings;
mod m20261001_100000_reviews;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_090000_bookings::Migration),
            Box::new(m20261001_100000_reviews::Migration),
        ]
    }
}
