use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Bookings {
    Table,
    Id,
}

#[derive(Iden)]
enum Reviews {
    Table,
    Id,
    BookingId,
    CustomerId,
    Punctuality,
    Knowledge,
    Conduct,
    Accuracy,
    Samagri,
    OverallTenths,
    Comment,
    Anonymous,
    CreatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Reviews::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Reviews::BookingId).uuid().not_null())
                    .col(ColumnDef::new(Reviews::CustomerId).string().not_null())
                    .col(ColumnDef::new(Reviews::Punctuality).small_integer().not_null())
                    .col(ColumnDef::new(Reviews::Knowledge).small_integer().not_null())
                    .col(ColumnDef::new(Reviews::Conduct).small_integer().not_null())
                    .col(ColumnDef::new(Reviews::Accuracy).small_integer().not_null())
                    .col(ColumnDef::new(Reviews::Samagri).small_integer().not_null())
                    .col(
                        ColumnDef::new(Reviews::OverallTenths)
                            .small_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Reviews::Comment).string().not_null())
                    .col(
                        ColumnDef::new(Reviews::Anonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Reviews::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-reviews-booking_id")
                            .from(Reviews::Table, Reviews::BookingId)
                            .to(Bookings::Table, Bookings::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // At most one review per booking.
        manager
            .create_index(
                Index::create()
                    .name("idx-reviews-booking_id-unique")
                    .table(Reviews::Table)
                    .col(Reviews::BookingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).to_owned())
            .await?;
        Ok(())
    }
}
