//! Bookings and their status history.
//!
//! - `bookings`: one row per booking, carrying lifecycle status, amounts,
//!   reconciliation state, the applied refund and the payout record
//! - `booking_status_history`: append-only log of every status change

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Bookings {
    Table,
    Id,
    BookingNumber,
    CustomerId,
    PanditId,
    EventDate,
    CreatedAt,
    Status,
    TotalAmount,
    DakshinaAmount,
    PlatformFee,
    TravelRequired,
    CalculatedTravelCost,
    ActualTravelCost,
    FoodAllowanceAmount,
    SamagriAmount,
    Discrepancy,
    DiscrepancyResolvedBy,
    DiscrepancyResolvedAt,
    DiscrepancyNote,
    RefundPercent,
    RefundAmount,
    RefundComputedAt,
    PanditPayout,
    PayoutStatus,
    PayoutReference,
    PayoutMethod,
    PayoutPaymentDate,
    PayoutCompletedAt,
    PayoutApprovedBy,
    HasReview,
    Version,
}

#[derive(Iden)]
enum BookingStatusHistory {
    Table,
    Id,
    BookingId,
    Sequence,
    FromStatus,
    ToStatus,
    Action,
    ActorId,
    Note,
    ChangedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Bookings::BookingNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Bookings::CustomerId).string().not_null())
                    .col(ColumnDef::new(Bookings::PanditId).string())
                    .col(ColumnDef::new(Bookings::EventDate).timestamp().not_null())
                    .col(ColumnDef::new(Bookings::CreatedAt).timestamp().not_null())
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string()
                            .not_null()
                            .default("CREATED"),
                    )
                    .col(
                        ColumnDef::new(Bookings::TotalAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::DakshinaAmount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Bookings::PlatformFee).big_integer())
                    .col(
                        ColumnDef::new(Bookings::TravelRequired)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Bookings::CalculatedTravelCost).big_integer())
                    .col(ColumnDef::new(Bookings::ActualTravelCost).big_integer())
                    .col(
                        ColumnDef::new(Bookings::FoodAllowanceAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::SamagriAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Bookings::Discrepancy)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Bookings::DiscrepancyResolvedBy).string())
                    .col(ColumnDef::new(Bookings::DiscrepancyResolvedAt).timestamp())
                    .col(ColumnDef::new(Bookings::DiscrepancyNote).string())
                    .col(ColumnDef::new(Bookings::RefundPercent).integer())
                    .col(ColumnDef::new(Bookings::RefundAmount).big_integer())
                    .col(ColumnDef::new(Bookings::RefundComputedAt).timestamp())
                    .col(ColumnDef::new(Bookings::PanditPayout).big_integer())
                    .col(
                        ColumnDef::new(Bookings::PayoutStatus)
                            .string()
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(ColumnDef::new(Bookings::PayoutReference).string())
                    .col(ColumnDef::new(Bookings::PayoutMethod).string())
                    .col(ColumnDef::new(Bookings::PayoutPaymentDate).date())
                    .col(ColumnDef::new(Bookings::PayoutCompletedAt).timestamp())
                    .col(ColumnDef::new(Bookings::PayoutApprovedBy).string())
                    .col(
                        ColumnDef::new(Bookings::HasReview)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Bookings::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // Payout queue lookup.
        manager
            .create_index(
                Index::create()
                    .name("idx-bookings-status-payout_status")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .col(Bookings::PayoutStatus)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(BookingStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BookingStatusHistory::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BookingStatusHistory::BookingId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingStatusHistory::Sequence)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingStatusHistory::FromStatus)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingStatusHistory::ToStatus)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingStatusHistory::Action)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BookingStatusHistory::ActorId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BookingStatusHistory::Note).string())
                    .col(
                        ColumnDef::new(BookingStatusHistory::ChangedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-booking_status_history-booking_id")
                            .from(
                                BookingStatusHistory::Table,
                                BookingStatusHistory::BookingId,
                            )
                            .to(Bookings::Table, Bookings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Two writers can never append the same position in one history.
        manager
            .create_index(
                Index::create()
                    .name("idx-booking_status_history-booking_id-sequence-unique")
                    .table(BookingStatusHistory::Table)
                    .col(BookingStatusHistory::BookingId)
                    .col(BookingStatusHistory::Sequence)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BookingStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await?;
        Ok(())
    }
}
