// migrations/m202510190001_create_feedbacks.rs
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Feedbacks {
    Table,
    Id,
    Name,
    Email,
    Physics,
    Chemistry,
    Maths,
    Cs,
    English,
    Feedback,
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m202510190001_create_feedbacks"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Feedbacks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Feedbacks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Feedbacks::Name).text().not_null())
                    .col(ColumnDef::new(Feedbacks::Email).text().not_null())
                    .col(ColumnDef::new(Feedbacks::Physics).big_integer().not_null())
                    .col(ColumnDef::new(Feedbacks::Chemistry).big_integer().not_null())
                    .col(ColumnDef::new(Feedbacks::Maths).big_integer().not_null())
                    .col(ColumnDef::new(Feedbacks::Cs).big_integer().not_null())
                    .col(ColumnDef::new(Feedbacks::English).big_integer().not_null())
                    .col(ColumnDef::new(Feedbacks::Feedback).text().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_feedbacks_email")
                    .table(Feedbacks::Table)
                    .col(Feedbacks::Email)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Feedbacks::Table).to_owned())
            .await
    }
}
