use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_movie::Movie;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Review::Table)
                    .if_not_exists()
                    .col(pk_auto(Review::Id))
                    .col(string_len(Review::Name, 64))
                    .col(text(Review::Text))
                    .col(integer(Review::Score))
                    .col(integer(Review::MovieId))
                    .col(big_integer(Review::Created))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_review_movie")
                            .from(Review::Table, Review::MovieId)
                            .to(Movie::Table, Movie::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_review_movie_id")
                    .table(Review::Table)
                    .col(Review::MovieId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Review::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Review {
    Table,
    Id,
    Name,
    Text,
    Score,
    MovieId,
    Created,
}
