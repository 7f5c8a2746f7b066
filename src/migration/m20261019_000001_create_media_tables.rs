// ABOUTME: Initial migration to create the media and content_documents tables
// ABOUTME: Adds the indexes used by list ordering, folder/category filters, and reference scans

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Media::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Media::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Media::Filename).string().not_null())
                    .col(ColumnDef::new(Media::OriginalName).string().not_null())
                    .col(ColumnDef::new(Media::MimeType).string().not_null())
                    .col(ColumnDef::new(Media::Size).big_integer().not_null())
                    .col(ColumnDef::new(Media::Width).integer())
                    .col(ColumnDef::new(Media::Height).integer())
                    .col(ColumnDef::new(Media::StorageKey).string().not_null())
                    .col(ColumnDef::new(Media::Url).string().not_null())
                    .col(ColumnDef::new(Media::Alt).string().not_null().default(""))
                    .col(ColumnDef::new(Media::Caption).string().not_null().default(""))
                    .col(ColumnDef::new(Media::Category).string().not_null())
                    .col(ColumnDef::new(Media::Folder).string().not_null().default("/"))
                    .col(ColumnDef::new(Media::Tags).json().not_null())
                    .col(
                        ColumnDef::new(Media::ShowInGallery)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Media::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(Media::UpdatedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_created_at")
                    .table(Media::Table)
                    .col(Media::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_media_folder_category")
                    .table(Media::Table)
                    .col(Media::Folder)
                    .col(Media::Category)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ContentDocuments::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContentDocuments::Collection).string().not_null())
                    .col(ColumnDef::new(ContentDocuments::Id).string().not_null())
                    .col(ColumnDef::new(ContentDocuments::Body).text().not_null())
                    .col(ColumnDef::new(ContentDocuments::UpdatedAt).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(ContentDocuments::Collection)
                            .col(ContentDocuments::Id),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ContentDocuments::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Media::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Media {
    Table,
    Id,
    Filename,
    OriginalName,
    MimeType,
    Size,
    Width,
    Height,
    StorageKey,
    Url,
    Alt,
    Caption,
    Category,
    Folder,
    Tags,
    ShowInGallery,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ContentDocuments {
    Table,
    Id,
    Collection,
    Body,
    UpdatedAt,
}
