// ABOUTME: SQLite database storage layer for media records and content documents
// ABOUTME: Handles connection setup, migrations, filtered pagination, and metadata updates

use anyhow::Result as AnyResult;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    sea_query::{Expr, LikeExpr},
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::entities::{content_document, media};
use crate::error::{AppError, Result};
use crate::references::ContentCollection;
use crate::types::{MediaFilter, MimeFilter, PageRequest, UpdateMediaRequest};

pub struct Storage {
    pub db: DatabaseConnection,
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains_pattern(term: &str) -> LikeExpr {
    LikeExpr::new(format!("%{}%", escape_like(term))).escape('\\')
}

fn mime_condition(filter: &MimeFilter) -> Condition {
    use media::Column::MimeType;

    match filter {
        MimeFilter::Image => Condition::all().add(MimeType.starts_with("image/")),
        MimeFilter::Video => Condition::all().add(MimeType.starts_with("video/")),
        MimeFilter::Audio => Condition::all().add(MimeType.starts_with("audio/")),
        MimeFilter::Other => Condition::all()
            .add(MimeType.not_like("image/%"))
            .add(MimeType.not_like("video/%"))
            .add(MimeType.not_like("audio/%")),
        MimeFilter::Prefix(prefix) => Condition::all().add(
            MimeType.like(LikeExpr::new(format!("{}%", escape_like(prefix))).escape('\\')),
        ),
    }
}

fn media_condition(filter: &MediaFilter) -> Condition {
    let mut condition = Condition::all();

    if let Some(search) = &filter.search {
        let tag_match = Expr::cust_with_values(
            r"EXISTS (SELECT 1 FROM json_each(media.tags) WHERE json_each.value LIKE ? ESCAPE '\')",
            [format!("%{}%", escape_like(search))],
        );
        condition = condition.add(
            Condition::any()
                .add(media::Column::OriginalName.like(contains_pattern(search)))
                .add(media::Column::Alt.like(contains_pattern(search)))
                .add(media::Column::Caption.like(contains_pattern(search)))
                .add(tag_match),
        );
    }
    if let Some(mime) = &filter.mime {
        condition = condition.add(mime_condition(mime));
    }
    if let Some(folder) = &filter.folder {
        condition = condition.add(media::Column::Folder.eq(folder.as_str()));
    }
    if let Some(category) = &filter.category {
        condition = condition.add(media::Column::Category.eq(category.as_str()));
    }
    if filter.gallery_only {
        condition = condition.add(media::Column::ShowInGallery.eq(true));
    }

    condition
}

impl Storage {
    pub async fn new(database_url: &str) -> AnyResult<Self> {
        let db = Database::connect(database_url).await?;
        crate::migration::Migrator::up(&db, None).await?;
        tracing::info!(database_url, "Database ready");
        Ok(Self { db })
    }

    pub async fn insert_media(&self, model: media::ActiveModel) -> Result<media::Model> {
        Ok(model.insert(&self.db).await?)
    }

    pub async fn find_media(&self, id: Uuid) -> Result<media::Model> {
        media::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Media {}", id)))
    }

    /// Finds a record already pointing at a stored blob, by key, url or filename.
    pub async fn find_media_at(
        &self,
        storage_key: &str,
        url: &str,
        filename: &str,
    ) -> Result<Option<media::Model>> {
        Ok(media::Entity::find()
            .filter(
                Condition::any()
                    .add(media::Column::StorageKey.eq(storage_key))
                    .add(media::Column::Url.eq(url))
                    .add(media::Column::Filename.eq(filename)),
            )
            .one(&self.db)
            .await?)
    }

    /// Returns one page of matching media, newest first, and the total match count.
    pub async fn list_media(
        &self,
        filter: &MediaFilter,
        page: PageRequest,
    ) -> Result<(Vec<media::Model>, u64)> {
        let paginator = media::Entity::find()
            .filter(media_condition(filter))
            .order_by_desc(media::Column::CreatedAt)
            .order_by_desc(media::Column::Id)
            .paginate(&self.db, page.limit);

        let total = paginator.num_items().await?;
        match page.offset() {
            Some(offset) if offset < total => {
                let items = paginator.fetch_page(page.page - 1).await?;
                Ok((items, total))
            }
            // Past the end, including offsets SQLite cannot represent
            _ => Ok((Vec::new(), total)),
        }
    }

    async fn distinct_values(&self, column: media::Column) -> Result<Vec<String>> {
        let mut values: Vec<String> = media::Entity::find()
            .select_only()
            .column(column)
            .distinct()
            .into_tuple()
            .all(&self.db)
            .await?;
        values.retain(|v| !v.is_empty());
        Ok(values)
    }

    pub async fn distinct_folders(&self) -> Result<Vec<String>> {
        self.distinct_values(media::Column::Folder).await
    }

    pub async fn distinct_categories(&self) -> Result<Vec<String>> {
        self.distinct_values(media::Column::Category).await
    }

    /// Applies the editable fields of `update`; identity columns are never touched.
    pub async fn update_media(
        &self,
        id: Uuid,
        update: UpdateMediaRequest,
    ) -> Result<media::Model> {
        let existing = self.find_media(id).await?;
        let mut active: media::ActiveModel = existing.into();

        if let Some(original_name) = update.original_name {
            active.original_name = Set(original_name);
        }
        if let Some(alt) = update.alt {
            active.alt = Set(alt);
        }
        if let Some(caption) = update.caption {
            active.caption = Set(caption);
        }
        if let Some(category) = update.category {
            active.category = Set(category);
        }
        if let Some(folder) = update.folder {
            active.folder = Set(folder);
        }
        if let Some(tags) = update.tags {
            active.tags = Set(tags.into_iter().collect());
        }
        if let Some(show_in_gallery) = update.show_in_gallery {
            active.show_in_gallery = Set(show_in_gallery);
        }
        active.updated_at = Set(now_millis());

        Ok(active.update(&self.db).await?)
    }

    pub async fn delete_media_record<C>(conn: &C, id: Uuid) -> Result<()>
    where
        C: ConnectionTrait,
    {
        media::Entity::delete_by_id(id).exec(conn).await?;
        Ok(())
    }

    pub async fn put_document(
        &self,
        collection: ContentCollection,
        id: &str,
        body: &serde_json::Value,
    ) -> Result<content_document::Model> {
        let text = serde_json::to_string(body)?;
        let updated_at = now_millis();

        let existing = content_document::Entity::find_by_id((
            collection.as_str().to_string(),
            id.to_string(),
        ))
        .one(&self.db)
        .await?;

        let model = match existing {
            Some(model) => {
                let mut active: content_document::ActiveModel = model.into();
                active.body = Set(text);
                active.updated_at = Set(updated_at);
                active.update(&self.db).await?
            }
            None => {
                content_document::ActiveModel {
                    collection: Set(collection.as_str().to_string()),
                    id: Set(id.to_string()),
                    body: Set(text),
                    updated_at: Set(updated_at),
                }
                .insert(&self.db)
                .await?
            }
        };

        tracing::debug!(%collection, document_id = id, "Stored content document");
        Ok(model)
    }

    pub async fn get_document(
        &self,
        collection: ContentCollection,
        id: &str,
    ) -> Result<content_document::Model> {
        content_document::Entity::find_by_id((collection.as_str().to_string(), id.to_string()))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} document {}", collection, id)))
    }

    pub async fn list_documents(
        &self,
        collection: ContentCollection,
    ) -> Result<Vec<content_document::Model>> {
        Ok(content_document::Entity::find()
            .filter(content_document::Column::Collection.eq(collection.as_str()))
            .order_by_asc(content_document::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn delete_document(&self, collection: ContentCollection, id: &str) -> Result<()> {
        let result = content_document::Entity::delete_by_id((
            collection.as_str().to_string(),
            id.to_string(),
        ))
        .exec(&self.db)
        .await?;

        if result.rows_affected == 0 {
            return Err(AppError::NotFound(format!("{} document {}", collection, id)));
        }
        Ok(())
    }
}
