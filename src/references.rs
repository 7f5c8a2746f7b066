// ABOUTME: Reverse lookup of content documents that embed a media id
// ABOUTME: REFERENCE_FIELDS is the hand-maintained list every delete-guard decision depends on

use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::entities::content_document;
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentCollection {
    TeamMembers,
    Spectacles,
    Events,
    Partners,
    Settings,
    Festivals,
    Stages,
    Residences,
    Articles,
}

impl ContentCollection {
    pub const ALL: [ContentCollection; 9] = [
        ContentCollection::TeamMembers,
        ContentCollection::Spectacles,
        ContentCollection::Events,
        ContentCollection::Partners,
        ContentCollection::Settings,
        ContentCollection::Festivals,
        ContentCollection::Stages,
        ContentCollection::Residences,
        ContentCollection::Articles,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentCollection::TeamMembers => "team_members",
            ContentCollection::Spectacles => "spectacles",
            ContentCollection::Events => "events",
            ContentCollection::Partners => "partners",
            ContentCollection::Settings => "settings",
            ContentCollection::Festivals => "festivals",
            ContentCollection::Stages => "stages",
            ContentCollection::Residences => "residences",
            ContentCollection::Articles => "articles",
        }
    }
}

impl fmt::Display for ContentCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentCollection {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        ContentCollection::ALL
            .into_iter()
            .find(|collection| collection.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("Unknown content collection: {}", s)))
    }
}

/// How a field carries media ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldShape {
    /// A single string holding the id or its permalink path.
    Scalar,
    /// An array of such strings.
    List,
    /// Arbitrary JSON in which the id may appear anywhere.
    Embedded,
}

#[derive(Debug, Clone, Copy)]
pub struct ReferenceField {
    pub name: &'static str,
    pub shape: FieldShape,
}

const fn scalar(name: &'static str) -> ReferenceField {
    ReferenceField { name, shape: FieldShape::Scalar }
}

/// Every content field that may hold a media id.
///
/// The store enforces no foreign keys, so a field that embeds media ids but is
/// missing here lets `delete` remove media that is still displayed. Any new
/// content field holding a media id must be added to this table in the same
/// change; `test_every_collection_is_scanned` fails for a collection without
/// an entry.
pub const REFERENCE_FIELDS: &[(ContentCollection, &[ReferenceField])] = &[
    (ContentCollection::TeamMembers, &[scalar("image"), scalar("mediaId")]),
    (
        ContentCollection::Spectacles,
        &[
            scalar("image"),
            ReferenceField { name: "gallery", shape: FieldShape::List },
            scalar("dossierUrl"),
        ],
    ),
    (ContentCollection::Events, &[scalar("image")]),
    (ContentCollection::Partners, &[scalar("logo"), scalar("mediaId")]),
    (
        ContentCollection::Settings,
        &[ReferenceField { name: "value", shape: FieldShape::Embedded }],
    ),
    (ContentCollection::Festivals, &[scalar("image"), scalar("mediaId")]),
    (ContentCollection::Stages, &[scalar("mediaId")]),
    (ContentCollection::Residences, &[scalar("image"), scalar("mediaId")]),
    (ContentCollection::Articles, &[scalar("image")]),
];

/// One content document field currently pointing at a media asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub collection: String,
    pub document_id: String,
    pub field: String,
}

pub fn permalink_path(id: Uuid) -> String {
    format!("/media/{}", id)
}

/// Spellings of `id` a content field may hold: the bare id, the permalink,
/// and the `/api/media` alias. All lowercase; matching lowercases the field.
fn id_forms(id: Uuid) -> [String; 3] {
    [id.to_string(), permalink_path(id), format!("/api/media/{}", id)]
}

fn field_condition(field: &ReferenceField, id: Uuid) -> sea_orm::sea_query::SimpleExpr {
    let path = format!("$.{}", field.name);
    let [bare, permalink, api_permalink] = id_forms(id);
    match field.shape {
        FieldShape::Scalar => Expr::cust_with_values(
            "lower(json_extract(body, ?)) IN (?, ?, ?)",
            [path, bare, permalink, api_permalink],
        ),
        FieldShape::List => Expr::cust_with_values(
            "EXISTS (SELECT 1 FROM json_each(body, ?) WHERE lower(json_each.value) IN (?, ?, ?))",
            [path, bare, permalink, api_permalink],
        ),
        // Every spelling contains the bare id
        FieldShape::Embedded => Expr::cust_with_values(
            "lower(json_extract(body, ?)) LIKE ?",
            [path, format!("%{}%", bare)],
        ),
    }
}

/// Scans every field in [`REFERENCE_FIELDS`] for `id`.
///
/// Generic over the connection so the delete path can run it inside its
/// transaction.
pub async fn compute_references<C>(conn: &C, id: Uuid) -> Result<Vec<Reference>>
where
    C: ConnectionTrait,
{
    let mut references = Vec::new();

    for (collection, fields) in REFERENCE_FIELDS {
        for field in fields.iter() {
            let document_ids: Vec<String> = content_document::Entity::find()
                .select_only()
                .column(content_document::Column::Id)
                .filter(content_document::Column::Collection.eq(collection.as_str()))
                .filter(field_condition(field, id))
                .order_by_asc(content_document::Column::Id)
                .into_tuple()
                .all(conn)
                .await?;

            references.extend(document_ids.into_iter().map(|document_id| Reference {
                collection: collection.to_string(),
                document_id,
                field: field.name.to_string(),
            }));
        }
    }

    tracing::debug!(media_id = %id, count = references.len(), "Computed media references");
    Ok(references)
}
