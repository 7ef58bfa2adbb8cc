use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, Json, Object, Result as GraphQLResult, Schema};
use serde_json::Value;

use crate::handlers::ImportPayload;
use crate::models::*;
use crate::sync::IngestionPipeline;

pub type IngestionSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(pipeline: Arc<IngestionPipeline>) -> IngestionSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(pipeline)
        .finish()
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Health check
    async fn health(&self) -> GraphQLResult<String> {
        Ok("OK".to_string())
    }

    /// Stored technology correlated with `external_id`, if any.
    async fn check_existing(
        &self,
        ctx: &Context<'_>,
        external_id: String,
    ) -> GraphQLResult<Option<Json<Value>>> {
        let pipeline = ctx.data::<Arc<IngestionPipeline>>()?;
        let existing = pipeline.check_existing(&external_id).await?;
        Ok(existing.map(|record| {
            let updated_at: chrono::DateTime<chrono::Utc> = record.updated_at.to_chrono();
            Json(serde_json::json!({
                "storeId": record.id,
                "externalId": record.external_id,
                "nameEn": record.name_en,
                "nameZh": record.name_zh,
                "imageUrl": record.image_url,
                "companyLogoUrl": record.company_logo_url,
                "reviewStatus": record.review_status,
                "updatedAt": updated_at.to_rfc3339(),
            }))
        }))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Imports a batch: `{ items: [...], config: { category, subcategory, onDuplicate, decisions, corrections } }`.
    /// A bare array of records is accepted as well.
    async fn batch_import(&self, ctx: &Context<'_>, input: Json<Value>) -> GraphQLResult<Json<BatchReport>> {
        let pipeline = ctx.data::<Arc<IngestionPipeline>>()?;
        let payload: ImportPayload = match input.0 {
            Value::Array(items) => ImportPayload {
                items: serde_json::from_value(Value::Array(items))?,
                config: None,
            },
            other => serde_json::from_value(other)?,
        };
        let config = payload.config.unwrap_or_default();
        let report = pipeline.run(&payload.items, &config).await;
        Ok(Json(report))
    }
}
