use axum::{
    Json,
    extract::{
        Multipart, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::HeaderMap,
};
use blog::{DeleteOutcome, ImageUpload, PostDraft};
use log::warn;
use serde_json::{Value, json};

use super::{IdQuery, failure};
use crate::state::AppState;

/// `GET /api/blog[?id=]`
pub async fn list_or_get(
    State(state): State<AppState>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Json<Value> {
    match IdQuery::requested(query) {
        Some(id) => {
            let post = state.run(move |site| site.blogs.get(&id)).await.flatten();
            match post.map(serde_json::to_value) {
                Some(Ok(post)) => Json(post),
                Some(Err(e)) => {
                    warn!("Failed to serialize post: {}", e);
                    failure("Blog not found")
                }
                None => failure("Blog not found"),
            }
        }
        None => {
            let blogs = state.run(|site| site.blogs.list()).await.unwrap_or_default();
            Json(json!({ "blogs": blogs }))
        }
    }
}

/// `POST /api/blog` (multipart)
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Json<Value> {
    if let Err(msg) = state.authorize(&headers) {
        return failure(msg);
    }

    let (draft, image) = match multipart {
        Ok(multipart) => match read_submission(multipart).await {
            Ok(submission) => submission,
            Err(e) => {
                warn!("Malformed blog submission: {}", e);
                return failure("Failed to add blog. Please try again.");
            }
        },
        Err(e) => {
            warn!("Blog submission is not multipart: {}", e);
            return failure("Failed to add blog. Please try again.");
        }
    };

    match state.run(move |site| site.create_post(draft, image)).await {
        Some(Ok(outcome)) if outcome.used_fallback() => Json(json!({
            "success": true,
            "msg": "Blog Added Successfully! (Local Storage)",
            "blogId": outcome.id,
            "usedFallback": true,
        })),
        Some(Ok(outcome)) => Json(json!({
            "success": true,
            "msg": "Blog Added Successfully!",
            "blogId": outcome.id,
        })),
        Some(Err(e)) => failure(e.to_string()),
        None => failure("Failed to add blog. Please try again."),
    }
}

/// `DELETE /api/blog?id=`
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Json<Value> {
    if let Err(msg) = state.authorize(&headers) {
        return failure(msg);
    }

    let Some(id) = IdQuery::requested(query) else {
        return Json(json!({ "msg": "No blog ID provided" }));
    };

    let msg = match state.run(move |site| site.blogs.delete(&id)).await {
        Some(DeleteOutcome::Primary) => "Blog Deleted Successfully!",
        Some(DeleteOutcome::Fallback) => "Blog Deleted Successfully! (Local Storage)",
        Some(DeleteOutcome::NotFound) => "Blog not found",
        None => "Failed to delete blog",
    };
    Json(json!({ "msg": msg }))
}

/// Collect the text fields and the image file from a submission
async fn read_submission(
    mut multipart: Multipart,
) -> Result<(PostDraft, Option<ImageUpload>), MultipartError> {
    let mut draft = PostDraft::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await?;
                image = Some(ImageUpload {
                    name: file_name,
                    bytes: bytes.to_vec(),
                });
            }
            "title" => draft.title = Some(field.text().await?),
            "description" => draft.description = Some(field.text().await?),
            "category" => draft.category = Some(field.text().await?),
            "author" => draft.author = Some(field.text().await?),
            "authorImg" | "authorImage" => draft.author_img = Some(field.text().await?),
            _ => {}
        }
    }

    Ok((draft, image))
}
