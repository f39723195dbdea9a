//! Blog post model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Record, RecordId, unknown_created_at};
use crate::error::{ValidationError, require};

/// Author image used when a submission doesn't include one
pub const DEFAULT_AUTHOR_IMAGE: &str = "/profile_icon.png";

/// Blog category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Technology,
    Startup,
    Lifestyle,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Technology, Category::Startup, Category::Lifestyle];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Technology => "Technology",
            Category::Startup => "Startup",
            Category::Lifestyle => "Lifestyle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Parse a category name, ignoring case and surrounding whitespace
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::MissingField("Category"));
        }
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::UnknownCategory(s.to_string()))
    }
}

/// A published blog post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: RecordId,
    pub title: String,
    /// Rich text body (HTML)
    pub description: String,
    pub category: Category,
    /// Reference to the cover image (URL path or data URI)
    pub image: String,
    pub author: String,
    #[serde(rename = "authorImg", alias = "authorImage", default)]
    pub author_img: String,
    #[serde(alias = "date", default = "unknown_created_at")]
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new, unsaved post
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: Category,
        author: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::default(),
            title: title.into(),
            description: description.into(),
            category,
            image: image.into(),
            author: author.into(),
            author_img: DEFAULT_AUTHOR_IMAGE.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_author_img(mut self, author_img: impl Into<String>) -> Self {
        self.author_img = author_img.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

impl Record for Post {
    const COLLECTION: &'static str = "blogs";

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn set_id(&mut self, id: RecordId) {
        self.id = id;
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("Title", &self.title)?;
        require("Description", &self.description)?;
        require("Author", &self.author)?;
        require("Image", &self.image)?;
        Ok(())
    }

    fn asset_refs(&self) -> Vec<&str> {
        vec![self.image.as_str()]
    }
}

/// Raw admin submission, before the image has been stored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    #[serde(alias = "authorImage")]
    pub author_img: Option<String>,
}

impl PostDraft {
    /// Check the text fields of the submission
    ///
    /// Runs before the image is stored so a bad submission leaves no asset
    /// behind.
    pub fn check(&self) -> Result<Category, ValidationError> {
        require("Title", self.title.as_deref().unwrap_or_default())?;
        require("Description", self.description.as_deref().unwrap_or_default())?;
        let category = self.category.as_deref().unwrap_or_default().parse()?;
        require("Author", self.author.as_deref().unwrap_or_default())?;
        Ok(category)
    }

    /// Build the post once the image reference is known
    pub fn into_post(self, image: impl Into<String>) -> Result<Post, ValidationError> {
        let category = self.check()?;
        let author_img = self
            .author_img
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR_IMAGE.to_string());

        let post = Post::new(
            self.title.unwrap_or_default().trim(),
            self.description.unwrap_or_default(),
            category,
            self.author.unwrap_or_default().trim(),
            image,
        )
        .with_author_img(author_img);

        post.validate()?;
        Ok(post)
    }
}
