//! Sample posts for a fresh local record file

use chrono::{Duration, Utc};

use crate::models::{Category, Post};

/// Posts shown before anything has been published
///
/// Only used to seed the local blog file when it doesn't exist yet.
pub fn sample_posts() -> Vec<Post> {
    let now = Utc::now();
    let entries = [
        (
            "sample1",
            "Getting Started with Rust Web Services",
            "Learn how to build small, fast web backends with Rust.",
            Category::Technology,
            "/blog_pic_1.png",
            "John Doe",
        ),
        (
            "sample2",
            "The Future of Web Development",
            "Exploring the latest trends and technologies in web development.",
            Category::Technology,
            "/blog_pic_2.png",
            "Jane Smith",
        ),
        (
            "sample3",
            "Building a Successful Startup",
            "Essential tips and strategies for launching your startup.",
            Category::Startup,
            "/blog_pic_3.png",
            "Mike Johnson",
        ),
        (
            "sample4",
            "Healthy Lifestyle Tips",
            "Simple ways to maintain a healthy and balanced lifestyle.",
            Category::Lifestyle,
            "/blog_pic_4.png",
            "Sarah Wilson",
        ),
    ];

    entries
        .into_iter()
        .enumerate()
        .map(|(i, (id, title, description, category, image, author))| {
            Post::new(title, description, category, author, image)
                .with_id(id)
                .with_created_at(now - Duration::minutes(i as i64))
        })
        .collect()
}
