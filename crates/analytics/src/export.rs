//! CSV renderings of the video table and of scored comments.

use crate::comments::{ScoredComment, strip_html};
use crate::filter::VideoRow;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to finish CSV output: {0}")]
    Flush(String),
}

#[derive(Serialize)]
struct VideoRecord<'a> {
    #[serde(rename = "Video ID")]
    id: &'a str,
    #[serde(rename = "Title")]
    title: &'a str,
    #[serde(rename = "Published Date")]
    published_date: String,
    #[serde(rename = "Views")]
    view_count: u64,
    #[serde(rename = "Likes")]
    like_count: u64,
    #[serde(rename = "Comments")]
    comment_count: u64,
    #[serde(rename = "Like/View Ratio")]
    like_to_view_ratio: f64,
    #[serde(rename = "Tags")]
    tags: String,
}

#[derive(Serialize)]
struct CommentRecord<'a> {
    #[serde(rename = "Author")]
    author: &'a str,
    #[serde(rename = "Comment")]
    text: String,
    #[serde(rename = "Likes")]
    like_count: u64,
    #[serde(rename = "Published Date")]
    published_at: String,
    #[serde(rename = "Sentiment")]
    sentiment: &'static str,
    #[serde(rename = "Comment ID")]
    id: &'a str,
}

fn write_records<T>(records: impl IntoIterator<Item = T>) -> Result<String, ExportError>
where
    T: Serialize,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::Flush(e.to_string()))
}

/// One line per row; tags joined with `; `
pub fn videos_csv(rows: &[VideoRow]) -> Result<String, ExportError> {
    write_records(rows.iter().map(|row| VideoRecord {
        id: &row.id,
        title: &row.title,
        published_date: row.published_date.to_rfc3339(),
        view_count: row.view_count,
        like_count: row.like_count,
        comment_count: row.comment_count,
        like_to_view_ratio: row.like_to_view_ratio,
        tags: row.tags.join("; "),
    }))
}

/// Comment text is written without its HTML markup
pub fn comments_csv(comments: &[ScoredComment]) -> Result<String, ExportError> {
    write_records(comments.iter().map(|scored| CommentRecord {
        author: &scored.comment.author,
        text: strip_html(&scored.comment.text),
        like_count: scored.comment.like_count,
        published_at: scored.comment.published_at.to_rfc3339(),
        sentiment: scored.sentiment.as_str(),
        id: &scored.comment.id,
    }))
}
