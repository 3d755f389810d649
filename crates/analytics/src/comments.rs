//! Keyword sentiment and commenter rankings for a video's comments.

use domain::Comment;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Commenters listed in [`CommentSummary::top_commenters`]
pub const TOP_COMMENTERS: usize = 10;

const POSITIVE_WORDS: &[&str] = &[
    "good",
    "great",
    "excellent",
    "amazing",
    "awesome",
    "love",
    "best",
    "fantastic",
    "wonderful",
    "perfect",
    "brilliant",
    "outstanding",
    "helpful",
    "thanks",
    "thank",
    "nice",
    "beautiful",
    "superb",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "terrible",
    "awful",
    "worst",
    "hate",
    "poor",
    "horrible",
    "disappointing",
    "useless",
    "waste",
    "boring",
    "annoying",
    "stupid",
];

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn from_score(score: i32) -> Self {
        match score {
            s if s > 0 => Self::Positive,
            s if s < 0 => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Neutral => "Neutral",
            Self::Negative => "Negative",
        }
    }
}

/// Comment bodies arrive as display HTML
pub fn strip_html(text: &str) -> String {
    HTML_TAG.replace_all(text, "").into_owned()
}

/// +1 for every positive keyword present, -1 for every negative one.
///
/// Keywords match as case-insensitive substrings, each counted once.
pub fn sentiment_score(text: &str) -> i32 {
    let lower = text.to_lowercase();
    let hits = |words: &[&str]| words.iter().filter(|word| lower.contains(*word)).count() as i32;
    hits(POSITIVE_WORDS) - hits(NEGATIVE_WORDS)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub score: i32,
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommenterCount {
    pub author: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentSummary {
    pub comments: Vec<ScoredComment>,
    /// Mean per-comment score; 0 without comments
    pub sentiment_score: f64,
    pub sentiment_counts: SentimentCounts,
    pub top_commenters: Vec<CommenterCount>,
}

pub fn summarize_comments(comments: &[Comment]) -> CommentSummary {
    let scored: Vec<ScoredComment> = comments
        .iter()
        .map(|comment| {
            let score = sentiment_score(&strip_html(&comment.text));
            ScoredComment {
                comment: comment.clone(),
                score,
                sentiment: Sentiment::from_score(score),
            }
        })
        .collect();

    let mut counts = SentimentCounts::default();
    for comment in &scored {
        match comment.sentiment {
            Sentiment::Positive => counts.positive += 1,
            Sentiment::Neutral => counts.neutral += 1,
            Sentiment::Negative => counts.negative += 1,
        }
    }

    let sentiment_score = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|c| f64::from(c.score)).sum::<f64>() / scored.len() as f64
    };

    CommentSummary {
        top_commenters: top_commenters(comments),
        comments: scored,
        sentiment_score,
        sentiment_counts: counts,
    }
}

/// Most frequent authors, ties broken by name
fn top_commenters(comments: &[Comment]) -> Vec<CommenterCount> {
    let mut by_author: HashMap<&str, usize> = HashMap::new();
    for comment in comments {
        *by_author.entry(comment.author.as_str()).or_default() += 1;
    }

    let mut ranked: Vec<CommenterCount> = by_author
        .into_iter()
        .map(|(author, count)| CommenterCount {
            author: author.to_string(),
            count,
        })
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.author.cmp(&b.author)));
    ranked.truncate(TOP_COMMENTERS);
    ranked
}
