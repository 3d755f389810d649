use serde::Serialize;
use std::collections::HashMap;

/// One word of the tag cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub word: String,
    pub count: usize,
}

/// Word frequencies over all tags, most frequent first, ties alphabetical.
///
/// Multi-word tags contribute each word; words are lower-cased.
pub fn tag_frequencies<'a>(tags: impl IntoIterator<Item = &'a String>) -> Vec<TagCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for word in tags.into_iter().flat_map(|tag| tag.split_whitespace()) {
        *counts.entry(word.to_lowercase()).or_default() += 1;
    }

    let mut words: Vec<TagCount> = counts
        .into_iter()
        .map(|(word, count)| TagCount { word, count })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_are_split_lowercased_and_ranked() {
        let tags: Vec<String> = ["Physics Wallah", "physics", "NEET", "neet 2024", "alakh"]
            .iter()
            .map(|t| t.to_string())
            .collect();

        let counts = tag_frequencies(&tags);

        let flat: Vec<_> = counts.iter().map(|c| (c.word.as_str(), c.count)).collect();
        assert_eq!(
            flat,
            [("neet", 2), ("physics", 2), ("2024", 1), ("alakh", 1), ("wallah", 1)]
        );
    }

    #[test]
    fn no_tags_no_words() {
        assert!(tag_frequencies(&Vec::<String>::new()).is_empty());
    }
}
