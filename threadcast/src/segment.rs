//! Splitting of oversized posts into numbered thread chunks.
//!
//! Lengths are counted in `char`s. A chunk is built from whole words and then
//! tagged with a ` (i/total)` marker; the marker always fits because the body
//! is truncated (with an ellipsis) when it would not.

/// Per-message limit on X.
pub const DEFAULT_MAX_CHARS: usize = 280;

/// Room kept free for the largest " (i/total)" marker.
pub const DEFAULT_SUFFIX_RESERVE: usize = 10;

const ELLIPSIS: char = '…';

/// Length limits used when paginating a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLimits {
    /// Hard platform maximum for a whole message, suffix included
    pub max_chars: usize,
    /// Characters subtracted from `max_chars` to get the content budget
    pub suffix_reserve: usize,
}

impl Default for SegmentLimits {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            suffix_reserve: DEFAULT_SUFFIX_RESERVE,
        }
    }
}

impl SegmentLimits {
    pub fn new(max_chars: usize, suffix_reserve: usize) -> Self {
        Self {
            max_chars,
            suffix_reserve,
        }
    }

    /// Characters available for words in each chunk before the marker is appended.
    pub fn content_budget(&self) -> usize {
        self.max_chars.saturating_sub(self.suffix_reserve)
    }

    pub fn fits(&self, text: &str) -> bool {
        char_len(text) <= self.max_chars
    }

    /// Reject limits that leave no room for content next to the shortest marker.
    pub fn validate(&self) -> Result<(), String> {
        let floor = self.suffix_reserve.max(marker_len(1));
        if self.max_chars <= floor {
            return Err(format!(
                "max_chars ({}) must exceed both suffix_reserve ({}) and the {}-char page marker",
                self.max_chars,
                self.suffix_reserve,
                marker_len(1)
            ));
        }
        Ok(())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Length of the widest marker for a thread of `total` chunks, ` (total/total)`.
fn marker_len(total: usize) -> usize {
    let digits = total.to_string().len();
    4 + 2 * digits
}

/// Greedily pack whitespace-delimited words into chunks of at most `budget` chars.
///
/// A word longer than `budget` is emitted verbatim as a chunk of its own.
pub fn pack_words(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = char_len(word);
        let separator = usize::from(!current.is_empty());

        if current_len + separator + word_len <= budget {
            if separator == 1 {
                current.push(' ');
            }
            current.push_str(word);
            current_len += separator + word_len;
        } else {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current.push_str(word);
            current_len = word_len;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Append the ` (index/total)` marker, truncating the body if needed.
fn with_marker(body: &str, index: usize, total: usize, max_chars: usize) -> String {
    let marker = format!(" ({}/{})", index, total);
    let marker_len = char_len(&marker);

    if char_len(body) + marker_len <= max_chars {
        return format!("{}{}", body, marker);
    }

    let keep = max_chars.saturating_sub(marker_len + 1);
    let truncated: String = body.chars().take(keep).collect();
    format!("{}{}{}", truncated.trim_end(), ELLIPSIS, marker)
}

/// Split `text` into numbered chunks, each no longer than `limits.max_chars`.
///
/// Returns an empty vector for text without any words.
///
/// The configured reserve grows to the real marker width when the chunk count
/// needs more digits, and the words are packed again.
pub fn paginate(text: &str, limits: &SegmentLimits) -> Vec<String> {
    let mut reserve = limits.suffix_reserve;
    let bodies = loop {
        let budget = limits.max_chars.saturating_sub(reserve).max(1);
        let bodies = pack_words(text, budget);
        let needed = marker_len(bodies.len());
        if needed <= reserve || budget == 1 {
            break bodies;
        }
        reserve = needed;
    };
    let total = bodies.len();

    bodies
        .iter()
        .enumerate()
        .map(|(i, body)| with_marker(body, i + 1, total, limits.max_chars))
        .collect()
}

/// Thread items for a single post: the post itself when it fits, its pages otherwise.
pub fn expand_post(text: &str, limits: &SegmentLimits) -> Vec<String> {
    if limits.fits(text) {
        vec![text.to_string()]
    } else {
        paginate(text, limits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_marker(chunk: &str) -> &str {
        let (body, _) = chunk.rsplit_once(" (").expect("chunk has a marker");
        body
    }

    fn sample_texts() -> Vec<String> {
        let lorem = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, sed do eiusmod \
                     tempor incididunt ut labore et dolore magna aliqua. Ut enim ad minim veniam, \
                     quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea commodo consequat.";
        vec![
            "short post".to_string(),
            lorem.repeat(3),
            lorem.repeat(12),
            "🚀 rocket emoji threads are fun ".repeat(40),
            "word ".repeat(500),
            "a\n\nthread   with\tirregular    whitespace ".repeat(30),
        ]
    }

    #[test]
    fn every_chunk_fits_the_platform_limit() {
        let limits = SegmentLimits::default();
        for text in sample_texts() {
            for chunk in paginate(&text, &limits) {
                assert!(
                    chunk.chars().count() <= limits.max_chars,
                    "chunk too long ({} chars): {}",
                    chunk.chars().count(),
                    chunk
                );
            }
        }
    }

    #[test]
    fn bodies_rejoin_to_original_words() {
        let limits = SegmentLimits::default();
        for text in sample_texts() {
            let chunks = paginate(&text, &limits);
            let rejoined = chunks.iter().map(|c| strip_marker(c)).collect::<Vec<_>>().join(" ");
            let original = text.split_whitespace().collect::<Vec<_>>().join(" ");
            assert_eq!(rejoined, original);
        }
    }

    #[test]
    fn markers_count_up_to_total() {
        let limits = SegmentLimits::default();
        let text = "lorem ipsum ".repeat(100);
        let chunks = paginate(&text, &limits);
        let total = chunks.len();
        assert!(total > 1);

        for (i, chunk) in chunks.iter().enumerate() {
            assert!(chunk.ends_with(&format!(" ({}/{})", i + 1, total)), "bad marker: {}", chunk);
        }
    }

    #[test]
    fn pagination_is_deterministic() {
        let limits = SegmentLimits::new(100, 10);
        for text in sample_texts() {
            assert_eq!(paginate(&text, &limits), paginate(&text, &limits));
        }
    }

    #[test]
    fn greedy_packing_respects_budget_boundary() {
        // "aaaa bbbb" is exactly 9 chars, so it fits a budget of 9 but not 8
        assert_eq!(pack_words("aaaa bbbb cc", 9), vec!["aaaa bbbb", "cc"]);
        assert_eq!(pack_words("aaaa bbbb cc", 8), vec!["aaaa", "bbbb cc"]);
    }

    #[test]
    fn oversized_word_gets_its_own_chunk() {
        let long_word = "x".repeat(30);
        let text = format!("one two {} three", long_word);
        let chunks = pack_words(&text, 20);
        assert_eq!(chunks, vec!["one two".to_string(), long_word, "three".to_string()]);
    }

    #[test]
    fn single_word_at_platform_limit_is_truncated_before_marker() {
        let limits = SegmentLimits::default();
        let text = "a".repeat(limits.max_chars);

        let chunks = paginate(&text, &limits);

        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert!(chunk.ends_with("… (1/1)"), "unexpected chunk: {}", chunk);
        assert_eq!(chunk.chars().count(), limits.max_chars);
    }

    #[test]
    fn text_that_fits_budget_gets_single_marker() {
        let limits = SegmentLimits::default();
        assert_eq!(paginate("hello world", &limits), vec!["hello world (1/1)"]);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        let limits = SegmentLimits::default();
        assert!(paginate("", &limits).is_empty());
        assert!(paginate(" \n\t ", &limits).is_empty());
    }

    #[test]
    fn multibyte_text_is_measured_in_chars() {
        let limits = SegmentLimits::new(40, 10);
        let text = "é".repeat(25) + " " + &"ü".repeat(25);
        let chunks = paginate(&text, &limits);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{} (1/2)", "é".repeat(25)));
        assert!(chunks.iter().all(|c| c.chars().count() <= 40));
    }

    #[test]
    fn small_reserve_grows_to_fit_marker() {
        let limits = SegmentLimits::new(20, 2);
        let chunks = paginate("aaaaaaaa bbbbbbbbb cc", &limits);

        assert_eq!(chunks, vec!["aaaaaaaa (1/2)", "bbbbbbbbb cc (2/2)"]);
    }

    #[test]
    fn wide_markers_do_not_eat_words() {
        // 150 chunks need " (150/150)", wider than a reserve of 6
        let limits = SegmentLimits::new(20, 6);
        let text = vec!["abcdefg"; 150].join(" ");

        let chunks = paginate(&text, &limits);

        assert_eq!(chunks.len(), 150);
        assert!(chunks.iter().all(|c| !c.contains(ELLIPSIS)));
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
        assert_eq!(chunks[149], "abcdefg (150/150)");
    }

    #[test]
    fn limits_without_room_for_content_are_rejected() {
        assert!(SegmentLimits::new(5, 0).validate().is_err());
        assert!(SegmentLimits::new(10, 10).validate().is_err());
        assert!(SegmentLimits::new(20, 2).validate().is_ok());
        assert!(SegmentLimits::default().validate().is_ok());
    }

    #[test]
    fn expand_post_leaves_fitting_posts_untouched() {
        let limits = SegmentLimits::default();
        let post = "a".repeat(limits.max_chars);
        assert_eq!(expand_post(&post, &limits), vec![post.clone()]);

        let long_post = "word ".repeat(100);
        let items = expand_post(&long_post, &limits);
        assert!(items.len() > 1);
        assert!(items[0].ends_with(&format!("(1/{})", items.len())));
    }
}
