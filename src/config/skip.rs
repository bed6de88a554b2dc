use std::collections::HashSet;
use std::ops::RangeInclusive;

/// Acknowledgements and laughter that carry nothing worth translating.
pub const DEFAULT_FILLER_WORDS: &[&str] = &[
    "ok",
    "okay",
    "k",
    "yes",
    "no",
    "good",
    "nice",
    "cool",
    "thanks",
    "thx",
    "haha",
    "hahaha",
    "hehe",
    "lol",
    "好",
    "好的",
    "好喔",
    "嗯",
    "嗯嗯",
    "對",
    "是",
    "不是",
    "哈哈",
    "哈哈哈",
    "呵呵",
    "謝謝",
    "បាទ",
    "ចាស",
    "អូខេ",
    "អរគុណ",
    "ហាហា",
];

/// Emoji and dingbat blocks, plus the joiners and selectors used to compose emoji.
pub const DEFAULT_PICTOGRAPHIC_RANGES: &[RangeInclusive<u32>] = &[
    0x1f000..=0x1faff,
    0x2600..=0x27bf,
    0x2b00..=0x2bff,
    0x2190..=0x21ff,
    0x2300..=0x23ff,
    0xe0020..=0xe007f,
    0x3030..=0x3030,
    0x303d..=0x303d,
    0x3297..=0x3297,
    0x3299..=0x3299,
    0x00a9..=0x00a9,
    0x00ae..=0x00ae,
    0x203c..=0x203c,
    0x2049..=0x2049,
    0x2122..=0x2122,
    0x2139..=0x2139,
    0x20e3..=0x20e3,
    0x200d..=0x200d,
    0xfe0f..=0xfe0f,
];

#[derive(Debug, Clone)]
pub struct SkipPolicy {
    filler_words: HashSet<String>,
    pictographic_ranges: Vec<RangeInclusive<u32>>,
}

impl Default for SkipPolicy {
    fn default() -> Self {
        Self {
            filler_words: DEFAULT_FILLER_WORDS.iter().map(|w| w.to_string()).collect(),
            pictographic_ranges: DEFAULT_PICTOGRAPHIC_RANGES.to_vec(),
        }
    }
}

impl SkipPolicy {
    /// Replaces the filler allow-list. Entries are trimmed and lower-cased; blanks are dropped.
    pub fn with_filler_words<I, S>(mut self, words: I) -> Self
        where I: IntoIterator<Item = S>, S: AsRef<str>
    {
        self.filler_words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    pub fn with_pictographic_ranges(mut self, ranges: Vec<RangeInclusive<u32>>) -> Self {
        self.pictographic_ranges = ranges;
        self
    }

    pub fn is_filler(&self, normalized: &str) -> bool {
        self.filler_words.contains(normalized)
    }

    pub fn is_pictographic(&self, c: char) -> bool {
        let code = c as u32;
        self.pictographic_ranges.iter().any(|range| range.contains(&code))
    }
}

/// Decides whether an inbound message is worth sending to the backend.
#[derive(Debug, Clone, Default)]
pub struct SkipClassifier {
    policy: SkipPolicy,
}

impl SkipClassifier {
    pub fn new(policy: SkipPolicy) -> Self {
        Self { policy }
    }

    pub fn should_skip(&self, text: &str) -> bool {
        let trimmed = text.trim();

        if self.policy.is_filler(&trimmed.to_lowercase()) {
            return true;
        }
        if trimmed.is_empty() {
            return true;
        }

        // Anything left after stripping pictographs and whitespace is real content.
        !trimmed.chars().any(|c| !c.is_whitespace() && !self.policy.is_pictographic(c))
    }
}
