use crate::article::Sentiment;
use crate::text::keyword_hits;

const POSITIVE_WORDS: &[&str] = &[
    "success", "win", "growth", "gain", "profit", "increase", "improve",
    "achieve", "milestone", "record", "best", "excellent", "breakthrough",
    "innovation", "advance", "surge", "boost", "rise", "soar", "recover",
];

const NEGATIVE_WORDS: &[&str] = &[
    "loss", "fail", "crash", "drop", "decline", "fall", "collapse", "crisis",
    "disaster", "worst", "violence", "death", "kill", "attack", "scam",
    "fraud", "corrupt", "accident", "fire", "shortage", "slump", "plunge",
];

/// Label a piece of text by counting distinct positive and negative words.
///
/// One side has to lead by more than one word before the text is labelled
/// anything other than neutral.
pub fn classify(text: &str) -> Sentiment {
    let lower = text.to_lowercase();
    let count = |words: &[&str]| words.iter().filter(|w| keyword_hits(&lower, w) > 0).count();

    let positive = count(POSITIVE_WORDS);
    let negative = count(NEGATIVE_WORDS);

    if positive > negative + 1 {
        Sentiment::Positive
    } else if negative > positive + 1 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}
