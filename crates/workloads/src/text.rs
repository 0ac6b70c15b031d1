//! Synthetic text for generated rows.
//!
//! Every helper draws from the caller's RNG, so a seeded `StdRng` yields the
//! same text on every run.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// 2024-01-01T00:00:00Z. Generated timestamps count back from here.
const EPOCH_SECONDS: i64 = 1_704_067_200;

const ADJECTIVES: &[&str] = &[
    "compact", "durable", "wireless", "ergonomic", "portable", "premium", "classic", "smart",
    "lightweight", "waterproof", "vintage", "modular", "silent", "rugged", "organic", "foldable",
];

const NOUNS: &[&str] = &[
    "headphones", "backpack", "keyboard", "kettle", "lamp", "jacket", "camera", "speaker",
    "monitor", "blender", "tent", "watch", "chair", "notebook", "bicycle", "charger",
];

const CATEGORIES: &[&str] = &[
    "Electronics", "Home", "Kitchen", "Outdoors", "Fashion", "Sports", "Office", "Garden",
    "Toys", "Books", "Beauty", "Automotive",
];

const TOPICS: &[&str] = &[
    "indexing", "replication", "caching", "query planning", "vector search", "embeddings",
    "sharding", "backups", "observability", "schema design", "connection pooling", "migrations",
    "transactions", "compression", "access control", "capacity planning",
];

const WORDS: &[&str] = &[
    "the", "system", "data", "fast", "reliable", "user", "request", "latency", "throughput",
    "storage", "model", "result", "cluster", "node", "table", "vector", "index", "query",
    "improves", "reduces", "handles", "supports", "with", "for", "across", "under", "load",
    "design", "quality", "simple", "daily", "value", "feature", "customer", "team", "release",
];

const FIRST_NAMES: &[&str] = &[
    "Alex", "Sam", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Avery", "Quinn",
    "Robin", "Drew", "Skyler", "Reese", "Emery", "Rowan",
];

const LAST_NAMES: &[&str] = &[
    "Nguyen", "Garcia", "Smith", "Kim", "Okafor", "Silva", "Müller", "Rossi", "Tanaka", "Haddad",
    "Novak", "Larsen", "Dubois", "Patel", "Cohen", "Moreau",
];

const CITIES: &[&str] = &[
    "Lisbon", "Osaka", "Toronto", "Nairobi", "Berlin", "Austin", "Melbourne", "Seoul", "Lyon",
    "Bogotá", "Oslo", "Pune",
];

const COUNTRIES: &[&str] = &["US", "DE", "JP", "FR", "IT", "KR", "SE", "BR", "IN", "GB"];

pub fn pick<'a, R: Rng + ?Sized>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.gen_range(0..items.len())]
}

/// Capitalized sentence of `words` words, ending with a period.
pub fn sentence<R: Rng + ?Sized>(rng: &mut R, words: usize) -> String {
    let mut text = (0..words.max(1))
        .map(|_| pick(&mut *rng, WORDS))
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(first) = text.get(..1) {
        text = first.to_uppercase() + &text[1..];
    }
    text.push('.');
    text
}

pub fn paragraph<R: Rng + ?Sized>(rng: &mut R, sentences: usize) -> String {
    (0..sentences.max(1))
        .map(|_| {
            let words = rng.gen_range(6..14);
            sentence(&mut *rng, words)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn person_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, FIRST_NAMES), pick(rng, LAST_NAMES))
}

/// Unique address derived from the row id.
pub fn email(name: &str, id: i64) -> String {
    let local: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect::<String>()
        .to_ascii_lowercase()
        .replace(' ', ".");
    format!("{local}.{id}@example.com")
}

pub fn city<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, CITIES)
}

pub fn country<R: Rng + ?Sized>(rng: &mut R) -> &'static str {
    pick(rng, COUNTRIES)
}

pub fn product_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = pick(rng, ADJECTIVES);
    let noun = pick(rng, NOUNS);
    format!("{adjective} {noun}")
}

/// Category names cycle through a fixed list, numbered once it wraps.
pub fn category_name(id: i64) -> String {
    let index = (id - 1).rem_euclid(CATEGORIES.len() as i64) as usize;
    let round = (id - 1) / CATEGORIES.len() as i64;
    if round == 0 {
        CATEGORIES[index].to_string()
    } else {
        format!("{} {}", CATEGORIES[index], round + 1)
    }
}

pub fn brand_name<R: Rng + ?Sized>(rng: &mut R, id: i64) -> String {
    format!("{} {}", pick(rng, LAST_NAMES), id)
}

pub fn article_title<R: Rng + ?Sized>(rng: &mut R) -> String {
    let topic = pick(rng, TOPICS);
    let angle = pick(
        rng,
        &["A guide to", "Notes on", "Rethinking", "Scaling", "Debugging", "Lessons from"],
    );
    format!("{angle} {topic}")
}

/// Comma-separated list of two or three topics.
pub fn tags<R: Rng + ?Sized>(rng: &mut R) -> String {
    let count = rng.gen_range(2..=3);
    (0..count)
        .map(|_| pick(&mut *rng, TOPICS))
        .collect::<Vec<_>>()
        .join(",")
}

/// Free-text search phrase resembling what a user would type.
pub fn search_phrase<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, ADJECTIVES), pick(rng, TOPICS))
}

pub fn price<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    (rng.gen_range(199..50_000) as f64) / 100.0
}

/// Timestamp within `days` days before the generation epoch.
pub fn timestamp_within<R: Rng + ?Sized>(rng: &mut R, days: i64) -> DateTime<Utc> {
    let offset = rng.gen_range(0..=days.max(0) * 86_400);
    DateTime::from_timestamp(EPOCH_SECONDS - offset, 0).unwrap_or_default()
}

/// A moment strictly after `start`, at most `days` days later.
pub fn timestamp_after<R: Rng + ?Sized>(
    rng: &mut R,
    start: DateTime<Utc>,
    days: i64,
) -> DateTime<Utc> {
    start + Duration::seconds(rng.gen_range(1..=days.max(1) * 86_400))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deterministic_text() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        assert_eq!(paragraph(&mut a, 3), paragraph(&mut b, 3));
        assert_eq!(person_name(&mut a), person_name(&mut b));
        assert_eq!(timestamp_within(&mut a, 30), timestamp_within(&mut b, 30));
    }

    #[test]
    fn test_sentence_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let text = sentence(&mut rng, 5);
        assert!(text.ends_with('.'));
        assert_eq!(text.split(' ').count(), 5);
        assert!(text.chars().next().unwrap().is_uppercase());
    }

    #[test]
    fn test_category_names_unique() {
        let names: std::collections::HashSet<String> = (1..=40).map(category_name).collect();
        assert_eq!(names.len(), 40);
        assert_eq!(category_name(1), "Electronics");
    }

    #[test]
    fn test_email_is_ascii() {
        assert_eq!(email("Robin Müller", 7), "robin.mller.7@example.com");
    }

    #[test]
    fn test_timestamps_ordered() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let start = timestamp_within(&mut rng, 365);
            assert!(start.timestamp() <= EPOCH_SECONDS);
            assert!(timestamp_after(&mut rng, start, 10) > start);
        }
    }
}
