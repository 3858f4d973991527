use serde::{Deserialize, Serialize};

/// One curated RSS feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub url: String,
    pub category: String,
    pub description: String,
}

impl FeedConfig {
    pub fn new(name: &str, url: &str, category: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            category: category.to_string(),
            description: description.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
}

pub const ALL_CATEGORIES: &str = "all";

pub const CATEGORIES: &[Category] = &[
    Category {
        id: ALL_CATEGORIES,
        label: "All Categories",
    },
    Category {
        id: "dental",
        label: "Dental",
    },
    Category {
        id: "medical",
        label: "Medical",
    },
    Category {
        id: "healthtech",
        label: "Health Tech",
    },
    Category {
        id: "ai",
        label: "AI & Innovation",
    },
    Category {
        id: "mental-health",
        label: "Mental Health",
    },
    Category {
        id: "wellness",
        label: "Wellness",
    },
    Category {
        id: "education",
        label: "Education",
    },
    Category {
        id: "emergency",
        label: "Emergency Med",
    },
];

impl Category {
    pub fn find(id: &str) -> Option<&'static Category> {
        CATEGORIES.iter().find(|c| c.id.eq_ignore_ascii_case(id))
    }
}

/// Built-in list of medical, dental and healthcare podcast feeds.
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![
        // Dental
        FeedConfig::new(
            "A Tale of Two Hygienists",
            "https://ataleoftwohygienists.libsyn.com/rss",
            "dental",
            "Dental hygiene insights and industry updates",
        ),
        FeedConfig::new(
            "The Dental Hacks Podcast",
            "https://dentalhacks.libsyn.com/rss",
            "dental",
            "Tips and tricks for modern dental practice",
        ),
        FeedConfig::new(
            "Dentistry Uncensored",
            "https://dentistryuncensored.libsyn.com/rss",
            "dental",
            "Unfiltered conversations about dentistry",
        ),
        // Medical and healthcare
        FeedConfig::new(
            "The Peter Attia Drive",
            "https://peterattiamd.com/feed/podcast/",
            "medical",
            "Longevity, health optimization, and medical science",
        ),
        FeedConfig::new(
            "Healthcare IT Today",
            "https://www.healthcareittoday.com/feed/podcast/",
            "healthtech",
            "Technology transforming healthcare",
        ),
        FeedConfig::new(
            "AI in Healthcare by Stanford",
            "https://feeds.soundcloud.com/users/soundcloud:users:280734880/sounds.rss",
            "ai",
            "Stanford Medicine exploring AI applications",
        ),
        // Mental health and wellness
        FeedConfig::new(
            "On Being",
            "https://feeds.simplecast.com/kwWc0lhf",
            "wellness",
            "Exploring meaning, faith, and ethics in healthcare",
        ),
        FeedConfig::new(
            "The Mental Illness Happy Hour",
            "https://mentalpod.com/feed",
            "mental-health",
            "Honest conversations about mental health",
        ),
        // Medical education
        FeedConfig::new(
            "The Curbsiders Internal Medicine",
            "https://thecurbsiders.libsyn.com/rss",
            "education",
            "Internal medicine pearls for practice",
        ),
        FeedConfig::new(
            "Emergency Medicine Cases",
            "https://emergencymedicinecases.com/feed/podcast/",
            "emergency",
            "EM education for emergency physicians",
        ),
    ]
}
