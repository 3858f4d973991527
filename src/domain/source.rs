use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Rss,
    Apple,
    #[serde(rename = "youtube")]
    YouTube,
    TrendingIndex,
    Backend,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::Rss,
        SourceKind::Apple,
        SourceKind::YouTube,
        SourceKind::TrendingIndex,
        SourceKind::Backend,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rss => "rss",
            SourceKind::Apple => "apple",
            SourceKind::YouTube => "youtube",
            SourceKind::TrendingIndex => "trending-index",
            SourceKind::Backend => "backend",
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rss" => Ok(SourceKind::Rss),
            "apple" => Ok(SourceKind::Apple),
            "youtube" => Ok(SourceKind::YouTube),
            "trending-index" | "trending" => Ok(SourceKind::TrendingIndex),
            "backend" => Ok(SourceKind::Backend),
            _ => Err(format!("Unknown source kind: {}", s)),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_str() {
        for kind in SourceKind::ALL {
            assert_eq!(kind.as_str().parse::<SourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_serializes_kebab_case() {
        let json = serde_json::to_string(&SourceKind::TrendingIndex).unwrap();
        assert_eq!(json, "\"trending-index\"");
    }
}
