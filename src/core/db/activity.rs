use std::future::Future;
use std::str::FromStr;

use time::OffsetDateTime;
use uuid::Uuid;

/// One logged plate check
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub plate_number: String,
    pub region: String,
    pub is_legal: bool,
    pub timestamp: OffsetDateTime,
    pub confidence: f32,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub plate_number: String,
    pub region: String,
    pub is_legal: bool,
    pub confidence: f32,
}

/// Append-only store of plate checks
pub trait ActivityRepository {
    /// Record a check, stamping it with a fresh id and the current time
    fn append(&self, activity: NewActivity) -> impl Future<Output = anyhow::Result<ActivityEntry>>;
    /// Every entry, newest first
    fn load_all(&self) -> impl Future<Output = anyhow::Result<Vec<ActivityEntry>>>;
    fn clear(&self) -> impl Future<Output = anyhow::Result<()>>;
    fn len(&self) -> impl Future<Output = anyhow::Result<u64>>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Legal,
    Illegal,
}

impl FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "legal" => Ok(StatusFilter::Legal),
            "illegal" => Ok(StatusFilter::Illegal),
            _ => Err(anyhow::anyhow!("Invalid status filter: {}", s)),
        }
    }
}

/// Search and status filter over loaded entries
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    /// Case-insensitive substring of the plate number or region
    pub search: Option<String>,
    pub status: StatusFilter,
}

impl ActivityFilter {
    pub fn matches(&self, entry: &ActivityEntry) -> bool {
        let matches_search = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                entry.plate_number.to_lowercase().contains(&term)
                    || entry.region.to_lowercase().contains(&term)
            }
        };

        matches_search
            && match self.status {
                StatusFilter::All => true,
                StatusFilter::Legal => entry.is_legal,
                StatusFilter::Illegal => !entry.is_legal,
            }
    }

    pub fn apply<'a>(&self, entries: &'a [ActivityEntry]) -> Vec<&'a ActivityEntry> {
        entries.iter().filter(|e| self.matches(e)).collect()
    }
}
