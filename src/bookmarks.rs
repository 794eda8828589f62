use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    hash::Hash,
    io::ErrorKind,
    sync::{Arc, RwLock},
    time::Instant,
};

pub const DEFAULT_CATEGORY: &str = "Uncategorized";

#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: u64,
    pub user_id: String,

    pub url: String,
    pub title: String,
    pub category: String,
    pub description: Option<String>,

    /// Set once at creation. Anchor for all reminder age calculations.
    pub created_at: DateTime<Utc>,
    pub last_reminded_at: Option<DateTime<Utc>>,
    pub reminder_dismissed: bool,
}

impl Hash for Bookmark {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl PartialEq for Bookmark {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookmarkCreate {
    pub user_id: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BookmarkUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Lets a user re-enable (or turn off) revisit reminders while editing
    /// a bookmark.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_dismissed: Option<bool>,
}

/// Partial reminder-state mutation requested by the reminder engine.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
pub struct ReminderStateUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reminded_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_dismissed: Option<bool>,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("bookmark not found")]
    NotFound,

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),

    #[error("csv error: {0:?}")]
    Csv(#[from] csv::Error),

    #[error("unexpected error: {0:?}")]
    Other(#[from] anyhow::Error),
}

/// Persistence collaborator for bookmarks. Every operation is scoped to a
/// single owning user; a row belonging to a different user behaves exactly
/// like a missing row.
pub trait BookmarkStore: Send + Sync {
    fn list(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError>;
    fn create(&self, create: BookmarkCreate) -> Result<Bookmark, StoreError>;
    fn update(
        &self,
        id: u64,
        user_id: &str,
        update: BookmarkUpdate,
    ) -> Result<Bookmark, StoreError>;
    fn delete(&self, id: u64, user_id: &str) -> Result<(), StoreError>;
    fn update_reminder_state(
        &self,
        id: u64,
        user_id: &str,
        update: ReminderStateUpdate,
    ) -> Result<(), StoreError>;
    fn categories(&self, user_id: &str) -> Result<Vec<String>, StoreError>;
}

fn validate_url(url: &str) -> Result<(), StoreError> {
    url::Url::parse(url).map_err(|_| StoreError::InvalidUrl(url.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct BackendCsv {
    list: Arc<RwLock<Vec<Bookmark>>>,
    path: String,
}

const CSV_HEADERS: [&str; 9] = [
    "id",
    "user_id",
    "url",
    "title",
    "category",
    "description",
    "created_at",
    "last_reminded_at",
    "reminder_dismissed",
];

fn record_field<'a>(
    record: &'a csv::StringRecord,
    idx: usize,
    name: &str,
) -> anyhow::Result<&'a str> {
    record
        .get(idx)
        .ok_or_else(|| anyhow!("couldnt get record {name}"))
}

impl BackendCsv {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if let Err(err) = std::fs::metadata(path) {
            match err.kind() {
                ErrorKind::NotFound => {
                    log::info!("Creating new database at {path}");
                    let mut csv_wrt = csv::Writer::from_path(path)?;
                    csv_wrt.write_record(CSV_HEADERS)?;
                    csv_wrt.flush()?;
                }
                _ => Err(err)?,
            }
        }

        let now = Instant::now();
        let mut csv_reader = csv::Reader::from_path(path)?;
        let iter = csv_reader.records();

        let mut bmarks = vec![];
        for record in iter {
            let record = record?;
            let id = record_field(&record, 0, "id")?.parse::<u64>()?;
            let user_id = record_field(&record, 1, "user_id")?.to_string();
            let url = record_field(&record, 2, "url")?.to_string();
            let title = record_field(&record, 3, "title")?.to_string();
            let category = record_field(&record, 4, "category")?.to_string();
            let description = record_field(&record, 5, "description")?.to_string();

            // Timestamps are a data-integrity boundary. A row we cannot
            // parse is rejected outright rather than coerced.
            let created_at = record_field(&record, 6, "created_at")?
                .parse::<DateTime<Utc>>()
                .map_err(|err| anyhow!("bookmark {id}: bad created_at: {err}"))?;

            let last_reminded_at = record_field(&record, 7, "last_reminded_at")?;
            let last_reminded_at = if last_reminded_at.is_empty() {
                None
            } else {
                Some(
                    last_reminded_at
                        .parse::<DateTime<Utc>>()
                        .map_err(|err| anyhow!("bookmark {id}: bad last_reminded_at: {err}"))?,
                )
            };

            if let Some(reminded) = last_reminded_at {
                if reminded < created_at {
                    return Err(anyhow!(
                        "bookmark {id}: last_reminded_at precedes created_at"
                    ));
                }
            }

            let reminder_dismissed = record_field(&record, 8, "reminder_dismissed")? == "true";

            let bmark = Bookmark {
                id,
                user_id,
                url,
                title,
                category: if category.is_empty() {
                    DEFAULT_CATEGORY.to_string()
                } else {
                    category
                },
                description: if description.is_empty() {
                    None
                } else {
                    Some(description)
                },
                created_at,
                last_reminded_at,
                reminder_dismissed,
            };

            bmarks.push(bmark);
        }

        log::debug!(
            "took {}ms to read csv",
            now.elapsed().as_micros() as f64 / 1000.0
        );

        let mgr = BackendCsv {
            list: Arc::new(RwLock::new(bmarks)),
            path: path.to_string(),
        };

        Ok(mgr)
    }

    fn save(&self) -> Result<(), StoreError> {
        let bmarks = self.list.write().unwrap();

        let temp_path = format!("{}-tmp", &self.path);
        let mut csv_wrt = csv::Writer::from_path(&temp_path)?;
        csv_wrt.write_record(CSV_HEADERS)?;
        for bmark in bmarks.iter() {
            csv_wrt.write_record([
                &bmark.id.to_string(),
                &bmark.user_id,
                &bmark.url,
                &bmark.title,
                &bmark.category,
                &bmark.description.clone().unwrap_or_default(),
                &bmark.created_at.to_rfc3339(),
                &bmark
                    .last_reminded_at
                    .map(|ts| ts.to_rfc3339())
                    .unwrap_or_default(),
                &bmark.reminder_dismissed.to_string(),
            ])?;
        }
        csv_wrt.flush()?;
        std::fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    #[cfg(test)]
    pub fn list_handle(&self) -> Arc<RwLock<Vec<Bookmark>>> {
        self.list.clone()
    }

    #[cfg(test)]
    pub fn flush(&self) -> Result<(), StoreError> {
        self.save()
    }
}

impl BookmarkStore for BackendCsv {
    fn list(&self, user_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        let bmarks = self.list.read().unwrap();
        Ok(bmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }

    fn create(&self, create: BookmarkCreate) -> Result<Bookmark, StoreError> {
        validate_url(&create.url)?;

        let id = if let Some(last_bookmark) = self.list.write().unwrap().last() {
            last_bookmark.id + 1
        } else {
            0
        };

        let category = match create.category {
            Some(category) if !category.trim().is_empty() => category,
            _ => DEFAULT_CATEGORY.to_string(),
        };

        let bmark = Bookmark {
            id,
            user_id: create.user_id,
            title: create.title.unwrap_or_else(|| create.url.clone()),
            category,
            description: create.description.filter(|d| !d.is_empty()),
            url: create.url,
            created_at: Utc::now(),
            last_reminded_at: None,
            reminder_dismissed: false,
        };

        self.list.write().unwrap().push(bmark.clone());

        self.save()?;

        Ok(bmark)
    }

    fn delete(&self, id: u64, user_id: &str) -> Result<(), StoreError> {
        let mut bmarks = self.list.write().unwrap();
        let idx = bmarks
            .iter()
            .position(|b| b.id == id && b.user_id == user_id)
            .ok_or(StoreError::NotFound)?;
        bmarks.remove(idx);

        drop(bmarks);

        self.save()?;

        Ok(())
    }

    fn update(
        &self,
        id: u64,
        user_id: &str,
        bmark_update: BookmarkUpdate,
    ) -> Result<Bookmark, StoreError> {
        if let Some(ref url) = bmark_update.url {
            validate_url(url)?;
        }

        let mut bmarks = self.list.write().unwrap();

        let bmark_idx = bmarks
            .iter()
            .position(|b| b.id == id && b.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        let bmark = &mut bmarks[bmark_idx];

        if let Some(title) = bmark_update.title {
            bmark.title = title;
        }
        if let Some(category) = bmark_update.category {
            bmark.category = if category.trim().is_empty() {
                DEFAULT_CATEGORY.to_string()
            } else {
                category
            };
        }
        if let Some(descr) = bmark_update.description {
            bmark.description = if descr.is_empty() { None } else { Some(descr) };
        }
        if let Some(url) = bmark_update.url {
            bmark.url = url;
        }
        if let Some(dismissed) = bmark_update.reminder_dismissed {
            bmark.reminder_dismissed = dismissed;
        }

        let result = bmark.clone();
        drop(bmarks);

        self.save()?;

        Ok(result)
    }

    fn update_reminder_state(
        &self,
        id: u64,
        user_id: &str,
        update: ReminderStateUpdate,
    ) -> Result<(), StoreError> {
        let mut bmarks = self.list.write().unwrap();

        let bmark = bmarks
            .iter_mut()
            .find(|b| b.id == id && b.user_id == user_id)
            .ok_or(StoreError::NotFound)?;

        if let Some(ts) = update.last_reminded_at {
            bmark.last_reminded_at = Some(ts);
        }
        if let Some(dismissed) = update.reminder_dismissed {
            bmark.reminder_dismissed = dismissed;
        }

        drop(bmarks);

        self.save()?;

        Ok(())
    }

    fn categories(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let bmarks = self.list.read().unwrap();

        let mut seen = HashSet::new();
        let mut categories = bmarks
            .iter()
            .filter(|b| b.user_id == user_id)
            .filter(|b| seen.insert(b.category.clone()))
            .map(|b| b.category.clone())
            .collect::<Vec<_>>();
        categories.sort();

        Ok(categories)
    }
}
