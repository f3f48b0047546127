use crate::bangumi::subject::{self, Detail, Subject};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::sync::Mutex;

/// An anime the user has chosen to track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: subject::Id,
    #[serde(rename = "titleJP")]
    pub title: String,
    pub cover: String,
    pub summary: String,
    pub eps: u32,
    pub hydrated: bool,
}

impl Record {
    /// A minimal record built from a search result, pending hydration.
    pub fn candidate(subject: &Subject) -> Self {
        Self {
            id: subject.id,
            title: subject.display_name().to_owned(),
            cover: subject
                .images
                .as_ref()
                .and_then(|images| images.common())
                .unwrap_or_default()
                .to_owned(),
            summary: String::new(),
            eps: 0,
            hydrated: false,
        }
    }

    /// Fills in the fields present in `detail`; blank fields never replace
    /// known ones.
    pub fn hydrate(&mut self, detail: &Detail) {
        if let Some(summary) = detail.summary() {
            self.summary = summary.to_owned();
        }

        if let Some(eps) = detail.episodes() {
            self.eps = eps;
        }

        if let Some(cover) = detail.cover() {
            self.cover = cover.to_owned();
        }

        self.hydrated = true;
    }
}

/// The tracked list. Identifiers are unique.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct List {
    records: Vec<Record>,
}

impl List {
    /// Parses a stored list. Anything unreadable is an empty list.
    pub fn parse(json: &str) -> Self {
        match serde_json::from_str(json) {
            Ok(list) => list,
            Err(error) => {
                log::warn!("Discarding unreadable tracked list: {error}");

                Self::default()
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn contains(&self, id: subject::Id) -> bool {
        self.records.iter().any(|record| record.id == id)
    }

    pub fn get(&self, id: subject::Id) -> Option<&Record> {
        self.records.iter().find(|record| record.id == id)
    }

    /// Appends the record unless its identifier is already tracked.
    pub fn add(&mut self, record: Record) -> bool {
        if self.contains(record.id) {
            return false;
        }

        self.records.push(record);

        true
    }

    pub fn remove(&mut self, id: subject::Id) -> Option<Record> {
        let position = self.records.iter().position(|record| record.id == id)?;

        Some(self.records.remove(position))
    }

    /// Applies a hydration result, if the record is still tracked.
    pub fn hydrate(&mut self, id: subject::Id, detail: &Detail) -> bool {
        let Some(record) = self.records.iter_mut().find(|record| record.id == id) else {
            return false;
        };

        record.hydrate(detail);

        true
    }

    pub fn unhydrated(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|record| !record.hydrated)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Where the tracked list lives; a single file holding the whole list.
///
/// Clones share their writes. A snapshot is never stored over a newer one.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
    writes: Arc<Writes>,
}

#[derive(Debug, Default)]
struct Writes {
    issued: AtomicU64,
    stored: Mutex<u64>,
}

impl Storage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writes: Arc::default(),
        }
    }

    pub fn load(&self) -> impl Future<Output = List> + 'static {
        let path = self.path.clone();

        async move {
            match fs::read_to_string(&path).await {
                Ok(json) => List::parse(&json),
                Err(error) => {
                    if error.kind() != std::io::ErrorKind::NotFound {
                        log::warn!("Could not read {}: {error}", path.display());
                    }

                    List::default()
                }
            }
        }
    }

    /// Overwrites the stored list with a snapshot of `list`.
    ///
    /// Snapshots are ordered by call. The file is replaced atomically.
    pub fn save(&self, list: &List) -> impl Future<Output = Result<(), anywho::Error>> + 'static {
        let path = self.path.clone();
        let writes = Arc::clone(&self.writes);
        let snapshot = writes.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let json = list.to_json();

        async move {
            let json = json?;
            let mut stored = writes.stored.lock().await;

            if *stored > snapshot {
                log::debug!("Skipping outdated save of {}", path.display());

                return Ok(());
            }

            if let Some(directory) = path.parent() {
                fs::create_dir_all(directory).await?;
            }

            let mut partial = path.clone().into_os_string();
            partial.push(".tmp");

            fs::write(&partial, json).await?;
            fs::rename(&partial, &path).await?;

            *stored = snapshot;

            Ok(())
        }
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(
            dirs::data_dir()
                .unwrap_or_default()
                .join(env!("CARGO_PKG_NAME"))
                .join("animeList.json"),
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn record(id: u64, title: &str) -> Record {
        Record {
            id: subject::Id::new(id),
            title: title.to_owned(),
            cover: String::new(),
            summary: String::new(),
            eps: 0,
            hydrated: false,
        }
    }

    fn detail(json: &str) -> Detail {
        serde_json::from_str(json).expect("Valid detail")
    }

    fn ids(list: &List) -> Vec<subject::Id> {
        list.iter().map(|record| record.id).collect()
    }

    #[test]
    fn candidate_prefers_localized_title_and_common_cover() {
        let subject: Subject = serde_json::from_str(
            r#"{
                "id": 9,
                "name": "Mushishi",
                "name_cn": "虫师",
                "images": {"large": "https://l/9.jpg", "common": "https://c/9.jpg"}
            }"#,
        )
        .unwrap();

        let record = Record::candidate(&subject);

        assert_eq!(record.title, "虫师");
        assert_eq!(record.cover, "https://c/9.jpg");
        assert_eq!(record.summary, "");
        assert_eq!(record.eps, 0);
        assert!(!record.hydrated);
    }

    #[test]
    fn candidate_without_images_has_empty_cover() {
        let subject: Subject = serde_json::from_str(r#"{"id": 9, "name": "Mushishi"}"#).unwrap();

        assert_eq!(Record::candidate(&subject).cover, "");
    }

    #[test]
    fn duplicate_add_leaves_list_unchanged() {
        let mut list = List::default();
        assert!(list.add(record(1, "A")));
        assert!(list.add(record(2, "B")));
        let before = list.clone();

        assert!(!list.add(record(1, "Another A")));

        assert_eq!(list, before);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn remove_preserves_relative_order() {
        let mut list = List::default();

        for id in 1..=5 {
            let _ = list.add(record(id, "X"));
        }

        let removed = list.remove(subject::Id::new(3));

        assert_eq!(removed.map(|record| record.id), Some(subject::Id::new(3)));
        assert_eq!(ids(&list), [1, 2, 4, 5].map(subject::Id::new));
    }

    #[test]
    fn removing_unknown_record_is_a_no_op() {
        let mut list = List::default();
        let _ = list.add(record(1, "A"));

        assert_eq!(list.remove(subject::Id::new(2)), None);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn hydration_keeps_fields_missing_from_detail() {
        let mut record = record(1, "A");
        record.summary = "S".to_owned();
        record.cover = "https://c/old.jpg".to_owned();

        record.hydrate(&detail(r#"{"eps": 24}"#));

        assert_eq!(record.summary, "S");
        assert_eq!(record.cover, "https://c/old.jpg");
        assert_eq!(record.eps, 24);
        assert!(record.hydrated);
    }

    #[test]
    fn hydration_never_blanks_a_field() {
        let mut record = record(1, "A");
        record.summary = "S".to_owned();
        record.eps = 12;

        record.hydrate(&detail(r#"{"summary": "", "eps": 0, "images": null}"#));

        assert_eq!(record.summary, "S");
        assert_eq!(record.eps, 12);
    }

    #[test]
    fn hydration_of_removed_record_is_dropped() {
        let mut list = List::default();
        let _ = list.add(record(1, "A"));
        let _ = list.add(record(2, "B"));
        let _ = list.remove(subject::Id::new(1));

        let applied = list.hydrate(subject::Id::new(1), &detail(r#"{"summary": "late"}"#));

        assert!(!applied);
        assert_eq!(list.get(subject::Id::new(2)).map(|r| r.summary.as_str()), Some(""));
    }

    #[test]
    fn add_then_hydrate_end_to_end() {
        let mut list = List::default();
        let _ = list.add(record(42, "Foo"));

        assert_eq!(list.unhydrated().count(), 1);

        let _ = list.hydrate(
            subject::Id::new(42),
            &detail(r#"{"eps": 12, "summary": "desc"}"#),
        );

        let record = list.get(subject::Id::new(42)).unwrap();

        assert_eq!(record.title, "Foo");
        assert_eq!(record.eps, 12);
        assert_eq!(record.summary, "desc");
        assert!(record.hydrated);
        assert_eq!(list.unhydrated().count(), 0);
    }

    #[test]
    fn records_use_stored_field_names() {
        let mut list = List::default();
        let _ = list.add(record(42, "Foo"));

        assert_eq!(
            list.to_json().unwrap(),
            r#"[{"id":42,"titleJP":"Foo","cover":"","summary":"","eps":0,"hydrated":false}]"#
        );
    }

    #[test]
    fn malformed_value_parses_as_empty_list() {
        assert!(List::parse("{not json").is_empty());
        assert!(List::parse("null").is_empty());
        assert!(List::parse(r#"[{"id": "x"}]"#).is_empty());
    }

    #[tokio::test]
    async fn missing_storage_loads_empty_list() {
        let directory = tempfile::tempdir().unwrap();
        let storage = Storage::new(directory.path().join("animeList.json"));

        assert!(storage.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let directory = tempfile::tempdir().unwrap();
        let storage = Storage::new(directory.path().join("nested").join("animeList.json"));

        let empty = List::default();
        storage.save(&empty).await.unwrap();
        assert_eq!(storage.load().await, empty);

        let mut list = List::default();
        let _ = list.add(record(1, "A"));
        let _ = list.add(record(2, "B"));
        let _ = list.hydrate(
            subject::Id::new(2),
            &detail(r#"{"eps": 13, "summary": "desc", "images": {"common": "https://c/2.jpg"}}"#),
        );

        storage.save(&list).await.unwrap();

        assert_eq!(storage.load().await, list);
    }

    #[tokio::test]
    async fn save_overwrites_previous_value() {
        let directory = tempfile::tempdir().unwrap();
        let storage = Storage::new(directory.path().join("animeList.json"));

        let mut list = List::default();
        let _ = list.add(record(1, "A"));
        storage.save(&list).await.unwrap();

        let _ = list.remove(subject::Id::new(1));
        storage.save(&list).await.unwrap();

        assert!(storage.load().await.is_empty());
    }

    #[tokio::test]
    async fn later_snapshot_wins_when_saves_finish_out_of_order() {
        let directory = tempfile::tempdir().unwrap();
        let storage = Storage::new(directory.path().join("animeList.json"));

        let mut older = List::default();
        for id in 1..=200 {
            let _ = older.add(record(id, "Old"));
        }

        let mut newer = List::default();
        let _ = newer.add(record(1, "New"));

        let save_older = storage.save(&older);
        let save_newer = storage.clone().save(&newer);

        save_newer.await.unwrap();
        save_older.await.unwrap();

        assert_eq!(storage.load().await, newer);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_saves_store_the_last_snapshot() {
        let directory = tempfile::tempdir().unwrap();
        let storage = Storage::new(directory.path().join("animeList.json"));

        let mut older = List::default();
        for id in 1..=200 {
            let _ = older.add(record(id, "Old"));
        }

        let mut newer = List::default();
        let _ = newer.add(record(1, "New"));

        for _ in 0..100 {
            let (first, second) = tokio::join!(storage.save(&older), storage.save(&newer));
            first.unwrap();
            second.unwrap();

            let json = std::fs::read_to_string(directory.path().join("animeList.json")).unwrap();

            assert_eq!(serde_json::from_str::<List>(&json).unwrap(), newer);
        }
    }

    #[tokio::test]
    async fn corrupted_storage_loads_empty_list() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("animeList.json");
        std::fs::write(&path, "[{\"id\": 1,").unwrap();

        assert!(Storage::new(path).load().await.is_empty());
    }
}
