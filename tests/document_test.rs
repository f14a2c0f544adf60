use chrono::{Duration, TimeZone, Utc};
use cms_page_search::store::Snapshot;
use cms_page_search::{
    ContentStore, IndexError, IndexRequest, MemoryStore, SearchIndex, Settings, TitleIndex,
};

fn snapshot_json() -> String {
    r#"{
        "pages": [
            {
                "id": 1,
                "reverse_id": "home",
                "site_id": 1,
                "publication_date": "2024-01-01T00:00:00Z",
                "absolute_url": "/en/",
                "meta_keywords": "start, landing"
            },
            {
                "id": 2,
                "site_id": 1,
                "publication_date": "2024-01-01T00:00:00Z",
                "publication_end_date": "2024-03-01T00:00:00Z",
                "absolute_url": "/en/expired/"
            },
            {
                "id": 3,
                "reverse_id": "news",
                "site_id": 1,
                "absolute_url": "/en/news/",
                "login_required": true
            }
        ],
        "titles": [
            {"id": 10, "page_id": 1, "language": "en", "title": "Home", "meta_description": "Welcome"},
            {"id": 11, "page_id": 1, "language": "de", "title": "Start", "meta_description": "Willkommen"},
            {"id": 12, "page_id": 1, "language": "en", "title": "Home (draft)", "publisher_is_draft": true},
            {"id": 20, "page_id": 2, "language": "en", "title": "Expired"},
            {"id": 30, "page_id": 3, "language": "en", "title": "News", "redirect": ""},
            {"id": 31, "page_id": 3, "language": "fr", "title": "Nouvelles", "redirect": "/fr/ailleurs/"}
        ],
        "placeholders": [
            {"id": 100, "page_id": 1, "slot": "content"},
            {"id": 101, "page_id": 1, "slot": "sidebar"},
            {"id": 300, "page_id": 3, "slot": "content"}
        ],
        "blocks": [
            {
                "id": 1000, "placeholder_id": 100, "language": "en", "position": 0,
                "plugin_type": "TextPlugin",
                "instance": {"fields": {"body": "<p>Hello world</p>"}, "search_fields": ["body"]}
            },
            {
                "id": 1001, "placeholder_id": 101, "language": "en", "position": 0,
                "plugin_type": "LinkPlugin",
                "instance": {"rendered": "<a href=\"/x\">Sidebar link</a>", "search_fulltext": true}
            },
            {
                "id": 1002, "placeholder_id": 100, "language": "de", "position": 0,
                "plugin_type": "TextPlugin",
                "instance": {"fields": {"body": "Hallo Welt"}, "search_fields": ["body"]}
            },
            {
                "id": 1003, "placeholder_id": 100, "language": "en", "position": 1,
                "plugin_type": "TextPlugin"
            },
            {
                "id": 3000, "placeholder_id": 300, "language": "en", "position": 0,
                "plugin_type": "TextPlugin",
                "instance": {"fields": {"body": "Latest news"}, "search_fields": ["body"]}
            }
        ]
    }"#
    .to_string()
}

fn store() -> MemoryStore {
    let snapshot: Snapshot = serde_json::from_str(&snapshot_json()).unwrap();
    MemoryStore::from_snapshot(snapshot).unwrap()
}

fn settings_with_policy(policy: &str) -> Settings {
    serde_json::from_str(&format!(
        r#"{{"PLACEHOLDERS_SEARCH_LIST": {policy}, "index_title": false}}"#
    ))
    .unwrap()
}

fn request(language: &str) -> IndexRequest {
    IndexRequest::new(language, 1, Utc::now())
}

#[test]
fn test_index_queryset_keeps_only_indexable_titles() {
    let store = store();
    let index = TitleIndex::new(&store, &Settings::default());
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

    let en: Vec<u64> = index
        .get_index_queryset_at("en", now)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(en, vec![10, 30]);

    // The French title redirects elsewhere
    assert!(index.get_index_queryset_at("fr", now).unwrap().is_empty());

    // Before its end date the expired page is still eligible
    let earlier = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let en: Vec<u64> = index
        .get_index_queryset_at("en", earlier)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(en, vec![10, 20, 30]);

    // Before its publication date the home page is not
    let before = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() - Duration::hours(1);
    let en: Vec<u64> = index
        .get_index_queryset_at("en", before)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(en, vec![30]);
}

#[test]
fn test_should_update_follows_draft_flag() {
    let store = store();
    let index = TitleIndex::new(&store, &Settings::default());
    assert!(index.should_update(&store.title(10).unwrap().unwrap()));
    assert!(!index.should_update(&store.title(12).unwrap().unwrap()));
}

#[test]
fn test_body_is_blocks_then_description_then_keywords() {
    let store = store();
    let settings = settings_with_policy(r#"{"*": ["content"]}"#);
    let index = TitleIndex::new(&store, &settings);
    let title = store.title(10).unwrap().unwrap();

    let doc = index.build_document(&title, "en", &request("en")).unwrap();
    assert_eq!(doc.body, "Hello world Welcome start, landing");
    assert_eq!(doc.title, "Home");
    assert_eq!(doc.url, "/en/");
    assert_eq!(doc.description, Some("Welcome".to_string()));
    assert_eq!(doc.language, "en");
    assert_eq!(doc.site_id, 1);
    assert!(!doc.login_required);
    assert_eq!(
        doc.pub_date,
        Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
    );
}

#[test]
fn test_reverse_id_entry_adds_sidebar() {
    let store = store();
    let settings = settings_with_policy(r#"{"*": ["content"], "home": ["content", "sidebar"]}"#);
    let index = TitleIndex::new(&store, &settings);
    let title = store.title(10).unwrap().unwrap();

    let body = index.get_search_data(&title, "en", &request("en")).unwrap();
    assert_eq!(body, "Hello world Sidebar link Welcome start, landing");
}

#[test]
fn test_empty_policy_indexes_every_placeholder() {
    let store = store();
    let index = TitleIndex::new(&store, &Settings::default());
    let title = store.title(10).unwrap().unwrap();

    let body = index.get_search_data(&title, "en", &request("en")).unwrap();
    assert!(body.contains("Hello world"));
    assert!(body.contains("Sidebar link"));
}

#[test]
fn test_missing_policy_entry_is_configuration_error() {
    let store = store();
    let settings = settings_with_policy(r#"{"home": ["content"]}"#);
    let index = TitleIndex::new(&store, &settings);
    let news = store.title(30).unwrap().unwrap();

    let err = index
        .build_document(&news, "en", &request("en"))
        .unwrap_err();
    match err.downcast_ref::<IndexError>() {
        Some(IndexError::MissingPolicyEntry { reverse_id }) => {
            assert_eq!(reverse_id.as_deref(), Some("news"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_meta_description_does_not_fall_back() {
    let store = store();
    let index = TitleIndex::new(&store, &Settings::default());
    let news = store.title(30).unwrap().unwrap();

    let body = index.get_search_data(&news, "en", &request("en")).unwrap();
    assert_eq!(body, "Latest news");
}

#[test]
fn test_other_language_uses_its_own_blocks() {
    let store = store();
    let index = TitleIndex::new(&store, &settings_with_policy("{}"));
    let title = store.title(11).unwrap().unwrap();

    let doc = index.build_document(&title, "de", &request("de")).unwrap();
    assert_eq!(doc.body, "Hallo Welt Willkommen start, landing");
}

#[test]
fn test_repeated_builds_match() {
    let store = store();
    let index = TitleIndex::new(&store, &Settings::default());
    let title = store.title(10).unwrap().unwrap();

    let first = index.build_document(&title, "en", &request("en")).unwrap();
    let second = index.build_document(&title, "en", &request("en")).unwrap();
    assert_eq!(first.body, second.body);
    assert_eq!(first.text, second.text);
}

#[test]
fn test_demo_files_load() {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");
    let settings = Settings::load(root.join("settings.json")).unwrap();
    let store = MemoryStore::load(root.join("snapshot.json")).unwrap();
    let index = TitleIndex::new(&store, &settings);

    let home = store.title(1).unwrap().unwrap();
    let doc = index.build_document(&home, "en", &request("en")).unwrap();
    assert_eq!(
        doc.body,
        "Hello world Latest release Read the notes Welcome cms, search"
    );
    assert_eq!(doc.text, format!("Home {}", doc.body));

    // The excluded footer is simply not part of the inclusion list
    let contact = store.title(3).unwrap().unwrap();
    let doc = index.build_document(&contact, "en", &request("en")).unwrap();
    assert_eq!(doc.body, "Write to us");
}
