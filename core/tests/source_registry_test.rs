use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use manga_core::source::{
    CatalogueBackend, Extension, ExtensionIndex, LocalSource, NoSourceNames, Source, SourceError,
    SourceRegistry, SourceResult, extension_feed,
};
use manga_core::storage::StorageManager;
use manga_core::types::{Chapter, LOCAL_SOURCE_ID, Manga, MangasPage, Page, SourceId, SourceInfo};
use tempfile::TempDir;

#[derive(Debug)]
struct Titles(&'static str);

impl CatalogueBackend for Titles {
    fn popular_manga(&self, _page: u32) -> SourceResult<MangasPage> {
        Ok(MangasPage::last(vec![Manga::new("/1", self.0)]))
    }

    fn search_manga(&self, _page: u32, _query: &str) -> SourceResult<MangasPage> {
        Ok(MangasPage::default())
    }

    fn manga_details(&self, manga: &Manga) -> SourceResult<Manga> {
        Ok(manga.clone())
    }

    fn chapter_list(&self, _manga: &Manga) -> SourceResult<Vec<Chapter>> {
        Ok(Vec::new())
    }

    fn page_list(&self, _chapter: &Chapter) -> SourceResult<Vec<Page>> {
        Ok(Vec::new())
    }
}

fn new_registry() -> (TempDir, Arc<SourceRegistry>) {
    let dir = tempfile::tempdir().expect("temp dir");
    let storage = Arc::new(StorageManager::new(dir.path()).expect("storage"));
    let local = Arc::new(LocalSource::new(storage));
    (dir, Arc::new(SourceRegistry::new(local, Arc::new(NoSourceNames))))
}

fn catalogue(id: u64, name: &'static str) -> Source {
    Source::catalogue(SourceInfo::new(SourceId::new(id), name, "en"), Arc::new(Titles(name)))
}

fn http(id: u64, name: &'static str) -> Source {
    let info = SourceInfo::new(SourceId::new(id), name, "en");
    Source::http(info, format!("https://{}.example", name.to_lowercase()), Arc::new(Titles(name)))
}

fn extension(pkg: &str, sources: impl IntoIterator<Item = Source>) -> Extension {
    sources.into_iter().fold(Extension::new(pkg, pkg), Extension::with_source)
}

#[test]
fn applied_sources_are_queryable() {
    let (_dir, registry) = new_registry();
    let snapshot = registry.apply(&[
        extension("a", [catalogue(10, "Archive"), http(11, "Site")]),
        extension("b", [http(12, "Other")]),
    ]);

    let expected: Vec<SourceId> = [0, 10, 11, 12].into_iter().map(SourceId::new).collect();
    assert_eq!(snapshot.ids(), expected);
    for id in [10, 11, 12] {
        let source = registry.get(SourceId::new(id)).expect("registered");
        assert_eq!(source.id(), SourceId::new(id));
    }

    let online: Vec<SourceId> = registry.online_sources().iter().map(|s| s.info().id).collect();
    assert_eq!(online, vec![SourceId::new(11), SourceId::new(12)]);
    assert_eq!(registry.catalogue_sources().len(), 4);
}

#[test]
fn later_extension_wins_on_duplicate_ids() {
    let (_dir, registry) = new_registry();
    registry.apply(&[
        extension("first", [catalogue(20, "First")]),
        extension("second", [catalogue(20, "Second")]),
    ]);

    let source = registry.get(SourceId::new(20)).unwrap();
    assert_eq!(source.name(), "Second");
    assert_eq!(source.popular_manga(1).unwrap().mangas[0].title, "Second");
}

#[test]
fn uninstalled_sources_disappear_on_next_apply() {
    let (_dir, registry) = new_registry();
    registry.apply(&[extension("a", [catalogue(30, "Thirty")])]);
    registry.apply(&[]);

    assert!(registry.get(SourceId::new(30)).is_none());
    assert!(registry.get(LOCAL_SOURCE_ID).is_some());
    assert_eq!(registry.snapshot().len(), 1);
}

#[test]
fn install_then_replace_then_uninstall() {
    let (_dir, registry) = new_registry();
    let one = SourceId::new(1);
    let two = SourceId::new(2);

    registry.apply(&[extension("a", [catalogue(1, "One")])]);
    assert!(registry.get(one).is_some());
    assert!(registry.get(two).is_none());
    assert!(registry.get(LOCAL_SOURCE_ID).is_some());

    registry.apply(&[extension("a", [catalogue(1, "One")]), extension("b", [http(2, "Two")])]);
    assert_eq!(registry.get(one).map(|s| s.name().to_string()).as_deref(), Some("One"));
    assert_eq!(registry.get(two).map(|s| s.name().to_string()).as_deref(), Some("Two"));
    assert!(registry.get(LOCAL_SOURCE_ID).is_some());

    registry.apply(&[extension("b", [http(2, "Two")])]);
    assert!(registry.get(one).is_none());
    assert!(registry.get(two).is_some());
    assert!(registry.get(LOCAL_SOURCE_ID).is_some());
    assert_eq!(registry.snapshot().ids(), vec![LOCAL_SOURCE_ID, two]);
}

#[test]
fn stub_operations_report_not_installed() {
    let (_dir, registry) = new_registry();
    let stub = registry.get_or_stub(SourceId::new(77));
    assert!(stub.is_stub());

    let manga = Manga::new("/m", "M");
    let chapter =
        Chapter { url: "/c".into(), name: "c".into(), chapter_number: 1.0, date_upload: 0 };
    let failures = [
        stub.manga_details(&manga).unwrap_err(),
        stub.chapter_list(&manga).unwrap_err(),
        stub.page_list(&chapter).unwrap_err(),
    ];
    for err in failures {
        assert!(matches!(err, SourceError::NotInstalled { id, .. } if id == SourceId::new(77)));
    }
}

#[test]
fn stub_names_come_from_extension_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(StorageManager::new(dir.path()).unwrap());
    let names: ExtensionIndex =
        [SourceInfo::new(SourceId::new(5), "MangaDex", "en")].into_iter().collect();
    let registry = SourceRegistry::new(Arc::new(LocalSource::new(storage)), Arc::new(names));

    let stub = registry.get_or_stub(SourceId::new(5));
    let err = stub.chapter_list(&Manga::new("/m", "M")).unwrap_err();
    assert_eq!(err.to_string(), "source MangaDex (5) is not installed");
}

#[test]
fn concurrent_stub_requests_share_one_instance() {
    let (_dir, registry) = new_registry();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_or_stub(SourceId::new(42))
            })
        })
        .collect();

    let stubs: Vec<Source> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(stubs.iter().all(|stub| stub.ptr_eq(&stubs[0])));
    assert!(registry.get_or_stub(SourceId::new(42)).ptr_eq(&stubs[0]));
}

#[test]
fn readers_never_observe_partial_snapshots() {
    let (_dir, registry) = new_registry();
    let left = extension("left", (100..150).map(|id| catalogue(id, "Left")));
    let right = extension("right", (200..250).map(|id| catalogue(id, "Right")));
    registry.apply(std::slice::from_ref(&left));

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Relaxed) {
                    let snapshot = registry.snapshot();
                    let present = |ids: std::ops::Range<u64>| {
                        ids.filter(|id| snapshot.contains(SourceId::new(*id))).count()
                    };
                    let (lefts, rights) = (present(100..150), present(200..250));
                    assert!(
                        (lefts == 50 && rights == 0) || (lefts == 0 && rights == 50),
                        "torn snapshot: {lefts} left, {rights} right"
                    );
                    assert!(snapshot.contains(LOCAL_SOURCE_ID));
                }
            })
        })
        .collect();

    for round in 0..200 {
        let next = if round % 2 == 0 { &right } else { &left };
        registry.apply(std::slice::from_ref(next));
    }
    done.store(true, Ordering::Relaxed);
    for reader in readers {
        reader.join().expect("reader saw a consistent registry");
    }
}

#[tokio::test]
async fn reconciler_follows_the_extension_feed() {
    let (_dir, registry) = new_registry();
    let (feed, rx) = extension_feed();
    feed.publish(vec![extension("boot", [catalogue(1, "Boot")])]);
    let task = registry.spawn(rx);

    let mut snapshots = registry.subscribe();
    let booted = snapshots.wait_for(|s| s.contains(SourceId::new(1)));
    tokio::time::timeout(Duration::from_secs(5), booted)
        .await
        .expect("initial list applied")
        .expect("registry alive");

    for id in 2..20 {
        feed.publish(vec![extension("burst", [catalogue(id, "Burst")])]);
    }
    let settled = snapshots.wait_for(|s| s.contains(SourceId::new(19)));
    tokio::time::timeout(Duration::from_secs(5), settled)
        .await
        .expect("latest list applied")
        .expect("registry alive");

    let snapshot = registry.snapshot();
    assert_eq!(snapshot.ids(), vec![LOCAL_SOURCE_ID, SourceId::new(19)]);

    drop(feed);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("reconciler stops when the feed closes")
        .expect("reconciler did not panic");
}
