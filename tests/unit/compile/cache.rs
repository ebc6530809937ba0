use super::*;
use crate::tree::element::el;
use crate::tree::node::{component, text};
use std::sync::atomic::AtomicUsize;

#[test]
fn builds_once_then_hits() {
    let cache = StaticCache::<&'static str>::new();
    let calls = AtomicUsize::new(0);
    let build = || -> SluiceResult<Node> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(el("p").child(text("hi")).into())
    };

    let a = cache.get_or_build("home", build).unwrap();
    let b = cache.get_or_build("home", build).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        cache.stats(),
        CacheStats {
            hits: 1,
            misses: 1,
            builds: 1,
            failures: 0
        }
    );
    assert_eq!(cache.len(), 1);
}

#[test]
fn failed_build_installs_nothing_and_retries() {
    let cache = StaticCache::<String>::new();
    let err = cache
        .get_or_build("broken".to_string(), || Err(SluiceError::build("bad tree")))
        .unwrap_err();
    assert!(matches!(err, SluiceError::Build(_)));
    assert!(cache.get(&"broken".to_string()).is_none());
    assert!(cache.is_empty());

    cache
        .get_or_build("broken".to_string(), || Ok(text("fixed")))
        .unwrap();
    assert_eq!(cache.stats().failures, 1);
    assert_eq!(cache.stats().builds, 1);
}

#[test]
fn invalidate_and_clear_drop_entries() {
    let cache = StaticCache::<u32>::new();
    cache.get_or_build(1, || Ok(text("one"))).unwrap();
    cache.get_or_build(2, || Ok(text("two"))).unwrap();
    assert!(cache.invalidate(&1));
    assert!(!cache.invalidate(&1));
    assert!(cache.get(&1).is_none());
    assert!(cache.get(&2).is_some());
    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn concurrent_first_requests_build_once() {
    let cache = StaticCache::<&'static str>::new();
    let calls = AtomicUsize::new(0);
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                cache
                    .get_or_build("shared", || {
                        calls.fetch_add(1, Ordering::SeqCst);
                        std::thread::sleep(std::time::Duration::from_millis(5));
                        Ok(text("shared body"))
                    })
                    .unwrap();
            });
        }
    });
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats().hits, 7);
}

#[test]
fn render_replays_with_live_context() {
    struct User(&'static str);
    let cache = StaticCache::<&'static str>::new();
    let build = || -> SluiceResult<Node> {
        Ok(el("span")
            .child(component(|ctx| {
                Ok(text(ctx.get::<User>().map(|u| u.0).unwrap_or("guest")))
            }))
            .into())
    };
    let mut out = Vec::new();
    cache
        .render("badge", build, &RenderContext::new().with_value(User("ada")), &mut out)
        .unwrap();
    cache
        .render("badge", build, &RenderContext::new(), &mut out)
        .unwrap();
    assert_eq!(out, b"<span>ada</span><span>guest</span>");
}

#[test]
fn prewarm_reports_failures_per_key() {
    let cache = StaticCache::<&'static str>::new();
    let entries: Vec<(&'static str, Box<dyn FnOnce() -> SluiceResult<Node> + Send>)> = vec![
        ("a", Box::new(|| Ok(text("a")))),
        ("b", Box::new(|| Err(SluiceError::build("nope")))),
        ("c", Box::new(|| Ok(text("c")))),
    ];
    let failed = cache.prewarm(entries);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "b");
    assert_eq!(cache.len(), 2);
}

#[test]
fn debug_and_stats_need_no_key_bounds() {
    struct Opaque;
    let cache = StaticCache::<Opaque>::default();
    assert_eq!(cache.stats(), CacheStats::default());
    let shown = format!("{cache:?}");
    assert!(shown.starts_with("StaticCache { keys: 0"));
}
