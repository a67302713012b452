use std::sync::Arc;
use strangler_router::adapters::SynthesizingProvider;
use strangler_router::{
    InMemoryObserver, PrefixPolicy, ProviderRegistry, Selector, StranglerRouter,
};

fn build_router() -> (Arc<StranglerRouter>, Arc<InMemoryObserver>) {
    let observer = Arc::new(InMemoryObserver::new());
    let registry = ProviderRegistry::new()
        .with(
            Selector::legacy(),
            Arc::new(SynthesizingProvider::new(Selector::legacy(), "Legacy Customer")),
        )
        .unwrap()
        .with(
            Selector::modern(),
            Arc::new(SynthesizingProvider::new(Selector::modern(), "Modern Customer")),
        )
        .unwrap();
    let router = StranglerRouter::new(
        Arc::new(PrefixPolicy::strangler_default()),
        registry,
        observer.clone(),
    )
    .unwrap();
    (Arc::new(router), observer)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_parallel_requests_lose_no_observations() {
    let (router, observer) = build_router();

    let handles: Vec<_> = (0..1_000)
        .map(|i| {
            let router = Arc::clone(&router);
            tokio::spawn(async move {
                let id = if i % 2 == 0 {
                    format!("MODERN_{}", i)
                } else {
                    format!("LEGACY_{}", i)
                };
                router.handle(&id).await
            })
        })
        .collect();

    for handle in handles {
        let lookup = handle.await.expect("task panicked").expect("routing failed");
        assert!(lookup.is_found());
    }

    let progress = observer.snapshot();
    assert_eq!(progress.total, 1_000);
    assert_eq!(observer.count(&Selector::modern()), 500);
    assert_eq!(observer.count(&Selector::legacy()), 500);
    assert_eq!(progress.fraction(&Selector::modern()), 0.5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_see_the_same_backend_for_a_key() {
    let (router, _) = build_router();

    let handles: Vec<_> = (0..200)
        .map(|_| {
            let router = Arc::clone(&router);
            tokio::spawn(async move { router.handle("MODERN_42").await })
        })
        .collect();

    for handle in handles {
        match handle.await.unwrap().unwrap() {
            strangler_router::Lookup::Found(customer) => {
                assert_eq!(customer.source, Some(Selector::modern()))
            }
            strangler_router::Lookup::NotFound => panic!("synthesizing backend never misses"),
        }
    }
}
