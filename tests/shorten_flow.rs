mod common;

use std::sync::Arc;
use url_shortener_core::app::AppContext;
use url_shortener_core::application::services::Shortened;
use url_shortener_core::config::Config;
use url_shortener_core::domain::repositories::UrlStore;
use url_shortener_core::error::AppError;
use url_shortener_core::infrastructure::persistence::MemoryUrlStore;
use url_shortener_core::utils::code_generator::RandomCodeProvider;
use url_shortener_core::utils::short_url::short_code_from_url;

#[tokio::test]
async fn test_shorten_resolve_delete_lifecycle() {
    let store = Arc::new(MemoryUrlStore::new());
    let (service, queue) = common::create_service(Arc::clone(&store), RandomCodeProvider);

    let short_url = service
        .get_short_url("https://example.com/page", "alice")
        .await
        .unwrap()
        .into_short_url();
    let code = short_code_from_url(&short_url).unwrap();
    assert_eq!(code.len(), 8);
    assert!(short_url.starts_with(common::BASE_URL));

    assert_eq!(
        service.get_original_url(&code).await.unwrap(),
        "https://example.com/page"
    );

    service.delete_user_urls("alice", vec![code.clone()]).unwrap();
    queue.stop().await;

    assert_eq!(
        service.get_original_url(&code).await.unwrap_err(),
        AppError::Gone { code: code.clone() }
    );
    assert!(matches!(
        service.get_user_urls("alice").await,
        Err(AppError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_same_url_returns_existing_code() {
    let store = Arc::new(MemoryUrlStore::new());
    let (service, _queue) = common::create_service(store, RandomCodeProvider);

    let first = service
        .get_short_url("https://example.com", "alice")
        .await
        .unwrap();
    let second = service
        .get_short_url("https://example.com", "bob")
        .await
        .unwrap();

    assert!(matches!(first, Shortened::Created(_)));
    assert!(second.is_conflict());
    assert_eq!(first.short_url(), second.short_url());
}

#[tokio::test]
async fn test_spellings_of_one_url_share_a_code() {
    let store = Arc::new(MemoryUrlStore::new());
    let (service, _queue) = common::create_service(Arc::clone(&store), RandomCodeProvider);

    let first = service.get_short_url("https://a.com", "alice").await.unwrap();
    let padded = service.get_short_url(" https://a.com ", "alice").await.unwrap();
    let shouting = service.get_short_url("HTTPS://A.COM:443/", "bob").await.unwrap();

    assert!(matches!(first, Shortened::Created(_)));
    assert!(matches!(padded, Shortened::Existing(_)));
    assert!(shouting.is_conflict());
    assert_eq!(first.short_url(), padded.short_url());
    assert_eq!(first.short_url(), shouting.short_url());

    let code = short_code_from_url(first.short_url()).unwrap();
    assert_eq!(service.get_original_url(&code).await.unwrap(), "https://a.com/");
}

#[tokio::test]
async fn test_collision_is_retried_with_next_code() {
    let store = Arc::new(MemoryUrlStore::new());
    let codes = common::ScriptedCodes::new(&["taken001", "taken001", "fresh002"]);
    let (service, _queue) = common::create_service(Arc::clone(&store), codes);

    let first = service
        .get_short_url("https://one.com", "")
        .await
        .unwrap();
    let second = service
        .get_short_url("https://two.com", "")
        .await
        .unwrap();

    assert_eq!(first.short_url(), format!("{}/taken001", common::BASE_URL));
    assert_eq!(second.short_url(), format!("{}/fresh002", common::BASE_URL));
}

#[tokio::test]
async fn test_deleted_code_is_never_reissued() {
    let store = Arc::new(MemoryUrlStore::new());
    let codes = common::ScriptedCodes::new(&["reused01", "reused01", "other002"]);
    let (service, queue) = common::create_service(Arc::clone(&store), codes);

    service
        .get_short_url("https://one.com", "alice")
        .await
        .unwrap();
    service
        .delete_user_urls("alice", vec!["reused01".to_string()])
        .unwrap();
    queue.stop().await;

    // The deleted URL can be shortened again, under a new code.
    let again = service
        .get_short_url("https://one.com", "alice")
        .await
        .unwrap();

    assert!(matches!(again, Shortened::Created(_)));
    assert_eq!(again.short_url(), format!("{}/other002", common::BASE_URL));
}

#[tokio::test]
async fn test_batch_is_all_or_nothing() {
    let store = Arc::new(MemoryUrlStore::new());
    let (service, _queue) = common::create_service(Arc::clone(&store), RandomCodeProvider);

    service
        .get_short_url("https://existing.com", "alice")
        .await
        .unwrap();

    let urls = vec![
        "https://new-1.com".to_string(),
        "https://existing.com".to_string(),
        "https://new-2.com".to_string(),
    ];
    let err = service.get_short_url_batch(&urls, "alice").await.unwrap_err();

    assert!(matches!(err, AppError::UrlConflict { .. }));
    assert_eq!(service.get_user_urls("alice").await.unwrap().len(), 1);
    assert!(store.find_by_url("https://new-1.com/").await.is_err());
}

#[tokio::test]
async fn test_batch_preserves_input_order() {
    let store = Arc::new(MemoryUrlStore::new());
    let (service, _queue) = common::create_service(store, RandomCodeProvider);

    let urls: Vec<String> = (0..5).map(|i| format!("https://site-{i}.com/")).collect();
    let short_urls = service.get_short_url_batch(&urls, "bob").await.unwrap();

    for (url, short_url) in urls.iter().zip(&short_urls) {
        let code = short_code_from_url(short_url).unwrap();
        assert_eq!(&service.get_original_url(&code).await.unwrap(), url);
    }

    let listed = service.get_user_urls("bob").await.unwrap();
    let listed: Vec<&str> = listed.iter().map(|u| u.original_url.as_str()).collect();
    assert_eq!(listed, urls.iter().map(String::as_str).collect::<Vec<_>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_shortening_of_same_url() {
    let store = Arc::new(MemoryUrlStore::new());
    let (service, _queue) = common::create_service(store, RandomCodeProvider);
    let service = Arc::new(service);

    let mut handles = Vec::new();
    for i in 0..32 {
        let service = Arc::clone(&service);
        handles.push(tokio::spawn(async move {
            service
                .get_short_url("https://hot.example.com", &format!("user-{i}"))
                .await
        }));
    }

    let mut created = 0;
    let mut short_urls = Vec::new();
    for handle in handles {
        let shortened = handle.await.unwrap().unwrap();
        if !shortened.is_conflict() {
            created += 1;
        }
        short_urls.push(shortened.into_short_url());
    }

    assert_eq!(created, 1);
    short_urls.dedup();
    assert_eq!(short_urls.len(), 1);
}

#[tokio::test]
async fn test_app_context_over_file_storage() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        file_storage_path: Some(dir.path().join("urls.json")),
        ..Config::default()
    };

    let short_url = {
        let context = AppContext::build(&config).await.unwrap();
        let short_url = context
            .service
            .get_short_url("https://persisted.com/page", "alice")
            .await
            .unwrap()
            .into_short_url();
        context.shutdown().await;
        short_url
    };

    let context = AppContext::build(&config).await.unwrap();
    let code = short_code_from_url(&short_url).unwrap();

    assert_eq!(
        context.service.get_original_url(&code).await.unwrap(),
        "https://persisted.com/page"
    );
    context.shutdown().await;
}
