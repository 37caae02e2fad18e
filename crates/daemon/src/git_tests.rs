// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use lazyaf_core::RepositoryId;

use super::*;

#[test]
fn static_resolver_returns_configured_url_for_any_repository() {
    let resolver = StaticRepositoryResolver::new("https://example.com/repo.git");
    assert_eq!(
        resolver.clone_url(RepositoryId::new()),
        Some("https://example.com/repo.git".to_string())
    );
    assert_eq!(
        resolver.clone_url(RepositoryId::new()),
        Some("https://example.com/repo.git".to_string())
    );
}

#[tokio::test]
async fn checkout_fails_fast_when_resolver_has_no_url() {
    struct EmptyResolver;
    impl RepositoryResolver for EmptyResolver {
        fn clone_url(&self, _repo_id: RepositoryId) -> Option<String> {
            None
        }
    }

    let provider = CliGitProvider::new("docker", "alpine/git", EmptyResolver);
    let err = provider.checkout(RepositoryId::new(), "main", None, "vol1").await.unwrap_err();
    assert_eq!(err.kind(), lazyaf_core::ErrorKind::NotFound);
}
