use super::*;

#[test]
fn test_store_error_converts_into_domain_error() {
    let err: DomainError = StoreError::Unavailable("connection refused".to_string()).into();
    assert!(matches!(err, DomainError::Store(StoreError::Unavailable(_))));
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_retryable_classification() {
    assert!(DomainError::AllChannelsFailed.is_retryable());
    assert!(DomainError::Store(StoreError::Conflict { id: "abc".into() }).is_retryable());
    assert!(!DomainError::Cancelled.is_retryable());
    assert!(!DomainError::invalid_strategy("no steps").is_retryable());
    assert!(!DomainError::SessionNotFound { id: "abc".into() }.is_retryable());
}

#[test]
fn test_delivery_error_kind() {
    assert!(DeliveryError::Transient("503".into()).is_transient());
    assert!(!DeliveryError::Permanent("invalid number".into()).is_transient());
}
