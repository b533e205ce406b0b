use super::*;
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_typed_id_creation() {
    let id = AccountId::new();
    assert!(!id.to_string().is_empty());
}

#[test]
fn test_typed_id_from_uuid() {
    let uuid = Uuid::new_v4();
    let id = JournalEntryId::from_uuid(uuid);
    assert_eq!(id.into_inner(), uuid);
    assert_eq!(Uuid::from(id), uuid);
    assert_eq!(JournalEntryId::from(uuid), id);
}

#[test]
fn test_typed_id_default_is_unique() {
    let ids: HashSet<_> = (0..100).map(|_| InvoiceId::default()).collect();
    assert_eq!(ids.len(), 100);
}

#[test]
fn test_typed_id_display() {
    let uuid = Uuid::new_v4();
    let id = PaymentId::from_uuid(uuid);
    assert_eq!(format!("{id}"), uuid.to_string());
}

#[test]
fn test_typed_id_from_str() {
    let uuid = Uuid::new_v4();
    let id = TenantId::from_str(&uuid.to_string()).unwrap();
    assert_eq!(id.into_inner(), uuid);
}

#[test]
fn test_typed_id_from_str_error() {
    assert!(OrganizationId::from_str("invalid").is_err());
}

#[test]
fn test_typed_id_serializes_transparently() {
    let uuid = Uuid::new_v4();
    let id = FiscalPeriodId::from_uuid(uuid);
    assert_eq!(
        serde_json::to_string(&id).unwrap(),
        format!("\"{uuid}\"")
    );
}
