

use tower::Service;

use crate::consent::{
    api::{AdminRequest, AdminResponse},
    infrastructure::model::ConsentStatus,
};
use fixtures::seeded_engine;

#[tokio::test]
async fn integration_end_to_end_scenario() {
    // User U exists; facility F is registered, implicitly creating hub H
    // named after F; a consent for (U, H) starts UNSIGNED with an empty
    // attribute set; granting it succeeds; a later consent for the same
    // pair coexists with the granted one.
    let core = seeded_engine();
    let mut admin = core.admin.clone();

    let AdminResponse::ConsentHub(hub) =
        admin.call(AdminRequest::RegisterFacility { facility_id: 1 }).await.unwrap()
    else {
        panic!("expected consent hub");
    };
    assert_eq!(hub.name, "storage-cluster");
    assert!(hub.enforce_consents);

    let AdminResponse::Consent(consent) = admin
        .call(AdminRequest::CreateConsent { user_id: 1, consent_hub_id: hub.id })
        .await
        .unwrap()
    else {
        panic!("expected consent");
    };
    assert_eq!(consent.status, ConsentStatus::Unsigned);
    // No resources assigned yet
    assert!(consent.attributes.is_empty());

    let AdminResponse::Consent(granted) = admin
        .call(AdminRequest::ChangeConsentStatus {
            consent_id: consent.id,
            status: "GRANTED".to_string(),
        })
        .await
        .unwrap()
    else {
        panic!("expected consent");
    };
    assert_eq!(granted.status, ConsentStatus::Granted);

    // The UNSIGNED bound does not apply to decided consents: a fresh
    // UNSIGNED consent coexists with the granted one
    let AdminResponse::Consent(second) = admin
        .call(AdminRequest::CreateConsent { user_id: 1, consent_hub_id: hub.id })
        .await
        .unwrap()
    else {
        panic!("expected consent");
    };
    assert_ne!(second.id, consent.id);
    assert_eq!(second.status, ConsentStatus::Unsigned);

    let AdminResponse::Consents(consents) = admin
        .call(AdminRequest::GetConsentsForUser { user_id: 1, status: None })
        .await
        .unwrap()
    else {
        panic!("expected consents");
    };
    assert_eq!(consents.len(), 2);
}

#[tokio::test]
async fn integration_admin_rejects_unknown_status_literal() {
    let core = seeded_engine();
    let mut admin = core.admin.clone();

    let AdminResponse::ConsentHub(hub) =
        admin.call(AdminRequest::RegisterFacility { facility_id: 1 }).await.unwrap()
    else {
        panic!("expected consent hub");
    };
    let AdminResponse::Consent(consent) = admin
        .call(AdminRequest::CreateConsent { user_id: 1, consent_hub_id: hub.id })
        .await
        .unwrap()
    else {
        panic!("expected consent");
    };

    let result = admin
        .call(AdminRequest::ChangeConsentStatus {
            consent_id: consent.id,
            status: "granted".to_string(),
        })
        .await;
    assert!(matches!(
        result.unwrap_err(),
        crate::consent::error::ConsentError::InvalidConsentStatus(_)
    ));

    let result =
        admin.call(AdminRequest::GetConsentsForUser { user_id: 1, status: Some("SIGNED".to_string()) }).await;
    assert!(matches!(
        result.unwrap_err(),
        crate::consent::error::ConsentError::InvalidConsentStatus(_)
    ));
}
