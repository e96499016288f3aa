//! End-to-end protocol flow: dispatch a request, run the selected
//! operation against a live service, check what comes back.

use cswd_core::{ElementSetName, QueryableRegistry, Repository};
use cswd_proto::{Constraint, ExceptionCode, Pagination, Record, Version};
use cswd_server::{
    CatalogueService, Dispatcher, Operation, RequestSummary, SearchRequest, TransactionOp,
};
use std::sync::Arc;

fn live_service() -> CatalogueService {
    let registry = Arc::new(QueryableRegistry::with_core_profiles().unwrap());
    let repo = Arc::new(Repository::in_memory(Arc::clone(&registry)).unwrap());
    CatalogueService::new(repo, registry)
}

fn full_dispatcher() -> Dispatcher<Operation> {
    let mut dispatcher = Dispatcher::new();
    for version in Version::ALL {
        for op in [
            Operation::GetCapabilities,
            Operation::GetRecords,
            Operation::GetRecordById,
            Operation::GetDomain,
            Operation::Transaction,
        ] {
            dispatcher.register(version, op, op);
        }
    }
    dispatcher
}

fn request(name: &str, version: Option<&str>) -> RequestSummary {
    RequestSummary {
        service: "CSW".to_string(),
        request: name.to_string(),
        version: version.map(String::from),
        ..Default::default()
    }
}

#[test]
fn test_negotiate_then_search() {
    let service = live_service();
    let dispatcher = full_dispatcher();

    let summary = service
        .transaction(vec![
            TransactionOp::Insert(
                Record::new("r1", "csw:Record", "http://www.opengis.net/cat/csw/2.0.2")
                    .with_title("Lake Ontario bathymetry"),
            ),
            TransactionOp::Insert(
                Record::new("r2", "csw:Record", "http://www.opengis.net/cat/csw/2.0.2")
                    .with_title("Prairie soils"),
            ),
        ])
        .unwrap();
    assert_eq!(summary.inserted, 2);

    let dispatched = dispatcher
        .dispatch(&request("GetRecords", Some("2.0.2")))
        .unwrap();
    assert_eq!(dispatched.operation, Operation::GetRecords);

    let results = service
        .get_records(&SearchRequest {
            constraint: Some(Constraint::CqlText("dc:title LIKE 'Lake%'".to_string())),
            elementset: ElementSetName::Brief,
            pagination: Pagination::default(),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(results.total, 1);
    assert_eq!(results.records[0].identifier, "r1");
}

#[test]
fn test_capabilities_negotiation_feeds_update_sequence() {
    let service = live_service();
    let dispatcher = full_dispatcher();

    let mut caps_request = request("GetCapabilities", None);
    caps_request.accept_versions = vec!["9.9.9".to_string(), "2.0.2".to_string()];
    let dispatched = dispatcher.dispatch(&caps_request).unwrap();
    assert_eq!(dispatched.version, Version::Csw202);

    let caps = service.get_capabilities(dispatched.version, None).unwrap();
    assert_eq!(caps.version, Version::Csw202);
    assert!(caps.typenames.contains(&"csw:Record".to_string()));
    assert!(caps.update_sequence.is_none());
}

#[test]
fn test_failed_dispatch_renders_exception_report() {
    let dispatcher = full_dispatcher();
    let err = dispatcher
        .dispatch(&request("GetRecords", None))
        .unwrap_err();
    let report = err.to_report();
    assert_eq!(report.code, ExceptionCode::MissingParameterValue);
    assert_eq!(report.locator.as_deref(), Some("version"));
}

#[test]
fn test_get_record_by_id_masks_to_brief() {
    let service = live_service();
    service
        .transaction(vec![TransactionOp::Insert(
            Record::new("r1", "csw:Record", "http://www.opengis.net/cat/csw/2.0.2")
                .with_title("Titled")
                .with_abstract("Hidden in brief"),
        )])
        .unwrap();

    let records = service
        .get_record_by_id(&["r1".to_string()], ElementSetName::Brief)
        .unwrap();
    assert_eq!(records[0].title.as_deref(), Some("Titled"));
    assert_eq!(records[0].abstract_, None);
}
