//! Export then import reproduces the same dashboard.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use tempfile::TempDir;

use aquaservice_lib::backup::ImportLimits;
use aquaservice_lib::dashboard::{build_views, ViewQuery};
use aquaservice_lib::db::ServiceDb;
use aquaservice_lib::notification::NoopNotifier;
use aquaservice_lib::services::backup::{export_json, import_backup_json};
use aquaservice_lib::services::customers::{add_customer, CustomerInput};
use aquaservice_lib::services::maintenance::{add_maintenance_record, MaintenanceInput};
use aquaservice_lib::error::ServiceError;
use aquaservice_lib::services::plans::{cancel_plan, complete_plan, create_plan, postpone_plan};
use aquaservice_lib::services::reminders::{snooze_months, snooze_to_date};
use aquaservice_lib::types::{MaintenanceType, PlanStatus, ScheduleRules};

fn open(dir: &TempDir, name: &str) -> ServiceDb {
    ServiceDb::open_at(dir.path().join(name)).expect("open database")
}

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid date")
}

fn customer(name: &str, installed: &str) -> CustomerInput {
    CustomerInput {
        name: name.to_string(),
        phone: "0532 111 22 33".to_string(),
        address: "Istanbul".to_string(),
        installation_date: Some(d(installed)),
        ..CustomerInput::default()
    }
}

fn visit(on: &str, kind: MaintenanceType, cost: Option<f64>) -> MaintenanceInput {
    MaintenanceInput {
        date: d(on),
        maintenance_type: kind,
        notes: String::new(),
        cost,
    }
}

/// A dataset touching every table and every optional field.
fn populate(db: &ServiceDb, today: NaiveDate) {
    let n = &NoopNotifier;

    let ayse = add_customer(db, n, &customer("Ayse", "2023-05-10"), today).unwrap();
    add_maintenance_record(db, n, &ayse.id, &visit("2024-05-01", MaintenanceType::FilterReplacement, Some(90.0)), today).unwrap();
    add_maintenance_record(db, n, &ayse.id, &visit("2024-11-02", MaintenanceType::Repair, None), today).unwrap();

    let mut typed = customer("Burak", "2024-02-29");
    typed.maintenance_cycle_months = Some(4);
    typed.maintenance_cycles = Some(BTreeMap::from([
        (MaintenanceType::FilterReplacement, 6),
        (MaintenanceType::MembraneReplacement, 24),
        (MaintenanceType::Repair, 0),
    ]));
    typed.device_model = Some("RO-7".to_string());
    let burak = add_customer(db, n, &typed, today).unwrap();
    snooze_to_date(db, n, &burak.id, d("2024-06-29"), d("2025-02-15"), today).unwrap();
    snooze_months(db, n, &burak.id, d("2024-06-29"), 1, today).unwrap();

    let cem = add_customer(db, n, &customer("Cem", "2024-12-20"), today).unwrap();
    let planned = create_plan(db, n, &cem.id, d("2025-01-05"), "first check").unwrap();
    let done = create_plan(db, n, &cem.id, d("2024-12-30"), "").unwrap();
    complete_plan(db, n, &done.id, &visit("2024-12-30", MaintenanceType::GeneralMaintenance, Some(40.5)), today).unwrap();
    let dropped = create_plan(db, n, &ayse.id, d("2025-01-10"), "").unwrap();
    cancel_plan(db, n, &dropped.id).unwrap();
    assert_eq!(planned.status, PlanStatus::Scheduled);

    let mut inactive = customer("Deniz", "2022-01-31");
    inactive.notes = "moved away".to_string();
    let deniz = add_customer(db, n, &inactive, today).unwrap();
    aquaservice_lib::services::customers::set_customer_active(db, n, &deniz.id, false).unwrap();
}

#[test]
fn import_of_export_reproduces_views() {
    let dir = tempfile::tempdir().unwrap();
    let today = d("2025-01-01");
    let source = open(&dir, "source.db");
    populate(&source, today);

    let json = export_json(&source).unwrap();
    let target = open(&dir, "target.db");
    let summary =
        import_backup_json(&target, &NoopNotifier, &json, &ImportLimits::default()).unwrap();
    assert_eq!(summary.customers, 4);
    assert_eq!(summary.plans, 3);
    assert_eq!(summary.dropped_plans, 0);

    let rules = ScheduleRules::default();
    for query in [
        ViewQuery::default(),
        ViewQuery {
            search: Some("bur".to_string()),
            ..ViewQuery::default()
        },
    ] {
        let before = build_views(&source.load_snapshot().unwrap(), &query, &rules, today);
        let after = build_views(&target.load_snapshot().unwrap(), &query, &rules, today);
        assert_eq!(before, after);
    }
    assert_eq!(source.load_snapshot().unwrap(), target.load_snapshot().unwrap());
}

#[test]
fn version_one_document_imports_without_plans() {
    let dir = tempfile::tempdir().unwrap();
    let db = open(&dir, "v1.db");
    let doc = r#"{
        "version": 1,
        "exportedAt": "2024-10-01T12:00:00.000Z",
        "customers": [
            {"id": "c1", "name": "Ayse", "phone": "0532", "address": "Kadikoy",
             "installationDate": "2024-01-31", "notes": "", "createdAt": "2024-01-31T10:00:00.000Z",
             "updatedAt": "2024-01-31T10:00:00.000Z"}
        ],
        "maintenanceRecords": [
            {"id": "m1", "customerId": "c1", "date": "2024-07-31", "type": "filter_replacement",
             "notes": "", "cost": 75, "createdAt": "2024-07-31T10:00:00.000Z"}
        ],
        "reminderOverrides": []
    }"#;

    let summary = import_backup_json(&db, &NoopNotifier, doc, &ImportLimits::default()).unwrap();
    assert_eq!(summary.version, 1);
    assert_eq!(summary.plans, 0);

    let snapshot = db.load_snapshot().unwrap();
    let views = build_views(&snapshot, &ViewQuery::default(), &ScheduleRules::default(), d("2025-01-01"));
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].next_due_date, d("2025-01-31"));
    assert_eq!(views[0].days_until_due, 30);
    assert_eq!(snapshot.maintenance_records[0].cost, Some(75.0));
}

#[test]
fn dates_at_the_edge_of_the_format_survive_export() {
    let dir = tempfile::tempdir().unwrap();
    let today = d("2025-01-01");
    let n = &NoopNotifier;
    let source = open(&dir, "edge.db");
    let cem = add_customer(&source, n, &customer("Cem", "2024-12-20"), today).unwrap();

    let far = NaiveDate::from_ymd_opt(10000, 1, 1).unwrap();
    let plan = create_plan(&source, n, &cem.id, d("9999-12-31"), "").unwrap();
    assert!(matches!(create_plan(&source, n, &cem.id, far, ""), Err(ServiceError::Validation(_))));
    assert!(matches!(postpone_plan(&source, n, &plan.id, far), Err(ServiceError::Validation(_))));
    assert!(matches!(
        snooze_to_date(&source, n, &cem.id, d("2025-06-20"), far, today),
        Err(ServiceError::Validation(_))
    ));
    snooze_to_date(&source, n, &cem.id, d("2025-06-20"), d("9999-12-31"), today).unwrap();

    let json = export_json(&source).unwrap();
    let target = open(&dir, "edge-target.db");
    let summary = import_backup_json(&target, n, &json, &ImportLimits::default()).unwrap();
    assert_eq!(summary.plans, 1);
    assert_eq!(summary.dropped_plans, 0);
    assert_eq!(source.load_snapshot().unwrap(), target.load_snapshot().unwrap());
}
