//! Customer maintenance views: the join behind the dashboard.
//!
//! Every function here is pure over a [`Snapshot`]. Records and overrides are
//! indexed by customer id in one pass each, then customers are joined in a
//! single pass, so the cost is linear in customers + records + overrides.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::days_between;
use crate::db::{DbCustomer, DbReminderOverride, Snapshot};
use crate::due::{next_due_date, per_type_due_dates, TypeDueDate};
use crate::snooze::{effective_due_date, newer};
use crate::status::classify_with;
use crate::types::{MaintenanceStatus, ScheduleRules};

/// One customer joined with its computed scheduling state. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerMaintenanceView {
    pub customer: DbCustomer,
    pub last_maintenance_date: Option<NaiveDate>,
    pub next_due_date: NaiveDate,
    pub effective_due_date: NaiveDate,
    pub days_until_due: i64,
    pub status: MaintenanceStatus,
    pub active_override: Option<DbReminderOverride>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActiveFilter {
    #[default]
    All,
    ActiveOnly,
    InactiveOnly,
}

/// Pre-filter applied to customers before the join.
#[derive(Debug, Clone, Default)]
pub struct ViewQuery {
    /// Case-insensitive substring over name, phone and address.
    pub search: Option<String>,
    pub active: ActiveFilter,
}

impl ViewQuery {
    fn matches(&self, customer: &DbCustomer, needle: Option<&str>) -> bool {
        let active_ok = match self.active {
            ActiveFilter::All => true,
            ActiveFilter::ActiveOnly => customer.active,
            ActiveFilter::InactiveOnly => !customer.active,
        };
        if !active_ok {
            return false;
        }
        match needle {
            None => true,
            Some(needle) => [&customer.name, &customer.phone, &customer.address]
                .iter()
                .any(|field| field.to_lowercase().contains(needle)),
        }
    }

    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Per-customer lookups built in one pass over each child table.
struct ScheduleIndex<'a> {
    last_dates: HashMap<&'a str, NaiveDate>,
    overrides: HashMap<&'a str, &'a DbReminderOverride>,
}

impl<'a> ScheduleIndex<'a> {
    fn build(snapshot: &'a Snapshot) -> Self {
        let mut last_dates: HashMap<&str, NaiveDate> = HashMap::new();
        for record in &snapshot.maintenance_records {
            last_dates
                .entry(record.customer_id.as_str())
                .and_modify(|d| {
                    if record.date > *d {
                        *d = record.date;
                    }
                })
                .or_insert(record.date);
        }

        let mut overrides: HashMap<&str, &DbReminderOverride> = HashMap::new();
        for o in &snapshot.reminder_overrides {
            overrides
                .entry(o.customer_id.as_str())
                .and_modify(|current| *current = newer(*current, o))
                .or_insert(o);
        }

        Self {
            last_dates,
            overrides,
        }
    }

    /// Effective due date and signed days for one customer, without cloning.
    fn resolve(
        &self,
        customer: &DbCustomer,
        rules: &ScheduleRules,
        today: NaiveDate,
    ) -> (Option<NaiveDate>, NaiveDate, NaiveDate, i64) {
        let last = self.last_dates.get(customer.id.as_str()).copied();
        let computed = next_due_date(
            customer.installation_date,
            last,
            customer.cycle_months(rules.default_cycle_months),
        );
        let effective = effective_due_date(
            computed,
            self.overrides.get(customer.id.as_str()).copied(),
        );
        (last, computed, effective, days_between(today, effective))
    }

    fn view(
        &self,
        customer: &DbCustomer,
        rules: &ScheduleRules,
        today: NaiveDate,
    ) -> CustomerMaintenanceView {
        let (last, computed, effective, days) = self.resolve(customer, rules, today);
        CustomerMaintenanceView {
            customer: customer.clone(),
            last_maintenance_date: last,
            next_due_date: computed,
            effective_due_date: effective,
            days_until_due: days,
            status: classify_with(days, rules),
            active_override: self.overrides.get(customer.id.as_str()).map(|o| (*o).clone()),
        }
    }
}

/// All matching customers as views, most urgent first.
///
/// Ordered by status priority, then by ascending days until due.
pub fn build_views(
    snapshot: &Snapshot,
    query: &ViewQuery,
    rules: &ScheduleRules,
    today: NaiveDate,
) -> Vec<CustomerMaintenanceView> {
    let index = ScheduleIndex::build(snapshot);
    let needle = query.needle();
    let mut views: Vec<CustomerMaintenanceView> = snapshot
        .customers
        .iter()
        .filter(|c| query.matches(c, needle.as_deref()))
        .map(|c| index.view(c, rules, today))
        .collect();
    sort_views(&mut views, ViewSort::Urgency);
    views
}

/// View for a single customer, or `None` if the id is unknown.
pub fn customer_view(
    snapshot: &Snapshot,
    customer_id: &str,
    rules: &ScheduleRules,
    today: NaiveDate,
) -> Option<CustomerMaintenanceView> {
    let customer = snapshot.customers.iter().find(|c| c.id == customer_id)?;
    Some(ScheduleIndex::build(snapshot).view(customer, rules, today))
}

/// Number of active customers whose effective due date has passed.
pub fn overdue_count(snapshot: &Snapshot, rules: &ScheduleRules, today: NaiveDate) -> usize {
    let index = ScheduleIndex::build(snapshot);
    snapshot
        .customers
        .iter()
        .filter(|c| c.active)
        .filter(|c| index.resolve(c, rules, today).3 < 0)
        .count()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub total: usize,
    pub overdue: usize,
    pub due_soon: usize,
    pub upcoming: usize,
    pub ok: usize,
}

/// Totals per status for summary cards and filter counts.
pub fn status_summary(views: &[CustomerMaintenanceView]) -> StatusSummary {
    views.iter().fold(
        StatusSummary {
            total: views.len(),
            ..StatusSummary::default()
        },
        |mut acc, view| {
            match view.status {
                MaintenanceStatus::Overdue => acc.overdue += 1,
                MaintenanceStatus::DueSoon => acc.due_soon += 1,
                MaintenanceStatus::Upcoming => acc.upcoming += 1,
                MaintenanceStatus::Ok => acc.ok += 1,
            }
            acc
        },
    )
}

/// The first `limit` views that need attention, in the order given.
pub fn urgent_preview(
    views: &[CustomerMaintenanceView],
    limit: usize,
) -> Vec<&CustomerMaintenanceView> {
    views
        .iter()
        .filter(|v| v.status != MaintenanceStatus::Ok)
        .take(limit)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ViewSort {
    /// Status priority, then days until due.
    #[default]
    Urgency,
    Name,
    InstallationNewestFirst,
    /// Customers never serviced sort last.
    LastMaintenanceNewestFirst,
    DueDate,
}

pub fn sort_views(views: &mut [CustomerMaintenanceView], order: ViewSort) {
    match order {
        ViewSort::Urgency => {
            views.sort_by_key(|v| (v.status.priority(), v.days_until_due));
        }
        ViewSort::Name => {
            views.sort_by_cached_key(|v| v.customer.name.to_lowercase());
        }
        ViewSort::InstallationNewestFirst => {
            views.sort_by(|a, b| {
                b.customer
                    .installation_date
                    .cmp(&a.customer.installation_date)
            });
        }
        ViewSort::LastMaintenanceNewestFirst => {
            // Option orders None first, so reversing puts never-serviced last.
            views.sort_by(|a, b| b.last_maintenance_date.cmp(&a.last_maintenance_date));
        }
        ViewSort::DueDate => {
            views.sort_by_key(|v| v.effective_due_date);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Overdue,
    DueSoon,
    Upcoming,
    /// Upcoming or ok: nothing to do this week.
    OnTrack,
}

impl StatusFilter {
    pub fn accepts(&self, status: MaintenanceStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Overdue => status == MaintenanceStatus::Overdue,
            StatusFilter::DueSoon => status == MaintenanceStatus::DueSoon,
            StatusFilter::Upcoming => status == MaintenanceStatus::Upcoming,
            StatusFilter::OnTrack => {
                matches!(status, MaintenanceStatus::Upcoming | MaintenanceStatus::Ok)
            }
        }
    }
}

pub fn filter_views(
    views: Vec<CustomerMaintenanceView>,
    filter: StatusFilter,
) -> Vec<CustomerMaintenanceView> {
    views
        .into_iter()
        .filter(|v| filter.accepts(v.status))
        .collect()
}

/// Detail view: the dashboard row plus the per-type schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDueBreakdown {
    pub view: CustomerMaintenanceView,
    /// Empty when the customer has no usable per-type cycles.
    pub per_type: Vec<TypeDueDate>,
    /// Soonest per-type due date, or the view's computed date without one.
    pub earliest_due_date: NaiveDate,
}

pub fn customer_due_breakdown(
    snapshot: &Snapshot,
    customer_id: &str,
    rules: &ScheduleRules,
    today: NaiveDate,
) -> Option<CustomerDueBreakdown> {
    let view = customer_view(snapshot, customer_id, rules, today)?;
    let per_type = per_type_due_dates(&view.customer, &snapshot.maintenance_records);
    let earliest_due_date = per_type
        .first()
        .map(|entry| entry.next_due_date)
        .unwrap_or(view.next_due_date);
    Some(CustomerDueBreakdown {
        view,
        per_type,
        earliest_due_date,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::db::test_utils::{date, sample_customer, sample_override, sample_record};
    use crate::types::MaintenanceType;

    fn rules() -> ScheduleRules {
        ScheduleRules::default()
    }

    /// Four customers, one per status, relative to 2025-01-01.
    fn fixture() -> Snapshot {
        let mut overdue = sample_customer("c-overdue", "Deniz");
        overdue.installation_date = date("2024-01-01");
        let mut soon = sample_customer("c-soon", "Cem");
        soon.installation_date = date("2024-07-05");
        let mut upcoming = sample_customer("c-upcoming", "Burak");
        upcoming.installation_date = date("2024-07-20");
        let mut ok = sample_customer("c-ok", "Ayse");
        ok.installation_date = date("2024-12-01");
        ok.address = "Besiktas".to_string();

        Snapshot {
            customers: vec![ok, upcoming, soon, overdue],
            maintenance_records: vec![
                // Older record first: the max date must win, not the last row.
                sample_record("m1", "c-overdue", "2024-06-01"),
                sample_record("m0", "c-overdue", "2024-03-01"),
            ],
            reminder_overrides: Vec::new(),
            plans: Vec::new(),
        }
    }

    #[test]
    fn test_views_sorted_by_status_then_days() {
        let snapshot = fixture();
        let views = build_views(&snapshot, &ViewQuery::default(), &rules(), date("2025-01-01"));
        let ids: Vec<&str> = views.iter().map(|v| v.customer.id.as_str()).collect();
        assert_eq!(ids, vec!["c-overdue", "c-soon", "c-upcoming", "c-ok"]);

        let overdue = &views[0];
        assert_eq!(overdue.last_maintenance_date, Some(date("2024-06-01")));
        assert_eq!(overdue.next_due_date, date("2024-12-01"));
        assert_eq!(overdue.days_until_due, -31);
        assert_eq!(overdue.status, MaintenanceStatus::Overdue);
        assert_eq!(views[1].days_until_due, 4);
        assert_eq!(views[1].status, MaintenanceStatus::DueSoon);
    }

    #[test]
    fn test_ties_break_by_days() {
        let mut a = sample_customer("a", "A");
        a.installation_date = date("2024-06-20");
        let mut b = sample_customer("b", "B");
        b.installation_date = date("2024-06-10");
        let snapshot = Snapshot {
            customers: vec![a, b],
            ..Snapshot::default()
        };
        let views = build_views(&snapshot, &ViewQuery::default(), &rules(), date("2025-01-01"));
        assert!(views.iter().all(|v| v.status == MaintenanceStatus::Overdue));
        assert_eq!(views[0].customer.id, "b");
        assert!(views[0].days_until_due < views[1].days_until_due);
    }

    #[test]
    fn test_latest_override_applies_in_view() {
        let mut snapshot = fixture();
        snapshot.reminder_overrides = vec![
            sample_override("o2", "c-overdue", "2025-03-01", 2),
            sample_override("o1", "c-overdue", "2025-02-01", 1),
        ];
        let view = customer_view(&snapshot, "c-overdue", &rules(), date("2025-01-01")).unwrap();
        assert_eq!(view.next_due_date, date("2024-12-01"));
        assert_eq!(view.effective_due_date, date("2025-03-01"));
        assert_eq!(view.status, MaintenanceStatus::Ok);
        assert_eq!(view.active_override.map(|o| o.id), Some("o2".to_string()));
    }

    #[test]
    fn test_view_override_agrees_with_active_override() {
        let mut snapshot = fixture();
        snapshot.reminder_overrides = vec![
            sample_override("o1", "c-overdue", "2025-02-01", 5),
            sample_override("o2", "c-overdue", "2025-04-01", 5),
            sample_override("o3", "c-soon", "2025-05-01", 1),
            sample_override("o0", "c-overdue", "2025-06-01", 4),
        ];
        for id in ["c-overdue", "c-soon"] {
            let view = customer_view(&snapshot, id, &rules(), date("2025-01-01")).unwrap();
            let expected = crate::snooze::active_override(
                snapshot.reminder_overrides.iter().filter(|o| o.customer_id == id),
            );
            assert_eq!(view.active_override.as_ref(), expected);
        }
        let view = customer_view(&snapshot, "c-overdue", &rules(), date("2025-01-01")).unwrap();
        assert_eq!(view.active_override.map(|o| o.id), Some("o2".to_string()));
    }

    #[test]
    fn test_search_and_active_filters() {
        let mut snapshot = fixture();
        snapshot.customers[1].active = false;

        let by_address = ViewQuery {
            search: Some("  BESIK ".to_string()),
            active: ActiveFilter::All,
        };
        let views = build_views(&snapshot, &by_address, &rules(), date("2025-01-01"));
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].customer.id, "c-ok");

        let inactive = ViewQuery {
            search: None,
            active: ActiveFilter::InactiveOnly,
        };
        let views = build_views(&snapshot, &inactive, &rules(), date("2025-01-01"));
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].customer.id, "c-upcoming");

        let active = ViewQuery {
            search: Some(String::new()),
            active: ActiveFilter::ActiveOnly,
        };
        assert_eq!(build_views(&snapshot, &active, &rules(), date("2025-01-01")).len(), 3);
    }

    #[test]
    fn test_overdue_count_ignores_inactive() {
        let mut snapshot = fixture();
        assert_eq!(overdue_count(&snapshot, &rules(), date("2025-01-01")), 1);
        snapshot
            .customers
            .iter_mut()
            .find(|c| c.id == "c-overdue")
            .unwrap()
            .active = false;
        assert_eq!(overdue_count(&snapshot, &rules(), date("2025-01-01")), 0);
    }

    #[test]
    fn test_dangling_children_are_tolerated() {
        let mut snapshot = fixture();
        snapshot
            .maintenance_records
            .push(sample_record("m9", "ghost", "2024-12-01"));
        snapshot
            .reminder_overrides
            .push(sample_override("o9", "ghost", "2025-05-01", 1));
        let views = build_views(&snapshot, &ViewQuery::default(), &rules(), date("2025-01-01"));
        assert_eq!(views.len(), 4);
    }

    #[test]
    fn test_summary_preview_and_filters() {
        let views = build_views(&fixture(), &ViewQuery::default(), &rules(), date("2025-01-01"));
        let summary = status_summary(&views);
        assert_eq!(
            summary,
            StatusSummary {
                total: 4,
                overdue: 1,
                due_soon: 1,
                upcoming: 1,
                ok: 1,
            }
        );

        let preview = urgent_preview(&views, 2);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].customer.id, "c-overdue");
        assert_eq!(urgent_preview(&views, 10).len(), 3);

        let on_track = filter_views(views.clone(), StatusFilter::OnTrack);
        assert_eq!(on_track.len(), 2);
        assert_eq!(filter_views(views, StatusFilter::DueSoon).len(), 1);
    }

    #[test]
    fn test_alternate_sorts() {
        let mut views =
            build_views(&fixture(), &ViewQuery::default(), &rules(), date("2025-01-01"));

        sort_views(&mut views, ViewSort::Name);
        assert_eq!(views[0].customer.name, "Ayse");

        sort_views(&mut views, ViewSort::InstallationNewestFirst);
        assert_eq!(views[0].customer.id, "c-ok");

        sort_views(&mut views, ViewSort::LastMaintenanceNewestFirst);
        assert_eq!(views[0].customer.id, "c-overdue");

        sort_views(&mut views, ViewSort::DueDate);
        assert_eq!(views[0].customer.id, "c-overdue");
        assert_eq!(views[3].customer.id, "c-ok");
    }

    #[test]
    fn test_due_breakdown_uses_per_type_map() {
        let mut snapshot = fixture();
        let mut cycles = BTreeMap::new();
        cycles.insert(MaintenanceType::FilterReplacement, 6);
        cycles.insert(MaintenanceType::MembraneReplacement, 2);
        snapshot.customers[0].maintenance_cycles = Some(cycles);

        let breakdown =
            customer_due_breakdown(&snapshot, "c-ok", &rules(), date("2025-01-01")).unwrap();
        assert_eq!(breakdown.per_type.len(), 2);
        assert_eq!(breakdown.earliest_due_date, date("2025-02-01"));
        assert_eq!(breakdown.view.next_due_date, date("2025-06-01"));

        let plain =
            customer_due_breakdown(&snapshot, "c-soon", &rules(), date("2025-01-01")).unwrap();
        assert!(plain.per_type.is_empty());
        assert_eq!(plain.earliest_due_date, plain.view.next_due_date);
        assert!(customer_due_breakdown(&snapshot, "ghost", &rules(), date("2025-01-01")).is_none());
    }

    #[test]
    fn test_large_dataset_joins_correctly() {
        const CUSTOMERS: usize = 5_000;
        const RECORDS_PER_CUSTOMER: usize = 8;

        let mut snapshot = Snapshot::default();
        for i in 0..CUSTOMERS {
            let id = format!("c{i}");
            snapshot.customers.push(sample_customer(&id, &format!("Customer {i}")));
            for r in 0..RECORDS_PER_CUSTOMER {
                let day = 1 + r as u32;
                snapshot.maintenance_records.push(sample_record(
                    &format!("m{i}-{r}"),
                    &id,
                    &format!("2024-06-{day:02}"),
                ));
            }
            if i % 2 == 0 {
                snapshot.reminder_overrides.push(sample_override(
                    &format!("o{i}"),
                    &id,
                    "2025-01-03",
                    1,
                ));
            }
        }

        let today = date("2025-01-01");
        let views = build_views(&snapshot, &ViewQuery::default(), &rules(), today);
        assert_eq!(views.len(), CUSTOMERS);

        // Snoozed customers land due-soon (2 days), the rest overdue from 2024-12-08.
        let summary = status_summary(&views);
        assert_eq!(summary.overdue, CUSTOMERS / 2);
        assert_eq!(summary.due_soon, CUSTOMERS / 2);
        assert!(views
            .iter()
            .all(|v| v.last_maintenance_date == Some(date("2024-06-08"))));
        assert_eq!(views[0].days_until_due, -24);
        assert_eq!(overdue_count(&snapshot, &rules(), today), CUSTOMERS / 2);
    }
}
