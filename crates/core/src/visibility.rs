//! Role-scoped order listing.
//!
//! Each role has a strategy that turns the caller and the query-string filters
//! into an [`OrderScope`]. The repository layer translates a scope into a
//! `WHERE` clause; nothing here knows about SQL.

use serde::Deserialize;

use crate::error::CoreError;
use crate::roles::{Actor, Role};
use crate::search::{clamp_limit, clamp_offset, normalize_term, ORDER_PAGE_SIZE};
use crate::serde_util::optional_id;
use crate::status::OrderStatus;
use crate::types::DbId;

/// Query-string filters accepted by every order listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilters {
    /// `active` (default), `all`, or one exact status.
    pub status: Option<String>,
    pub city: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Admin-only override on the accounter listing. Blank means none.
    #[serde(default, deserialize_with = "optional_id")]
    pub accounter_id: Option<DbId>,
    /// Attach recent history to each order (default `true`).
    pub include_history: Option<bool>,
}

/// What the caller asked for in `?status=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Active,
    All,
    Exact(OrderStatus),
}

impl StatusFilter {
    pub fn parse(value: Option<&str>) -> Result<Self, CoreError> {
        match value.map(str::trim) {
            None | Some("") | Some("active") => Ok(StatusFilter::Active),
            Some("all") => Ok(StatusFilter::All),
            Some(other) => other.parse().map(StatusFilter::Exact),
        }
    }
}

/// A resolved, role-checked listing query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderScope {
    pub maker_id: Option<DbId>,
    pub accounter_id: Option<DbId>,
    /// Only orders this taker is assigned to.
    pub assigned_to: Option<DbId>,
    /// When set, the status must be one of these.
    pub status_in: Option<Vec<OrderStatus>>,
    /// The status must be none of these.
    pub status_not_in: Vec<OrderStatus>,
    pub city: Option<String>,
    /// Raw search term; matched case-insensitively against title, description and city.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl OrderScope {
    fn base(filters: &ListFilters) -> Self {
        Self {
            city: normalize_term(filters.city.as_deref()),
            search: normalize_term(filters.search.as_deref()),
            limit: clamp_limit(filters.limit, ORDER_PAGE_SIZE, ORDER_PAGE_SIZE),
            offset: clamp_offset(filters.offset),
            ..Default::default()
        }
    }

    fn with_status_filter(mut self, filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Active => self.exclude(&OrderStatus::INACTIVE),
            StatusFilter::All => {}
            StatusFilter::Exact(status) => self.status_in = Some(vec![status]),
        }
        self
    }

    fn exclude(&mut self, statuses: &[OrderStatus]) {
        for status in statuses {
            if !self.status_not_in.contains(status) {
                self.status_not_in.push(*status);
            }
        }
    }
}

/// A listing strategy: pure function from caller and filters to a scope.
pub type ScopeStrategy = fn(&Actor, &ListFilters) -> Result<OrderScope, CoreError>;

/// Orders the maker created.
pub fn maker_scope(actor: &Actor, filters: &ListFilters) -> Result<OrderScope, CoreError> {
    let status = StatusFilter::parse(filters.status.as_deref())?;
    Ok(OrderScope {
        maker_id: Some(actor.id),
        ..OrderScope::base(filters).with_status_filter(status)
    })
}

/// Orders assigned to the taker, never completed or entered into the ERP.
pub fn taker_scope(actor: &Actor, filters: &ListFilters) -> Result<OrderScope, CoreError> {
    let status = StatusFilter::parse(filters.status.as_deref())?;
    let mut scope = OrderScope {
        assigned_to: Some(actor.id),
        ..OrderScope::base(filters).with_status_filter(status)
    };
    scope.exclude(&OrderStatus::FINALIZED);
    Ok(scope)
}

/// Completed and ERP-entered orders routed to the accounter.
///
/// A requested status narrows the set only if it is one of the two; anything
/// else shows both. Admins may list on behalf of another accounter.
pub fn accounter_scope(actor: &Actor, filters: &ListFilters) -> Result<OrderScope, CoreError> {
    let status = StatusFilter::parse(filters.status.as_deref())?;
    let status_in = match status {
        StatusFilter::Exact(s) if OrderStatus::ACCOUNTING.contains(&s) => vec![s],
        _ => OrderStatus::ACCOUNTING.to_vec(),
    };
    let accounter_id = match (actor.role, filters.accounter_id) {
        (Role::Admin, Some(id)) => id,
        _ => actor.id,
    };
    Ok(OrderScope {
        accounter_id: Some(accounter_id),
        status_in: Some(status_in),
        ..OrderScope::base(filters)
    })
}

/// Every order.
pub fn admin_scope(_actor: &Actor, filters: &ListFilters) -> Result<OrderScope, CoreError> {
    let status = StatusFilter::parse(filters.status.as_deref())?;
    Ok(OrderScope::base(filters).with_status_filter(status))
}

/// The listing strategy for a role.
pub fn strategy_for(role: Role) -> ScopeStrategy {
    match role {
        Role::Maker => maker_scope,
        Role::Taker => taker_scope,
        Role::Accounter => accounter_scope,
        Role::Admin => admin_scope,
    }
}

/// Resolve the scope for the caller's own role.
pub fn resolve_scope(actor: &Actor, filters: &ListFilters) -> Result<OrderScope, CoreError> {
    strategy_for(actor.role)(actor, filters)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn filters(status: Option<&str>) -> ListFilters {
        ListFilters {
            status: status.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn maker_sees_own_active_orders_by_default() {
        let maker = Actor::new(7, "m", Role::Maker);
        let scope = resolve_scope(&maker, &filters(None)).unwrap();

        assert_eq!(scope.maker_id, Some(7));
        assert_eq!(scope.status_in, None);
        assert_eq!(scope.status_not_in, OrderStatus::INACTIVE.to_vec());
        assert_eq!(scope.limit, 20);
        assert_eq!(scope.offset, 0);
    }

    #[test]
    fn all_removes_the_status_filter_and_exact_pins_it() {
        let admin = Actor::new(1, "a", Role::Admin);

        let all = resolve_scope(&admin, &filters(Some("all"))).unwrap();
        assert!(all.status_not_in.is_empty());
        assert_eq!(all.status_in, None);

        let archived = resolve_scope(&admin, &filters(Some("archived"))).unwrap();
        assert_eq!(archived.status_in, Some(vec![OrderStatus::Archived]));
    }

    #[test]
    fn taker_never_sees_finalized_orders() {
        let taker = Actor::new(3, "t", Role::Taker);
        for status in [None, Some("all"), Some("completed"), Some("entered_erp")] {
            let scope = resolve_scope(&taker, &filters(status)).unwrap();
            assert_eq!(scope.assigned_to, Some(3));
            assert!(scope.status_not_in.contains(&OrderStatus::Completed));
            assert!(scope.status_not_in.contains(&OrderStatus::EnteredErp));
        }
    }

    #[test]
    fn accounter_is_limited_to_accounting_statuses() {
        let accounter = Actor::new(5, "acc", Role::Accounter);

        let default = resolve_scope(&accounter, &filters(None)).unwrap();
        assert_eq!(default.accounter_id, Some(5));
        assert_eq!(default.status_in, Some(OrderStatus::ACCOUNTING.to_vec()));
        assert!(default.status_not_in.is_empty());

        let narrowed = resolve_scope(&accounter, &filters(Some("entered_erp"))).unwrap();
        assert_eq!(narrowed.status_in, Some(vec![OrderStatus::EnteredErp]));

        let outside = resolve_scope(&accounter, &filters(Some("pending"))).unwrap();
        assert_eq!(outside.status_in, Some(OrderStatus::ACCOUNTING.to_vec()));
    }

    #[test]
    fn only_admin_may_list_for_another_accounter() {
        let request = ListFilters {
            accounter_id: Some(42),
            ..Default::default()
        };
        let admin = Actor::new(1, "a", Role::Admin);
        let accounter = Actor::new(5, "acc", Role::Accounter);

        assert_eq!(accounter_scope(&admin, &request).unwrap().accounter_id, Some(42));
        assert_eq!(accounter_scope(&accounter, &request).unwrap().accounter_id, Some(5));
    }

    #[test]
    fn limit_is_clamped_to_page_size() {
        let admin = Actor::new(1, "a", Role::Admin);
        let request = ListFilters {
            limit: Some(1000),
            offset: Some(-4),
            ..Default::default()
        };
        let scope = resolve_scope(&admin, &request).unwrap();
        assert_eq!(scope.limit, 20);
        assert_eq!(scope.offset, 0);
    }

    #[test]
    fn search_and_city_are_trimmed() {
        let admin = Actor::new(1, "a", Role::Admin);
        let request = ListFilters {
            search: Some("  rice ".into()),
            city: Some("".into()),
            ..Default::default()
        };
        let scope = resolve_scope(&admin, &request).unwrap();
        assert_eq!(scope.search.as_deref(), Some("rice"));
        assert_eq!(scope.city, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let maker = Actor::new(7, "m", Role::Maker);
        assert_matches!(
            resolve_scope(&maker, &filters(Some("shipped"))),
            Err(CoreError::Validation(_))
        );
    }
}
