//! The order lifecycle engine.
//!
//! [`OrderLifecycle`] is the write path for orders: it resolves the caller's
//! authority, validates the request with the rules in `ama_core::lifecycle`,
//! writes the order, its items, assignments, history and in-app notifications
//! in one transaction, and only after commit hands push and email work to the
//! [`Notifier`].
//!
//! Failures of `create` and `update` that are the caller's or the server's
//! fault (validation and internal errors) are appended to the activity log as
//! `order_error`. Authorization and not-found failures are not.

use ama_core::activity::{
    ACTION_ORDER_CREATED, ACTION_ORDER_DELETED, ACTION_ORDER_ERROR, ACTION_ORDER_STATUS_CHANGED,
    ACTION_ORDER_UPDATED, PHASE_CREATE, PHASE_UPDATE, TARGET_ORDER,
};
use ama_core::error::CoreError;
use ama_core::history::{
    city_change, description_change, diff_items, initial_rows, status_change, takers_changed,
    takers_differ, title_change, ExistingItem, HistoryEntry,
};
use ama_core::items::{sanitize_items, SanitizeOptions};
use ama_core::lifecycle::{
    check_accounter_update, check_status_change, default_description, ensure_can_change_accounter,
    ensure_can_create, ensure_can_delete, initial_status, resolve_authority, Authority,
    CreateOrderInput, OrderAccess, UpdateOrderInput,
};
use ama_core::notifications::{
    assigned_to_order, assignment_push_body, details_updated_by, new_order_assigned,
    ready_for_review, ready_for_review_push_body, status_updated_by, updated_by_maker, NewNotice,
    PUSH_TITLE_ASSIGNED, PUSH_TITLE_COMPLETED,
};
use ama_core::roles::{Actor, Role};
use ama_core::search::{normalize_term, RECENT_HISTORY_LIMIT};
use ama_core::settings::OrderSettings;
use ama_core::status::{ItemStatus, OrderStatus};
use ama_core::types::DbId;
use ama_core::visibility::{ListFilters, ScopeStrategy};
use ama_db::models::activity_log::CreateActivityLog;
use ama_db::models::order::{CreateOrder, Order, OrderDetails, OrderPage, Pagination};
use ama_db::models::order_item::OrderItem;
use ama_db::models::user::UserContact;
use ama_db::repositories::order_repo::DetailOptions;
use ama_db::repositories::{
    NotificationRepo, OrderAssignmentRepo, OrderItemRepo, OrderLogRepo, OrderRepo, UserRepo,
};
use ama_db::DbPool;
use ama_events::notifier::EmailItem;
use ama_events::{Notifier, OrderEmail, OrderEmailKind, PushMessage, Recipient};
use chrono::Utc;
use serde_json::json;

use crate::activity;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Detail view returned after a write: recent history, prices visible.
const WRITE_VIEW: DetailOptions = DetailOptions {
    history: Some(Some(RECENT_HISTORY_LIMIT)),
    hide_prices: false,
};

/// Push messages collected inside a transaction and sent after commit.
#[derive(Default)]
struct Outbox {
    pushes: Vec<(DbId, PushMessage)>,
    /// Accounter to push and email once the order reached `completed`.
    completed_for: Option<DbId>,
}

/// Order write operations bound to one request's dependencies.
pub struct OrderLifecycle<'a> {
    pool: &'a DbPool,
    settings: &'a OrderSettings,
    notifier: &'a dyn Notifier,
}

impl<'a> OrderLifecycle<'a> {
    pub fn new(pool: &'a DbPool, settings: &'a OrderSettings, notifier: &'a dyn Notifier) -> Self {
        Self {
            pool,
            settings,
            notifier,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(&state.pool, &state.config.orders, state.notifier.as_ref())
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Create an order with its items and taker assignments.
    pub async fn create(
        &self,
        actor: &Actor,
        input: CreateOrderInput,
        ip: Option<String>,
    ) -> AppResult<OrderDetails> {
        let result = self.try_create(actor, input, ip.clone()).await;
        if let Err(err) = &result {
            self.record_failure(actor, None, PHASE_CREATE, err, ip).await;
        }
        result
    }

    async fn try_create(
        &self,
        actor: &Actor,
        input: CreateOrderInput,
        ip: Option<String>,
    ) -> AppResult<OrderDetails> {
        ensure_can_create(actor)?;

        let items = sanitize_items(&input.items, SanitizeOptions { allow_empty: false })?;
        let status = initial_status(input.status.as_deref());
        let city = self.checked_city(input.city.as_deref())?;
        let title = normalize_term(input.title.as_deref());
        let description = normalize_term(input.description.as_deref())
            .unwrap_or_else(|| default_description(items.len()));

        if let Some(accounter_id) = input.accounter_id {
            if !self.has_role(accounter_id, Role::Accounter).await? {
                return Err(CoreError::Validation("Invalid accounter selection".into()).into());
            }
        }

        // Drafts are never assigned.
        let taker_ids = if status == OrderStatus::Archived {
            Vec::new()
        } else {
            self.checked_takers(&input.assigned_taker_ids).await?
        };

        let mut tx = self.pool.begin().await?;
        let order = OrderRepo::create(
            &mut *tx,
            &CreateOrder {
                title,
                description,
                status,
                city,
                maker_id: actor.id,
                accounter_id: input.accounter_id,
            },
        )
        .await?;
        OrderItemRepo::insert_many(&mut tx, order.id, &initial_rows(&items)).await?;
        OrderAssignmentRepo::replace(&mut tx, order.id, &taker_ids).await?;

        let notices: Vec<NewNotice> = taker_ids
            .iter()
            .map(|&id| NewNotice::alert(id, order.id, new_order_assigned(order.title.as_deref())))
            .collect();
        NotificationRepo::insert_many(&mut tx, &notices).await?;
        tx.commit().await?;

        tracing::info!(
            order_id = order.id,
            maker_id = actor.id,
            status = %status,
            items = items.len(),
            takers = taker_ids.len(),
            "Order created",
        );

        let details = self.load_details(order.id, DetailOptions::default()).await?;

        for &taker_id in &taker_ids {
            self.notifier.notify(
                taker_id,
                PushMessage::new(
                    PUSH_TITLE_ASSIGNED,
                    assignment_push_body(order.id, order.title.as_deref()),
                    order.id,
                ),
            );
        }
        if !details.assigned_takers.is_empty() {
            let sender = self.recipient_for(actor).await;
            self.notifier.send_order_email(
                OrderEmailKind::Created,
                &order_email(&details),
                &recipients(&details.assigned_takers),
                &sender,
                &[],
            );
        }

        let taker_names: Vec<&str> = details
            .assigned_takers
            .iter()
            .map(|t| t.username.as_str())
            .collect();
        activity::record(
            self.pool,
            CreateActivityLog::new(Some(actor.id), ACTION_ORDER_CREATED)
                .with_target(TARGET_ORDER, Some(order.id))
                .with_details(json!({
                    "status": status,
                    "city": details.order.city,
                    "itemCount": items.len(),
                    "assignedTakers": taker_ids,
                    "assignedTakerNames": taker_names,
                    "items": items,
                }))
                .with_ip(ip),
        )
        .await;

        Ok(details)
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Apply a partial update to an order on behalf of `actor`.
    pub async fn update(
        &self,
        actor: &Actor,
        order_id: DbId,
        input: UpdateOrderInput,
        ip: Option<String>,
    ) -> AppResult<OrderDetails> {
        let result = self.try_update(actor, order_id, input, ip.clone()).await;
        if let Err(err) = &result {
            self.record_failure(actor, Some(order_id), PHASE_UPDATE, err, ip)
                .await;
        }
        result
    }

    async fn try_update(
        &self,
        actor: &Actor,
        order_id: DbId,
        input: UpdateOrderInput,
        ip: Option<String>,
    ) -> AppResult<OrderDetails> {
        let snapshot = self.find_order(order_id).await?;
        let taker_ids = OrderAssignmentRepo::taker_ids(self.pool, order_id).await?;

        let authority = resolve_authority(
            actor,
            OrderAccess {
                maker_id: snapshot.maker_id,
                accounter_id: snapshot.accounter_id,
                assigned_taker_ids: &taker_ids,
            },
        )?;

        if authority == Authority::Accounter {
            return self.enter_erp(actor, snapshot, &input, ip).await;
        }
        let current = snapshot.status()?;

        // --- Validate everything before opening the transaction ---

        let requested = input.requested_status()?;
        if let Some(to) = requested {
            check_status_change(authority, current, to)?;
        }
        if input.accounter_id.is_some() {
            ensure_can_change_accounter(authority)?;
        }

        let items = input
            .items
            .as_deref()
            .map(|items| sanitize_items(items, SanitizeOptions { allow_empty: false }))
            .transpose()?;

        let city = match &input.city {
            Some(city) => Some(self.checked_city(city.as_deref())?),
            None => None,
        };

        let accounter = match input.accounter_id {
            Some(Some(id)) => {
                if !self.has_role(id, Role::Accounter).await? {
                    return Err(CoreError::Validation("Invalid accounter selected".into()).into());
                }
                Some(Some(id))
            }
            other => other,
        };

        let new_takers = match input.requested_takers() {
            Some(ids) => Some(self.checked_takers(&ids).await?),
            None => None,
        };

        // --- Apply ---

        let mut entries: Vec<HistoryEntry> = Vec::new();
        let mut changes: Vec<&'static str> = Vec::new();
        let mut notices: Vec<NewNotice> = Vec::new();
        let mut outbox = Outbox::default();

        let mut tx = self.pool.begin().await?;

        // Reload under a row lock: fields this request leaves alone must keep
        // whatever a concurrent update committed.
        let mut order = OrderRepo::find_for_update(&mut tx, order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))?;
        let current = order.status()?;
        if let Some(to) = requested {
            check_status_change(authority, current, to)?;
        }
        let taker_ids = OrderAssignmentRepo::taker_ids(&mut *tx, order_id).await?;

        if let Some(title) = normalize_term(input.title.as_deref()) {
            if order.title.as_deref() != Some(title.as_str()) {
                entries.push(title_change(order.title.as_deref(), &title));
                order.title = Some(title);
                changes.push("title");
            }
        }

        if let Some(city) = city {
            if city != order.city {
                entries.push(city_change(order.city.as_deref(), city.as_deref()));
                order.city = city;
                changes.push("city");
            }
        }

        if let Some(accounter_id) = accounter {
            order.accounter_id = accounter_id;
            changes.push("accounter");
        }

        if let Some(description) = normalize_term(input.description.as_deref()) {
            if order.description.as_deref() != Some(description.as_str()) {
                entries.push(description_change(order.description.as_deref(), &description));
                order.description = Some(description);
                changes.push("description");
            }
        }

        if let Some(items) = &items {
            let existing: Vec<ExistingItem> = OrderItemRepo::list_for_order(&mut *tx, order_id)
                .await?
                .iter()
                .map(OrderItem::to_existing)
                .collect::<Result<_, _>>()?;
            let diff = diff_items(&existing, items);
            entries.extend(diff.entries);
            OrderItemRepo::replace_all(&mut tx, order_id, &diff.rows).await?;
            changes.push("items");
        }

        let final_takers = match new_takers {
            Some(requested) if takers_differ(&taker_ids, &requested) => {
                OrderAssignmentRepo::replace(&mut tx, order_id, &requested).await?;
                entries.push(takers_changed());
                for &added in requested.iter().filter(|id| !taker_ids.contains(id)) {
                    notices.push(NewNotice::alert(
                        added,
                        order_id,
                        assigned_to_order(order_id, order.title.as_deref()),
                    ));
                    outbox.pushes.push((
                        added,
                        PushMessage::new(
                            PUSH_TITLE_ASSIGNED,
                            assignment_push_body(order_id, order.title.as_deref()),
                            order_id,
                        ),
                    ));
                }
                changes.push("assignedTakers");
                requested
            }
            _ => taker_ids.clone(),
        };

        if let Some(to) = requested {
            if to != current {
                entries.push(status_change(current, to));
                changes.push("status");
            }

            if current == OrderStatus::Archived && to == OrderStatus::Pending {
                // Sending a draft counts as creating it now.
                order.created_at = Utc::now();
                for &taker_id in &final_takers {
                    notices.push(NewNotice::alert(
                        taker_id,
                        order_id,
                        new_order_assigned(order.title.as_deref()),
                    ));
                    outbox.pushes.push((
                        taker_id,
                        PushMessage::new(
                            PUSH_TITLE_ASSIGNED,
                            assignment_push_body(order_id, order.title.as_deref()),
                            order_id,
                        ),
                    ));
                }
            }

            if actor.role == Role::Taker && to != current {
                notices.push(NewNotice::info(
                    order.maker_id,
                    order_id,
                    status_updated_by(order_id, to, &actor.username),
                ));
            }

            if to == OrderStatus::Completed && current != OrderStatus::Completed {
                if let Some(accounter_id) = order.accounter_id {
                    notices.push(NewNotice::alert(
                        accounter_id,
                        order_id,
                        ready_for_review(order_id, order.title.as_deref()),
                    ));
                    outbox.completed_for = Some(accounter_id);
                }
            }

            order.status = to.as_str().to_string();
        }

        OrderRepo::save(&mut *tx, &order).await?;
        OrderLogRepo::insert_many(&mut tx, order_id, actor.id, &entries).await?;

        if input.touches_details() {
            match actor.role {
                Role::Maker => notices.extend(
                    final_takers
                        .iter()
                        .map(|&id| NewNotice::info(id, order_id, updated_by_maker(order_id))),
                ),
                Role::Taker => notices.push(NewNotice::info(
                    order.maker_id,
                    order_id,
                    details_updated_by(order_id, &actor.username),
                )),
                _ => {}
            }
        }

        NotificationRepo::insert_many(&mut tx, &notices).await?;
        tx.commit().await?;

        tracing::info!(
            order_id,
            user_id = actor.id,
            role = %actor.role,
            changes = ?changes,
            "Order updated",
        );

        let details = self.load_details(order_id, WRITE_VIEW).await?;

        activity::record(
            self.pool,
            CreateActivityLog::new(Some(actor.id), ACTION_ORDER_UPDATED)
                .with_target(TARGET_ORDER, Some(order_id))
                .with_details(json!({
                    "changes": changes,
                    "status": details.order.status,
                    "itemCount": details.items.len(),
                    "city": details.order.city,
                }))
                .with_ip(ip),
        )
        .await;

        self.dispatch_update(actor, &details, outbox, input.skip_email)
            .await;

        Ok(view_for(actor, details))
    }

    /// The accounter's only write: mark a completed order as entered into the ERP.
    async fn enter_erp(
        &self,
        actor: &Actor,
        order: Order,
        input: &UpdateOrderInput,
        ip: Option<String>,
    ) -> AppResult<OrderDetails> {
        let current = order.status()?;
        check_accounter_update(input, current)?;

        let mut tx = self.pool.begin().await?;
        if current != OrderStatus::EnteredErp {
            OrderLogRepo::insert_many(
                &mut tx,
                order.id,
                actor.id,
                &[status_change(current, OrderStatus::EnteredErp)],
            )
            .await?;
        }
        OrderRepo::set_status(&mut *tx, order.id, OrderStatus::EnteredErp).await?;
        tx.commit().await?;

        tracing::info!(order_id = order.id, accounter_id = actor.id, "Order entered into ERP");

        activity::record(
            self.pool,
            CreateActivityLog::new(Some(actor.id), ACTION_ORDER_STATUS_CHANGED)
                .with_target(TARGET_ORDER, Some(order.id))
                .with_details(json!({
                    "from": current,
                    "to": OrderStatus::EnteredErp,
                }))
                .with_ip(ip),
        )
        .await;

        self.load_details(order.id, WRITE_VIEW).await
    }

    /// Post-commit push and email for an update.
    async fn dispatch_update(
        &self,
        actor: &Actor,
        details: &OrderDetails,
        outbox: Outbox,
        skip_email: bool,
    ) {
        for (user_id, message) in outbox.pushes {
            self.notifier.notify(user_id, message);
        }

        let order_id = details.order.id;
        let email = order_email(details);

        if let Some(accounter_id) = outbox.completed_for {
            self.notifier.notify(
                accounter_id,
                PushMessage::new(
                    PUSH_TITLE_COMPLETED,
                    ready_for_review_push_body(order_id, details.order.title.as_deref()),
                    order_id,
                ),
            );
            match UserRepo::contacts(self.pool, &[accounter_id]).await {
                Ok(contacts) => {
                    let sender = self.recipient_for(actor).await;
                    self.notifier.send_order_email(
                        OrderEmailKind::CompletedForAccounter,
                        &email,
                        &recipients(&contacts),
                        &sender,
                        &[],
                    );
                }
                Err(e) => {
                    tracing::warn!(order_id, accounter_id, error = %e, "Failed to load accounter contact");
                }
            }
        }

        if skip_email {
            return;
        }

        let changes: Vec<String> = details
            .history
            .iter()
            .flatten()
            .take(RECENT_HISTORY_LIMIT as usize)
            .map(|entry| entry.new_description.clone())
            .collect();

        match actor.role {
            Role::Maker
                if !details.assigned_takers.is_empty()
                    && details.order.status != OrderStatus::EnteredErp.as_str() =>
            {
                let sender = self.recipient_for(actor).await;
                self.notifier.send_order_email(
                    OrderEmailKind::Updated,
                    &email,
                    &recipients(&details.assigned_takers),
                    &sender,
                    &changes,
                );
            }
            Role::Taker => {
                match UserRepo::contacts(self.pool, &[details.order.maker_id]).await {
                    Ok(maker) => {
                        let sender = self.recipient_for(actor).await;
                        self.notifier.send_order_email(
                            OrderEmailKind::UpdatedByTaker,
                            &email,
                            &recipients(&maker),
                            &sender,
                            &changes,
                        );
                    }
                    Err(e) => {
                        tracing::warn!(order_id, error = %e, "Failed to load maker contact");
                    }
                }
            }
            _ => {}
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// One page of orders visible to `actor` under `strategy`.
    pub async fn list(
        &self,
        actor: &Actor,
        strategy: ScopeStrategy,
        filters: &ListFilters,
    ) -> AppResult<OrderPage> {
        let scope = strategy(actor, filters)?;
        let total = OrderRepo::count(self.pool, &scope).await?;
        let orders = OrderRepo::list(self.pool, &scope).await?;

        let opts = DetailOptions {
            history: filters.include_history.unwrap_or(true).then_some(None),
            hide_prices: actor.role == Role::Taker,
        };
        let orders = OrderRepo::with_details(self.pool, orders, opts).await?;

        Ok(OrderPage {
            orders,
            pagination: Pagination {
                total,
                limit: scope.limit,
                offset: scope.offset,
            },
        })
    }

    /// Titles of the caller's own orders matching `term`.
    pub async fn title_suggestions(&self, actor: &Actor, term: Option<&str>) -> AppResult<Vec<String>> {
        let Some(term) = normalize_term(term) else {
            return Ok(Vec::new());
        };
        Ok(OrderRepo::title_suggestions(self.pool, actor.id, &term).await?)
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    /// Delete an order with its items, history and assignments.
    pub async fn delete(&self, actor: &Actor, order_id: DbId, ip: Option<String>) -> AppResult<()> {
        let order = self.find_order(order_id).await?;
        ensure_can_delete(actor, order.maker_id)?;

        let total_items = OrderItemRepo::list_for_order(self.pool, order_id).await?.len();
        if !OrderRepo::delete_cascade(self.pool, order_id).await? {
            return Err(CoreError::NotFound {
                entity: "Order",
                id: order_id,
            }
            .into());
        }

        tracing::info!(order_id, user_id = actor.id, "Order deleted");

        activity::record(
            self.pool,
            CreateActivityLog::new(Some(actor.id), ACTION_ORDER_DELETED)
                .with_target(TARGET_ORDER, Some(order_id))
                .with_details(json!({
                    "title": order.title,
                    "makerId": order.maker_id,
                    "totalItems": total_items,
                }))
                .with_ip(ip),
        )
        .await;

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Items
    // -----------------------------------------------------------------------

    /// Set or clear the collection status of one item.
    ///
    /// Any authenticated user may do this. The order's own status is untouched.
    pub async fn set_item_status(
        &self,
        actor: &Actor,
        item_id: DbId,
        status: Option<Option<&str>>,
    ) -> AppResult<OrderItem> {
        let status = ItemStatus::parse_patch(status)?;

        let mut item = OrderItemRepo::set_status(self.pool, item_id, status)
            .await?
            .ok_or(CoreError::NotFound {
                entity: "OrderItem",
                id: item_id,
            })?;

        tracing::debug!(item_id, user_id = actor.id, status = ?status, "Item status set");

        if actor.role == Role::Taker {
            item.price = None;
        }
        Ok(item)
    }

    // -----------------------------------------------------------------------
    // Bulk email
    // -----------------------------------------------------------------------

    /// Email each taker one digest of the given orders. Returns the number of
    /// takers found.
    pub async fn bulk_email(
        &self,
        actor: &Actor,
        order_ids: &[DbId],
        taker_ids: &[DbId],
    ) -> AppResult<usize> {
        if !actor.role.can_create_orders() {
            return Err(CoreError::Forbidden(
                "Only makers or admins can send order emails".into(),
            )
            .into());
        }
        if order_ids.is_empty() || taker_ids.is_empty() {
            return Err(AppError::BadRequest(
                "orderIds and takerIds are required".into(),
            ));
        }

        let orders = OrderRepo::find_many(self.pool, order_ids).await?;
        let details = OrderRepo::with_details(self.pool, orders, DetailOptions::default()).await?;
        let emails: Vec<OrderEmail> = details.iter().map(order_email).collect();
        let takers = UserRepo::contacts(self.pool, taker_ids).await?;

        let sender = self.recipient_for(actor).await;
        for taker in &takers {
            self.notifier
                .send_bulk_email(&emails, &recipient(taker), &sender);
        }

        tracing::info!(
            user_id = actor.id,
            orders = emails.len(),
            takers = takers.len(),
            "Bulk order email queued",
        );
        Ok(takers.len())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn find_order(&self, order_id: DbId) -> AppResult<Order> {
        OrderRepo::find_by_id(self.pool, order_id)
            .await?
            .ok_or_else(|| order_not_found(order_id))
    }

    async fn load_details(&self, order_id: DbId, opts: DetailOptions) -> AppResult<OrderDetails> {
        OrderRepo::find_details(self.pool, order_id, opts)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound {
                    entity: "Order",
                    id: order_id,
                }
                .into()
            })
    }

    /// Blank means no city; anything else must be configured.
    fn checked_city(&self, city: Option<&str>) -> Result<Option<String>, CoreError> {
        match normalize_term(city) {
            Some(city) => {
                self.settings.validate_city(&city)?;
                Ok(Some(city))
            }
            None => Ok(None),
        }
    }

    async fn has_role(&self, user_id: DbId, role: Role) -> AppResult<bool> {
        let found = UserRepo::ids_with_role(self.pool, &[user_id], role).await?;
        Ok(!found.is_empty())
    }

    /// Deduplicate requested taker ids and make sure each one is a taker.
    async fn checked_takers(&self, ids: &[DbId]) -> AppResult<Vec<DbId>> {
        let mut unique: Vec<DbId> = Vec::with_capacity(ids.len());
        for &id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            return Ok(unique);
        }

        let takers = UserRepo::ids_with_role(self.pool, &unique, Role::Taker).await?;
        if takers.len() != unique.len() {
            return Err(CoreError::Validation("Invalid taker selection".into()).into());
        }
        Ok(unique)
    }

    /// The caller as an email correspondent, with their stored address.
    async fn recipient_for(&self, actor: &Actor) -> Recipient {
        let email = match UserRepo::find_by_id(self.pool, actor.id).await {
            Ok(user) => user.and_then(|u| u.email),
            Err(e) => {
                tracing::warn!(user_id = actor.id, error = %e, "Failed to load sender email");
                None
            }
        };
        Recipient {
            id: actor.id,
            username: actor.username.clone(),
            email,
        }
    }

    async fn record_failure(
        &self,
        actor: &Actor,
        order_id: Option<DbId>,
        phase: &str,
        err: &AppError,
        ip: Option<String>,
    ) {
        if !is_recorded_failure(err) {
            return;
        }
        tracing::warn!(user_id = actor.id, order_id = ?order_id, phase, error = %err, "Order write failed");
        activity::record(
            self.pool,
            CreateActivityLog::new(Some(actor.id), ACTION_ORDER_ERROR)
                .with_target(TARGET_ORDER, order_id)
                .with_details(json!({
                    "message": err.message(),
                    "phase": phase,
                }))
                .with_ip(ip),
        )
        .await;
    }
}

fn order_not_found(order_id: DbId) -> AppError {
    CoreError::NotFound {
        entity: "Order",
        id: order_id,
    }
    .into()
}

/// Validation and server failures are audited; refusals and misses are not.
fn is_recorded_failure(err: &AppError) -> bool {
    match err {
        AppError::Core(CoreError::Validation(_) | CoreError::Internal(_)) => true,
        AppError::Core(_) => false,
        AppError::Database(sqlx::Error::RowNotFound) => false,
        AppError::Database(_) | AppError::BadRequest(_) | AppError::InternalError(_) => true,
    }
}

/// Takers never see prices.
fn view_for(actor: &Actor, mut details: OrderDetails) -> OrderDetails {
    if actor.role == Role::Taker {
        details.hide_prices();
    }
    details
}

fn recipient(contact: &UserContact) -> Recipient {
    Recipient {
        id: contact.id,
        username: contact.username.clone(),
        email: contact.email.clone(),
    }
}

fn recipients(contacts: &[UserContact]) -> Vec<Recipient> {
    contacts.iter().map(recipient).collect()
}

fn order_email(details: &OrderDetails) -> OrderEmail {
    OrderEmail {
        id: details.order.id,
        title: details.order.title.clone(),
        status: details.order.status.clone(),
        city: details.order.city.clone(),
        items: details
            .items
            .iter()
            .map(|item| EmailItem {
                name: item.name.clone(),
                quantity: item.quantity.normalize().to_string(),
                price: item.price.map(|p| p.round_dp(2).to_string()),
                status: item.status.clone(),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn refusals_are_not_recorded() {
        assert!(!is_recorded_failure(&CoreError::Forbidden("no".into()).into()));
        assert!(!is_recorded_failure(
            &CoreError::NotFound {
                entity: "Order",
                id: 1
            }
            .into()
        ));
        assert!(!is_recorded_failure(&AppError::Database(sqlx::Error::RowNotFound)));
    }

    #[test]
    fn validation_and_server_errors_are_recorded() {
        assert!(is_recorded_failure(&CoreError::Validation("bad".into()).into()));
        assert!(is_recorded_failure(&AppError::InternalError("boom".into())));
        assert!(is_recorded_failure(&AppError::Database(sqlx::Error::PoolTimedOut)));
    }

    #[test]
    fn error_message_has_no_variant_prefix() {
        let err: AppError = CoreError::Validation("Order must have at least one item".into()).into();
        assert_eq!(err.message(), "Order must have at least one item");
        assert_matches!(err, AppError::Core(CoreError::Validation(_)));
    }
}
