//! Subscription lifecycle.
//!
//! Handlers and the expiry sweep both go through [`SubscriptionService`], so
//! the one-active-subscription rule, the note formats and the published
//! events are identical no matter who triggers a change.

use std::sync::Arc;

use backoffice_core::business::{subdomain_sync_target, SUBDOMAIN_EXPIRED};
use backoffice_core::subscription::{
    self as lifecycle, append_note, expiry_action, BulkAction, BulkSummary, ExpiryAction,
    ExpirySummary, MSG_ALREADY_ACTIVE, MSG_REACTIVATE_EXPIRED,
};
use backoffice_core::types::DbId;
use backoffice_db::models::business::UpdateBusiness;
use backoffice_db::models::plan::SubscriptionPlan;
use backoffice_db::models::subscription::{
    CreateSubscription, Subscription, SubscriptionDetail, SubscriptionUsage, UpdateSubscription,
};
use backoffice_db::repositories::{BusinessRepo, PlanRepo, SubscriptionRepo};
use backoffice_db::DbPool;
use backoffice_events::{event_types, EventBus, PlatformEvent};
use chrono::{Duration, Utc};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Input for [`SubscriptionService::create`].
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub business_id: DbId,
    pub plan_id: DbId,
    pub auto_renew: bool,
    pub notes: Option<String>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    pool: DbPool,
    bus: Arc<EventBus>,
}

impl SubscriptionService {
    pub fn new(pool: DbPool, bus: Arc<EventBus>) -> Self {
        Self { pool, bus }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(state.pool.clone(), Arc::clone(&state.event_bus))
    }

    // -- lookups ------------------------------------------------------------

    pub async fn get(&self, id: DbId) -> AppResult<SubscriptionDetail> {
        SubscriptionRepo::find_detail(&self.pool, id)
            .await?
            .ok_or(AppError::not_found("Subscription", id))
    }

    async fn plan(&self, id: DbId) -> AppResult<SubscriptionPlan> {
        PlanRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::not_found("SubscriptionPlan", id))
    }

    pub async fn usage(&self, id: DbId) -> AppResult<SubscriptionUsage> {
        let detail = self.get(id).await?;
        let plan = self.plan(detail.subscription.plan_id).await?;
        let sub = detail.subscription;
        let now = Utc::now();
        Ok(SubscriptionUsage {
            subscription_id: sub.id,
            business_id: sub.business_id,
            plan_name: detail.plan_name,
            pricing_display: lifecycle::pricing_display(plan.price_cents, plan.duration_days),
            start_date: sub.start_date,
            end_date: sub.end_date,
            days_remaining: lifecycle::days_remaining(sub.end_date, now),
            is_active: sub.is_active,
            is_expired: lifecycle::is_expired(sub.end_date, now),
            auto_renew: sub.auto_renew,
        })
    }

    /// Active subscriptions ending within `days` from now.
    pub async fn expiring(&self, days: i64) -> AppResult<Vec<SubscriptionDetail>> {
        let until = lifecycle::shift_days(Utc::now(), days.max(0)).map_err(AppError::validation)?;
        Ok(SubscriptionRepo::list_expiring(&self.pool, until).await?)
    }

    /// Active subscriptions already past their end date.
    pub async fn expired(&self) -> AppResult<Vec<SubscriptionDetail>> {
        Ok(SubscriptionRepo::list_expired_active(&self.pool).await?)
    }

    // -- single-row operations ----------------------------------------------

    pub async fn create(&self, input: NewSubscription, actor: Option<DbId>) -> AppResult<Subscription> {
        BusinessRepo::find_by_id(&self.pool, input.business_id)
            .await?
            .ok_or(AppError::not_found("Business", input.business_id))?;
        let plan = self.plan(input.plan_id).await?;

        let now = Utc::now();
        let end_date = lifecycle::end_date(now, plan.duration_days).map_err(AppError::validation)?;
        if let Some(current) =
            SubscriptionRepo::find_active_for_business(&self.pool, input.business_id).await?
        {
            if !lifecycle::is_expired(current.subscription.end_date, now) {
                return Err(AppError::conflict(MSG_ALREADY_ACTIVE));
            }
        }

        let subscription = SubscriptionRepo::create(
            &self.pool,
            &CreateSubscription {
                business_id: input.business_id,
                plan_id: plan.id,
                start_date: now,
                end_date,
                auto_renew: input.auto_renew,
                notes: input.notes,
                renewed_from_id: None,
            },
        )
        .await?;

        tracing::info!(
            subscription_id = subscription.id,
            business_id = subscription.business_id,
            plan_id = plan.id,
            "Subscription created"
        );
        self.publish(event_types::SUBSCRIPTION_CREATED, &subscription, &plan.name, actor, json!({}));
        Ok(subscription)
    }

    /// Change `auto_renew` and/or `notes` in place.
    pub async fn update(
        &self,
        id: DbId,
        auto_renew: Option<bool>,
        notes: Option<String>,
        actor: Option<DbId>,
    ) -> AppResult<Subscription> {
        let detail = self.get(id).await?;
        let changed = json!({
            "auto_renew_changed": auto_renew.is_some(),
            "notes_changed": notes.is_some(),
        });
        let updated = self
            .apply(
                id,
                UpdateSubscription {
                    auto_renew,
                    notes,
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(subscription_id = id, "Subscription updated");
        self.publish(event_types::SUBSCRIPTION_UPDATED, &updated, &detail.plan_name, actor, changed);
        Ok(updated)
    }

    pub async fn delete(&self, id: DbId) -> AppResult<()> {
        if !SubscriptionRepo::soft_delete(&self.pool, id).await? {
            return Err(AppError::not_found("Subscription", id));
        }
        tracing::info!(subscription_id = id, "Subscription deleted");
        Ok(())
    }

    /// Replace a subscription with a follow-up period.
    ///
    /// The new row starts where the old one ends (or now if that has passed),
    /// may switch plan, and lasts `duration_days` or the plan's duration.
    pub async fn renew(
        &self,
        id: DbId,
        plan_id: Option<DbId>,
        duration_days: Option<i32>,
        actor: Option<DbId>,
    ) -> AppResult<Subscription> {
        let current = self.get(id).await?.subscription;
        let plan = self.plan(plan_id.unwrap_or(current.plan_id)).await?;
        let days = duration_days.unwrap_or(plan.duration_days);
        lifecycle::validate_duration_days(days).map_err(AppError::validation)?;

        let start = lifecycle::renewal_start(current.end_date, Utc::now());
        let end_date = lifecycle::end_date(start, days).map_err(AppError::validation)?;
        let renewed = SubscriptionRepo::renew(
            &self.pool,
            current.id,
            &CreateSubscription {
                business_id: current.business_id,
                plan_id: plan.id,
                start_date: start,
                end_date,
                auto_renew: current.auto_renew,
                notes: None,
                renewed_from_id: Some(current.id),
            },
        )
        .await?;

        tracing::info!(
            subscription_id = renewed.id,
            renewed_from_id = current.id,
            business_id = renewed.business_id,
            "Subscription renewed"
        );
        self.publish(
            event_types::SUBSCRIPTION_RENEWED,
            &renewed,
            &plan.name,
            actor,
            json!({ "renewed_from_id": current.id }),
        );
        Ok(renewed)
    }

    /// Stop a subscription. `immediate` also moves the end date to now.
    pub async fn cancel(&self, id: DbId, immediate: bool, actor: Option<DbId>) -> AppResult<Subscription> {
        let detail = self.get(id).await?;
        let cancelled = self
            .apply(
                id,
                UpdateSubscription {
                    end_date: immediate.then(Utc::now),
                    is_active: Some(false),
                    auto_renew: Some(false),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(subscription_id = id, immediate, "Subscription cancelled");
        self.publish(
            event_types::SUBSCRIPTION_CANCELLED,
            &cancelled,
            &detail.plan_name,
            actor,
            json!({ "immediate": immediate }),
        );
        Ok(cancelled)
    }

    pub async fn suspend(&self, id: DbId, reason: &str, actor: Option<DbId>) -> AppResult<Subscription> {
        let detail = self.get(id).await?;
        let reason = non_blank(reason).unwrap_or("No reason provided");
        let notes = append_note(
            detail.subscription.notes.as_deref(),
            &lifecycle::suspend_note(reason),
        );
        let suspended = self
            .apply(
                id,
                UpdateSubscription {
                    is_active: Some(false),
                    notes: Some(notes),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(subscription_id = id, reason, "Subscription suspended");
        self.publish(
            event_types::SUBSCRIPTION_SUSPENDED,
            &suspended,
            &detail.plan_name,
            actor,
            json!({ "reason": reason }),
        );
        Ok(suspended)
    }

    /// Re-enable a suspended or cancelled subscription that has not ended.
    pub async fn reactivate(&self, id: DbId, actor: Option<DbId>) -> AppResult<Subscription> {
        let detail = self.get(id).await?;
        if lifecycle::is_expired(detail.subscription.end_date, Utc::now()) {
            return Err(AppError::validation(MSG_REACTIVATE_EXPIRED));
        }
        if let Some(other) =
            SubscriptionRepo::find_active_for_business(&self.pool, detail.subscription.business_id)
                .await?
        {
            if other.subscription.id != id {
                return Err(AppError::conflict(MSG_ALREADY_ACTIVE));
            }
        }

        let reactivated = self
            .apply(
                id,
                UpdateSubscription {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(subscription_id = id, "Subscription reactivated");
        self.publish(
            event_types::SUBSCRIPTION_REACTIVATED,
            &reactivated,
            &detail.plan_name,
            actor,
            json!({}),
        );
        Ok(reactivated)
    }

    pub async fn extend(
        &self,
        id: DbId,
        days: i64,
        reason: &str,
        actor: Option<DbId>,
    ) -> AppResult<Subscription> {
        lifecycle::validate_extend_days(days).map_err(AppError::validation)?;
        let detail = self.get(id).await?;
        let new_end =
            lifecycle::shift_days(detail.subscription.end_date, days).map_err(AppError::validation)?;
        let reason = non_blank(reason).unwrap_or("No reason provided");
        let notes = append_note(
            detail.subscription.notes.as_deref(),
            &lifecycle::extend_note(days, reason),
        );
        let extended = self
            .apply(
                id,
                UpdateSubscription {
                    end_date: Some(new_end),
                    notes: Some(notes),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(subscription_id = id, days, "Subscription extended");
        self.publish(
            event_types::SUBSCRIPTION_EXTENDED,
            &extended,
            &detail.plan_name,
            actor,
            json!({ "days": days, "reason": reason }),
        );
        Ok(extended)
    }

    /// Move to another plan.
    ///
    /// `immediate` swaps the plan in place and recomputes the end date from
    /// the original start; otherwise the new plan starts as a renewal at the
    /// current end date.
    pub async fn change_plan(
        &self,
        id: DbId,
        plan_id: DbId,
        immediate: bool,
        actor: Option<DbId>,
    ) -> AppResult<Subscription> {
        let current = self.get(id).await?.subscription;
        let plan = self.plan(plan_id).await?;

        let changed = if immediate {
            let end_date = lifecycle::end_date(current.start_date, plan.duration_days)
                .map_err(AppError::validation)?;
            self.apply(
                id,
                UpdateSubscription {
                    plan_id: Some(plan.id),
                    end_date: Some(end_date),
                    ..Default::default()
                },
            )
            .await?
        } else {
            self.renew(id, Some(plan.id), None, actor).await?
        };

        tracing::info!(
            subscription_id = changed.id,
            from_plan_id = current.plan_id,
            to_plan_id = plan.id,
            immediate,
            "Subscription plan changed"
        );
        self.publish(
            event_types::SUBSCRIPTION_PLAN_CHANGED,
            &changed,
            &plan.name,
            actor,
            json!({ "previous_plan_id": current.plan_id, "immediate": immediate }),
        );
        Ok(changed)
    }

    async fn apply(&self, id: DbId, update: UpdateSubscription) -> AppResult<Subscription> {
        SubscriptionRepo::update(&self.pool, id, &update)
            .await?
            .ok_or(AppError::not_found("Subscription", id))
    }

    // -- batch operations ---------------------------------------------------

    /// Apply `action` to every id; failures are collected per item.
    pub async fn bulk(
        &self,
        action: BulkAction,
        ids: &[DbId],
        reason: Option<&str>,
        actor: Option<DbId>,
    ) -> BulkSummary {
        let mut summary = BulkSummary::new(action, ids.len());
        let reason_text = reason.and_then(non_blank).unwrap_or("Bulk operation");

        for &id in ids {
            let result = match action {
                BulkAction::Cancel => self.cancel(id, false, actor).await,
                BulkAction::Suspend => self.suspend(id, reason_text, actor).await,
                BulkAction::Reactivate => self.reactivate(id, actor).await,
                BulkAction::Extend => {
                    let days = lifecycle::parse_extend_days(reason);
                    self.extend(id, days, reason_text, actor).await
                }
                BulkAction::Renew => self.renew(id, None, None, actor).await,
            };
            match result {
                Ok(_) => summary.record_success(id),
                Err(e) => {
                    tracing::warn!(subscription_id = id, action = %action, error = %e, "Bulk item failed");
                    summary.record_failure(id, e);
                }
            }
        }

        tracing::info!(
            action = %action,
            total = summary.total_requested,
            successful = summary.successful,
            errors = summary.errors,
            "Bulk subscription operation finished"
        );
        summary
    }

    /// Renew or deactivate every active subscription that has ended.
    pub async fn process_expired(&self, actor: Option<DbId>) -> AppResult<ExpirySummary> {
        let expired = self.expired().await?;
        let mut summary = ExpirySummary::new(expired.len());

        for detail in expired {
            let sub = &detail.subscription;
            let action = expiry_action(sub.auto_renew);
            let result = match action {
                ExpiryAction::Renew => self.renew(sub.id, None, None, actor).await.map(|_| ()),
                ExpiryAction::Deactivate => self.deactivate_expired(&detail, actor).await,
            };
            match result {
                Ok(()) => summary.record(sub.id, action),
                Err(e) => {
                    tracing::warn!(subscription_id = sub.id, error = %e, "Failed to process expired subscription");
                    summary.record_failure(sub.id, e);
                }
            }
        }
        Ok(summary)
    }

    async fn deactivate_expired(&self, detail: &SubscriptionDetail, actor: Option<DbId>) -> AppResult<()> {
        let sub = self
            .apply(
                detail.subscription.id,
                UpdateSubscription {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
        self.publish(event_types::SUBSCRIPTION_EXPIRED, &sub, &detail.plan_name, actor, json!({}));
        Ok(())
    }

    /// Publish `subscription.expiring` for subscriptions ending within
    /// `days`, at most once per subscription per day. Returns how many
    /// warnings went out.
    pub async fn send_expiry_warnings(&self, days: i64) -> AppResult<usize> {
        let now = Utc::now();
        let not_since = now - Duration::days(1);
        let mut sent = 0;

        for detail in self.expiring(days).await? {
            let sub = &detail.subscription;
            if !SubscriptionRepo::claim_expiry_warning(&self.pool, sub.id, not_since).await? {
                continue;
            }
            self.publish(
                event_types::SUBSCRIPTION_EXPIRING,
                sub,
                &detail.plan_name,
                None,
                json!({ "days_remaining": lifecycle::days_remaining(sub.end_date, now) }),
            );
            sent += 1;
        }
        Ok(sent)
    }

    /// Align each business's subdomain status with whether it holds a
    /// current subscription. Returns how many businesses changed.
    pub async fn sync_subdomains(&self) -> AppResult<usize> {
        let mut changed = 0;
        for (business_id, status, has_active) in BusinessRepo::list_subdomain_states(&self.pool).await? {
            let Some(target) = subdomain_sync_target(status, has_active) else {
                continue;
            };
            if !BusinessRepo::set_subdomain_status(&self.pool, business_id, target).await? {
                continue;
            }
            if target == SUBDOMAIN_EXPIRED {
                if let Some(business) = BusinessRepo::find_by_id(&self.pool, business_id).await? {
                    let line = format!(
                        "EXPIRED: no active subscription as of {}",
                        Utc::now().format("%Y-%m-%d")
                    );
                    BusinessRepo::update(
                        &self.pool,
                        business_id,
                        &UpdateBusiness {
                            notes: Some(append_note(business.notes.as_deref(), &line)),
                            ..Default::default()
                        },
                    )
                    .await?;
                }
            }
            tracing::info!(business_id, subdomain_status_id = target, "Subdomain status synced");
            changed += 1;
        }
        Ok(changed)
    }

    fn publish(
        &self,
        event_type: &str,
        sub: &Subscription,
        plan_name: &str,
        actor: Option<DbId>,
        extra: serde_json::Value,
    ) {
        let mut payload = json!({
            "plan_name": plan_name,
            "plan_id": sub.plan_id,
            "end_date": sub.end_date.to_rfc3339(),
            "is_active": sub.is_active,
        });
        if let (Some(target), serde_json::Value::Object(extra)) = (payload.as_object_mut(), extra) {
            target.extend(extra);
        }
        self.bus.publish(
            PlatformEvent::subscription(event_type, sub.id, sub.business_id)
                .with_actor(actor)
                .with_payload(payload),
        );
    }
}

fn non_blank(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
