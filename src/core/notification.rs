//! In-portal notifications and tuition reminders.

use crate::{
    core::{
        money::Money,
        notify::Notifier,
        paging::{PageWindow, Paged, fetch_page, search_term},
        reconcile::paid_amounts,
        semester::get_semester,
        student::get_user,
    },
    entities::{FeeAssessment, FeeStatus, Notification, fee_assessment, notification, student, user},
    errors::{Error, Result},
};
use chrono::{Days, NaiveDate};
use sea_orm::{
    FromQueryResult, JoinType, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

/// Kind given to reminder notifications.
pub const TUITION_REMINDER_KIND: &str = "TuitionReminder";

/// Reminder lookahead when the request does not say.
pub const DEFAULT_DAYS_BEFORE_DUE: u32 = 7;

fn default_kind() -> String {
    "General".to_string()
}

/// Fields accepted when creating a notification.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotification {
    /// Recipient
    pub user_id: i32,
    /// Short heading
    pub title: String,
    /// Body text
    pub message: String,
    /// Free-form category, `General` when absent
    #[serde(default = "default_kind", alias = "type")]
    pub kind: String,
}

/// Filters for [`list_notifications`].
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    /// Only notifications of this kind
    #[serde(alias = "type")]
    pub kind: Option<String>,
    /// Only read or only unread notifications
    pub is_read: Option<bool>,
}

/// Parameters for [`send_tuition_reminders`].
#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    /// Semester whose assessments are checked
    pub semester_id: i32,
    /// Day the reminder is computed for; today when absent
    pub reminder_date: Option<NaiveDate>,
    /// How far ahead of `reminder_date` a due date still triggers a reminder
    pub days_before_due: Option<u32>,
}

/// Result of [`send_tuition_reminders`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOutcome {
    /// Students with an outstanding assessment due within the window
    pub total_students: usize,
    /// Notifications created
    pub notifications_sent: usize,
}

#[derive(Debug, FromQueryResult)]
struct ReminderTarget {
    assessment_id: i32,
    user_id: i32,
    email: String,
    full_name: String,
    total_amount: Money,
    due_date: NaiveDate,
}

/// Creates a notification for an existing user.
pub async fn create_notification(
    db: &DatabaseConnection,
    input: CreateNotification,
) -> Result<notification::Model> {
    if input.title.trim().is_empty() {
        return Err(Error::validation("Notification title is required"));
    }
    get_user(db, input.user_id).await?;

    let created = notification::ActiveModel {
        user_id: Set(input.user_id),
        title: Set(input.title.trim().to_string()),
        message: Set(input.message),
        kind: Set(input.kind),
        sent_at: Set(chrono::Utc::now()),
        is_read: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::debug!(
        notification_id = created.id,
        user_id = created.user_id,
        "Created notification"
    );
    Ok(created)
}

/// Lists a user's notifications, newest first.
pub async fn list_notifications(
    db: &DatabaseConnection,
    user_id: i32,
    filter: &NotificationFilter,
    window: PageWindow,
) -> Result<Paged<notification::Model>> {
    let mut query = Notification::find().filter(notification::Column::UserId.eq(user_id));
    if let Some(kind) = search_term(filter.kind.as_deref()) {
        query = query.filter(notification::Column::Kind.eq(kind));
    }
    if let Some(is_read) = filter.is_read {
        query = query.filter(notification::Column::IsRead.eq(is_read));
    }
    let query = query
        .order_by_desc(notification::Column::SentAt)
        .order_by_desc(notification::Column::Id);
    fetch_page(db, query, window).await
}

/// Retrieves a notification visible to `reader_id`. Admins may read anyone's.
pub async fn get_notification(
    db: &DatabaseConnection,
    id: i32,
    reader_id: i32,
    is_admin: bool,
) -> Result<notification::Model> {
    let found = Notification::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Notification", id))?;
    if !is_admin && found.user_id != reader_id {
        return Err(Error::Forbidden {
            message: format!("Notification {id} belongs to another user"),
        });
    }
    Ok(found)
}

/// Marks one of the reader's own notifications as read.
pub async fn mark_read(
    db: &DatabaseConnection,
    id: i32,
    reader_id: i32,
) -> Result<notification::Model> {
    let found = get_notification(db, id, reader_id, false).await?;
    if found.is_read {
        return Ok(found);
    }
    let mut active: notification::ActiveModel = found.into();
    active.is_read = Set(true);
    active.update(db).await.map_err(Into::into)
}

/// Marks all of the reader's unread notifications as read in one statement.
///
/// Returns how many notifications changed; zero when there was nothing unread.
pub async fn mark_all_read(db: &DatabaseConnection, reader_id: i32) -> Result<u64> {
    let result = Notification::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .filter(notification::Column::UserId.eq(reader_id))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db)
        .await?;

    tracing::debug!(
        user_id = reader_id,
        marked = result.rows_affected,
        "Marked notifications read"
    );
    Ok(result.rows_affected)
}

/// Reminds every student with an outstanding assessment due soon.
///
/// An assessment qualifies when it is `Unpaid` or `Partial` and due on or before
/// `reminder_date + days_before_due`. Each reminder quotes the amount still owed after
/// successful payments. Notifications are written in one transaction; email delivery happens
/// afterwards and a failed email only logs.
pub async fn send_tuition_reminders(
    db: &DatabaseConnection,
    notifier: &dyn Notifier,
    request: ReminderRequest,
) -> Result<ReminderOutcome> {
    let semester = get_semester(db, request.semester_id).await?;
    let reminder_date = request
        .reminder_date
        .unwrap_or_else(|| chrono::Utc::now().date_naive());
    let days = request.days_before_due.unwrap_or(DEFAULT_DAYS_BEFORE_DUE);
    let horizon = reminder_date
        .checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| Error::validation(format!("daysBeforeDue {days} is out of range")))?;

    let targets = FeeAssessment::find()
        .select_only()
        .column_as(fee_assessment::Column::Id, "assessment_id")
        .column_as(user::Column::Id, "user_id")
        .column(user::Column::Email)
        .column(user::Column::FullName)
        .column(fee_assessment::Column::TotalAmount)
        .column(fee_assessment::Column::DueDate)
        .join(JoinType::InnerJoin, fee_assessment::Relation::Student.def())
        .join(JoinType::InnerJoin, student::Relation::User.def())
        .filter(fee_assessment::Column::SemesterId.eq(semester.id))
        .filter(fee_assessment::Column::Status.is_in([FeeStatus::Unpaid, FeeStatus::Partial]))
        .filter(fee_assessment::Column::DueDate.lte(horizon))
        .order_by_asc(fee_assessment::Column::Id)
        .into_model::<ReminderTarget>()
        .all(db)
        .await?;

    let ids: Vec<i32> = targets.iter().map(|t| t.assessment_id).collect();
    let paid = paid_amounts(db, &ids).await?;

    let txn = db.begin().await?;
    let mut outgoing = Vec::with_capacity(targets.len());
    for target in &targets {
        let remaining = target
            .total_amount
            .saturating_remaining(paid.get(&target.assessment_id).copied().unwrap_or_default());
        let title = format!("Tuition reminder: {}", semester.name);
        let message = format!(
            "Dear {}, you have {remaining} outstanding for {}, due on {}.",
            target.full_name, semester.name, target.due_date
        );
        notification::ActiveModel {
            user_id: Set(target.user_id),
            title: Set(title.clone()),
            message: Set(message.clone()),
            kind: Set(TUITION_REMINDER_KIND.to_string()),
            sent_at: Set(chrono::Utc::now()),
            is_read: Set(false),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        outgoing.push((target.email.as_str(), title, message));
    }
    txn.commit().await?;

    for (email, title, message) in &outgoing {
        if let Err(e) = notifier.send(email, title, message).await {
            tracing::warn!(recipient = %email, error = %e, "Failed to email tuition reminder");
        }
    }

    let outcome = ReminderOutcome {
        total_students: targets.len(),
        notifications_sent: outgoing.len(),
    };
    tracing::info!(
        semester_id = semester.id,
        %reminder_date,
        days,
        total_students = outcome.total_students,
        notifications_sent = outcome.notifications_sent,
        "Sent tuition reminders"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::PaymentStatus;
    use crate::test_utils::*;

    fn reminder(semester_id: i32, date: NaiveDate) -> ReminderRequest {
        ReminderRequest {
            semester_id,
            reminder_date: Some(date),
            days_before_due: None,
        }
    }

    #[tokio::test]
    async fn test_create_requires_existing_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = create_notification(
            &db,
            CreateNotification {
                user_id: 77,
                title: "Hello".to_string(),
                message: "World".to_string(),
                kind: default_kind(),
            },
        )
        .await;
        assert!(matches!(result, Err(Error::NotFound { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_list_and_mark_read() -> Result<()> {
        let (db, fx) = setup_with_assessment(1_000).await?;
        for title in ["First", "Second"] {
            create_notification(
                &db,
                CreateNotification {
                    user_id: fx.student.user_id,
                    title: title.to_string(),
                    message: "Body".to_string(),
                    kind: default_kind(),
                },
            )
            .await?;
        }
        let window = PageWindow { page: 1, page_size: 10 };
        let all =
            list_notifications(&db, fx.student.user_id, &NotificationFilter::default(), window)
                .await?;
        assert_eq!(all.total_count, 2);
        assert_eq!(all.items[0].title, "Second");

        let read = mark_read(&db, all.items[0].id, fx.student.user_id).await?;
        assert!(read.is_read);
        let unread = list_notifications(
            &db,
            fx.student.user_id,
            &NotificationFilter {
                is_read: Some(false),
                ..Default::default()
            },
            window,
        )
        .await?;
        assert_eq!(unread.total_count, 1);

        let other = mark_read(&db, all.items[1].id, fx.student.user_id + 1).await;
        assert!(matches!(other, Err(Error::Forbidden { .. })));
        assert!(get_notification(&db, all.items[1].id, 0, true).await.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn test_mark_all_read_only_touches_own_unread() -> Result<()> {
        let (db, fx) = setup_with_assessment(1_000).await?;
        let other = create_test_student(&db, "CS002", fx.department.id, fx.class.id).await?;
        for user_id in [fx.student.user_id, fx.student.user_id, other.user_id] {
            create_notification(
                &db,
                CreateNotification {
                    user_id,
                    title: "Notice".to_string(),
                    message: "Body".to_string(),
                    kind: default_kind(),
                },
            )
            .await?;
        }

        assert_eq!(mark_all_read(&db, fx.student.user_id).await?, 2);
        assert_eq!(mark_all_read(&db, fx.student.user_id).await?, 0);

        let window = PageWindow { page: 1, page_size: 10 };
        let unread = NotificationFilter {
            is_read: Some(false),
            ..Default::default()
        };
        let mine = list_notifications(&db, fx.student.user_id, &unread, window).await?;
        assert_eq!(mine.total_count, 0);
        let theirs = list_notifications(&db, other.user_id, &unread, window).await?;
        assert_eq!(theirs.total_count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reminders_respect_window_and_status() -> Result<()> {
        let (db, fx) = setup_with_assessment(1_000).await?;
        let notifier = RecordingNotifier::default();
        let due = fx.assessment.due_date;

        let early = send_tuition_reminders(
            &db,
            &notifier,
            reminder(fx.semester.id, due.checked_sub_days(Days::new(8)).unwrap()),
        )
        .await?;
        assert_eq!(early, ReminderOutcome::default());

        record_test_payment(&db, &fx, 400, None).await?;
        let outcome = send_tuition_reminders(
            &db,
            &notifier,
            reminder(fx.semester.id, due.checked_sub_days(Days::new(7)).unwrap()),
        )
        .await?;
        assert_eq!(outcome.total_students, 1);
        assert_eq!(outcome.notifications_sent, 1);
        assert_eq!(notifier.sent_to().len(), 1);

        let window = PageWindow { page: 1, page_size: 10 };
        let filter = NotificationFilter {
            kind: Some(TUITION_REMINDER_KIND.to_string()),
            ..Default::default()
        };
        let listed = list_notifications(&db, fx.student.user_id, &filter, window).await?;
        assert_eq!(listed.total_count, 1);
        assert!(listed.items[0].message.contains("600.00"));
        Ok(())
    }

    #[tokio::test]
    async fn test_reminders_skip_paid_and_ignore_pending() -> Result<()> {
        let (db, fx) = setup_with_assessment(1_000).await?;
        let notifier = RecordingNotifier::default();
        record_test_payment(&db, &fx, 1_000, Some(PaymentStatus::Pending)).await?;

        let on_due_date = reminder(fx.semester.id, fx.assessment.due_date);
        let pending_only = send_tuition_reminders(&db, &notifier, on_due_date).await?;
        assert_eq!(pending_only.notifications_sent, 1);

        record_test_payment(&db, &fx, 1_000, None).await?;
        let paid = send_tuition_reminders(&db, &notifier, on_due_date).await?;
        assert_eq!(paid.total_students, 0);
        Ok(())
    }
}
