use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::error::{AppResult, ScheduleError};
use crate::ledger::models::{Transaction, TransactionDraft};
use crate::ledger::store::{ReplayGuard, ReplayPlan};

use super::interval::advance;

/// Plans the catch-up replay for one template: one draft per occurrence
/// missed strictly before the current UTC day, the advanced cursor, and
/// the net signed balance delta across the drafts. Pure; the store applies
/// the plan.
///
/// Replay starts at the stored next_recurring_date when the template was
/// processed before, otherwise at the template's own occurrence date.
pub fn plan_replay(template: &Transaction, now: DateTime<Utc>) -> AppResult<ReplayPlan> {
    let interval = template.recurring_interval.ok_or_else(|| {
        ScheduleError::InvalidInterval("recurring template carries no interval".to_string())
    })?;

    let (start, guard) = match template.last_processed {
        None => (template.date, ReplayGuard::NeverProcessed),
        Some(_) => {
            let next = template
                .next_recurring_date
                .ok_or(ScheduleError::MalformedTemplate {
                    id: template.id,
                    field: "next_recurring_date",
                })?;
            (next, ReplayGuard::NextDueAt(next))
        }
    };

    let today = now.date_naive();
    let mut occurrence = start;
    let mut drafts = Vec::new();
    let mut net_delta = Decimal::ZERO;

    // Occurrences falling on the current day are deferred to the next run,
    // so a run retried later the same day cannot double-process.
    while occurrence.date_naive() < today {
        let draft = draft_occurrence(template, occurrence);
        net_delta += draft.signed_amount();
        drafts.push(draft);
        occurrence = advance(occurrence, interval);
    }

    Ok(ReplayPlan {
        template_id: template.id,
        account_id: template.account_id,
        drafts,
        net_delta,
        next_due: occurrence,
        guard,
    })
}

fn draft_occurrence(template: &Transaction, date: DateTime<Utc>) -> TransactionDraft {
    let description = match template.description.as_deref() {
        Some(text) if !text.is_empty() => format!("{} (Recurring)", text),
        _ => "Recurring transaction".to_string(),
    };

    TransactionDraft {
        user_id: template.user_id,
        account_id: template.account_id,
        kind: template.kind,
        amount: template.amount,
        description,
        date,
        category: template.category.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::ledger::fixtures;
    use crate::ledger::models::{RecurrenceInterval, TransactionKind};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 5, 0).unwrap()
    }

    #[test]
    fn test_weekly_catch_up_replays_missed_occurrences() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(500), true);
        let d0 = at(2025, 3, 3);
        let template = Transaction {
            last_processed: Some(d0),
            next_recurring_date: Some(d0 + Duration::days(7)),
            ..fixtures::template(
                &account,
                TransactionKind::Expense,
                dec!(12.50),
                RecurrenceInterval::Weekly,
                d0,
                "Gym",
            )
        };

        // 20 days after D0: D0+7 and D0+14 were missed, D0+21 is tomorrow.
        let now = d0 + Duration::days(20);
        let plan = plan_replay(&template, now).unwrap();

        assert_eq!(plan.drafts.len(), 2);
        assert_eq!(plan.drafts[0].date, d0 + Duration::days(7));
        assert_eq!(plan.drafts[1].date, d0 + Duration::days(14));
        assert_eq!(plan.next_due, d0 + Duration::days(21));
        assert_eq!(plan.net_delta, dec!(-25.00));
        assert_eq!(plan.guard, ReplayGuard::NextDueAt(d0 + Duration::days(7)));
        assert_eq!(plan.drafts[0].description, "Gym (Recurring)");
        assert_eq!(plan.drafts[0].category, template.category);
    }

    #[test]
    fn test_never_processed_template_replays_from_its_own_date() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(0), true);
        let template = fixtures::template(
            &account,
            TransactionKind::Expense,
            dec!(1200),
            RecurrenceInterval::Monthly,
            at(2025, 1, 31),
            "Rent",
        );

        let plan = plan_replay(&template, at(2025, 4, 2)).unwrap();

        let dates: Vec<DateTime<Utc>> = plan.drafts.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![at(2025, 1, 31), at(2025, 2, 28), at(2025, 3, 31)]);
        assert_eq!(plan.next_due, at(2025, 4, 30));
        assert_eq!(plan.net_delta, dec!(-3600));
        assert_eq!(plan.guard, ReplayGuard::NeverProcessed);
    }

    #[test]
    fn test_income_templates_produce_positive_delta() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(0), true);
        let template = fixtures::template(
            &account,
            TransactionKind::Income,
            dec!(3000),
            RecurrenceInterval::Monthly,
            at(2025, 1, 1),
            "Salary",
        );

        let plan = plan_replay(&template, at(2025, 3, 1)).unwrap();

        assert_eq!(plan.drafts.len(), 2);
        assert_eq!(plan.net_delta, dec!(6000));
    }

    #[test]
    fn test_same_day_occurrence_is_deferred() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(100), true);
        let due_today = at(2025, 6, 15);
        let template = Transaction {
            last_processed: Some(at(2025, 6, 8)),
            next_recurring_date: Some(due_today),
            ..fixtures::template(
                &account,
                TransactionKind::Expense,
                dec!(9.99),
                RecurrenceInterval::Weekly,
                at(2025, 6, 1),
                "Streaming",
            )
        };

        // Later the same day: nothing to materialize, cursor unchanged.
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 18, 0, 0).unwrap();
        let plan = plan_replay(&template, now).unwrap();

        assert!(plan.drafts.is_empty());
        assert_eq!(plan.net_delta, Decimal::ZERO);
        assert_eq!(plan.next_due, due_today);
    }

    #[test]
    fn test_planning_is_deterministic() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(0), true);
        let template = fixtures::template(
            &account,
            TransactionKind::Expense,
            dec!(5),
            RecurrenceInterval::Daily,
            at(2025, 2, 1),
            "Coffee",
        );

        let now = at(2025, 2, 10);
        assert_eq!(
            plan_replay(&template, now).unwrap(),
            plan_replay(&template, now).unwrap()
        );
    }

    #[test]
    fn test_missing_interval_is_rejected() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(0), true);
        let template = Transaction {
            recurring_interval: None,
            ..fixtures::template(
                &account,
                TransactionKind::Expense,
                dec!(5),
                RecurrenceInterval::Daily,
                at(2025, 2, 1),
                "Broken",
            )
        };

        let err = plan_replay(&template, at(2025, 2, 10)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Schedule(ScheduleError::InvalidInterval(_))
        ));
    }

    #[test]
    fn test_processed_template_without_cursor_is_malformed() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(0), true);
        let template = Transaction {
            last_processed: Some(at(2025, 2, 1)),
            next_recurring_date: None,
            ..fixtures::template(
                &account,
                TransactionKind::Expense,
                dec!(5),
                RecurrenceInterval::Daily,
                at(2025, 2, 1),
                "Broken",
            )
        };

        let err = plan_replay(&template, at(2025, 2, 10)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Schedule(ScheduleError::MalformedTemplate { .. })
        ));
    }

    #[test]
    fn test_blank_description_gets_a_readable_fallback() {
        let user = fixtures::user("ada@example.com");
        let account = fixtures::account(user.id, dec!(0), true);
        let template = Transaction {
            description: None,
            ..fixtures::template(
                &account,
                TransactionKind::Expense,
                dec!(5),
                RecurrenceInterval::Daily,
                at(2025, 2, 1),
                "unused",
            )
        };

        let plan = plan_replay(&template, at(2025, 2, 3)).unwrap();
        assert_eq!(plan.drafts[0].description, "Recurring transaction");
    }
}
