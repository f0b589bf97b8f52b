// Plain HTML bodies for the two outbound emails. Kept as string builders
// rather than a templating engine; the mail client does the styling.

use rust_decimal::Decimal;

use crate::reporting::stats::MonthlyStats;

/// Subject and HTML body for a budget threshold alert.
pub fn budget_alert_email(
    user_name: &str,
    account_name: &str,
    percentage_used: Decimal,
    budget_amount: Decimal,
    total_expenses: Decimal,
) -> (String, String) {
    let subject = format!("Budget Alert for {}", account_name);
    let remaining = budget_amount - total_expenses;

    let html = format!(
        "<h2>Budget Alert</h2>\
         <p>Hello {},</p>\
         <p>You've used {}% of your monthly budget.</p>\
         <ul>\
         <li>Budget Amount: ${}</li>\
         <li>Spent So Far: ${}</li>\
         <li>Remaining: ${}</li>\
         </ul>",
        user_name,
        percentage_used.round_dp(1),
        budget_amount.round_dp(2),
        total_expenses.round_dp(2),
        remaining.round_dp(2),
    );
    (subject, html)
}

/// Subject and HTML body for the monthly financial report.
pub fn monthly_report_email(
    user_name: &str,
    month_label: &str,
    stats: &MonthlyStats,
    insights: &[String],
) -> (String, String) {
    let subject = format!("Your Monthly Financial Report - {}", month_label);

    let mut category_rows = String::new();
    for (category, amount) in &stats.by_category {
        category_rows.push_str(&format!(
            "<tr><td>{}</td><td>${}</td></tr>",
            category,
            amount.round_dp(2)
        ));
    }

    let mut insight_items = String::new();
    for insight in insights {
        insight_items.push_str(&format!("<li>{}</li>", insight));
    }

    let html = format!(
        "<h2>Your Financial Report for {}</h2>\
         <p>Hello {},</p>\
         <ul>\
         <li>Total Income: ${}</li>\
         <li>Total Expenses: ${}</li>\
         <li>Net Income: ${}</li>\
         </ul>\
         <h3>Expenses by Category</h3>\
         <table>{}</table>\
         <h3>FinTrack Insights</h3>\
         <ul>{}</ul>",
        month_label,
        user_name,
        stats.total_income.round_dp(2),
        stats.total_expenses.round_dp(2),
        stats.net_income().round_dp(2),
        category_rows,
        insight_items,
    );
    (subject, html)
}
