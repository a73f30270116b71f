use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;

use fintrack::config::{PASSWORD_ENV, USER_ENV};
use fintrack::db::{Database, LedgerReader};
use fintrack::engine;
use fintrack::format::{format_amount, format_change, format_pct, progress_bar, truncate};
use fintrack::models::{
    Category, DateRange, Month, Transaction, TransactionFilter, TransactionType,
};
use fintrack::validate::{parse_amount, parse_date, parse_limit};
use fintrack::{auth, demo, LedgerError};

const DEFAULT_TREND_MONTHS: u32 = 6;
const RECENT_LIMIT: u32 = 5;

pub(crate) fn as_cli(args: &[String], db: &Database) -> Result<()> {
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };
    let rest = &args[2..];
    match command.as_str() {
        "register" => cli_register(rest, db),
        "login" => cli_login(rest, db),
        "categories" | "cats" => cli_categories(rest, db),
        "add" => cli_add(rest, db),
        "list" | "ls" => cli_list(rest, db),
        "summary" | "s" => cli_summary(rest, db),
        "budget" => cli_budget(rest, db),
        "breakdown" => cli_breakdown(rest, db),
        "compare" => cli_compare(rest, db),
        "trend" => cli_trend(rest, db),
        "demo" => cli_demo(db),
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        "--version" | "-V" | "version" => {
            println!("fintrack {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("fintrack: personal income/expense ledger");
    println!();
    println!("Usage: fintrack <command> [args] [--user <name> --password <pw>]");
    println!();
    println!("Commands:");
    println!("  register <username> <password>       Create an account");
    println!("  login                                Check credentials");
    println!("  categories [--type income]           List categories");
    println!("  add <income|expense> <amount> <category>");
    println!("      [--date <date>] [--desc <text>]  Record a transaction (default date: today)");
    println!("  list [--from D] [--to D] [--type T] [--category C] [--limit N]");
    println!("                                       List transactions, newest first");
    println!("  summary [YYYY-MM]                    Monthly totals vs. previous month");
    println!("  budget [set <amount>] [--month M]    Show or set the monthly budget");
    println!("  breakdown [--type T] [--month M | --from D --to D]");
    println!("                                       Totals per category");
    println!("  compare [--from D] [--to D]          Income and expense per category");
    println!("  trend [--months N]                   Income vs. expense for recent months");
    println!("  demo                                 Create demo_user with sample data");
    println!("  --help, -h                           Show this help");
    println!("  --version, -V                        Show version");
    println!();
    println!("Credentials may also come from {USER_ENV} and {PASSWORD_ENV}.");
}

// ── Argument helpers ─────────────────────────────────────────

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither a `--flag` nor the value following one.
fn positional(args: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.starts_with("--") {
            iter.next();
        } else {
            out.push(arg.as_str());
        }
    }
    out
}

fn month_arg(args: &[String]) -> Result<Month> {
    let explicit = flag_value(args, "--month").or_else(|| positional(args).first().copied());
    match explicit {
        Some(m) => Ok(m.parse()?),
        None => Ok(Month::current()),
    }
}

fn kind_arg(args: &[String]) -> Result<Option<TransactionType>> {
    flag_value(args, "--type")
        .filter(|t| !t.eq_ignore_ascii_case("all"))
        .map(|t| {
            TransactionType::parse(t)
                .ok_or_else(|| anyhow!("Unknown type '{t}', expected income or expense"))
        })
        .transpose()
}

fn range_arg(args: &[String]) -> Result<Option<DateRange>> {
    let from = flag_value(args, "--from").map(parse_date).transpose()?;
    let to = flag_value(args, "--to").map(parse_date).transpose()?;
    if from.is_none() && to.is_none() {
        return Ok(None);
    }
    let range = DateRange::new(from, to);
    if range.is_empty() {
        anyhow::bail!("--from must not be after --to");
    }
    Ok(Some(range))
}

fn authenticate(args: &[String], db: &Database) -> Result<i64> {
    let username = flag_value(args, "--user")
        .map(str::to_string)
        .or_else(|| std::env::var(USER_ENV).ok())
        .ok_or_else(|| anyhow!("No user given. Use --user <name> or set {USER_ENV}"))?;
    let password = flag_value(args, "--password")
        .map(str::to_string)
        .or_else(|| std::env::var(PASSWORD_ENV).ok())
        .ok_or_else(|| anyhow!("No password given. Use --password <pw> or set {PASSWORD_ENV}"))?;

    match auth::login(db, &username, &password) {
        Ok(id) => Ok(id),
        Err(LedgerError::NotFound { .. }) => Err(anyhow!("Invalid username or password")),
        Err(e) => Err(e.into()),
    }
}

// ── Commands ─────────────────────────────────────────────────

fn cli_register(args: &[String], db: &Database) -> Result<()> {
    let pos = positional(args);
    let (Some(username), Some(password)) = (pos.first(), pos.get(1)) else {
        anyhow::bail!("Usage: fintrack register <username> <password>");
    };
    let id = auth::register(db, username, password)?;
    println!("Registered {username} (id {id}). You can now log in.");
    Ok(())
}

fn cli_login(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let user = db
        .get_user(user_id)?
        .ok_or_else(|| anyhow!("User {user_id} vanished"))?;
    println!("Logged in as {} (id {})", user.username, user.id);
    Ok(())
}

fn cli_categories(args: &[String], db: &Database) -> Result<()> {
    let income_only = kind_arg(args)? == Some(TransactionType::Income);
    for cat in db.list_categories()? {
        if income_only && !cat.is_income_category() {
            continue;
        }
        let marker = if cat.is_income_category() { "  (income)" } else { "" };
        println!("  {}{marker}", cat.name);
    }
    Ok(())
}

fn cli_add(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let pos = positional(args);
    let (Some(kind), Some(amount), Some(category)) = (pos.first(), pos.get(1), pos.get(2)) else {
        anyhow::bail!("Usage: fintrack add <income|expense> <amount> <category> [--date D] [--desc TEXT]");
    };

    let kind = TransactionType::parse(kind)
        .ok_or_else(|| anyhow!("Unknown type '{kind}', expected income or expense"))?;
    let amount = parse_amount(amount)?;
    let category = db
        .find_category_by_name(category)?
        .ok_or_else(|| anyhow!("Invalid category '{category}'. See `fintrack categories`"))?;
    let category_id = category
        .id
        .ok_or_else(|| anyhow!("Category has no ID"))?;
    let date = match flag_value(args, "--date") {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    let description = flag_value(args, "--desc").unwrap_or_default().trim().to_string();

    let txn = Transaction::new(user_id, category_id, kind, amount, date, description);
    let id = db
        .insert_transaction(&txn)
        .context("Failed to save transaction")?;
    println!(
        "Saved {} #{id}: {} in {} on {date}",
        kind.as_str().to_lowercase(),
        format_amount(amount),
        category.name
    );
    Ok(())
}

fn cli_list(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let category_id = match flag_value(args, "--category") {
        Some(name) => Some(
            db.find_category_by_name(name)?
                .and_then(|c| c.id)
                .ok_or_else(|| anyhow!("Invalid category '{name}'"))?,
        ),
        None => None,
    };
    let limit = flag_value(args, "--limit")
        .map(|l| l.parse::<u32>().with_context(|| format!("Invalid --limit '{l}'")))
        .transpose()?;
    let filter = TransactionFilter {
        range: range_arg(args)?.unwrap_or_default(),
        kind: kind_arg(args)?,
        category_id,
        limit,
    };

    let txns = db.list_transactions(user_id, &filter)?;
    if txns.is_empty() {
        println!("No transactions");
        return Ok(());
    }
    let categories = db.list_categories()?;
    print_transactions(&txns, &categories);
    println!("{} transaction(s)", txns.len());
    Ok(())
}

fn print_transactions(txns: &[Transaction], categories: &[Category]) {
    println!(
        "{:<10}  {:<7}  {:<15}  {:>12}  Description",
        "Date", "Type", "Category", "Amount"
    );
    println!("{}", "─".repeat(70));
    for t in txns {
        let cat = Category::find_by_id(categories, t.category_id)
            .map(|c| c.name.as_str())
            .unwrap_or("?");
        println!(
            "{:<10}  {:<7}  {:<15}  {:>12}  {}",
            t.date.to_string(),
            t.kind.as_str(),
            truncate(cat, 15),
            format_amount(t.signed_amount()),
            truncate(&t.description, 30),
        );
    }
}

fn cli_summary(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let month = month_arg(args)?;
    let cmp = engine::month_over_month(db, user_id, month)?;
    let budget = engine::budget_status(db, user_id, month)?;
    let spending = engine::category_breakdown(
        db,
        user_id,
        TransactionType::Expense,
        DateRange::month(month),
    )?;

    println!("{}", month.long_label());
    println!("{}", "─".repeat(44));
    println!(
        "  Income:   {:>14}  {} from last month",
        format_amount(cmp.current.total_income),
        format_change(cmp.income_change)
    );
    println!(
        "  Expenses: {:>14}  {} from last month",
        format_amount(cmp.current.total_expense),
        format_change(cmp.expense_change)
    );
    println!(
        "  Balance:  {:>14}  {}",
        format_amount(cmp.current.net_balance),
        format_change(cmp.balance_change)
    );
    match budget.usage_pct {
        Some(pct) => println!(
            "  Budget:   {:>14}  {} {}",
            format_amount(budget.limit.unwrap_or_default()),
            progress_bar(budget.progress_pct(), 20),
            format_pct(pct)
        ),
        None if budget.is_set() => println!("  Budget:   {:>14}", format_amount(budget.limit.unwrap_or_default())),
        None => println!("  Budget:   not set"),
    }

    if !spending.is_empty() {
        println!();
        println!("Spending by Category:");
        for (name, amount) in &spending {
            println!("  {name:<18} {:>12}", format_amount(*amount));
        }
    }

    let recent = engine::recent_transactions(db, user_id, RECENT_LIMIT)?;
    if !recent.is_empty() {
        println!();
        println!("Recent:");
        print_transactions(&recent, &db.list_categories()?);
    }
    Ok(())
}

fn cli_budget(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let month = match flag_value(args, "--month") {
        Some(m) => m.parse()?,
        None => Month::current(),
    };

    let pos = positional(args);
    if pos.first() == Some(&"set") {
        let Some(amount) = pos.get(1) else {
            anyhow::bail!("Usage: fintrack budget set <amount> [--month YYYY-MM]");
        };
        let limit = parse_limit(amount)?;
        db.upsert_budget(user_id, month, limit)
            .context("Failed to save budget")?;
        println!("Budget for {} set to {}", month.long_label(), format_amount(limit));
    }

    let status = engine::budget_status(db, user_id, month)?;
    println!("Budget for {}", month.long_label());
    println!("{}", "─".repeat(40));
    match status.limit {
        Some(limit) => println!("  Limit:      {}", format_amount(limit)),
        None => println!("  Limit:      no budget set"),
    }
    println!("  Spent:      {}", format_amount(status.spent));
    println!("  Remaining:  {}", format_amount(status.remaining));
    if let Some(pct) = status.usage_pct {
        println!("  Used:       {} {}", progress_bar(status.progress_pct(), 20), format_pct(pct));
    }
    if status.is_overspent() {
        println!();
        println!(
            "  Overspending alert! Budget exceeded by {}",
            format_amount(status.overspent_by)
        );
    }
    Ok(())
}

fn cli_breakdown(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let kind = kind_arg(args)?.unwrap_or(TransactionType::Expense);
    let (period, label) = match range_arg(args)? {
        Some(range) => (range, describe_range(range)),
        None => {
            let month = month_arg(args)?;
            (DateRange::month(month), month.long_label())
        }
    };

    let rows = engine::category_breakdown(db, user_id, kind, period)?;
    println!("{kind} by category, {label}");
    println!("{}", "─".repeat(40));
    if rows.is_empty() {
        println!("  No {} data for this period", kind.as_str().to_lowercase());
        return Ok(());
    }
    let total = rows
        .iter()
        .try_fold(Decimal::ZERO, |acc, (_, v)| acc.checked_add(*v))
        .ok_or_else(|| anyhow!("Category totals are too large to add up"))?;
    for (name, amount) in &rows {
        let share = engine::share_pct(*amount, total);
        println!("  {name:<18} {:>12}  {}", format_amount(*amount), format_pct(share));
    }
    println!("  {:<18} {:>12}", "Total", format_amount(total));
    Ok(())
}

fn cli_compare(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let range = range_arg(args)?.unwrap_or_default();
    let rows = engine::category_comparison(db, user_id, range)?;
    if rows.is_empty() {
        println!("No data available for the selected period");
        return Ok(());
    }
    println!("{:<18} {:>12} {:>12}", "Category", "Income", "Expense");
    println!("{}", "─".repeat(44));
    for row in &rows {
        println!(
            "{:<18} {:>12} {:>12}",
            row.name,
            format_amount(row.income),
            format_amount(row.expense)
        );
    }
    Ok(())
}

fn cli_trend(args: &[String], db: &Database) -> Result<()> {
    let user_id = authenticate(args, db)?;
    let months = flag_value(args, "--months")
        .map(|n| n.parse::<u32>().with_context(|| format!("Invalid --months '{n}'")))
        .transpose()?
        .unwrap_or(DEFAULT_TREND_MONTHS);

    let points = engine::income_expense_series(db, user_id, Month::current(), months)?;
    println!("{:<9} {:>12} {:>12} {:>12}", "Month", "Income", "Expense", "Net");
    println!("{}", "─".repeat(48));
    for p in &points {
        println!(
            "{:<9} {:>12} {:>12} {:>12}",
            format!("{} {}", p.month.short_label(), p.month.year()),
            format_amount(p.income),
            format_amount(p.expense),
            format_amount(p.income - p.expense)
        );
    }
    Ok(())
}

fn cli_demo(db: &Database) -> Result<()> {
    let seed = demo::seed_demo(db, chrono::Local::now().date_naive())?;
    if seed.created_user {
        println!("Created {} (password: {})", demo::DEMO_USERNAME, demo::DEMO_PASSWORD);
    } else {
        println!("{} already exists", demo::DEMO_USERNAME);
    }
    println!("Inserted {} sample transactions", seed.inserted);
    if seed.budget_set {
        println!("Set a {} budget for this month", format_amount(Decimal::from(demo::DEMO_BUDGET)));
    }
    let summary = engine::monthly_summary(db, seed.user_id, Month::current())?;
    println!(
        "This month: income {}, expenses {}, balance {}",
        format_amount(summary.total_income),
        format_amount(summary.total_expense),
        format_amount(summary.net_balance)
    );
    Ok(())
}

fn describe_range(range: DateRange) -> String {
    match (range.from, range.to) {
        (Some(f), Some(t)) => format!("{f} to {t}"),
        (Some(f), None) => format!("from {f}"),
        (None, Some(t)) => format!("until {t}"),
        (None, None) => "all time".to_string(),
    }
}
