use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The semantic columns the engine understands. Arbitrary source column
/// names are mapped onto these by [`resolve_schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalColumn {
    Date,
    Amount,
    Income,
    Expenses,
    Revenue,
    Costs,
    Category,
}

impl CanonicalColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalColumn::Date => "date",
            CanonicalColumn::Amount => "amount",
            CanonicalColumn::Income => "income",
            CanonicalColumn::Expenses => "expenses",
            CanonicalColumn::Revenue => "revenue",
            CanonicalColumn::Costs => "costs",
            CanonicalColumn::Category => "category",
        }
    }
}

pub const REVENUE_KEYWORDS: &[&str] = &["revenue", "sales", "income", "turnover", "gross_sales"];
pub const EXPENSE_KEYWORDS: &[&str] = &["expense", "costs", "expenditure", "outgoings", "spending"];
pub const DATE_KEYWORDS: &[&str] = &["date", "transaction_date", "period", "month", "time"];
pub const AMOUNT_KEYWORDS: &[&str] = &["amount", "value", "sum", "total"];
pub const CATEGORY_KEYWORDS: &[&str] =
    &["category", "type", "description", "account", "classification"];

/// Keyword pass order. Evaluated top to bottom; the first source column whose
/// normalized name contains one of the keywords wins and is consumed.
const KEYWORD_PASSES: &[(CanonicalColumn, &[&str])] = &[
    (CanonicalColumn::Revenue, REVENUE_KEYWORDS),
    (CanonicalColumn::Expenses, EXPENSE_KEYWORDS),
    (CanonicalColumn::Date, DATE_KEYWORDS),
    (CanonicalColumn::Amount, AMOUNT_KEYWORDS),
    (CanonicalColumn::Category, CATEGORY_KEYWORDS),
];

/// Exact-name pass order. A column whose normalized name equals one of these
/// resolves directly, before any keyword matching runs.
const EXACT_PASSES: &[CanonicalColumn] = &[
    CanonicalColumn::Date,
    CanonicalColumn::Amount,
    CanonicalColumn::Income,
    CanonicalColumn::Expenses,
    CanonicalColumn::Revenue,
    CanonicalColumn::Costs,
    CanonicalColumn::Category,
];

pub const INCOME_CATEGORY_KEYWORDS: &[&str] =
    &["income", "revenue", "sales", "receivable", "deposit"];
pub const EXPENSE_CATEGORY_KEYWORDS: &[&str] =
    &["expense", "cost", "payment", "bill", "payable", "purchase"];

/// Case-insensitive substring match over free-text categories.
///
/// The income and expense masks are NOT mutually exclusive: a category such
/// as "sales expense" is counted in both totals. Known correctness hazard,
/// preserved from observed behavior.
#[derive(Debug, Clone, Copy)]
pub struct CategoryMask {
    keywords: &'static [&'static str],
}

impl CategoryMask {
    pub const INCOME: CategoryMask = CategoryMask {
        keywords: INCOME_CATEGORY_KEYWORDS,
    };
    pub const EXPENSE: CategoryMask = CategoryMask {
        keywords: EXPENSE_CATEGORY_KEYWORDS,
    };

    pub fn matches(&self, category: &str) -> bool {
        let lower = category.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k))
    }
}

/// Lowercase, trim, and replace spaces so that "Transaction Date" and
/// "transaction_date" resolve identically.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Maps arbitrary source column names onto the canonical schema.
///
/// Pure and deterministic: an exact-name pass runs first, then the fixed
/// keyword passes. Each source column is consumed at most once, and pass
/// order never depends on the input.
pub fn resolve_schema(columns: &[String]) -> BTreeMap<CanonicalColumn, String> {
    let normalized: Vec<String> = columns.iter().map(|c| normalize_column_name(c)).collect();
    let mut consumed = vec![false; columns.len()];
    let mut mapping = BTreeMap::new();

    for &canonical in EXACT_PASSES {
        for (idx, name) in normalized.iter().enumerate() {
            if !consumed[idx] && name == canonical.as_str() {
                mapping.insert(canonical, columns[idx].clone());
                consumed[idx] = true;
                break;
            }
        }
    }

    for &(canonical, keywords) in KEYWORD_PASSES {
        if mapping.contains_key(&canonical) {
            continue;
        }
        for (idx, name) in normalized.iter().enumerate() {
            if !consumed[idx] && keywords.iter().any(|k| name.contains(k)) {
                mapping.insert(canonical, columns[idx].clone());
                consumed[idx] = true;
                break;
            }
        }
    }

    mapping
}

/// One decoded input row, keyed by the source column name.
pub type RawRow = BTreeMap<String, Value>;

/// A materialized row table as handed over by an external decoder
/// (CSV, spreadsheet, JSON). Column order is the source order and matters
/// for schema resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn new(columns: Vec<String>, rows: Vec<RawRow>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table from bare rows, deriving the column list from the keys
    /// in first-seen order.
    pub fn from_rows(rows: Vec<RawRow>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }
}

/// Which canonical columns were successfully resolved for a dataset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedColumns {
    pub date: bool,
    pub amount: bool,
    pub income: bool,
    pub expenses: bool,
    pub revenue: bool,
    pub costs: bool,
    pub category: bool,
}

impl ResolvedColumns {
    /// True when at least one numeric signal resolved. A dataset without any
    /// is valid but empty of signal; the calculators report that, not the
    /// normalizer.
    pub fn any_numeric(&self) -> bool {
        self.amount || self.income || self.expenses || self.revenue || self.costs
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let flags = [
            (self.date, "date"),
            (self.amount, "amount"),
            (self.income, "income"),
            (self.expenses, "expenses"),
            (self.revenue, "revenue"),
            (self.costs, "costs"),
            (self.category, "category"),
        ];
        for (set, name) in flags {
            if set {
                names.push(name);
            }
        }
        names
    }
}

/// One cleaned input row. All fields optional; rows that carry no numeric
/// signal at all are dropped during normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub income: Option<f64>,
    pub expenses: Option<f64>,
    pub revenue: Option<f64>,
    pub costs: Option<f64>,
    /// Lowercased free text, ready for keyword matching.
    pub category: Option<String>,
}

/// Aggregate of all rows falling in one calendar month. Field presence
/// mirrors which columns resolved for the dataset.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub amount: Option<f64>,
    pub income: Option<f64>,
    pub expenses: Option<f64>,
}

impl MonthlyBucket {
    pub fn net_cash_flow(&self) -> f64 {
        match (self.income, self.expenses) {
            (Some(income), Some(expenses)) => income - expenses,
            _ => self.amount.unwrap_or(0.0),
        }
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// The normalized dataset a single report invocation operates on. Immutable
/// after normalization apart from one monotonic sort by date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialDataset {
    pub records: Vec<FinancialRecord>,
    pub resolved: ResolvedColumns,
    /// Cell counts over the surviving rows, for completeness scoring.
    pub total_cells: usize,
    pub non_null_cells: usize,
}

impl FinancialDataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort, records without a date first. Called once by the
    /// assembler before the date-dependent calculators run.
    pub fn sort_by_date(&mut self) {
        self.records.sort_by_key(|r| r.date);
    }

    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let mut dates = self.records.iter().filter_map(|r| r.date);
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(min, max), d| (min.min(d), max.max(d)));
        Some((min, max))
    }

    /// Non-null cell ratio over the surviving rows, as a percentage.
    pub fn completeness(&self) -> f64 {
        if self.total_cells == 0 {
            return 0.0;
        }
        self.non_null_cells as f64 / self.total_cells as f64 * 100.0
    }

    /// Groups dated records into calendar-month buckets, ordered by month.
    /// Records without a date are skipped.
    pub fn monthly_buckets(&self) -> Vec<MonthlyBucket> {
        #[derive(Default)]
        struct Accumulator {
            amount: f64,
            income: f64,
            expenses: f64,
        }

        let mut buckets: BTreeMap<(i32, u32), Accumulator> = BTreeMap::new();
        for record in &self.records {
            let Some(date) = record.date else { continue };
            let acc = buckets.entry((date.year(), date.month())).or_default();
            acc.amount += record.amount.unwrap_or(0.0);
            acc.income += record.income.unwrap_or(0.0);
            acc.expenses += record.expenses.unwrap_or(0.0);
        }

        buckets
            .into_iter()
            .map(|((year, month), acc)| MonthlyBucket {
                year,
                month,
                amount: self.resolved.amount.then_some(acc.amount),
                income: self.resolved.income.then_some(acc.income),
                expenses: self.resolved.expenses.then_some(acc.expenses),
            })
            .collect()
    }
}

/// Strips currency symbols and thousands separators, then parses to float.
/// Anything unparsable becomes `None`.
pub fn clean_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | '£' | '€' | '¥' | ','))
                .collect();
            let cleaned = cleaned.trim();
            if cleaned.is_empty() {
                return None;
            }
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Parses a calendar date from a raw cell. Tries the fixed format list, then
/// a datetime prefix, then a bare year-month (resolved to the first day).
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let Value::String(s) = value else { return None };
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    // Datetime strings: keep the date prefix, drop the time of day.
    if s.len() > 10 {
        let prefix = &s[..10];
        for format in &DATE_FORMATS[..2] {
            if let Ok(date) = NaiveDate::parse_from_str(prefix, format) {
                return Some(date);
            }
        }
    }

    // "2024-01" style periods.
    if s.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Some(date);
        }
    }

    None
}

/// Strict variant of [`parse_date`] for callers that need the failure
/// surfaced instead of a dropped row.
pub fn parse_date_str(s: &str) -> crate::error::Result<NaiveDate> {
    parse_date(&Value::String(s.to_string()))
        .ok_or_else(|| crate::error::AnalysisError::InvalidDateFormat(s.to_string()))
}

fn string_cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Normalizes a raw table into a [`FinancialDataset`]: resolves the schema,
/// cleans values, drops rows with unparsable dates or no numeric signal.
///
/// Never fails outright; a table where no numeric column resolves produces a
/// dataset flagged empty of signal for the calculators to report.
pub fn normalize_table(table: &RawTable) -> FinancialDataset {
    let mapping = resolve_schema(&table.columns);
    debug!(
        "Resolved {} of {} source columns: {:?}",
        mapping.len(),
        table.columns.len(),
        mapping
    );

    let mut resolved = ResolvedColumns {
        date: mapping.contains_key(&CanonicalColumn::Date),
        amount: mapping.contains_key(&CanonicalColumn::Amount),
        income: mapping.contains_key(&CanonicalColumn::Income),
        expenses: mapping.contains_key(&CanonicalColumn::Expenses),
        revenue: mapping.contains_key(&CanonicalColumn::Revenue),
        costs: mapping.contains_key(&CanonicalColumn::Costs),
        category: mapping.contains_key(&CanonicalColumn::Category),
    };

    // Revenue doubles as income when no income column resolved.
    let mirror_income = resolved.revenue && !resolved.income;
    if mirror_income {
        resolved.income = true;
    }

    let numeric_sources: Vec<(CanonicalColumn, &String)> = [
        CanonicalColumn::Amount,
        CanonicalColumn::Income,
        CanonicalColumn::Expenses,
        CanonicalColumn::Revenue,
        CanonicalColumn::Costs,
    ]
    .iter()
    .filter_map(|c| mapping.get(c).map(|source| (*c, source)))
    .collect();

    let mut records = Vec::with_capacity(table.rows.len());
    let mut total_cells = 0usize;
    let mut non_null_cells = 0usize;
    let mut dropped_dates = 0usize;
    let mut dropped_empty = 0usize;

    for row in &table.rows {
        let mut record = FinancialRecord::default();

        if let Some(source) = mapping.get(&CanonicalColumn::Date) {
            record.date = row.get(source).and_then(parse_date);
            if record.date.is_none() {
                dropped_dates += 1;
                continue;
            }
        }

        for &(canonical, source) in &numeric_sources {
            let parsed = row.get(source).and_then(clean_numeric);
            match canonical {
                CanonicalColumn::Amount => record.amount = parsed,
                CanonicalColumn::Income => record.income = parsed,
                CanonicalColumn::Expenses => record.expenses = parsed,
                CanonicalColumn::Revenue => record.revenue = parsed,
                CanonicalColumn::Costs => record.costs = parsed,
                _ => unreachable!("non-numeric canonical in numeric pass"),
            }
        }

        if mirror_income {
            record.income = record.revenue;
        }

        if let Some(source) = mapping.get(&CanonicalColumn::Category) {
            record.category = row.get(source).and_then(string_cell);
        }

        let has_signal = record.amount.is_some()
            || record.income.is_some()
            || record.expenses.is_some()
            || record.revenue.is_some()
            || record.costs.is_some();
        if !numeric_sources.is_empty() && !has_signal {
            dropped_empty += 1;
            continue;
        }

        total_cells += table.columns.len();
        non_null_cells += table
            .columns
            .iter()
            .filter(|c| row.get(*c).map(|v| !v.is_null()).unwrap_or(false))
            .count();
        records.push(record);
    }

    if dropped_dates + dropped_empty > 0 {
        debug!(
            "Dropped {} row(s) with unparsable dates and {} without numeric signal",
            dropped_dates, dropped_empty
        );
    }

    FinancialDataset {
        records,
        resolved,
        total_cells,
        non_null_cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_exact_names_pass_through() {
        let mapping = resolve_schema(&columns(&["Date", "Income", "Expenses"]));
        assert_eq!(mapping[&CanonicalColumn::Date], "Date");
        assert_eq!(mapping[&CanonicalColumn::Income], "Income");
        assert_eq!(mapping[&CanonicalColumn::Expenses], "Expenses");
        assert!(!mapping.contains_key(&CanonicalColumn::Revenue));
    }

    #[test]
    fn test_resolve_keyword_variants() {
        let mapping = resolve_schema(&columns(&[
            "Transaction Date",
            "Gross Sales",
            "Expenditure",
            "Value",
            "Classification",
        ]));
        assert_eq!(mapping[&CanonicalColumn::Date], "Transaction Date");
        assert_eq!(mapping[&CanonicalColumn::Revenue], "Gross Sales");
        assert_eq!(mapping[&CanonicalColumn::Expenses], "Expenditure");
        assert_eq!(mapping[&CanonicalColumn::Amount], "Value");
        assert_eq!(mapping[&CanonicalColumn::Category], "Classification");
    }

    #[test]
    fn test_resolve_first_match_wins() {
        // Both columns match the revenue keywords; only the first resolves,
        // leaving the second available for later passes.
        let mapping = resolve_schema(&columns(&["sales_total", "turnover"]));
        assert_eq!(mapping[&CanonicalColumn::Revenue], "sales_total");
        // "turnover" stays unclaimed: the revenue slot is taken and it
        // matches no other keyword set.
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn test_resolve_consumes_columns_once() {
        // "total_costs" matches both the expense keywords and the amount
        // keywords; the expense pass runs first and consumes it.
        let mapping = resolve_schema(&columns(&["total_costs"]));
        assert_eq!(mapping[&CanonicalColumn::Expenses], "total_costs");
        assert!(!mapping.contains_key(&CanonicalColumn::Amount));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let cols = columns(&["Period", "Amount", "Category", "notes"]);
        let a = resolve_schema(&cols);
        let b = resolve_schema(&cols);
        assert_eq!(a, b);
        assert_eq!(a[&CanonicalColumn::Date], "Period");
        assert_eq!(a[&CanonicalColumn::Amount], "Amount");
        assert_eq!(a[&CanonicalColumn::Category], "Category");
    }

    #[test]
    fn test_category_mask_double_count() {
        assert!(CategoryMask::INCOME.matches("Client Payment Received - Sales"));
        assert!(CategoryMask::EXPENSE.matches("Client Payment Received - Sales"));
        assert!(CategoryMask::INCOME.matches("deposit"));
        assert!(!CategoryMask::INCOME.matches("office rent"));
        assert!(CategoryMask::EXPENSE.matches("Office Rent Bill"));
    }

    #[test]
    fn test_clean_numeric_strips_currency() {
        assert_eq!(clean_numeric(&json!("$1,234.56")), Some(1234.56));
        assert_eq!(clean_numeric(&json!("€500")), Some(500.0));
        assert_eq!(clean_numeric(&json!("-42.5")), Some(-42.5));
        assert_eq!(clean_numeric(&json!(17)), Some(17.0));
        assert_eq!(clean_numeric(&json!("n/a")), None);
        assert_eq!(clean_numeric(&json!("")), None);
        assert_eq!(clean_numeric(&Value::Null), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(parse_date(&json!("2024-01-31")), Some(d));
        assert_eq!(parse_date(&json!("2024/01/31")), Some(d));
        assert_eq!(parse_date(&json!("01/31/2024")), Some(d));
        assert_eq!(parse_date(&json!("2024-01-31T10:30:00")), Some(d));
        assert_eq!(
            parse_date(&json!("2024-01")),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_date(&json!("not a date")), None);
    }

    #[test]
    fn test_parse_date_str_surfaces_failure() {
        use crate::error::AnalysisError;
        assert!(parse_date_str("2024-01-31").is_ok());
        assert!(matches!(
            parse_date_str("31st of January"),
            Err(AnalysisError::InvalidDateFormat(_))
        ));
    }

    fn row(pairs: &[(&str, Value)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_normalize_drops_bad_dates_and_empty_rows() {
        let table = RawTable::new(
            columns(&["date", "amount"]),
            vec![
                row(&[("date", json!("2024-01-01")), ("amount", json!("$100"))]),
                row(&[("date", json!("garbage")), ("amount", json!("200"))]),
                row(&[("date", json!("2024-01-03")), ("amount", json!("n/a"))]),
            ],
        );

        let dataset = normalize_table(&table);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records[0].amount, Some(100.0));
        assert!(dataset.resolved.date);
        assert!(dataset.resolved.amount);
    }

    #[test]
    fn test_normalize_keeps_row_with_any_numeric_signal() {
        let table = RawTable::new(
            columns(&["income", "expenses"]),
            vec![row(&[
                ("income", json!("5000")),
                ("expenses", json!("broken")),
            ])],
        );

        let dataset = normalize_table(&table);
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records[0].income, Some(5000.0));
        assert_eq!(dataset.records[0].expenses, None);
    }

    #[test]
    fn test_normalize_mirrors_revenue_into_income() {
        let table = RawTable::new(
            columns(&["revenue", "expenses"]),
            vec![row(&[
                ("revenue", json!("1000")),
                ("expenses", json!("400")),
            ])],
        );

        let dataset = normalize_table(&table);
        assert!(dataset.resolved.income);
        assert_eq!(dataset.records[0].income, Some(1000.0));
        assert_eq!(dataset.records[0].revenue, Some(1000.0));
    }

    #[test]
    fn test_normalize_without_numeric_columns_flags_no_signal() {
        let table = RawTable::new(
            columns(&["date", "notes"]),
            vec![row(&[
                ("date", json!("2024-01-01")),
                ("notes", json!("hello")),
            ])],
        );

        let dataset = normalize_table(&table);
        assert!(!dataset.resolved.any_numeric());
        assert_eq!(dataset.len(), 1);
    }

    #[test]
    fn test_monthly_buckets_group_by_calendar_month() {
        let table = RawTable::new(
            columns(&["date", "income", "expenses"]),
            vec![
                row(&[
                    ("date", json!("2024-01-05")),
                    ("income", json!("1000")),
                    ("expenses", json!("300")),
                ]),
                row(&[
                    ("date", json!("2024-01-20")),
                    ("income", json!("500")),
                    ("expenses", json!("200")),
                ]),
                row(&[
                    ("date", json!("2024-02-10")),
                    ("income", json!("800")),
                    ("expenses", json!("100")),
                ]),
            ],
        );

        let dataset = normalize_table(&table);
        let buckets = dataset.monthly_buckets();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label(), "2024-01");
        assert!((buckets[0].net_cash_flow() - 1000.0).abs() < 1e-9);
        assert!((buckets[1].net_cash_flow() - 700.0).abs() < 1e-9);
    }

    #[test]
    fn test_completeness_counts_non_null_cells() {
        let table = RawTable::new(
            columns(&["amount", "category"]),
            vec![
                row(&[("amount", json!("100")), ("category", json!("sales"))]),
                row(&[("amount", json!("50")), ("category", Value::Null)]),
            ],
        );

        let dataset = normalize_table(&table);
        assert_eq!(dataset.total_cells, 4);
        assert_eq!(dataset.non_null_cells, 3);
        assert!((dataset.completeness() - 75.0).abs() < 1e-9);
    }
}
