//! Tabular data for `UI_TABLE`.
//!
//! Both `sync` and `select` update the table's [`Request`] from the query
//! and hand it to the [`DataSource`]:
//!
//! - `fields=a,b` limits the published columns (all when empty)
//! - `where=a>=1&&b=x` filters rows; each condition is
//!   `field(=|<|>|<=|>=)value`
//!
//! A parameter that is not sent leaves that part of the request as it was,
//! so a plain `sync` repeats the last selection.
//!
//! Publishes `meta` (`[{"name": column}]`) and `data` (one object per row,
//! cells in column order).

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::debug;

use crate::com::{Com, Input, Output, Process};

/// One row of cells keyed by column name.
pub type Row = Output;

/// Separator between `where` conditions.
pub const CONDITION_SEPARATOR: &str = "&&";

static CONDITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([^=<>]+)([=<>]{1,2})(.+)").expect("condition pattern is valid")
});

/// Comparison in a `where` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Lt,
    Gt,
    Le,
    Ge,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" => Ok(Self::Eq),
            "<" => Ok(Self::Lt),
            ">" => Ok(Self::Gt),
            "<=" => Ok(Self::Le),
            ">=" => Ok(Self::Ge),
            other => Err(format!("unknown comparison '{other}'")),
        }
    }
}

impl CompareOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Lt => ord == Ordering::Less,
            Self::Gt => ord == Ordering::Greater,
            Self::Le => ord != Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
        }
    }
}

/// A parsed `field<op>value` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub field: String,
    pub op: CompareOp,
    pub value: String,
}

impl Condition {
    /// Parses `field<op>value`. `None` if the text has no valid comparison.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let caps = CONDITION.captures(text)?;
        let op = caps[2].parse().ok()?;
        let field = caps[1].trim();
        if field.is_empty() {
            return None;
        }
        Some(Self {
            field: field.to_string(),
            op,
            value: caps[3].trim().to_string(),
        })
    }

    /// Compares a cell against the condition's value: numerically when both
    /// sides are numbers, as text otherwise. Null cells never match.
    #[must_use]
    pub fn matches(&self, cell: &Value) -> bool {
        let text = match cell {
            Value::Null => return false,
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let ord = match (text.parse::<f64>(), self.value.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(text.as_str().cmp(self.value.as_str())),
        };
        ord.is_some_and(|ord| self.op.accepts(ord))
    }

    /// The value as a number, if it is one.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

/// Field selection and filter of a table request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub fields: BTreeSet<String>,
    pub conditions: Vec<Condition>,
}

impl Request {
    /// Applies `fields` and `where` when they are present in `input`.
    pub fn update(&mut self, input: &Input) {
        if let Some(fields) = input.param("fields") {
            self.fields = fields
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(clause) = input.param("where") {
            self.conditions = clause
                .split(CONDITION_SEPARATOR)
                .filter(|part| !part.trim().is_empty())
                .filter_map(|part| {
                    let condition = Condition::parse(part);
                    if condition.is_none() {
                        debug!(condition = %part, "Skipping unparsable condition");
                    }
                    condition
                })
                .collect();
        }
    }

    /// True if column `field` is selected.
    #[must_use]
    pub fn selects(&self, field: &str) -> bool {
        self.fields.is_empty() || self.fields.contains(field)
    }

    /// The first condition on `field`.
    #[must_use]
    pub fn condition(&self, field: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.field == field)
    }

    /// True if every condition on a column of `row` holds. Conditions on
    /// other fields are left to the data source.
    #[must_use]
    pub fn matches(&self, row: &Row) -> bool {
        self.conditions
            .iter()
            .all(|c| row.get(&c.field).map_or(true, |cell| c.matches(cell)))
    }
}

/// Supplies a table's columns and rows.
pub trait DataSource: Send {
    /// Column names in display order.
    fn columns(&self) -> Vec<String>;

    /// Rows for the current request.
    fn rows(&self, request: &Request) -> Vec<Row>;

    /// Called on every `sync` and `select`. Long loads report `in work`
    /// here and are polled until they finish.
    fn handle(&mut self, _request: &Request) -> Process {
        Process::default()
    }
}

/// Fixed rows filtered with [`Request::matches`].
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl StaticSource {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row. `cells` are matched to columns by position.
    #[must_use]
    pub fn row<I, V>(mut self, cells: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let row = self
            .columns
            .iter()
            .cloned()
            .zip(cells.into_iter().map(Into::into))
            .collect();
        self.rows.push(row);
        self
    }
}

impl DataSource for StaticSource {
    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn rows(&self, request: &Request) -> Vec<Row> {
        self.rows
            .iter()
            .filter(|row| request.matches(row))
            .cloned()
            .collect()
    }
}

/// Backend of `UI_TABLE`.
pub struct Table {
    source: Box<dyn DataSource>,
    request: Request,
}

impl Table {
    pub const SYNC: &'static str = "sync";
    pub const SELECT: &'static str = "select";

    pub fn new(source: impl DataSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            request: Request::default(),
        }
    }

    /// The request built from the queries so far.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }
}

impl Com for Table {
    fn com_type(&self) -> &'static str {
        "table"
    }

    fn actions(&self) -> &[&'static str] {
        &[Self::SYNC, Self::SELECT]
    }

    fn run_action(&mut self, _action: &str, input: &Input) -> Process {
        self.request.update(input);
        self.source.handle(&self.request)
    }

    fn publish_attributes(&mut self, out: &mut Output) {
        let columns: Vec<String> = self
            .source
            .columns()
            .into_iter()
            .filter(|c| self.request.selects(c))
            .collect();

        let meta = columns.iter().map(|name| json!({ "name": name })).collect();
        let data = self
            .source
            .rows(&self.request)
            .into_iter()
            .map(|mut row| {
                let cells: Row = columns
                    .iter()
                    .filter_map(|c| row.remove(c).map(|cell| (c.clone(), cell)))
                    .collect();
                Value::Object(cells)
            })
            .collect();

        out.insert("meta".into(), Value::Array(meta));
        out.insert("data".into(), Value::Array(data));
    }
}
