//! Domain types for departments, templates, persons and workdays.
//!
//! Records are projections of graph nodes. Each `from_node` reads the
//! properties written by the managers in this module.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{Result, StorageError, ValidationError};
use crate::graph::{Node, NodeLabel, NodeRef, Properties};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

// ============================================================================
// Weekday
// ============================================================================

/// One of the seven fixed weekday records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "MON")]
    Mon,
    #[serde(rename = "TUE")]
    Tue,
    #[serde(rename = "WED")]
    Wed,
    #[serde(rename = "THU")]
    Thu,
    #[serde(rename = "FRI")]
    Fri,
    #[serde(rename = "SAT")]
    Sat,
    #[serde(rename = "SUN")]
    Sun,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Weekday::Mon => "MON",
            Weekday::Tue => "TUE",
            Weekday::Wed => "WED",
            Weekday::Thu => "THU",
            Weekday::Fri => "FRI",
            Weekday::Sat => "SAT",
            Weekday::Sun => "SUN",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }

    /// ISO day number, Monday = 1.
    pub fn number(&self) -> u32 {
        match self {
            Weekday::Mon => 1,
            Weekday::Tue => 2,
            Weekday::Wed => 3,
            Weekday::Thu => 4,
            Weekday::Fri => 5,
            Weekday::Sat => 6,
            Weekday::Sun => 7,
        }
    }

    pub fn from_code(code: &str) -> Result<Self> {
        Weekday::ALL
            .into_iter()
            .find(|w| w.code().eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| ValidationError::InvalidWeekday(code.to_string()).into())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        match date.weekday() {
            chrono::Weekday::Mon => Weekday::Mon,
            chrono::Weekday::Tue => Weekday::Tue,
            chrono::Weekday::Wed => Weekday::Wed,
            chrono::Weekday::Thu => Weekday::Thu,
            chrono::Weekday::Fri => Weekday::Fri,
            chrono::Weekday::Sat => Weekday::Sat,
            chrono::Weekday::Sun => Weekday::Sun,
        }
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(NodeLabel::Weekday, self.code())
    }
}

impl std::fmt::Display for Weekday {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Weekday {
    type Err = crate::error::RosterError;

    fn from_str(s: &str) -> Result<Self> {
        Weekday::from_code(s)
    }
}

// ============================================================================
// Date and Time Helpers
// ============================================================================

/// Parse a canonical `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()).into())
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| ValidationError::InvalidTime(value.to_string()).into())
}

pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Minutes from `start` to `end`. An end before the start wraps past
/// midnight; equal times are rejected.
pub fn duration_minutes(start: NaiveTime, end: NaiveTime) -> Result<i64> {
    let minutes = (end - start).num_minutes();
    match minutes {
        0 => Err(ValidationError::EmptyTimeRange {
            start: format_time(start),
            end: format_time(end),
        }
        .into()),
        m if m < 0 => Ok(m + 24 * 60),
        m => Ok(m),
    }
}

/// Identifiers become path segments of node keys.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    if id.trim().is_empty() || id.contains('/') {
        return Err(ValidationError::InvalidId(id.to_string()).into());
    }
    Ok(())
}

pub(crate) fn require_field(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field.to_string()).into());
    }
    Ok(())
}

// ============================================================================
// Node Addresses
// ============================================================================

pub fn department_ref(department_id: &str) -> NodeRef {
    NodeRef::new(NodeLabel::Department, department_id)
}

pub fn workplace_ref(department_id: &str, workplace_id: &str) -> NodeRef {
    NodeRef::new(
        NodeLabel::Workplace,
        format!("{}/{}", department_id, workplace_id),
    )
}

pub fn timeslot_ref(department_id: &str, workplace_id: &str, timeslot_name: &str) -> NodeRef {
    NodeRef::new(
        NodeLabel::Timeslot,
        format!("{}/{}/{}", department_id, workplace_id, timeslot_name),
    )
}

pub fn date_ref(date: NaiveDate) -> NodeRef {
    NodeRef::new(NodeLabel::Date, format_date(date))
}

pub fn person_ref(person_id: &str) -> NodeRef {
    NodeRef::new(NodeLabel::Person, person_id)
}

/// Natural key of a materialized workday.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkdayKey {
    pub department_id: String,
    pub workplace_id: String,
    pub timeslot_name: String,
    pub date: NaiveDate,
}

impl WorkdayKey {
    pub fn new(
        department_id: impl Into<String>,
        workplace_id: impl Into<String>,
        timeslot_name: impl Into<String>,
        date: NaiveDate,
    ) -> Self {
        Self {
            department_id: department_id.into(),
            workplace_id: workplace_id.into(),
            timeslot_name: timeslot_name.into(),
            date,
        }
    }

    /// Build a key from a `YYYY-MM-DD` date string.
    pub fn parse(
        department_id: &str,
        workplace_id: &str,
        timeslot_name: &str,
        date: &str,
    ) -> Result<Self> {
        Ok(Self::new(
            department_id,
            workplace_id,
            timeslot_name,
            parse_date(date)?,
        ))
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef::new(NodeLabel::Workday, self.to_string())
    }

    pub fn timeslot_ref(&self) -> NodeRef {
        timeslot_ref(&self.department_id, &self.workplace_id, &self.timeslot_name)
    }
}

impl std::fmt::Display for WorkdayKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.department_id,
            self.workplace_id,
            self.timeslot_name,
            format_date(self.date)
        )
    }
}

// ============================================================================
// Node Property Access
// ============================================================================

fn required_str(node: &Node, key: &str) -> Result<String> {
    node.get_str(key).map(str::to_string).ok_or_else(|| {
        StorageError::SchemaMismatch(format!("{} is missing property '{}'", node.id, key)).into()
    })
}

fn required_time(node: &Node, key: &str) -> Result<NaiveTime> {
    parse_time(&required_str(node, key)?)
}

pub(crate) fn props(
    pairs: impl IntoIterator<Item = (&'static str, serde_json::Value)>,
) -> Properties {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ============================================================================
// Template Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Department {
    pub(crate) fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            id: node.key.clone(),
            name: required_str(node, "name")?,
            created_at: node.created_at,
            updated_at: node.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workplace {
    pub id: String,
    pub department_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workplace {
    pub(crate) fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            id: required_str(node, "id")?,
            department_id: required_str(node, "department")?,
            name: required_str(node, "name")?,
            created_at: node.created_at,
            updated_at: node.updated_at,
        })
    }
}

/// A weekly recurring binding of a timeslot to a weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Offering {
    pub fn new(weekday: Weekday, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            weekday,
            start_time,
            end_time,
        }
    }

    pub fn duration_minutes(&self) -> Result<i64> {
        duration_minutes(self.start_time, self.end_time)
    }

    pub(crate) fn edge_properties(&self) -> Properties {
        props([
            ("start_time", json!(format_time(self.start_time))),
            ("end_time", json!(format_time(self.end_time))),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Timeslot {
    pub name: String,
    pub department_id: String,
    pub workplace_id: String,
    pub active: bool,
    /// Offerings ordered Monday to Sunday.
    pub offerings: Vec<Offering>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Timeslot {
    pub(crate) fn from_node(node: &Node, offerings: Vec<Offering>) -> Result<Self> {
        Ok(Self {
            name: required_str(node, "name")?,
            department_id: required_str(node, "department")?,
            workplace_id: required_str(node, "workplace")?,
            active: node.get_bool("active").unwrap_or(false),
            offerings,
            created_at: node.created_at,
            updated_at: node.updated_at,
        })
    }
}

// ============================================================================
// Person Records
// ============================================================================

/// Writable person fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonInput {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub active: bool,
    /// Target working hours per week.
    pub working_hours: i64,
}

impl PersonInput {
    pub fn new(
        id: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            active: true,
            working_hours: 0,
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn with_working_hours(mut self, hours: i64) -> Self {
        self.working_hours = hours;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        require_field("first_name", &self.first_name)?;
        require_field("last_name", &self.last_name)?;
        require_field("email", &self.email)?;
        Ok(())
    }

    pub(crate) fn properties(&self) -> Properties {
        props([
            ("first_name", json!(self.first_name)),
            ("last_name", json!(self.last_name)),
            ("email", json!(self.email)),
            ("active", json!(self.active)),
            ("working_hours", json!(self.working_hours)),
        ])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub active: bool,
    pub working_hours: i64,
    /// Departments the person works at.
    pub departments: Vec<String>,
    /// Workplaces the person is qualified for, as `department/workplace`.
    pub workplaces: Vec<String>,
    /// Weekdays the person is available on.
    pub weekdays: Vec<Weekday>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Person {
    pub(crate) fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            id: node.key.clone(),
            first_name: required_str(node, "first_name")?,
            last_name: required_str(node, "last_name")?,
            email: required_str(node, "email")?,
            active: node.get_bool("active").unwrap_or(false),
            working_hours: node.get_i64("working_hours").unwrap_or(0),
            departments: Vec::new(),
            workplaces: Vec::new(),
            weekdays: Vec::new(),
            created_at: node.created_at,
            updated_at: node.updated_at,
        })
    }
}

/// The person linked to a workday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignee {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Assignee {
    pub(crate) fn from_node(node: &Node) -> Result<Self> {
        Ok(Self {
            id: node.key.clone(),
            first_name: required_str(node, "first_name")?,
            last_name: required_str(node, "last_name")?,
            email: required_str(node, "email")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Absence {
    pub person_id: String,
    pub date: NaiveDate,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Workday Records
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workday {
    pub department_id: String,
    pub workplace_id: String,
    pub timeslot_name: String,
    pub date: NaiveDate,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Length of the shift. When `end_time` is before `start_time` the shift
    /// runs past midnight, so 22:00 to 06:00 is 480 minutes rather than
    /// a negative span.
    pub duration_minutes: i64,
    pub active: bool,
    pub comment: String,
    pub person: Option<Assignee>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workday {
    pub fn key(&self) -> WorkdayKey {
        WorkdayKey::new(
            self.department_id.clone(),
            self.workplace_id.clone(),
            self.timeslot_name.clone(),
            self.date,
        )
    }

    pub(crate) fn from_node(node: &Node, person: Option<Assignee>) -> Result<Self> {
        Ok(Self {
            department_id: required_str(node, "department")?,
            workplace_id: required_str(node, "workplace")?,
            timeslot_name: required_str(node, "timeslot")?,
            date: parse_date(&required_str(node, "date")?)?,
            weekday: Weekday::from_code(&required_str(node, "weekday")?)?,
            start_time: required_time(node, "start_time")?,
            end_time: required_time(node, "end_time")?,
            duration_minutes: node.get_i64("duration_in_minutes").unwrap_or(0),
            active: node.get_bool("active").unwrap_or(false),
            comment: node.get_str("comment").unwrap_or_default().to_string(),
            person,
            created_at: node.created_at,
            updated_at: node.updated_at,
        })
    }
}

/// Editable workday fields. Unset fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkdayUpdate {
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub active: Option<bool>,
    pub comment: Option<String>,
}

impl WorkdayUpdate {
    pub fn times(start_time: NaiveTime, end_time: NaiveTime) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Default::default()
        }
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}
