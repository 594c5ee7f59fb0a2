use crate::config::Config;
use crate::dates;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const STUDENTS: &str = "students";
pub const COURSES: &str = "courses";

pub const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .0.len())]
pub struct ValidationError(pub Vec<FieldError>);

impl ValidationError {
    #[cfg(test)]
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
}

impl StudentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StudentStatus::Active => "active",
            StudentStatus::Inactive => "inactive",
        }
    }
}

impl fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<bool> for StudentStatus {
    fn from(flag: bool) -> Self {
        if flag {
            StudentStatus::Active
        } else {
            StudentStatus::Inactive
        }
    }
}

impl FromStr for StudentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "true" => Ok(StudentStatus::Active),
            "inactive" | "false" => Ok(StudentStatus::Inactive),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

// Older records stored the status as a boolean flag.
impl<'de> Deserialize<'de> for StudentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Flag(b) => Ok(b.into()),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    /// Course name. Not a foreign key; see `references`.
    #[serde(default)]
    pub course: String,
    #[serde(default)]
    pub status: StudentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrolled_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
}

struct FieldReader<'a> {
    fields: &'a Map<String, Value>,
    errors: Vec<FieldError>,
}

impl<'a> FieldReader<'a> {
    fn new(fields: &'a Map<String, Value>) -> Self {
        Self {
            fields,
            errors: Vec::new(),
        }
    }

    fn fail(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn optional(&mut self, field: &str) -> Option<String> {
        match self.fields.get(field) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                let t = s.trim();
                (!t.is_empty()).then(|| t.to_string())
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                self.fail(field, "must be text");
                None
            }
        }
    }

    fn required(&mut self, field: &str) -> String {
        let before = self.errors.len();
        match self.optional(field) {
            Some(v) => v,
            None => {
                if self.errors.len() == before {
                    self.fail(field, format!("{field} is required"));
                }
                String::new()
            }
        }
    }

    fn date(&mut self, field: &str, value: &str) {
        if !value.is_empty() && dates::parse_naive(value).is_none() {
            self.fail(field, format!("{field} is not a valid date"));
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationError(self.errors))
        }
    }
}

fn looks_like_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !s.chars().any(char::is_whitespace)
}

impl Student {
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(fields);
        let name = r.required("name");
        let email = r.required("email");
        if !email.is_empty() && !looks_like_email(&email) {
            r.fail("email", "email is not a valid address");
        }
        let phone = r.required("phone");
        let course = r.required("course");
        let status = match fields.get("status") {
            None | Some(Value::Null) => StudentStatus::default(),
            Some(v) => StudentStatus::deserialize(v).unwrap_or_else(|e| {
                r.fail("status", e.to_string());
                StudentStatus::default()
            }),
        };
        let enrolled_date = r.optional("enrolledDate");
        if let Some(d) = &enrolled_date {
            r.date("enrolledDate", d);
        }
        r.finish(Student {
            id: String::new(),
            name,
            email,
            phone,
            course,
            status,
            enrolled_date,
        })
    }
}

impl Course {
    /// An empty code is generated from `prefix` and the current unix millis.
    pub fn from_fields(fields: &Map<String, Value>, prefix: &str) -> Result<Self, ValidationError> {
        let mut r = FieldReader::new(fields);
        let code = r.optional("code").unwrap_or_else(|| {
            format!("{}-{}", prefix, chrono::Utc::now().timestamp_millis())
        });
        let name = r.required("name");
        let description = r.optional("description").unwrap_or_default();
        let start_date = r.required("startDate");
        r.date("startDate", &start_date);
        let end_date = r.required("endDate");
        r.date("endDate", &end_date);
        r.finish(Course {
            id: String::new(),
            code,
            name,
            description,
            start_date,
            end_date,
        })
    }

    /// Problems worth reporting that do not block a save.
    pub fn warnings(&self) -> Vec<&'static str> {
        let start = dates::parse_instant(&self.start_date);
        let end = dates::parse_instant(&self.end_date);
        match (start, end) {
            (Some(s), Some(e)) if s > e => vec!["start_after_end"],
            _ => Vec::new(),
        }
    }
}

/// The two record kinds the dashboard edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Student,
    Course,
}

/// A validated record ready to be written, minus its id.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub record: Map<String, Value>,
    pub warnings: Vec<&'static str>,
    /// Course name a student points at.
    pub course_ref: Option<String>,
}

impl RecordKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "student" | "students" => Some(RecordKind::Student),
            "course" | "courses" => Some(RecordKind::Course),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Student => "student",
            RecordKind::Course => "course",
        }
    }

    pub fn collection(self) -> &'static str {
        match self {
            RecordKind::Student => STUDENTS,
            RecordKind::Course => COURSES,
        }
    }

    pub fn blank_draft(self, config: &Config) -> Map<String, Value> {
        let mut draft = Map::new();
        let fields: &[&str] = match self {
            RecordKind::Student => &["name", "email", "phone", "course", "enrolledDate"],
            RecordKind::Course => &["code", "name", "description", "startDate", "endDate"],
        };
        for f in fields {
            draft.insert((*f).to_string(), Value::String(String::new()));
        }
        if self == RecordKind::Student {
            draft.insert(
                "status".into(),
                Value::String(config.students.default_status.as_str().to_string()),
            );
        }
        draft
    }

    pub fn normalize(
        self,
        fields: &Map<String, Value>,
        config: &Config,
    ) -> Result<Normalized, ValidationError> {
        let (value, warnings, course_ref) = match self {
            RecordKind::Student => {
                let s = Student::from_fields(fields)?;
                let course = s.course.clone();
                (serde_json::to_value(&s), Vec::new(), Some(course))
            }
            RecordKind::Course => {
                let c = Course::from_fields(fields, &config.courses.code_prefix)?;
                let warnings = c.warnings();
                (serde_json::to_value(&c), warnings, None)
            }
        };
        let mut record = match value {
            Ok(Value::Object(m)) => m,
            _ => Map::new(),
        };
        record.remove("id");
        Ok(Normalized {
            record,
            warnings,
            course_ref,
        })
    }
}
