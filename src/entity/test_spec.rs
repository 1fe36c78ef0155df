// src/entity/test_spec.rs
use serde::{Deserialize, Serialize};

use super::{copy_title, require, Category, Lifecycle, Record, RecordBase};
use crate::gateway::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    #[default]
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    Flaky,
}

impl TestStatus {
    /// Whether the test has produced a result.
    pub fn is_finished(self) -> bool {
        !matches!(self, TestStatus::Pending | TestStatus::Running)
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Pending => write!(f, "pending"),
            TestStatus::Running => write!(f, "running"),
            TestStatus::Passed => write!(f, "passed"),
            TestStatus::Failed => write!(f, "failed"),
            TestStatus::Skipped => write!(f, "skipped"),
            TestStatus::Flaky => write!(f, "flaky"),
        }
    }
}

impl std::str::FromStr for TestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TestStatus::Pending),
            "running" => Ok(TestStatus::Running),
            "passed" | "pass" => Ok(TestStatus::Passed),
            "failed" | "fail" => Ok(TestStatus::Failed),
            "skipped" | "skip" => Ok(TestStatus::Skipped),
            "flaky" => Ok(TestStatus::Flaky),
            _ => Err(format!("Invalid test status: {}", s)),
        }
    }
}

impl Lifecycle for TestStatus {
    const ALL: &'static [Self] = &[
        TestStatus::Pending,
        TestStatus::Running,
        TestStatus::Passed,
        TestStatus::Failed,
        TestStatus::Skipped,
        TestStatus::Flaky,
    ];

    fn can_transition_to(self, next: Self) -> bool {
        match self {
            TestStatus::Pending => next == TestStatus::Running,
            TestStatus::Running => next.is_finished(),
            // finished specs can only be queued again
            _ => next == TestStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    Unit,
    Integration,
    E2e,
    Visual,
    Api,
    Accessibility,
}

impl std::fmt::Display for TestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestType::Unit => write!(f, "unit"),
            TestType::Integration => write!(f, "integration"),
            TestType::E2e => write!(f, "e2e"),
            TestType::Visual => write!(f, "visual"),
            TestType::Api => write!(f, "api"),
            TestType::Accessibility => write!(f, "accessibility"),
        }
    }
}

impl std::str::FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unit" => Ok(TestType::Unit),
            "integration" => Ok(TestType::Integration),
            "e2e" => Ok(TestType::E2e),
            "visual" => Ok(TestType::Visual),
            "api" => Ok(TestType::Api),
            "accessibility" | "a11y" => Ok(TestType::Accessibility),
            _ => Err(format!("Invalid test type: {}", s)),
        }
    }
}

impl Category for TestType {
    const ALL: &'static [Self] = &[
        TestType::Unit,
        TestType::Integration,
        TestType::E2e,
        TestType::Visual,
        TestType::Api,
        TestType::Accessibility,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BrowserType {
    #[default]
    Chromium,
    Firefox,
    Webkit,
    Edge,
}

impl std::fmt::Display for BrowserType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserType::Chromium => write!(f, "chromium"),
            BrowserType::Firefox => write!(f, "firefox"),
            BrowserType::Webkit => write!(f, "webkit"),
            BrowserType::Edge => write!(f, "edge"),
        }
    }
}

/// A single test case tracked by the test console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSpec {
    #[serde(flatten)]
    pub base: RecordBase,
    pub name: String,
    pub file: String,
    #[serde(default)]
    pub suite: String,
    pub status: TestStatus,
    pub test_type: TestType,
    pub browser: BrowserType,
    pub duration_ms: u64,
    pub retries: u32,
    pub error: Option<String>,
    /// Line coverage percentage reported by the last run.
    pub coverage: Option<f64>,
}

impl TestSpec {
    pub fn new(name: String, file: String) -> Self {
        Self {
            base: RecordBase::draft(),
            name,
            file,
            suite: String::new(),
            status: TestStatus::default(),
            test_type: TestType::default(),
            browser: BrowserType::default(),
            duration_ms: 0,
            retries: 0,
            error: None,
            coverage: None,
        }
    }
}

impl Record for TestSpec {
    type Status = TestStatus;
    type Category = TestType;

    const COLLECTION: &'static str = "test_specs";
    const NOUN: &'static str = "test";

    fn base(&self) -> &RecordBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut RecordBase {
        &mut self.base
    }

    fn status(&self) -> TestStatus {
        self.status
    }

    fn set_status(&mut self, status: TestStatus) {
        if status == TestStatus::Pending {
            self.error = None;
        }
        self.status = status;
    }

    fn category(&self) -> TestType {
        self.test_type
    }

    fn label(&self) -> &str {
        &self.name
    }

    fn searchable_fields(&self) -> Vec<&str> {
        vec![self.name.as_str(), self.file.as_str(), self.suite.as_str()]
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("file", &self.file)
    }

    fn duplicate(&self) -> Self {
        Self {
            base: self.base.duplicate(),
            name: copy_title(&self.name),
            suite: self.suite.clone(),
            test_type: self.test_type,
            browser: self.browser,
            ..TestSpec::new(String::new(), self.file.clone())
        }
    }

    fn fixtures() -> Vec<Self> {
        let mut login = TestSpec::new(
            "should log in with valid credentials".to_string(),
            "tests/e2e/auth.spec.ts".to_string(),
        );
        login.base = RecordBase::fixture("test/login", 1);
        login.suite = "Authentication".to_string();
        login.status = TestStatus::Passed;
        login.test_type = TestType::E2e;
        login.duration_ms = 2300;

        let mut upload = TestSpec::new(
            "uploads large files".to_string(),
            "tests/e2e/files.spec.ts".to_string(),
        );
        upload.base = RecordBase::fixture("test/upload", 1);
        upload.suite = "Files".to_string();
        upload.status = TestStatus::Flaky;
        upload.test_type = TestType::E2e;
        upload.browser = BrowserType::Webkit;
        upload.duration_ms = 8100;
        upload.retries = 2;

        vec![login, upload]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_transitions() {
        assert!(TestStatus::Pending.can_transition_to(TestStatus::Running));
        assert!(TestStatus::Running.can_transition_to(TestStatus::Flaky));
        assert!(!TestStatus::Running.can_transition_to(TestStatus::Pending));
        assert!(TestStatus::Failed.can_transition_to(TestStatus::Pending));
        assert!(!TestStatus::Passed.can_transition_to(TestStatus::Failed));
    }

    #[test]
    fn test_requeue_clears_error() {
        let mut spec = TestSpec::new("a".to_string(), "a.rs".to_string());
        spec.status = TestStatus::Failed;
        spec.error = Some("assertion failed".to_string());
        spec.set_status(TestStatus::Pending);
        assert!(spec.error.is_none());
    }

    #[test]
    fn test_spec_requires_file() {
        let spec = TestSpec::new("a".to_string(), String::new());
        assert!(spec.validate().is_err());
    }

    #[test]
    fn test_duplicate_resets_run_data() {
        let mut spec = TestSpec::new("a".to_string(), "a.rs".to_string());
        spec.status = TestStatus::Failed;
        spec.duration_ms = 900;
        spec.retries = 3;
        let copy = spec.duplicate();
        assert_eq!(copy.status, TestStatus::Pending);
        assert_eq!(copy.duration_ms, 0);
        assert_eq!(copy.retries, 0);
        assert_eq!(copy.file, "a.rs");
    }
}
