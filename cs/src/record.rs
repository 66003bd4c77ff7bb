//! Record types for the export job
//!
//! `Customer` is the source shape, read column-for-column from the
//! `customer` table. `NewCustomer` is the derived, external-facing shape
//! that flows to both sinks. `JobRun` is the bookkeeping row written for
//! every pipeline execution.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One customer row as stored in the source table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// First name
    pub firstname: String,

    /// Last name
    pub lastname: String,

    /// Email address
    pub email: String,

    /// Contact number
    pub contact_number: String,

    /// Country identifier, matched verbatim against the exclusion set
    pub country: String,

    /// Date of birth
    pub dob: NaiveDate,
}

/// The derived record delivered to the durable store and the flat file.
/// Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    /// First and last name joined with a single space
    pub full_name: String,

    /// Date of birth, copied unchanged
    pub birthday: NaiveDate,

    /// Country, copied unchanged
    pub nation: String,

    /// Contact number, copied unchanged
    pub phone_number: String,

    /// Email address, copied unchanged
    pub email: String,
}

impl NewCustomer {
    /// Derive the target shape from a source customer.
    ///
    /// The name parts are joined as-is; any leading or trailing whitespace
    /// in the source fields is preserved.
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            full_name: format!("{} {}", customer.firstname, customer.lastname),
            birthday: customer.dob,
            nation: customer.country.clone(),
            phone_number: customer.contact_number.clone(),
            email: customer.email.clone(),
        }
    }
}

/// Terminal and in-flight states of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run started, outcome not yet recorded
    Running,
    /// Source exhausted with every chunk committed to both sinks
    Complete,
    /// Aborted by a chunk, sink, or bookkeeping failure
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "complete" => Ok(Self::Complete),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown run status: {}", s)),
        }
    }
}

/// One pipeline execution, identified by a monotonically incrementing id.
/// Repeated invocations are distinguishable, not deduplicated.
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    /// Monotonic run identifier allocated by the store
    pub run_id: i64,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run ended, if it has
    pub finished_at: Option<DateTime<Utc>>,

    /// Current status
    pub status: RunStatus,

    /// Source rows read before the run ended
    pub read_count: u64,

    /// Records delivered to both sinks before the run ended
    pub written_count: u64,

    /// Error message for failed runs
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn customer(firstname: &str, lastname: &str) -> Customer {
        Customer {
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            email: "a@b.com".to_string(),
            contact_number: "000".to_string(),
            country: "US".to_string(),
            dob: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_from_customer_field_mapping() {
        let source = Customer {
            firstname: "Bo".to_string(),
            lastname: "Kim".to_string(),
            email: "bo@x.com".to_string(),
            contact_number: "222".to_string(),
            country: "US".to_string(),
            dob: NaiveDate::from_ymd_opt(1985, 5, 5).unwrap(),
        };

        let target = NewCustomer::from_customer(&source);

        assert_eq!(target.full_name, "Bo Kim");
        assert_eq!(target.birthday, NaiveDate::from_ymd_opt(1985, 5, 5).unwrap());
        assert_eq!(target.nation, "US");
        assert_eq!(target.phone_number, "222");
        assert_eq!(target.email, "bo@x.com");
    }

    #[test]
    fn test_full_name_preserves_whitespace() {
        // No trimming: whitespace already present in the source survives
        let target = NewCustomer::from_customer(&customer(" Ann ", "Lee "));
        assert_eq!(target.full_name, " Ann  Lee ");
    }

    #[test]
    fn test_run_status_display_parse() {
        for status in [RunStatus::Running, RunStatus::Complete, RunStatus::Failed] {
            let parsed: RunStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<RunStatus>().is_err());
    }

    #[test]
    fn test_new_customer_serde() {
        let target = NewCustomer::from_customer(&customer("Ann", "Lee"));
        let json = serde_json::to_string(&target).unwrap();
        let deserialized: NewCustomer = serde_json::from_str(&json).unwrap();
        assert_eq!(target, deserialized);
    }

    proptest! {
        #[test]
        fn prop_full_name_is_single_space_join(
            first in "[a-zA-Z ]{0,12}",
            last in "[a-zA-Z ]{0,12}",
        ) {
            let target = NewCustomer::from_customer(&customer(&first, &last));
            prop_assert_eq!(target.full_name, format!("{} {}", first, last));
        }
    }
}
