use crate::lifecycle::{AppState, HookPoint, Phase};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Boxed cause carried by component and hook failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum AppError {
    /// A lifecycle operation was invoked in a state that forbids it
    #[error("Cannot {operation} while application is {state}")]
    IllegalState {
        operation: &'static str,
        state: AppState,
    },

    /// The state observer refused an edge outside the lifecycle graph
    #[error("Illegal state transition: {from} -> {to}")]
    IllegalTransition { from: AppState, to: AppState },

    #[error("Component already registered: {name}")]
    DuplicateName { name: String },

    #[error("Component name must not be empty")]
    InvalidName,

    #[error("Component {name} failed during {phase}: {source}")]
    ComponentFailure {
        name: String,
        phase: Phase,
        #[source]
        source: BoxError,
    },

    #[error("Hook {point} failed: {source}")]
    HookFailure {
        point: HookPoint,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("Lifecycle cancelled")]
    Cancelled,

    /// A phase run by `Application::run` outlived its configured deadline
    #[error("Timeout during {phase}: no progress after {timeout:?}")]
    Timeout { phase: Phase, timeout: Duration },
}

impl AppError {
    pub fn component(name: impl Into<String>, phase: Phase, source: anyhow::Error) -> Self {
        Self::ComponentFailure {
            name: name.into(),
            phase,
            source: source.into(),
        }
    }

    pub fn hook(point: HookPoint, source: anyhow::Error) -> Self {
        Self::HookFailure {
            point,
            source: source.into(),
        }
    }

    /// Collapse a list of collected errors: `None` when empty, the
    /// aggregate otherwise.
    pub fn aggregate(errors: Vec<AppError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self::Aggregate(AggregateError { errors }))
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Several errors collected while shutting down or running after-hooks.
#[derive(Debug, Error)]
pub struct AggregateError {
    errors: Vec<AppError>,
}

impl AggregateError {
    pub fn errors(&self) -> &[AppError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<AppError> {
        self.errors
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) collected", self.errors.len())?;
        for (i, err) in self.errors.iter().enumerate() {
            write!(f, "; [{}] {}", i + 1, err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_empty_is_none() {
        assert!(AppError::aggregate(Vec::new()).is_none());
    }

    #[test]
    fn test_aggregate_lists_every_error() {
        let err = AppError::aggregate(vec![
            AppError::component("db", Phase::Stop, anyhow::anyhow!("E1")),
            AppError::component("web", Phase::Stop, anyhow::anyhow!("E2")),
        ])
        .unwrap();

        let message = err.to_string();
        assert!(message.starts_with("2 error(s) collected"));
        assert!(message.contains("Component db failed during Stop: E1"));
        assert!(message.contains("Component web failed during Stop: E2"));

        match err {
            AppError::Aggregate(agg) => assert_eq!(agg.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_component_failure_keeps_source() {
        let err = AppError::component("db", Phase::Initialize, anyhow::anyhow!("refused"));
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("refused"));
    }
}
